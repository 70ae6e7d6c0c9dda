use crate::domain::value_objects::AuthTokens;
use crate::shared::error::Result;

/// セッション資格情報の永続化ポート。プロセス再起動をまたいで
/// `accessToken` / `refreshToken` の固定キー名で保存する。
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<AuthTokens>>;
    fn save(&self, tokens: &AuthTokens) -> Result<()>;
    fn clear(&self) -> Result<()>;
}
