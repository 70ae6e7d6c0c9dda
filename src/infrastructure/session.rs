use crate::application::ports::CredentialStore;
use crate::domain::entities::User;
use crate::domain::value_objects::AuthTokens;
use crate::shared::error::Result;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

/// プロセス内のセッション状態。トークン・閲覧者プロフィール・
/// 「初期チェック済み」フラグを保持し、資格情報は CredentialStore 経由で
/// 永続化する。
///
/// token_version はアクセストークンが差し替わるたびに増える。
/// トランスポートの single-flight リフレッシュは、この版数で
/// 「自分が 401 を見た後に誰かがもう更新したか」を判定する。
pub struct SessionHandle {
    tokens: RwLock<Option<AuthTokens>>,
    token_version: AtomicU64,
    viewer: RwLock<Option<User>>,
    checked: AtomicBool,
    store: Arc<dyn CredentialStore>,
}

impl SessionHandle {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            tokens: RwLock::new(None),
            token_version: AtomicU64::new(0),
            viewer: RwLock::new(None),
            checked: AtomicBool::new(false),
            store,
        }
    }

    fn read_tokens(&self) -> RwLockReadGuard<'_, Option<AuthTokens>> {
        self.tokens
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_tokens(&self) -> RwLockWriteGuard<'_, Option<AuthTokens>> {
        self.tokens
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 永続化済みの資格情報をメモリへ読み込む（起動時に一度呼ぶ）
    pub fn restore_persisted(&self) -> Result<bool> {
        match self.store.load()? {
            Some(tokens) => {
                *self.write_tokens() = Some(tokens);
                self.token_version.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.read_tokens().as_ref().map(|t| t.access.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read_tokens().as_ref().map(|t| t.refresh.clone())
    }

    pub fn token_version(&self) -> u64 {
        self.token_version.load(Ordering::SeqCst)
    }

    /// ログイン時: アクセス・リフレッシュ両方を差し替えて永続化する
    pub fn set_session(&self, tokens: AuthTokens) -> Result<()> {
        self.store.save(&tokens)?;
        *self.write_tokens() = Some(tokens);
        self.token_version.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// リフレッシュ時: アクセストークンだけ差し替える
    /// （リフレッシュトークンは既存のものを維持する）
    pub fn set_access_token(&self, access: String) -> Result<()> {
        let updated = {
            let mut tokens = self.write_tokens();
            match tokens.as_mut() {
                Some(current) => {
                    current.access = access;
                    Some(current.clone())
                }
                None => None,
            }
        };
        if let Some(tokens) = updated {
            self.store.save(&tokens)?;
            self.token_version.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    pub fn viewer(&self) -> Option<User> {
        self.viewer
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn viewer_id(&self) -> Option<String> {
        self.viewer().map(|user| user.id)
    }

    pub fn set_viewer(&self, user: Option<User>) {
        *self
            .viewer
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = user;
    }

    pub fn is_authenticated(&self) -> bool {
        self.read_tokens().is_some()
    }

    /// 起動時チェックの完了フラグ
    pub fn mark_checked(&self) {
        self.checked.store(true, Ordering::SeqCst);
    }

    pub fn is_checked(&self) -> bool {
        self.checked.load(Ordering::SeqCst)
    }

    /// セッションを全消去する（メモリ・永続化の両方）
    pub fn clear(&self) {
        *self.write_tokens() = None;
        self.set_viewer(None);
        self.token_version.fetch_add(1, Ordering::SeqCst);
        self.checked.store(true, Ordering::SeqCst);
        if let Err(err) = self.store.clear() {
            warn!("Failed to clear persisted credentials: {err}");
        }
    }
}
