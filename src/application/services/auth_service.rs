use crate::application::ports::{FeedGateway, SignupPayload, TokenRefresher};
use crate::domain::entities::User;
use crate::domain::value_objects::CacheKey;
use crate::infrastructure::cache::{CacheValue, EntityCache};
use crate::infrastructure::session::SessionHandle;
use crate::shared::error::{AppError, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// ログイン・サインアップ・起動時のセッション復元・ログアウトを
/// 扱うサービス。どの経路でも最後にはセッションを「チェック済み」に
/// マークする。
pub struct AuthService {
    gateway: Arc<dyn FeedGateway>,
    session: Arc<SessionHandle>,
    cache: Arc<EntityCache>,
    refresher: Arc<dyn TokenRefresher>,
}

impl AuthService {
    pub fn new(
        gateway: Arc<dyn FeedGateway>,
        session: Arc<SessionHandle>,
        cache: Arc<EntityCache>,
        refresher: Arc<dyn TokenRefresher>,
    ) -> Self {
        Self {
            gateway,
            session,
            cache,
            refresher,
        }
    }

    pub async fn login(&self, identifier: &str, password: &str) -> Result<User> {
        let result = self.gateway.login(identifier, password).await;
        match result {
            Ok(auth) => {
                self.session.set_session(auth.tokens.clone())?;
                self.session.set_viewer(Some(auth.user.clone()));
                self.cache.set(
                    &CacheKey::current_user(),
                    CacheValue::User(Box::new(auth.user.clone())),
                );
                self.session.mark_checked();
                info!("Logged in as {}", auth.user.username);
                Ok(auth.user)
            }
            Err(err) => {
                // 失敗でも初期チェック自体は完了扱いにする
                self.session.mark_checked();
                Err(err)
            }
        }
    }

    /// サインアップはトークンを返さない。ログインは別途行う。
    pub async fn signup(&self, payload: SignupPayload) -> Result<User> {
        let result = self.gateway.signup(&payload).await;
        self.session.mark_checked();
        match result {
            Ok(user) => {
                info!("Signed up as {}", user.username);
                Ok(user)
            }
            Err(err) => Err(err),
        }
    }

    /// 起動時のセッション復元。永続化済みのリフレッシュトークンが
    /// あればサイレントリフレッシュを試み、成功したら viewer
    /// プロフィールを取り込む。
    pub async fn bootstrap(&self) -> Result<Option<User>> {
        let result = self.bootstrap_inner().await;
        self.session.mark_checked();
        result
    }

    async fn bootstrap_inner(&self) -> Result<Option<User>> {
        let restored = self.session.restore_persisted()?;
        if !restored {
            debug!("No persisted credentials found, starting unauthenticated");
            self.session.clear();
            self.cache.clear();
            return Ok(None);
        }

        match self.refresher.refresh().await {
            Ok(_) => {}
            Err(AppError::Unauthorized(reason)) | Err(AppError::Auth(reason)) => {
                // リフレッシュ失敗時はトランスポートがセッションと
                // キャッシュを破棄済み
                warn!("Silent refresh failed during bootstrap: {reason}");
                return Ok(None);
            }
            Err(err) => return Err(err),
        }

        let user = self.gateway.fetch_current_user().await?;
        self.session.set_viewer(Some(user.clone()));
        self.cache.set(
            &CacheKey::current_user(),
            CacheValue::User(Box::new(user.clone())),
        );
        debug!("Session restored for {}", user.username);
        Ok(Some(user))
    }

    /// ログアウト。資格情報とキャッシュ全体を破棄する。
    pub fn logout(&self) {
        self.session.clear();
        self.cache.clear();
        info!("Logged out, session and cache cleared");
    }
}
