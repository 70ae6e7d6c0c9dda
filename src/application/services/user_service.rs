use crate::application::ports::FeedGateway;
use crate::application::services::mutations::{Mutation, MutationEngine, MutationReply};
use crate::domain::entities::{ProfilePatch, User};
use crate::domain::value_objects::CacheKey;
use crate::infrastructure::cache::{CacheValue, EntityCache};
use crate::infrastructure::session::SessionHandle;
use crate::shared::config::CacheConfig;
use crate::shared::error::{AppError, Result};
use std::sync::Arc;
use std::time::Duration;

/// viewer プロフィール・ユーザー検索・おすすめユーザーを扱うサービス
pub struct UserService {
    cache: Arc<EntityCache>,
    gateway: Arc<dyn FeedGateway>,
    engine: Arc<MutationEngine>,
    session: Arc<SessionHandle>,
    config: CacheConfig,
}

impl UserService {
    pub fn new(
        cache: Arc<EntityCache>,
        gateway: Arc<dyn FeedGateway>,
        engine: Arc<MutationEngine>,
        session: Arc<SessionHandle>,
        config: CacheConfig,
    ) -> Self {
        Self {
            cache,
            gateway,
            engine,
            session,
            config,
        }
    }

    fn fresh(&self) -> Duration {
        Duration::from_secs(self.config.fresh_secs)
    }

    /// ログイン中ユーザーのプロフィール。取得結果はセッションの
    /// viewer にも反映する。
    pub async fn current_user(&self) -> Result<User> {
        let gateway = Arc::clone(&self.gateway);
        let value = self
            .cache
            .read_through(&CacheKey::current_user(), self.fresh(), move || async move {
                let user = gateway.fetch_current_user().await?;
                Ok(CacheValue::User(Box::new(user)))
            })
            .await?;
        let user = value
            .as_user()
            .cloned()
            .ok_or_else(|| AppError::Internal("current_user cache holds no user".to_string()))?;
        self.session.set_viewer(Some(user.clone()));
        Ok(user)
    }

    /// username からプロフィールを取得
    pub async fn profile(&self, username: &str) -> Result<Option<User>> {
        let gateway = Arc::clone(&self.gateway);
        let username_owned = username.to_string();
        match self
            .cache
            .read_through(
                &CacheKey::user_profile(username),
                self.fresh(),
                move || async move {
                    let user = gateway.fetch_user_by_username(&username_owned).await?;
                    Ok(CacheValue::User(Box::new(user)))
                },
            )
            .await
        {
            Ok(value) => Ok(value.as_user().cloned()),
            Err(AppError::Api { status: 404, .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// フォロー候補のおすすめユーザー一覧
    pub async fn suggested_users(&self) -> Result<Vec<User>> {
        let gateway = Arc::clone(&self.gateway);
        let value = self
            .cache
            .read_through(
                &CacheKey::suggested_users(),
                self.fresh(),
                move || async move {
                    Ok(CacheValue::Users(gateway.fetch_suggested_users().await?))
                },
            )
            .await?;
        Ok(value.as_users().map(<[User]>::to_vec).unwrap_or_default())
    }

    /// メンション補完などのためのユーザー検索（キャッシュしない）
    pub async fn search(&self, query: &str) -> Result<Vec<User>> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }
        self.gateway.search_users(trimmed).await
    }

    /// 楽観的なプロフィール更新。失敗時は viewer キャッシュを戻す。
    pub async fn update_profile(&self, patch: ProfilePatch) -> Result<User> {
        if patch.is_empty() {
            return Err(AppError::ValidationError(
                "Profile patch has no fields to update".to_string(),
            ));
        }
        match self.engine.execute(Mutation::UpdateProfile { patch }).await? {
            MutationReply::UpdatedUser(user) => Ok(user),
            reply => Err(AppError::Internal(format!(
                "Unexpected reply for update_profile: {reply:?}"
            ))),
        }
    }
}
