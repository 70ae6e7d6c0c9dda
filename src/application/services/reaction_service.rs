use crate::application::ports::{FeedGateway, LikeStatus};
use crate::application::services::mutations::{Mutation, MutationEngine, MutationReply};
use crate::domain::value_objects::{is_temp_id, CacheKey};
use crate::infrastructure::cache::{CacheValue, EntityCache};
use crate::infrastructure::session::SessionHandle;
use crate::shared::config::CacheConfig;
use crate::shared::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// いいね（投稿・コメント）の件数と viewer フラグ、および
/// like / unlike ミューテーションを扱うサービス。
///
/// 件数とフラグは親エンティティに埋め込まず、独立したキーで
/// キャッシュする。一時 ID を渡された読み出しはネットワークに出ず、
/// キャッシュ値か既定値（0 / false）を返す。
pub struct ReactionService {
    cache: Arc<EntityCache>,
    gateway: Arc<dyn FeedGateway>,
    engine: Arc<MutationEngine>,
    session: Arc<SessionHandle>,
    config: CacheConfig,
}

impl ReactionService {
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

    fn flag_fresh(&self) -> Duration {
        Duration::from_secs(self.config.flag_fresh_secs)
    }

    fn cached_count(&self, key: &CacheKey) -> u64 {
        self.cache
            .peek(key)
            .as_ref()
            .and_then(CacheValue::as_count)
            .unwrap_or(0)
    }

    fn cached_flag(&self, key: &CacheKey) -> bool {
        self.cache
            .peek(key)
            .as_ref()
            .and_then(CacheValue::as_flag)
            .unwrap_or(false)
    }

    pub async fn post_likes_count(&self, post_id: &str) -> Result<u64> {
        let key = CacheKey::post_likes_count(post_id);
        if is_temp_id(post_id) {
            return Ok(self.cached_count(&key));
        }
        let gateway = Arc::clone(&self.gateway);
        let post_id_owned = post_id.to_string();
        let value = self
            .cache
            .read_through(&key, self.fresh(), move || async move {
                Ok(CacheValue::Count(
                    gateway.fetch_post_likes_count(&post_id_owned).await?,
                ))
            })
            .await?;
        Ok(value.as_count().unwrap_or_default())
    }

    pub async fn comment_likes_count(&self, comment_id: &str) -> Result<u64> {
        let key = CacheKey::comment_likes_count(comment_id);
        if is_temp_id(comment_id) {
            return Ok(self.cached_count(&key));
        }
        let gateway = Arc::clone(&self.gateway);
        let comment_id_owned = comment_id.to_string();
        let value = self
            .cache
            .read_through(&key, self.fresh(), move || async move {
                Ok(CacheValue::Count(
                    gateway.fetch_comment_likes_count(&comment_id_owned).await?,
                ))
            })
            .await?;
        Ok(value.as_count().unwrap_or_default())
    }

    /// viewer が投稿にいいね済みか。未ログインなら常に false。
    pub async fn has_liked_post(&self, post_id: &str) -> Result<bool> {
        let key = CacheKey::post_has_liked(post_id);
        if is_temp_id(post_id) || self.session.viewer().is_none() {
            return Ok(self.cached_flag(&key));
        }
        let gateway = Arc::clone(&self.gateway);
        let post_id_owned = post_id.to_string();
        let value = self
            .cache
            .read_through(&key, self.flag_fresh(), move || async move {
                Ok(CacheValue::Flag(
                    gateway.fetch_has_liked_post(&post_id_owned).await?,
                ))
            })
            .await?;
        Ok(value.as_flag().unwrap_or_default())
    }

    pub async fn has_liked_comment(&self, comment_id: &str) -> Result<bool> {
        let key = CacheKey::comment_has_liked(comment_id);
        if is_temp_id(comment_id) || self.session.viewer().is_none() {
            return Ok(self.cached_flag(&key));
        }
        let gateway = Arc::clone(&self.gateway);
        let comment_id_owned = comment_id.to_string();
        let value = self
            .cache
            .read_through(&key, self.flag_fresh(), move || async move {
                Ok(CacheValue::Flag(
                    gateway.fetch_has_liked_comment(&comment_id_owned).await?,
                ))
            })
            .await?;
        Ok(value.as_flag().unwrap_or_default())
    }

    fn map_reply(reply: MutationReply, liked: bool) -> LikeStatus {
        match reply {
            MutationReply::Liked(status) => status,
            _ => LikeStatus {
                liked,
                message: "Simulated like operation for temporary target".to_string(),
            },
        }
    }

    pub async fn like_post(&self, post_id: &str) -> Result<LikeStatus> {
        let reply = self
            .engine
            .execute(Mutation::LikePost {
                post_id: post_id.to_string(),
            })
            .await?;
        Ok(Self::map_reply(reply, true))
    }

    pub async fn unlike_post(&self, post_id: &str) -> Result<LikeStatus> {
        let reply = self
            .engine
            .execute(Mutation::UnlikePost {
                post_id: post_id.to_string(),
            })
            .await?;
        Ok(Self::map_reply(reply, false))
    }

    pub async fn like_comment(&self, comment_id: &str) -> Result<LikeStatus> {
        let reply = self
            .engine
            .execute(Mutation::LikeComment {
                comment_id: comment_id.to_string(),
            })
            .await?;
        Ok(Self::map_reply(reply, true))
    }

    pub async fn unlike_comment(&self, comment_id: &str) -> Result<LikeStatus> {
        let reply = self
            .engine
            .execute(Mutation::UnlikeComment {
                comment_id: comment_id.to_string(),
            })
            .await?;
        Ok(Self::map_reply(reply, false))
    }
}
