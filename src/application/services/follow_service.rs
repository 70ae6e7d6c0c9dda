use crate::application::ports::{FeedGateway, FollowStatus};
use crate::application::services::mutations::{Mutation, MutationEngine, MutationReply};
use crate::application::shared::feed::fetch_next_page;
use crate::domain::entities::{PaginatedCollection, User};
use crate::domain::value_objects::CacheKey;
use crate::infrastructure::cache::{CacheValue, EntityCache};
use crate::infrastructure::session::SessionHandle;
use crate::shared::config::CacheConfig;
use crate::shared::error::{AppError, Result};
use std::sync::Arc;
use std::time::Duration;

/// フォローグラフ（件数・フラグ・一覧）と follow / unfollow を扱うサービス
pub struct FollowService {
    cache: Arc<EntityCache>,
    gateway: Arc<dyn FeedGateway>,
    engine: Arc<MutationEngine>,
    session: Arc<SessionHandle>,
    config: CacheConfig,
}

impl FollowService {
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

    pub async fn followers_count(&self, user_id: &str) -> Result<u64> {
        let gateway = Arc::clone(&self.gateway);
        let user_id_owned = user_id.to_string();
        let value = self
            .cache
            .read_through(
                &CacheKey::followers_count(user_id),
                self.fresh(),
                move || async move {
                    Ok(CacheValue::Count(
                        gateway.fetch_followers_count(&user_id_owned).await?,
                    ))
                },
            )
            .await?;
        Ok(value.as_count().unwrap_or_default())
    }

    pub async fn following_count(&self, user_id: &str) -> Result<u64> {
        let gateway = Arc::clone(&self.gateway);
        let user_id_owned = user_id.to_string();
        let value = self
            .cache
            .read_through(
                &CacheKey::following_count(user_id),
                self.fresh(),
                move || async move {
                    Ok(CacheValue::Count(
                        gateway.fetch_following_count(&user_id_owned).await?,
                    ))
                },
            )
            .await?;
        Ok(value.as_count().unwrap_or_default())
    }

    /// viewer が対象ユーザーをフォロー済みか。未ログインなら常に false。
    pub async fn is_following(&self, target_user_id: &str) -> Result<bool> {
        let Some(viewer_id) = self.session.viewer_id() else {
            return Ok(false);
        };
        let gateway = Arc::clone(&self.gateway);
        let target_owned = target_user_id.to_string();
        let value = self
            .cache
            .read_through(
                &CacheKey::is_following(&viewer_id, target_user_id),
                self.flag_fresh(),
                move || async move {
                    Ok(CacheValue::Flag(
                        gateway.fetch_is_followed_by_me(&target_owned).await?,
                    ))
                },
            )
            .await?;
        Ok(value.as_flag().unwrap_or_default())
    }

    pub async fn followers(&self, user_id: &str) -> Result<Vec<User>> {
        let gateway = Arc::clone(&self.gateway);
        let user_id_owned = user_id.to_string();
        let value = self
            .cache
            .read_through(
                &CacheKey::followers_list(user_id),
                self.fresh(),
                move || async move {
                    let page = gateway.fetch_followers(&user_id_owned, None).await?;
                    Ok(CacheValue::UserFeed(PaginatedCollection::from_page(page)))
                },
            )
            .await?;
        Ok(value
            .as_user_feed()
            .map(|feed| feed.flatten())
            .unwrap_or_default())
    }

    pub async fn fetch_next_followers(&self, user_id: &str) -> Result<bool> {
        let gateway = Arc::clone(&self.gateway);
        let user_id_owned = user_id.to_string();
        fetch_next_page(
            &self.cache,
            &CacheKey::followers_list(user_id),
            move |cursor| async move {
                gateway
                    .fetch_followers(&user_id_owned, cursor.as_deref())
                    .await
            },
        )
        .await
    }

    pub async fn following(&self, user_id: &str) -> Result<Vec<User>> {
        let gateway = Arc::clone(&self.gateway);
        let user_id_owned = user_id.to_string();
        let value = self
            .cache
            .read_through(
                &CacheKey::following_list(user_id),
                self.fresh(),
                move || async move {
                    let page = gateway.fetch_following(&user_id_owned, None).await?;
                    Ok(CacheValue::UserFeed(PaginatedCollection::from_page(page)))
                },
            )
            .await?;
        Ok(value
            .as_user_feed()
            .map(|feed| feed.flatten())
            .unwrap_or_default())
    }

    pub async fn fetch_next_following(&self, user_id: &str) -> Result<bool> {
        let gateway = Arc::clone(&self.gateway);
        let user_id_owned = user_id.to_string();
        fetch_next_page(
            &self.cache,
            &CacheKey::following_list(user_id),
            move |cursor| async move {
                gateway
                    .fetch_following(&user_id_owned, cursor.as_deref())
                    .await
            },
        )
        .await
    }

    fn map_reply(reply: MutationReply) -> Result<FollowStatus> {
        match reply {
            MutationReply::Followed(status) => Ok(status),
            reply => Err(AppError::Internal(format!(
                "Unexpected reply for follow mutation: {reply:?}"
            ))),
        }
    }

    /// 楽観的フォロー。両者のカウント・isFollowing・おすすめ一覧を
    /// 先行更新し、失敗時はスナップショットへ戻す。
    pub async fn follow(&self, target_user_id: &str) -> Result<FollowStatus> {
        let reply = self
            .engine
            .execute(Mutation::FollowUser {
                target_user_id: target_user_id.to_string(),
            })
            .await?;
        Self::map_reply(reply)
    }

    pub async fn unfollow(&self, target_user_id: &str) -> Result<FollowStatus> {
        let reply = self
            .engine
            .execute(Mutation::UnfollowUser {
                target_user_id: target_user_id.to_string(),
            })
            .await?;
        Self::map_reply(reply)
    }
}
