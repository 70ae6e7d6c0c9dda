use crate::application::ports::FeedGateway;
use crate::application::services::mutations::{Mutation, MutationEngine};
use crate::application::shared::feed::fetch_next_page;
use crate::domain::entities::{Notification, PaginatedCollection};
use crate::domain::value_objects::CacheKey;
use crate::infrastructure::cache::{CacheValue, EntityCache};
use crate::shared::config::CacheConfig;
use crate::shared::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// 通知一覧と既読化を扱うサービス
pub struct NotificationService {
    cache: Arc<EntityCache>,
    gateway: Arc<dyn FeedGateway>,
    engine: Arc<MutationEngine>,
    config: CacheConfig,
}

impl NotificationService {
    pub fn new(
        cache: Arc<EntityCache>,
        gateway: Arc<dyn FeedGateway>,
        engine: Arc<MutationEngine>,
        config: CacheConfig,
    ) -> Self {
        Self {
            cache,
            gateway,
            engine,
            config,
        }
    }

    fn fresh(&self) -> Duration {
        Duration::from_secs(self.config.fresh_secs)
    }

    pub async fn notifications(&self) -> Result<Vec<Notification>> {
        let gateway = Arc::clone(&self.gateway);
        let value = self
            .cache
            .read_through(
                &CacheKey::notification_list(),
                self.fresh(),
                move || async move {
                    let page = gateway.fetch_notifications(None).await?;
                    Ok(CacheValue::NotificationFeed(PaginatedCollection::from_page(
                        page,
                    )))
                },
            )
            .await?;
        Ok(value
            .as_notification_feed()
            .map(|feed| feed.flatten())
            .unwrap_or_default())
    }

    pub async fn fetch_next_notifications(&self) -> Result<bool> {
        let gateway = Arc::clone(&self.gateway);
        fetch_next_page(
            &self.cache,
            &CacheKey::notification_list(),
            move |cursor| async move { gateway.fetch_notifications(cursor.as_deref()).await },
        )
        .await
    }

    /// 既読フラグを先行して立て、失敗時は戻す
    pub async fn mark_read(&self, notification_id: &str) -> Result<()> {
        self.engine
            .execute(Mutation::MarkNotificationRead {
                notification_id: notification_id.to_string(),
            })
            .await?;
        Ok(())
    }

    pub async fn mark_all_read(&self) -> Result<()> {
        self.engine.execute(Mutation::MarkAllNotificationsRead).await?;
        Ok(())
    }
}
