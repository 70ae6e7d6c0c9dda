use crate::application::services::mutations::{Mutation, MutationEngine, MutationReply};
use crate::application::shared::feed::fetch_next_page;
use crate::application::ports::FeedGateway;
use crate::domain::entities::{PaginatedCollection, Post, PostDraft};
use crate::domain::value_objects::{is_temp_id, CacheKey};
use crate::infrastructure::cache::{CacheValue, EntityCache};
use crate::shared::config::CacheConfig;
use crate::shared::error::{AppError, Result};
use std::sync::Arc;
use std::time::Duration;

/// 投稿フィード（メイン / フォロー中 / ユーザー別）と投稿単体の
/// 読み書きを担うサービス
pub struct TimelineService {
    cache: Arc<EntityCache>,
    gateway: Arc<dyn FeedGateway>,
    engine: Arc<MutationEngine>,
    config: CacheConfig,
}

impl TimelineService {
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

    async fn read_post_feed<F, Fut>(&self, key: &CacheKey, fetch_first: F) -> Result<Vec<Post>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<crate::domain::entities::Page<Post>>>,
    {
        let value = self
            .cache
            .read_through(key, self.fresh(), || async move {
                let page = fetch_first().await?;
                Ok(CacheValue::PostFeed(PaginatedCollection::from_page(page)))
            })
            .await?;
        Ok(value
            .as_post_feed()
            .map(|feed| feed.flatten())
            .unwrap_or_default())
    }

    /// メインフィード（重複排除済みの平坦な投稿列）
    pub async fn feed(&self) -> Result<Vec<Post>> {
        let gateway = Arc::clone(&self.gateway);
        self.read_post_feed(&CacheKey::post_list(), move || async move {
            gateway.fetch_posts(None).await
        })
        .await
    }

    pub async fn fetch_next_feed(&self) -> Result<bool> {
        let gateway = Arc::clone(&self.gateway);
        fetch_next_page(&self.cache, &CacheKey::post_list(), move |cursor| {
            async move { gateway.fetch_posts(cursor.as_deref()).await }
        })
        .await
    }

    /// フォロー中ユーザーのフィード
    pub async fn following_feed(&self) -> Result<Vec<Post>> {
        let gateway = Arc::clone(&self.gateway);
        self.read_post_feed(&CacheKey::post_following(), move || async move {
            gateway.fetch_following_posts(None).await
        })
        .await
    }

    pub async fn fetch_next_following_feed(&self) -> Result<bool> {
        let gateway = Arc::clone(&self.gateway);
        fetch_next_page(&self.cache, &CacheKey::post_following(), move |cursor| {
            async move { gateway.fetch_following_posts(cursor.as_deref()).await }
        })
        .await
    }

    /// 特定ユーザーの投稿フィード
    pub async fn user_feed(&self, user_id: &str) -> Result<Vec<Post>> {
        let gateway = Arc::clone(&self.gateway);
        let user_id_owned = user_id.to_string();
        self.read_post_feed(&CacheKey::user_posts(user_id), move || async move {
            gateway.fetch_user_posts(&user_id_owned, None).await
        })
        .await
    }

    pub async fn fetch_next_user_feed(&self, user_id: &str) -> Result<bool> {
        let gateway = Arc::clone(&self.gateway);
        let user_id_owned = user_id.to_string();
        fetch_next_page(&self.cache, &CacheKey::user_posts(user_id), move |cursor| {
            async move {
                gateway
                    .fetch_user_posts(&user_id_owned, cursor.as_deref())
                    .await
            }
        })
        .await
    }

    /// 投稿単体の取得。一時 ID はネットワークに出さず、
    /// キャッシュ上の値だけを返す。
    pub async fn post(&self, post_id: &str) -> Result<Option<Post>> {
        let key = CacheKey::post_detail(post_id);
        if is_temp_id(post_id) {
            return Ok(self
                .cache
                .peek(&key)
                .as_ref()
                .and_then(CacheValue::as_post)
                .cloned());
        }

        let gateway = Arc::clone(&self.gateway);
        let post_id_owned = post_id.to_string();
        match self
            .cache
            .read_through(&key, self.fresh(), move || async move {
                let post = gateway.fetch_post(&post_id_owned).await?;
                Ok(CacheValue::Post(Box::new(post)))
            })
            .await
        {
            Ok(value) => Ok(value.as_post().cloned()),
            Err(AppError::Api { status: 404, .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// ユーザーの投稿数
    pub async fn post_count(&self, user_id: &str) -> Result<u64> {
        let gateway = Arc::clone(&self.gateway);
        let user_id_owned = user_id.to_string();
        let value = self
            .cache
            .read_through(
                &CacheKey::post_count(user_id),
                self.fresh(),
                move || async move {
                    Ok(CacheValue::Count(
                        gateway.fetch_post_count(&user_id_owned).await?,
                    ))
                },
            )
            .await?;
        Ok(value.as_count().unwrap_or_default())
    }

    /// 楽観的な投稿作成。戻り値はサーバー確定済みの投稿。
    pub async fn create_post(&self, draft: PostDraft) -> Result<Post> {
        match self.engine.execute(Mutation::CreatePost { draft }).await? {
            MutationReply::CreatedPost(post) => Ok(post),
            reply => Err(AppError::Internal(format!(
                "Unexpected reply for create_post: {reply:?}"
            ))),
        }
    }

    /// 楽観的な投稿削除
    pub async fn delete_post(&self, post_id: &str) -> Result<()> {
        self.engine
            .execute(Mutation::DeletePost {
                post_id: post_id.to_string(),
            })
            .await?;
        Ok(())
    }
}
