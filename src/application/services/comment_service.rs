use crate::application::ports::FeedGateway;
use crate::application::services::mutations::{Mutation, MutationEngine, MutationReply};
use crate::application::shared::feed::fetch_next_page;
use crate::domain::entities::{Comment, CommentDraft, PaginatedCollection};
use crate::domain::value_objects::{is_temp_id, CacheKey};
use crate::infrastructure::cache::{CacheValue, EntityCache};
use crate::shared::config::CacheConfig;
use crate::shared::error::{AppError, Result};
use std::sync::Arc;
use std::time::Duration;

/// コメントツリー（ルートコメントとリプライ）の読み書きを担うサービス
pub struct CommentService {
    cache: Arc<EntityCache>,
    gateway: Arc<dyn FeedGateway>,
    engine: Arc<MutationEngine>,
    config: CacheConfig,
}

impl CommentService {
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

    /// 投稿直下のルートコメント一覧
    pub async fn root_comments(&self, post_id: &str) -> Result<Vec<Comment>> {
        let key = CacheKey::comment_root_list(post_id);
        if is_temp_id(post_id) {
            // 未確定の投稿にはまだサーバー側コメントが存在しない
            return Ok(self.cached_feed(&key));
        }

        let gateway = Arc::clone(&self.gateway);
        let post_id_owned = post_id.to_string();
        let value = self
            .cache
            .read_through(&key, self.fresh(), move || async move {
                let page = gateway.fetch_root_comments(&post_id_owned, None).await?;
                Ok(CacheValue::CommentFeed(PaginatedCollection::from_page(
                    page,
                )))
            })
            .await?;
        Ok(value
            .as_comment_feed()
            .map(|feed| feed.flatten())
            .unwrap_or_default())
    }

    pub async fn fetch_next_root_comments(&self, post_id: &str) -> Result<bool> {
        if is_temp_id(post_id) {
            return Ok(false);
        }
        let gateway = Arc::clone(&self.gateway);
        let post_id_owned = post_id.to_string();
        fetch_next_page(
            &self.cache,
            &CacheKey::comment_root_list(post_id),
            move |cursor| async move {
                gateway
                    .fetch_root_comments(&post_id_owned, cursor.as_deref())
                    .await
            },
        )
        .await
    }

    /// 親コメントへのリプライ一覧
    pub async fn replies(&self, parent_comment_id: &str) -> Result<Vec<Comment>> {
        let key = CacheKey::comment_replies_list(parent_comment_id);
        if is_temp_id(parent_comment_id) {
            return Ok(self.cached_feed(&key));
        }

        let gateway = Arc::clone(&self.gateway);
        let parent_owned = parent_comment_id.to_string();
        let value = self
            .cache
            .read_through(&key, self.fresh(), move || async move {
                let page = gateway.fetch_replies(&parent_owned, None).await?;
                Ok(CacheValue::CommentFeed(PaginatedCollection::from_page(
                    page,
                )))
            })
            .await?;
        Ok(value
            .as_comment_feed()
            .map(|feed| feed.flatten())
            .unwrap_or_default())
    }

    pub async fn fetch_next_replies(&self, parent_comment_id: &str) -> Result<bool> {
        if is_temp_id(parent_comment_id) {
            return Ok(false);
        }
        let gateway = Arc::clone(&self.gateway);
        let parent_owned = parent_comment_id.to_string();
        fetch_next_page(
            &self.cache,
            &CacheKey::comment_replies_list(parent_comment_id),
            move |cursor| async move {
                gateway.fetch_replies(&parent_owned, cursor.as_deref()).await
            },
        )
        .await
    }

    /// コメント単体。一時 ID はキャッシュ上の値のみ。
    pub async fn comment(&self, comment_id: &str) -> Result<Option<Comment>> {
        let key = CacheKey::comment_detail(comment_id);
        if is_temp_id(comment_id) {
            return Ok(self
                .cache
                .peek(&key)
                .as_ref()
                .and_then(CacheValue::as_comment)
                .cloned());
        }

        let gateway = Arc::clone(&self.gateway);
        let comment_id_owned = comment_id.to_string();
        match self
            .cache
            .read_through(&key, self.fresh(), move || async move {
                let comment = gateway.fetch_comment(&comment_id_owned).await?;
                Ok(CacheValue::Comment(Box::new(comment)))
            })
            .await
        {
            Ok(value) => Ok(value.as_comment().cloned()),
            Err(AppError::Api { status: 404, .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// 楽観的なコメント作成。戻り値はサーバー確定済みのコメント。
    pub async fn create_comment(&self, draft: CommentDraft) -> Result<Comment> {
        match self.engine.execute(Mutation::CreateComment { draft }).await? {
            MutationReply::CreatedComment(comment) => Ok(comment),
            reply => Err(AppError::Internal(format!(
                "Unexpected reply for create_comment: {reply:?}"
            ))),
        }
    }

    /// 楽観的なコメント削除
    pub async fn delete_comment(&self, comment_id: &str) -> Result<()> {
        self.engine
            .execute(Mutation::DeleteComment {
                comment_id: comment_id.to_string(),
            })
            .await?;
        Ok(())
    }

    fn cached_feed(&self, key: &CacheKey) -> Vec<Comment> {
        self.cache
            .peek(key)
            .as_ref()
            .and_then(CacheValue::as_comment_feed)
            .map(|feed| feed.flatten())
            .unwrap_or_default()
    }
}
