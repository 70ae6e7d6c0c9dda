use crate::domain::entities::{
    Comment, CommentDraft, Notification, Page, Post, PostDraft, ProfilePatch, User,
};
use crate::domain::value_objects::AuthTokens;
use crate::shared::error::Result;
use async_trait::async_trait;

/// like / unlike エンドポイントのステータス応答
#[derive(Debug, Clone)]
pub struct LikeStatus {
    pub liked: bool,
    pub message: String,
}

/// follow / unfollow エンドポイントのステータス応答
#[derive(Debug, Clone)]
pub struct FollowStatus {
    pub followed: bool,
    pub message: String,
}

/// ログイン成功時のペイロード
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: User,
    pub tokens: AuthTokens,
}

#[derive(Debug, Clone)]
pub struct SignupPayload {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

/// REST コラボレータへのポート。実装はカーソルを不透明トークンとして
/// 扱い、一時 ID をサーバーへ送らないこと。
#[async_trait]
pub trait FeedGateway: Send + Sync {
    // --- posts ---
    async fn fetch_posts(&self, cursor: Option<&str>) -> Result<Page<Post>>;
    async fn fetch_user_posts(&self, user_id: &str, cursor: Option<&str>) -> Result<Page<Post>>;
    async fn fetch_following_posts(&self, cursor: Option<&str>) -> Result<Page<Post>>;
    async fn fetch_post(&self, post_id: &str) -> Result<Post>;
    async fn fetch_post_count(&self, user_id: &str) -> Result<u64>;
    async fn create_post(&self, draft: &PostDraft) -> Result<Post>;
    async fn delete_post(&self, post_id: &str) -> Result<()>;

    // --- comments ---
    async fn fetch_root_comments(&self, post_id: &str, cursor: Option<&str>)
        -> Result<Page<Comment>>;
    async fn fetch_replies(
        &self,
        parent_comment_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<Comment>>;
    async fn fetch_comment(&self, comment_id: &str) -> Result<Comment>;
    async fn create_comment(&self, draft: &CommentDraft) -> Result<Comment>;
    async fn delete_comment(&self, comment_id: &str) -> Result<()>;

    // --- likes ---
    async fn like_post(&self, post_id: &str) -> Result<LikeStatus>;
    async fn unlike_post(&self, post_id: &str) -> Result<LikeStatus>;
    async fn like_comment(&self, comment_id: &str) -> Result<LikeStatus>;
    async fn unlike_comment(&self, comment_id: &str) -> Result<LikeStatus>;
    async fn fetch_post_likes_count(&self, post_id: &str) -> Result<u64>;
    async fn fetch_comment_likes_count(&self, comment_id: &str) -> Result<u64>;
    async fn fetch_has_liked_post(&self, post_id: &str) -> Result<bool>;
    async fn fetch_has_liked_comment(&self, comment_id: &str) -> Result<bool>;

    // --- follows ---
    async fn follow_user(&self, target_user_id: &str) -> Result<FollowStatus>;
    async fn unfollow_user(&self, target_user_id: &str) -> Result<FollowStatus>;
    async fn fetch_followers_count(&self, user_id: &str) -> Result<u64>;
    async fn fetch_following_count(&self, user_id: &str) -> Result<u64>;
    async fn fetch_is_followed_by_me(&self, target_user_id: &str) -> Result<bool>;
    async fn fetch_followers(&self, user_id: &str, cursor: Option<&str>) -> Result<Page<User>>;
    async fn fetch_following(&self, user_id: &str, cursor: Option<&str>) -> Result<Page<User>>;

    // --- users ---
    async fn fetch_current_user(&self) -> Result<User>;
    async fn fetch_user_by_username(&self, username: &str) -> Result<User>;
    async fn fetch_suggested_users(&self) -> Result<Vec<User>>;
    async fn search_users(&self, query: &str) -> Result<Vec<User>>;
    async fn update_profile(&self, patch: &ProfilePatch) -> Result<User>;

    // --- notifications ---
    async fn fetch_notifications(&self, cursor: Option<&str>) -> Result<Page<Notification>>;
    async fn mark_notification_read(&self, notification_id: &str) -> Result<()>;
    async fn mark_all_notifications_read(&self) -> Result<()>;

    // --- auth ---
    async fn login(&self, identifier: &str, password: &str) -> Result<AuthSession>;
    async fn signup(&self, payload: &SignupPayload) -> Result<User>;
}
