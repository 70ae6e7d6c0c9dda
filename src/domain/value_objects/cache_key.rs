use serde::{Deserialize, Serialize};
use std::fmt;

/// 階層化されたキャッシュキー。セグメントの列で名前空間を構成し、
/// プレフィックス一致による一括無効化・一括キャンセルに使う。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(Vec<String>);

impl CacheKey {
    fn from_segments<const N: usize>(segments: [&str; N]) -> Self {
        Self(segments.iter().map(|s| s.to_string()).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// self が other のプレフィックス（または同一）かどうか
    pub fn is_prefix_of(&self, other: &CacheKey) -> bool {
        self.0.len() <= other.0.len()
            && self.0.iter().zip(other.0.iter()).all(|(a, b)| a == b)
    }

    // --- posts ---

    pub fn posts() -> Self {
        Self::from_segments(["posts"])
    }

    pub fn post_list() -> Self {
        Self::from_segments(["posts", "list"])
    }

    pub fn post_following() -> Self {
        Self::from_segments(["posts", "following"])
    }

    pub fn post_detail(post_id: &str) -> Self {
        Self::from_segments(["posts", "detail", post_id])
    }

    pub fn user_posts(user_id: &str) -> Self {
        Self::from_segments(["posts", "user", user_id])
    }

    pub fn post_count(user_id: &str) -> Self {
        Self::from_segments(["posts", "count", user_id])
    }

    // --- comments ---

    pub fn comment_root_list(post_id: &str) -> Self {
        Self::from_segments(["comments", "rootList", post_id])
    }

    pub fn comment_replies_list(parent_comment_id: &str) -> Self {
        Self::from_segments(["comments", "repliesList", parent_comment_id])
    }

    pub fn comment_detail(comment_id: &str) -> Self {
        Self::from_segments(["comments", "detail", comment_id])
    }

    // --- likes ---

    pub fn post_likes_count(post_id: &str) -> Self {
        Self::from_segments(["likes", "post", post_id, "count"])
    }

    pub fn post_has_liked(post_id: &str) -> Self {
        Self::from_segments(["likes", "post", post_id, "hasLiked"])
    }

    pub fn comment_likes_count(comment_id: &str) -> Self {
        Self::from_segments(["likes", "comment", comment_id, "count"])
    }

    pub fn comment_has_liked(comment_id: &str) -> Self {
        Self::from_segments(["likes", "comment", comment_id, "hasLiked"])
    }

    // --- follows ---

    pub fn followers_count(user_id: &str) -> Self {
        Self::from_segments(["follows", "followers", "count", user_id])
    }

    pub fn following_count(user_id: &str) -> Self {
        Self::from_segments(["follows", "following", "count", user_id])
    }

    pub fn followers_list(user_id: &str) -> Self {
        Self::from_segments(["follows", "followers", "list", user_id])
    }

    pub fn following_list(user_id: &str) -> Self {
        Self::from_segments(["follows", "following", "list", user_id])
    }

    pub fn is_following(viewer_id: &str, target_id: &str) -> Self {
        Self::from_segments(["follows", "isFollowing", viewer_id, target_id])
    }

    // --- users ---

    pub fn current_user() -> Self {
        Self::from_segments(["users", "me"])
    }

    pub fn suggested_users() -> Self {
        Self::from_segments(["users", "suggested"])
    }

    pub fn user_profile(username: &str) -> Self {
        Self::from_segments(["users", "profile", username])
    }

    // --- notifications ---

    pub fn notification_list() -> Self {
        Self::from_segments(["notifications", "list"])
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(":"))
    }
}
