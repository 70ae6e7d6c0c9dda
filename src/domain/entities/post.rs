use super::user::User;
use crate::domain::value_objects::TempId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: String,
    pub user: User,
    pub content: String,
    pub image: Option<String>,
    pub video: Option<String>,
    pub created_at: DateTime<Utc>,
    /// リツイート元の投稿。ネストは 1 段まで（リツイートのリツイートは展開しない）
    pub retweet: Option<Box<Post>>,
    #[serde(default)]
    pub total_comments_count: u32,
}

impl Post {
    pub fn new_with_id(
        id: String,
        user: User,
        content: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user,
            content,
            image: None,
            video: None,
            created_at,
            retweet: None,
            total_comments_count: 0,
        }
    }

    pub fn is_retweet(&self) -> bool {
        self.retweet.is_some()
    }
}

/// 投稿作成のドラフト。temp_id は作成ミューテーション開始時に採番され、
/// サーバー確定レスポンスとの突き合わせ（相関）にのみ使う。
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub temp_id: TempId,
    pub content: String,
    pub image: Option<String>,
    pub video: Option<String>,
    pub retweet: Option<Post>,
}

impl PostDraft {
    pub fn new(content: String) -> Self {
        Self {
            temp_id: TempId::generate(),
            content,
            image: None,
            video: None,
            retweet: None,
        }
    }

    pub fn with_retweet(mut self, retweet: Post) -> Self {
        self.retweet = Some(retweet);
        self
    }

    /// キャッシュに先行投入するプレースホルダー投稿を組み立てる
    pub fn to_placeholder(&self, author: User) -> Post {
        Post {
            id: self.temp_id.to_string(),
            user: author,
            content: self.content.clone(),
            image: self.image.clone(),
            video: self.video.clone(),
            created_at: Utc::now(),
            retweet: self.retweet.clone().map(Box::new),
            total_comments_count: 0,
        }
    }
}
