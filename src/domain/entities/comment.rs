use super::user::User;
use crate::domain::value_objects::TempId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: String,
    pub user: User,
    pub post_id: String,
    /// 親コメント。ルートコメントでは None
    pub parent_comment: Option<Box<Comment>>,
    pub content: String,
    pub image: Option<String>,
    pub video: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub reply_count: u32,
}

impl Comment {
    pub fn new_with_id(
        id: String,
        user: User,
        post_id: String,
        content: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user,
            post_id,
            parent_comment: None,
            content,
            image: None,
            video: None,
            created_at,
            reply_count: 0,
        }
    }

    pub fn is_reply(&self) -> bool {
        self.parent_comment.is_some()
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_comment.as_deref().map(|parent| parent.id.as_str())
    }

    pub fn increment_reply_count(&mut self) {
        self.reply_count += 1;
    }

    pub fn decrement_reply_count(&mut self) {
        if self.reply_count > 0 {
            self.reply_count -= 1;
        }
    }
}

/// コメント作成のドラフト。temp_id は相関用（サーバーには送らない）
#[derive(Debug, Clone)]
pub struct CommentDraft {
    pub temp_id: TempId,
    pub post_id: String,
    pub parent_comment_id: Option<String>,
    pub content: String,
    pub image: Option<String>,
    pub video: Option<String>,
}

impl CommentDraft {
    pub fn new(post_id: String, content: String) -> Self {
        Self {
            temp_id: TempId::generate(),
            post_id,
            parent_comment_id: None,
            content,
            image: None,
            video: None,
        }
    }

    pub fn reply_to(mut self, parent_comment_id: String) -> Self {
        self.parent_comment_id = Some(parent_comment_id);
        self
    }

    /// キャッシュに先行投入するプレースホルダーコメントを組み立てる。
    /// 親コメントはキャッシュ上の実体が分かればそれを、無ければ ID だけの
    /// 骨格を埋める。
    pub fn to_placeholder(&self, author: User, parent: Option<Comment>) -> Comment {
        let parent_comment = match (&self.parent_comment_id, parent) {
            (Some(_), Some(parent)) => Some(Box::new(parent)),
            (Some(parent_id), None) => Some(Box::new(Comment::new_with_id(
                parent_id.clone(),
                author.clone(),
                self.post_id.clone(),
                String::new(),
                Utc::now(),
            ))),
            (None, _) => None,
        };

        Comment {
            id: self.temp_id.to_string(),
            user: author,
            post_id: self.post_id.clone(),
            parent_comment,
            content: self.content.clone(),
            image: self.image.clone(),
            video: self.video.clone(),
            created_at: Utc::now(),
            reply_count: 0,
        }
    }
}
