use super::user::User;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Like,
    Comment,
    Follow,
    Retweet,
    Mention,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    #[serde(rename = "fromUser")]
    pub from_user: User,
    #[serde(rename = "targetPostId")]
    pub target_post_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "isRead")]
    pub is_read: bool,
}

impl Notification {
    pub fn mark_read(&mut self) {
        self.is_read = true;
    }
}
