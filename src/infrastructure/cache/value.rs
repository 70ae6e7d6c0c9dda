use crate::domain::entities::{Comment, Notification, PaginatedCollection, Post, User};

/// キャッシュに載る値のタグ付きユニオン。キーの種別ごとに対応する
/// バリアントを使う（件数・フラグは親エンティティとは独立に保持する）。
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Post(Box<Post>),
    Comment(Box<Comment>),
    User(Box<User>),
    PostFeed(PaginatedCollection<Post>),
    CommentFeed(PaginatedCollection<Comment>),
    UserFeed(PaginatedCollection<User>),
    NotificationFeed(PaginatedCollection<Notification>),
    Users(Vec<User>),
    Count(u64),
    Flag(bool),
}

impl CacheValue {
    pub fn as_count(&self) -> Option<u64> {
        match self {
            CacheValue::Count(count) => Some(*count),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            CacheValue::Flag(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_post(&self) -> Option<&Post> {
        match self {
            CacheValue::Post(post) => Some(post),
            _ => None,
        }
    }

    pub fn as_comment(&self) -> Option<&Comment> {
        match self {
            CacheValue::Comment(comment) => Some(comment),
            _ => None,
        }
    }

    pub fn as_user(&self) -> Option<&User> {
        match self {
            CacheValue::User(user) => Some(user),
            _ => None,
        }
    }

    pub fn as_post_feed(&self) -> Option<&PaginatedCollection<Post>> {
        match self {
            CacheValue::PostFeed(feed) => Some(feed),
            _ => None,
        }
    }

    pub fn as_comment_feed(&self) -> Option<&PaginatedCollection<Comment>> {
        match self {
            CacheValue::CommentFeed(feed) => Some(feed),
            _ => None,
        }
    }

    pub fn as_user_feed(&self) -> Option<&PaginatedCollection<User>> {
        match self {
            CacheValue::UserFeed(feed) => Some(feed),
            _ => None,
        }
    }

    pub fn as_notification_feed(&self) -> Option<&PaginatedCollection<Notification>> {
        match self {
            CacheValue::NotificationFeed(feed) => Some(feed),
            _ => None,
        }
    }

    pub fn as_users(&self) -> Option<&[User]> {
        match self {
            CacheValue::Users(users) => Some(users),
            _ => None,
        }
    }
}
