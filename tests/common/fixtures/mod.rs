use chrono::Utc;
use saezuri::domain::entities::{Comment, Notification, NotificationType, Page, Post, User};

pub fn user(id: &str, username: &str) -> User {
    User::new(id.to_string(), username.to_string())
}

pub fn post(id: &str, author: &User) -> Post {
    Post::new_with_id(
        id.to_string(),
        author.clone(),
        format!("content of {id}"),
        Utc::now(),
    )
}

pub fn comment(id: &str, post_id: &str, author: &User) -> Comment {
    Comment::new_with_id(
        id.to_string(),
        author.clone(),
        post_id.to_string(),
        format!("comment {id}"),
        Utc::now(),
    )
}

pub fn reply(id: &str, parent: &Comment, author: &User) -> Comment {
    let mut comment = comment(id, &parent.post_id, author);
    comment.parent_comment = Some(Box::new(parent.clone()));
    comment
}

#[allow(dead_code)]
pub fn notification(id: &str, from: &User) -> Notification {
    Notification {
        id: id.to_string(),
        kind: NotificationType::Like,
        from_user: from.clone(),
        target_post_id: None,
        timestamp: Utc::now(),
        is_read: false,
    }
}

pub fn page<T>(items: Vec<T>, next: Option<&str>) -> Page<T> {
    Page::new(items, next.map(str::to_string), None)
}
