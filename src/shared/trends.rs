use crate::domain::entities::{Post, User};
use std::collections::HashSet;

/// 投稿本文からハッシュタグを抽出する（`#` を除いた重複なしの一覧）
pub fn extract_trends_from_posts(posts: &[Post]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut trends = Vec::new();

    for post in posts {
        let mut chars = post.content.char_indices().peekable();
        while let Some((idx, ch)) = chars.next() {
            if ch != '#' {
                continue;
            }
            let rest = &post.content[idx + ch.len_utf8()..];
            let tag: String = rest
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            if !tag.is_empty() && seen.insert(tag.clone()) {
                trends.push(tag);
            }
        }
    }

    trends
}

/// ユーザー一覧をクエリ文字列で絞り込む（username / 氏名の部分一致）
pub fn filter_users(users: &[User], query: &str) -> Vec<User> {
    let lower = query.to_lowercase();
    users
        .iter()
        .filter(|user| {
            user.username.to_lowercase().contains(&lower)
                || user.first_name.to_lowercase().contains(&lower)
                || user.last_name.to_lowercase().contains(&lower)
        })
        .cloned()
        .collect()
}
