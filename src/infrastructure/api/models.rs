use crate::domain::entities::{Page, User};
use serde::Deserialize;

/// ページネーション付きエンドポイントの共通レスポンス。
/// next / previous は完全な URL か null で、クライアントは
/// 不透明なカーソルとしてそのまま次回リクエストに使う。
#[derive(Debug, Clone, Deserialize)]
pub struct PaginatedResponse<T> {
    #[serde(default)]
    pub count: Option<u64>,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> PaginatedResponse<T> {
    pub fn into_page(self) -> Page<T> {
        Page::new(self.results, self.next, self.previous)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HasLikedResponse {
    pub has_liked: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IsFollowedResponse {
    pub is_followed_by_me: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LikeStatusResponse {
    #[serde(default)]
    pub liked: Option<bool>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FollowStatusResponse {
    #[serde(default)]
    pub followed: Option<bool>,
    #[serde(default)]
    pub message: String,
}

/// ログインレスポンス（access / refresh / user）
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub access: String,
    pub refresh: String,
}

/// リフレッシュは access のみ返す。refresh トークンは
/// クライアント側で既存のものを維持する。
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}
