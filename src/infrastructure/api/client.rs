use super::models::{
    CountResponse, FollowStatusResponse, HasLikedResponse, IsFollowedResponse, LikeStatusResponse,
    LoginResponse, PaginatedResponse,
};
use super::transport::{ApiRequest, ApiResponse, ApiTransport, HttpExecute, HttpMethod};
use crate::application::ports::{
    AuthSession, FeedGateway, FollowStatus, LikeStatus, SignupPayload,
};
use crate::domain::entities::{
    Comment, CommentDraft, Notification, Page, Post, PostDraft, ProfilePatch, User,
};
use crate::domain::value_objects::AuthTokens;
use crate::shared::config::ApiConfig;
use crate::shared::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// reqwest による HttpExecute 実装
pub struct ReqwestExecutor {
    client: Client,
    base_url: String,
}

impl ReqwestExecutor {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(Duration::from_secs(config.request_timeout))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("saezuri/", env!("CARGO_PKG_VERSION"))
    }

    /// 相対パスはベース URL に連結し、カーソル（完全 URL）はそのまま使う
    fn resolve_url(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path).map_err(AppError::from);
        }
        Url::parse(&format!("{}{}", self.base_url, path)).map_err(AppError::from)
    }
}

#[async_trait]
impl HttpExecute for ReqwestExecutor {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut url = self.resolve_url(&request.path)?;
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }

        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        };

        let mut builder = self.client.request(method, url);
        if let Some(bearer) = &request.bearer {
            builder = builder.bearer_auth(bearer);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        Ok(ApiResponse { status, body })
    }
}

/// FeedGateway の REST 実装。エンドポイントの形は黒箱サーバーの
/// 公開仕様に従う。一時 ID はここまで到達しない想定だが、ドラフトの
/// シリアライズにも含めない。
pub struct ApiClient {
    transport: Arc<ApiTransport>,
}

impl ApiClient {
    pub fn new(transport: Arc<ApiTransport>) -> Self {
        Self { transport }
    }

    async fn request_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let response = self.transport.send(request).await?;
        Self::handle(response)
    }

    async fn request_unit(&self, request: ApiRequest) -> Result<()> {
        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(AppError::Api {
                status: response.status,
                message: response.body_text(),
            });
        }
        Ok(())
    }

    fn handle<T: DeserializeOwned>(response: ApiResponse) -> Result<T> {
        if !response.is_success() {
            return Err(AppError::Api {
                status: response.status,
                message: response.body_text(),
            });
        }
        response.json()
    }

    /// カーソルがあればそれを、無ければ先頭ページのパスを使う
    fn page_request(cursor: Option<&str>, first_page_path: &str) -> ApiRequest {
        match cursor {
            Some(cursor) => ApiRequest::get(cursor),
            None => ApiRequest::get(first_page_path),
        }
    }
}

#[async_trait]
impl FeedGateway for ApiClient {
    async fn fetch_posts(&self, cursor: Option<&str>) -> Result<Page<Post>> {
        let request = Self::page_request(cursor, "/posts/");
        let response: PaginatedResponse<Post> = self.request_json(request).await?;
        Ok(response.into_page())
    }

    async fn fetch_user_posts(&self, user_id: &str, cursor: Option<&str>) -> Result<Page<Post>> {
        let request = match cursor {
            Some(cursor) => ApiRequest::get(cursor),
            None => ApiRequest::get("/posts/").with_query("user_id", user_id),
        };
        let response: PaginatedResponse<Post> = self.request_json(request).await?;
        Ok(response.into_page())
    }

    async fn fetch_following_posts(&self, cursor: Option<&str>) -> Result<Page<Post>> {
        let request = Self::page_request(cursor, "/posts/following/");
        let response: PaginatedResponse<Post> = self.request_json(request).await?;
        Ok(response.into_page())
    }

    async fn fetch_post(&self, post_id: &str) -> Result<Post> {
        self.request_json(ApiRequest::get(format!("/posts/{post_id}/")))
            .await
    }

    async fn fetch_post_count(&self, user_id: &str) -> Result<u64> {
        let response: CountResponse = self
            .request_json(ApiRequest::get("/posts/count/").with_query("user_id", user_id))
            .await?;
        Ok(response.count)
    }

    async fn create_post(&self, draft: &PostDraft) -> Result<Post> {
        let body = json!({
            "content": draft.content,
            "image": draft.image,
            "video": draft.video,
            "retweet_id": draft.retweet.as_ref().map(|post| post.id.clone()),
        });
        self.request_json(ApiRequest::post("/posts/", body)).await
    }

    async fn delete_post(&self, post_id: &str) -> Result<()> {
        self.request_unit(ApiRequest::delete(format!("/posts/{post_id}/")))
            .await
    }

    async fn fetch_root_comments(
        &self,
        post_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<Comment>> {
        let request = Self::page_request(cursor, &format!("/posts/{post_id}/comments/"));
        let response: PaginatedResponse<Comment> = self.request_json(request).await?;
        Ok(response.into_page())
    }

    async fn fetch_replies(
        &self,
        parent_comment_id: &str,
        cursor: Option<&str>,
    ) -> Result<Page<Comment>> {
        let request = match cursor {
            Some(cursor) => ApiRequest::get(cursor),
            None => {
                ApiRequest::get("/comments/").with_query("parent_comment_id", parent_comment_id)
            }
        };
        let response: PaginatedResponse<Comment> = self.request_json(request).await?;
        Ok(response.into_page())
    }

    async fn fetch_comment(&self, comment_id: &str) -> Result<Comment> {
        self.request_json(ApiRequest::get(format!("/comments/{comment_id}/")))
            .await
    }

    async fn create_comment(&self, draft: &CommentDraft) -> Result<Comment> {
        let body = json!({
            "post_id": draft.post_id,
            "parent_comment": draft.parent_comment_id,
            "content": draft.content,
            "image": draft.image,
            "video": draft.video,
        });
        self.request_json(ApiRequest::post("/comments/", body))
            .await
    }

    async fn delete_comment(&self, comment_id: &str) -> Result<()> {
        self.request_unit(ApiRequest::delete(format!("/comments/{comment_id}/")))
            .await
    }

    async fn like_post(&self, post_id: &str) -> Result<LikeStatus> {
        let response: LikeStatusResponse = self
            .request_json(ApiRequest::post(
                "/likes/posts/",
                json!({ "postId": post_id }),
            ))
            .await?;
        Ok(LikeStatus {
            liked: response.liked.unwrap_or(true),
            message: response.message,
        })
    }

    async fn unlike_post(&self, post_id: &str) -> Result<LikeStatus> {
        let response: LikeStatusResponse = self
            .request_json(
                ApiRequest::delete("/likes/posts/unlike/").with_body(json!({ "postId": post_id })),
            )
            .await?;
        Ok(LikeStatus {
            liked: response.liked.unwrap_or(false),
            message: response.message,
        })
    }

    async fn like_comment(&self, comment_id: &str) -> Result<LikeStatus> {
        let response: LikeStatusResponse = self
            .request_json(ApiRequest::post(
                "/likes/comments/",
                json!({ "commentId": comment_id }),
            ))
            .await?;
        Ok(LikeStatus {
            liked: response.liked.unwrap_or(true),
            message: response.message,
        })
    }

    async fn unlike_comment(&self, comment_id: &str) -> Result<LikeStatus> {
        let response: LikeStatusResponse = self
            .request_json(
                ApiRequest::delete("/likes/comments/unlike/")
                    .with_body(json!({ "commentId": comment_id })),
            )
            .await?;
        Ok(LikeStatus {
            liked: response.liked.unwrap_or(false),
            message: response.message,
        })
    }

    async fn fetch_post_likes_count(&self, post_id: &str) -> Result<u64> {
        let response: CountResponse = self
            .request_json(ApiRequest::get(format!("/likes/posts/{post_id}/count/")))
            .await?;
        Ok(response.count)
    }

    async fn fetch_comment_likes_count(&self, comment_id: &str) -> Result<u64> {
        let response: CountResponse = self
            .request_json(ApiRequest::get(format!(
                "/likes/comments/{comment_id}/count/"
            )))
            .await?;
        Ok(response.count)
    }

    async fn fetch_has_liked_post(&self, post_id: &str) -> Result<bool> {
        let response: HasLikedResponse = self
            .request_json(ApiRequest::get(format!("/likes/posts/{post_id}/has_liked/")))
            .await?;
        Ok(response.has_liked)
    }

    async fn fetch_has_liked_comment(&self, comment_id: &str) -> Result<bool> {
        let response: HasLikedResponse = self
            .request_json(ApiRequest::get(format!(
                "/likes/comments/{comment_id}/has_liked/"
            )))
            .await?;
        Ok(response.has_liked)
    }

    async fn follow_user(&self, target_user_id: &str) -> Result<FollowStatus> {
        let response: FollowStatusResponse = self
            .request_json(ApiRequest::post(
                "/follows/follow/",
                json!({ "targetUserId": target_user_id }),
            ))
            .await?;
        Ok(FollowStatus {
            followed: response.followed.unwrap_or(true),
            message: response.message,
        })
    }

    async fn unfollow_user(&self, target_user_id: &str) -> Result<FollowStatus> {
        let response: FollowStatusResponse = self
            .request_json(
                ApiRequest::delete("/follows/unfollow/")
                    .with_body(json!({ "targetUserId": target_user_id })),
            )
            .await?;
        Ok(FollowStatus {
            followed: response.followed.unwrap_or(false),
            message: response.message,
        })
    }

    async fn fetch_followers_count(&self, user_id: &str) -> Result<u64> {
        let response: CountResponse = self
            .request_json(ApiRequest::get(format!(
                "/follows/users/{user_id}/followers/count/"
            )))
            .await?;
        Ok(response.count)
    }

    async fn fetch_following_count(&self, user_id: &str) -> Result<u64> {
        let response: CountResponse = self
            .request_json(ApiRequest::get(format!(
                "/follows/users/{user_id}/following/count/"
            )))
            .await?;
        Ok(response.count)
    }

    async fn fetch_is_followed_by_me(&self, target_user_id: &str) -> Result<bool> {
        let response: IsFollowedResponse = self
            .request_json(ApiRequest::get(format!(
                "/follows/users/{target_user_id}/is_followed_by_me/"
            )))
            .await?;
        Ok(response.is_followed_by_me)
    }

    async fn fetch_followers(&self, user_id: &str, cursor: Option<&str>) -> Result<Page<User>> {
        let request = Self::page_request(cursor, &format!("/follows/users/{user_id}/followers/"));
        let response: PaginatedResponse<User> = self.request_json(request).await?;
        Ok(response.into_page())
    }

    async fn fetch_following(&self, user_id: &str, cursor: Option<&str>) -> Result<Page<User>> {
        let request = Self::page_request(cursor, &format!("/follows/users/{user_id}/following/"));
        let response: PaginatedResponse<User> = self.request_json(request).await?;
        Ok(response.into_page())
    }

    async fn fetch_current_user(&self) -> Result<User> {
        self.request_json(ApiRequest::get("/users/me/")).await
    }

    async fn fetch_user_by_username(&self, username: &str) -> Result<User> {
        self.request_json(ApiRequest::get(format!("/users/{username}/")))
            .await
    }

    async fn fetch_suggested_users(&self) -> Result<Vec<User>> {
        let response: PaginatedResponse<User> = self
            .request_json(ApiRequest::get("/users/suggested/"))
            .await?;
        Ok(response.results)
    }

    async fn search_users(&self, query: &str) -> Result<Vec<User>> {
        self.request_json(ApiRequest::get("/users/search/").with_query("q", query))
            .await
    }

    async fn update_profile(&self, patch: &ProfilePatch) -> Result<User> {
        let body = serde_json::to_value(patch)?;
        self.request_json(ApiRequest::patch("/users/me/", body))
            .await
    }

    async fn fetch_notifications(&self, cursor: Option<&str>) -> Result<Page<Notification>> {
        let request = Self::page_request(cursor, "/notifications/");
        let response: PaginatedResponse<Notification> = self.request_json(request).await?;
        Ok(response.into_page())
    }

    async fn mark_notification_read(&self, notification_id: &str) -> Result<()> {
        self.request_unit(ApiRequest::patch(
            format!("/notifications/{notification_id}/"),
            json!({ "is_read": true }),
        ))
        .await
    }

    async fn mark_all_notifications_read(&self) -> Result<()> {
        self.request_unit(ApiRequest::patch(
            "/mark_all_as_read/",
            json!({}),
        ))
        .await
    }

    async fn login(&self, identifier: &str, password: &str) -> Result<AuthSession> {
        let response: LoginResponse = self
            .request_json(ApiRequest::post(
                "/login/",
                json!({ "identifier": identifier, "password": password }),
            ))
            .await?;
        Ok(AuthSession {
            user: response.user,
            tokens: AuthTokens::new(response.access, response.refresh),
        })
    }

    async fn signup(&self, payload: &SignupPayload) -> Result<User> {
        let body = json!({
            "username": payload.username,
            "email": payload.email,
            "password": payload.password,
            "firstName": payload.first_name,
            "lastName": payload.last_name,
        });
        self.request_json(ApiRequest::post("/signup/", body)).await
    }
}
