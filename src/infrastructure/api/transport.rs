use super::models::RefreshResponse;
use crate::infrastructure::cache::EntityCache;
use crate::infrastructure::session::SessionHandle;
use crate::shared::error::{AppError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

/// トランスポート層へ渡すリクエスト。path には相対パスのほか、
/// サーバー発行のカーソル（完全な URL）をそのまま渡せる。
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: HttpMethod::Post,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
            bearer: None,
        }
    }

    pub fn patch(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: HttpMethod::Patch,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
            bearer: None,
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Delete,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    fn with_bearer(mut self, bearer: Option<String>) -> Self {
        self.bearer = bearer;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(AppError::from)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// 生の HTTP 実行ポート。reqwest 実装のほか、テストではモックを差す。
#[async_trait]
pub trait HttpExecute: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;
}

const REFRESH_PATH: &str = "/refresh/";

/// 全リクエストの通り道。Bearer 資格情報を付与し、401 への応答として
/// トークンリフレッシュを single-flight で直列化する。
///
/// リフレッシュ実行中に 401 を受けたリクエストはロック待ちでキューに
/// 並び、完了後に新しいトークンで一度だけ再試行される。リフレッシュ
/// 自体が失敗した場合、またはリフレッシュトークンが無い場合は、
/// セッションとキャッシュを丸ごと破棄して失敗を伝播する。
pub struct ApiTransport {
    executor: Arc<dyn HttpExecute>,
    session: Arc<SessionHandle>,
    cache: Arc<EntityCache>,
    refresh_lock: Mutex<()>,
}

impl ApiTransport {
    pub fn new(
        executor: Arc<dyn HttpExecute>,
        session: Arc<SessionHandle>,
        cache: Arc<EntityCache>,
    ) -> Self {
        Self {
            executor,
            session,
            cache,
            refresh_lock: Mutex::new(()),
        }
    }

    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let seen_version = self.session.token_version();
        let bearer = self.session.access_token();
        let response = self
            .executor
            .execute(request.clone().with_bearer(bearer))
            .await?;

        if !response.is_unauthorized() {
            return Ok(response);
        }

        // 401: リフレッシュ後に一度だけ再試行する
        let access = self.refresh_access_token(seen_version).await?;
        let retried = self
            .executor
            .execute(request.with_bearer(Some(access)))
            .await?;

        if retried.is_unauthorized() {
            // 再試行済みリクエストは再々試行しない
            return Err(AppError::Unauthorized(
                "Request still unauthorized after token refresh".to_string(),
            ));
        }
        Ok(retried)
    }

    /// アクセストークンを更新する。同時に複数の 401 が発生しても
    /// リフレッシュ呼び出しは常に 1 回に合流する。
    async fn refresh_access_token(&self, seen_version: u64) -> Result<String> {
        let _guard = self.refresh_lock.lock().await;

        // ロック待ちの間に別のリクエストが更新を終えていれば、その結果に乗る
        if self.session.token_version() != seen_version {
            if let Some(access) = self.session.access_token() {
                debug!("Coalesced onto a completed token refresh");
                return Ok(access);
            }
        }

        let Some(refresh) = self.session.refresh_token() else {
            self.terminate_session("no refresh token available");
            return Err(AppError::Unauthorized(
                "No refresh token available".to_string(),
            ));
        };

        let request = ApiRequest::post(REFRESH_PATH, json!({ "refresh": refresh }));
        match self.executor.execute(request).await {
            Ok(response) if response.is_success() => {
                let parsed: RefreshResponse = response.json()?;
                self.session.set_access_token(parsed.access.clone())?;
                debug!("Access token refreshed");
                Ok(parsed.access)
            }
            Ok(response) => {
                self.terminate_session("token refresh rejected");
                Err(AppError::Unauthorized(format!(
                    "Token refresh rejected (status {})",
                    response.status
                )))
            }
            Err(err) => {
                self.terminate_session("token refresh request failed");
                Err(err)
            }
        }
    }

    /// 回復不能な認証失敗。無効なセッションに紐づくデータを一切
    /// 残さないよう、資格情報とキャッシュの両方を破棄する。
    fn terminate_session(&self, reason: &str) {
        warn!("Terminating session: {reason}");
        self.session.clear();
        self.cache.clear();
    }
}

#[async_trait]
impl crate::application::ports::TokenRefresher for ApiTransport {
    async fn refresh(&self) -> Result<String> {
        let seen_version = self.session.token_version();
        self.refresh_access_token(seen_version).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::AuthTokens;
    use crate::infrastructure::storage::MemoryCredentialStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// 有効なトークン以外に 401 を返し、/refresh/ で新トークンを発行する
    struct FakeAuthServer {
        valid_token: std::sync::Mutex<String>,
        refresh_calls: AtomicUsize,
        refresh_delay: Duration,
        refresh_succeeds: bool,
    }

    impl FakeAuthServer {
        fn new(valid_token: &str) -> Self {
            Self {
                valid_token: std::sync::Mutex::new(valid_token.to_string()),
                refresh_calls: AtomicUsize::new(0),
                refresh_delay: Duration::from_millis(30),
                refresh_succeeds: true,
            }
        }

        fn failing_refresh(valid_token: &str) -> Self {
            Self {
                refresh_succeeds: false,
                ..Self::new(valid_token)
            }
        }
    }

    #[async_trait]
    impl HttpExecute for FakeAuthServer {
        async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
            if request.path == REFRESH_PATH {
                self.refresh_calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(self.refresh_delay).await;
                if !self.refresh_succeeds {
                    return Ok(ApiResponse {
                        status: 401,
                        body: b"{}".to_vec(),
                    });
                }
                let new_token = "refreshed-access".to_string();
                *self.valid_token.lock().unwrap() = new_token.clone();
                return Ok(ApiResponse {
                    status: 200,
                    body: serde_json::to_vec(&json!({ "access": new_token })).unwrap(),
                });
            }

            let valid = self.valid_token.lock().unwrap().clone();
            if request.bearer.as_deref() == Some(valid.as_str()) {
                Ok(ApiResponse {
                    status: 200,
                    body: b"{\"ok\":true}".to_vec(),
                })
            } else {
                Ok(ApiResponse {
                    status: 401,
                    body: b"{}".to_vec(),
                })
            }
        }
    }

    fn session_with(access: &str, refresh: &str) -> Arc<SessionHandle> {
        let session = SessionHandle::new(Arc::new(MemoryCredentialStore::new()));
        session
            .set_session(AuthTokens::new(access.to_string(), refresh.to_string()))
            .unwrap();
        Arc::new(session)
    }

    fn transport(
        executor: Arc<dyn HttpExecute>,
        session: Arc<SessionHandle>,
    ) -> (Arc<ApiTransport>, Arc<EntityCache>) {
        let cache = Arc::new(EntityCache::new(Duration::from_secs(600)));
        (
            Arc::new(ApiTransport::new(executor, session, cache.clone())),
            cache,
        )
    }

    #[tokio::test]
    async fn test_valid_token_passes_through() {
        let server = Arc::new(FakeAuthServer::new("good"));
        let session = session_with("good", "r1");
        let (transport, _) = transport(server.clone(), session);

        let response = transport.send(ApiRequest::get("/posts/")).await.unwrap();

        assert!(response.is_success());
        assert_eq!(server.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_token_refreshes_and_retries_once() {
        let server = Arc::new(FakeAuthServer::new("server-only"));
        let session = session_with("expired", "r1");
        let (transport, _) = transport(server.clone(), session.clone());

        let response = transport.send(ApiRequest::get("/posts/")).await.unwrap();

        assert!(response.is_success());
        assert_eq!(server.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.access_token().as_deref(), Some("refreshed-access"));
    }

    #[tokio::test]
    async fn test_concurrent_401s_share_a_single_refresh() {
        let server = Arc::new(FakeAuthServer::new("server-only"));
        let session = session_with("expired", "r1");
        let (transport, _) = transport(server.clone(), session);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let transport = transport.clone();
            handles.push(tokio::spawn(async move {
                transport.send(ApiRequest::get("/posts/")).await
            }));
        }

        for handle in handles {
            let response = handle.await.unwrap().unwrap();
            assert!(response.is_success());
        }
        assert_eq!(server.refresh_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_refresh_token_terminates_session() {
        let server = Arc::new(FakeAuthServer::new("server-only"));
        let session = Arc::new(SessionHandle::new(Arc::new(MemoryCredentialStore::new())));
        let (transport, cache) = transport(server.clone(), session.clone());
        cache.set(
            &crate::domain::value_objects::CacheKey::post_likes_count("p1"),
            crate::infrastructure::cache::CacheValue::Count(1),
        );

        let result = transport.send(ApiRequest::get("/posts/")).await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
        assert_eq!(server.refresh_calls.load(Ordering::SeqCst), 0);
        assert!(cache.is_empty());
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_session_and_cache() {
        let server = Arc::new(FakeAuthServer::failing_refresh("server-only"));
        let session = session_with("expired", "r1");
        let (transport, cache) = transport(server.clone(), session.clone());
        cache.set(
            &crate::domain::value_objects::CacheKey::post_likes_count("p1"),
            crate::infrastructure::cache::CacheValue::Count(1),
        );

        let result = transport.send(ApiRequest::get("/posts/")).await;

        assert!(matches!(result, Err(AppError::Unauthorized(_))));
        assert_eq!(server.refresh_calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_empty());
        assert!(!session.is_authenticated());
        assert!(session.is_checked());
    }
}
