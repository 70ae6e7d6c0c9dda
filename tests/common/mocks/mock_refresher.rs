use async_trait::async_trait;
use saezuri::application::ports::TokenRefresher;
use saezuri::shared::error::{AppError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// 設定した結果を返すだけのリフレッシャー
pub struct MockTokenRefresher {
    result: Mutex<Option<String>>,
    pub calls: AtomicUsize,
}

impl MockTokenRefresher {
    pub fn succeeding(access: &str) -> Self {
        Self {
            result: Mutex::new(Some(access.to_string())),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            result: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TokenRefresher for MockTokenRefresher {
    async fn refresh(&self) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.result.lock().unwrap().clone() {
            Some(access) => Ok(access),
            None => Err(AppError::Unauthorized("refresh rejected".to_string())),
        }
    }
}
