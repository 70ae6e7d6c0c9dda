#![allow(dead_code)]

pub mod fixtures;
pub mod mocks;

use mocks::{MockFeedGateway, MockTokenRefresher};
use saezuri::application::ports::TokenRefresher;
use saezuri::domain::entities::User;
use saezuri::infrastructure::storage::MemoryCredentialStore;
use saezuri::{AppConfig, AppState};
use std::sync::Arc;

pub fn test_config() -> AppConfig {
    AppConfig::default()
}

pub fn state_with(gateway: Arc<MockFeedGateway>) -> AppState {
    state_with_store(gateway, Arc::new(MemoryCredentialStore::new()))
}

pub fn state_with_store(
    gateway: Arc<MockFeedGateway>,
    store: Arc<MemoryCredentialStore>,
) -> AppState {
    let refresher: Arc<dyn TokenRefresher> = Arc::new(MockTokenRefresher::succeeding("access"));
    AppState::with_gateway(test_config(), store, gateway, refresher)
        .expect("failed to assemble test state")
}

/// viewer を設定したサインイン済み状態を作る
pub fn signed_in_state(gateway: Arc<MockFeedGateway>, viewer: &User) -> AppState {
    let state = state_with(gateway);
    state.session.set_viewer(Some(viewer.clone()));
    state
}
