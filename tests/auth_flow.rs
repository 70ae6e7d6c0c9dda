mod common;

use common::fixtures;
use common::mocks::{MockFeedGateway, MockTokenRefresher};
use saezuri::application::ports::CredentialStore;
use saezuri::domain::value_objects::{AuthTokens, CacheKey};
use saezuri::infrastructure::cache::CacheValue;
use saezuri::infrastructure::storage::MemoryCredentialStore;
use saezuri::AppState;
use std::sync::Arc;

#[tokio::test]
async fn test_login_persists_tokens_and_caches_viewer() {
    let gateway = MockFeedGateway::new();
    let store = Arc::new(MemoryCredentialStore::new());
    let state = common::state_with_store(gateway.clone(), store.clone());

    gateway.set_login(fixtures::user("u1", "alice"), "access-1", "refresh-1");

    let user = state.auth.login("alice", "hunter2").await.unwrap();

    assert_eq!(user.id, "u1");
    assert_eq!(state.session.viewer_id().as_deref(), Some("u1"));
    assert!(state.session.is_checked());
    let persisted = store.load().unwrap().unwrap();
    assert_eq!(persisted.access, "access-1");
    assert_eq!(persisted.refresh, "refresh-1");
    let cached = state.cache.peek(&CacheKey::current_user()).unwrap();
    assert_eq!(cached.as_user().unwrap().username, "alice");
}

#[tokio::test]
async fn test_failed_login_still_marks_session_checked() {
    let gateway = MockFeedGateway::new();
    let state = common::state_with(gateway.clone());

    gateway.fail_next("login");
    let result = state.auth.login("alice", "wrong").await;

    assert!(result.is_err());
    assert!(state.session.is_checked());
    assert!(!state.session.is_authenticated());
}

#[tokio::test]
async fn test_bootstrap_without_credentials_starts_signed_out() {
    let gateway = MockFeedGateway::new();
    let state = common::state_with(gateway.clone());

    let user = state.auth.bootstrap().await.unwrap();

    assert!(user.is_none());
    assert!(state.session.is_checked());
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn test_bootstrap_with_persisted_credentials_restores_session() {
    let gateway = MockFeedGateway::new();
    let store = Arc::new(MemoryCredentialStore::new());
    store
        .save(&AuthTokens::new("old-access".to_string(), "refresh-1".to_string()))
        .unwrap();
    *gateway.current_user.lock().unwrap() = Some(fixtures::user("u1", "alice"));

    let refresher = Arc::new(MockTokenRefresher::succeeding("new-access"));
    let state = AppState::with_gateway(
        common::test_config(),
        store,
        gateway.clone(),
        refresher.clone(),
    )
    .unwrap();

    let user = state.auth.bootstrap().await.unwrap();

    assert_eq!(user.unwrap().id, "u1");
    assert!(state.session.is_checked());
    assert_eq!(
        refresher.calls.load(std::sync::atomic::Ordering::SeqCst),
        1
    );
    assert_eq!(state.session.viewer_id().as_deref(), Some("u1"));
}

#[tokio::test]
async fn test_bootstrap_with_rejected_refresh_stays_signed_out() {
    let gateway = MockFeedGateway::new();
    let store = Arc::new(MemoryCredentialStore::new());
    store
        .save(&AuthTokens::new("old-access".to_string(), "refresh-1".to_string()))
        .unwrap();

    let refresher = Arc::new(MockTokenRefresher::failing());
    let state =
        AppState::with_gateway(common::test_config(), store, gateway.clone(), refresher).unwrap();

    let user = state.auth.bootstrap().await.unwrap();

    assert!(user.is_none());
    assert!(state.session.is_checked());
    assert!(gateway.calls().is_empty());
}

#[tokio::test]
async fn test_logout_clears_session_and_entire_cache() {
    let gateway = MockFeedGateway::new();
    let store = Arc::new(MemoryCredentialStore::new());
    let state = common::state_with_store(gateway.clone(), store.clone());

    gateway.set_login(fixtures::user("u1", "alice"), "access-1", "refresh-1");
    state.auth.login("alice", "hunter2").await.unwrap();
    state
        .cache
        .set(&CacheKey::post_likes_count("p1"), CacheValue::Count(3));

    state.logout();

    assert!(!state.session.is_authenticated());
    assert!(state.session.viewer().is_none());
    assert!(state.cache.is_empty());
    assert!(store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_signup_does_not_create_a_session() {
    let gateway = MockFeedGateway::new();
    let state = common::state_with(gateway.clone());

    let user = state
        .auth
        .signup(saezuri::application::ports::SignupPayload {
            username: "carol".to_string(),
            email: "carol@example.com".to_string(),
            password: "hunter2".to_string(),
            first_name: "Carol".to_string(),
            last_name: "C".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(user.username, "carol");
    assert!(!state.session.is_authenticated());
    assert!(state.session.is_checked());
}
