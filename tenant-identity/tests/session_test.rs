mod common;

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use common::{harness, with_store, DEFAULT_URL};
use tenant_identity::models::auth::RefreshResponse;
use tenant_identity::models::SessionStatus;
use tenant_identity::services::SessionStorage;
use tenant_identity::storage::{KeyValueStore, MemoryStore, SESSION_KEY};
use tenant_identity::testing::{fixtures, http_error};

fn refreshed(access_token: &str) -> RefreshResponse {
    RefreshResponse {
        access_token: access_token.to_string(),
        refresh_token: Some("refresh-token-2".to_string()),
        expires_at: Utc::now() + ChronoDuration::minutes(30),
    }
}

#[tokio::test]
async fn test_init_without_stored_session_is_anonymous() {
    let h = harness();

    assert_eq!(h.identity.session.status(), SessionStatus::Unresolved);
    assert_eq!(h.identity.session.init().await, SessionStatus::Anonymous);
    assert!(h.identity.session.current().is_none());
}

#[tokio::test]
async fn test_session_survives_restart() {
    let store = Arc::new(MemoryStore::new());
    let first = with_store(DEFAULT_URL, store.clone());
    first.identity.session.set_session(fixtures::session());

    let second = with_store(DEFAULT_URL, store);
    assert_eq!(second.identity.session.init().await, SessionStatus::Authenticated);
    let session = second.identity.session.current().expect("restored");
    assert_eq!(session.user.id, "user_123");
    assert_eq!(second.api.calls("refresh"), 0);
}

#[tokio::test]
async fn test_init_refreshes_expired_session() {
    let store = Arc::new(MemoryStore::new());
    SessionStorage::new(store.clone()).write(&fixtures::expired_session());
    let h = with_store(DEFAULT_URL, store.clone());
    h.api.push_refresh(Ok(refreshed("access-token-2")));

    assert_eq!(h.identity.session.init().await, SessionStatus::Authenticated);
    assert_eq!(h.api.calls("refresh"), 1);
    assert_eq!(h.identity.session.access_token().as_deref(), Some("access-token-2"));

    let persisted = SessionStorage::new(store).read().expect("persisted");
    assert_eq!(persisted.tokens.access_token, "access-token-2");
    assert_eq!(persisted.tokens.refresh_token.as_deref(), Some("refresh-token-2"));
}

#[tokio::test]
async fn test_failed_refresh_clears_session_and_storage() {
    let store = Arc::new(MemoryStore::new());
    SessionStorage::new(store.clone()).write(&fixtures::expired_session());
    let h = with_store(DEFAULT_URL, store.clone());
    h.api.push_refresh(Err(http_error(401, "INVALID_TOKEN")));

    assert_eq!(h.identity.session.init().await, SessionStatus::Anonymous);
    assert!(h.identity.session.current().is_none());
    assert!(store.get(SESSION_KEY).unwrap().is_none());
}

#[tokio::test]
async fn test_corrupt_stored_session_is_discarded() {
    let store = Arc::new(MemoryStore::new());
    store.set(SESSION_KEY, r#"{"user":{"id":""}}"#).unwrap();
    let h = with_store(DEFAULT_URL, store.clone());

    assert_eq!(h.identity.session.init().await, SessionStatus::Anonymous);
    assert!(store.get(SESSION_KEY).unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_refreshes_share_one_request() {
    let h = harness();
    h.identity.session.set_session(fixtures::session());
    h.api.set_latency(Duration::from_millis(200));
    h.api.push_refresh(Ok(refreshed("access-token-2")));

    let session = &h.identity.session;
    let (a, b, c, d) = tokio::join!(
        session.refresh(),
        session.refresh(),
        session.refresh(),
        session.refresh()
    );

    assert!(a && b && c && d);
    assert_eq!(h.api.calls("refresh"), 1);
    assert_eq!(session.access_token().as_deref(), Some("access-token-2"));

    // Settled: the next refresh goes out again.
    h.api.push_refresh(Ok(refreshed("access-token-3")));
    assert!(session.refresh().await);
    assert_eq!(h.api.calls("refresh"), 2);
}

#[tokio::test]
async fn test_authorized_token_refreshes_inside_skew() {
    let h = harness();
    let mut session = fixtures::session();
    // Inside the 60 second skew window.
    session.expires_at = Utc::now() + ChronoDuration::seconds(30);
    h.identity.session.set_session(session);
    h.api.push_refresh(Ok(refreshed("access-token-2")));

    let token = h.identity.session.authorized_token().await;

    assert_eq!(token.as_deref(), Some("access-token-2"));
    assert_eq!(h.api.calls("refresh"), 1);
}

#[tokio::test]
async fn test_logout_clears_tenant_state_and_redirects_with_reason() {
    let h = harness();
    let membership = fixtures::membership("t1", "stmarys", &["teacher"]);
    h.identity
        .session
        .set_session(fixtures::session_with_memberships(vec![membership.clone()]));
    h.identity.tenant_context.activate(membership).unwrap();

    h.identity.logout(Some("session expired")).await;

    assert_eq!(h.api.calls("logout"), 1);
    assert_eq!(h.identity.session.status(), SessionStatus::Anonymous);
    assert!(h.identity.tenant_context.active().is_none());
    assert!(h.store.get(SESSION_KEY).unwrap().is_none());
    assert_eq!(
        h.navigator.last().as_deref(),
        Some("/login?reason=session%20expired")
    );
}

#[tokio::test]
async fn test_password_login_accepts_legacy_response() {
    let h = harness();
    let exp = Utc::now().timestamp() + 900;
    h.api.push_login(Ok(json!({
        "access_token": fixtures::token(json!({ "sub": "u1", "exp": exp })),
        "refresh_token": "legacy-refresh",
        "user": { "_id": "u1", "email": "ops@example.com", "name": "Ops" },
        "is_host": true
    })));

    let session = h
        .identity
        .session
        .login(" ops@example.com ", "hunter2")
        .await
        .unwrap();

    assert_eq!(session.user.id, "u1");
    assert_eq!(session.user.display_name.as_deref(), Some("Ops"));
    assert_eq!(session.expires_at.timestamp(), exp);
    assert!(h.identity.session.is_host_session());
    assert!(h.identity.session.is_authenticated());
}

#[tokio::test]
async fn test_failed_login_leaves_session_untouched() {
    let h = harness();
    h.api.push_login(Err(http_error(401, "INVALID_CREDENTIALS")));

    assert!(h.identity.session.login("user@example.com", "wrong").await.is_err());
    assert!(h.identity.session.current().is_none());
}
