mod common;

use std::sync::Arc;

use common::{harness, with_store, DEFAULT_URL};
use tenant_identity::models::tenant::BootstrapStatus;
use tenant_identity::storage::{KeyValueStore, MemoryStore, LAST_TENANT_KEY};
use tenant_identity::testing::fixtures;

#[tokio::test]
async fn test_several_memberships_without_preference_go_to_selection() {
    let h = harness();
    h.identity.session.set_session(fixtures::session_with_memberships(vec![
        fixtures::membership("t1", "stmarys", &["teacher"]),
        fixtures::membership("t2", "greenfield", &["teacher"]),
    ]));

    let destination = h.identity.post_login_router().route(None).await;

    assert_eq!(destination, "/tenant-select");
    assert_eq!(h.navigator.last().as_deref(), Some("/tenant-select"));
    assert!(h.identity.tenant_context.active().is_none());
}

#[tokio::test]
async fn test_single_membership_is_activated_automatically() {
    let h = harness();
    h.identity
        .session
        .set_session(fixtures::session_with_memberships(vec![fixtures::membership(
            "t1",
            "stmarys",
            &["teacher"],
        )]));

    let destination = h.identity.post_login_router().route(Some("/reports")).await;

    assert_eq!(destination, "/reports");
    assert_eq!(h.identity.tenant_context.active_tenant_id().as_deref(), Some("t1"));
    assert_eq!(h.identity.bootstrap.status(), BootstrapStatus::Ready);
    assert_eq!(h.api.calls("permissions"), 1);
    assert_eq!(h.api.calls("entitlements"), 1);
}

#[tokio::test]
async fn test_unsafe_return_url_falls_back_to_landing() {
    let h = harness();
    h.identity
        .session
        .set_session(fixtures::session_with_memberships(vec![fixtures::membership(
            "t1",
            "stmarys",
            &["teacher"],
        )]));

    let destination = h
        .identity
        .post_login_router()
        .route(Some("https://evil.example.com/"))
        .await;

    assert_eq!(destination, "/dashboard");
}

#[tokio::test]
async fn test_last_tenant_is_restored_after_restart() {
    let store = Arc::new(MemoryStore::new());
    let memberships = vec![
        fixtures::membership("t1", "stmarys", &["teacher"]),
        fixtures::membership("t2", "greenfield", &["teacher"]),
    ];

    let first = with_store(DEFAULT_URL, store.clone());
    first.identity.tenant_context.activate(memberships[1].clone()).unwrap();

    let second = with_store(DEFAULT_URL, store);
    second
        .identity
        .session
        .set_session(fixtures::session_with_memberships(memberships));
    let destination = second.identity.post_login_router().route(None).await;

    assert_eq!(destination, "/dashboard");
    assert_eq!(
        second.identity.tenant_context.active_tenant_id().as_deref(),
        Some("t2")
    );
}

#[tokio::test]
async fn test_stale_preference_is_forgotten() {
    let h = harness();
    h.store
        .set(LAST_TENANT_KEY, r#"{"tenantId":"t9","slug":"closed-school"}"#)
        .unwrap();
    h.identity.session.set_session(fixtures::session_with_memberships(vec![
        fixtures::membership("t1", "stmarys", &["teacher"]),
        fixtures::membership("t2", "greenfield", &["teacher"]),
    ]));

    let destination = h.identity.post_login_router().route(None).await;

    assert_eq!(destination, "/tenant-select");
    assert!(h.store.get(LAST_TENANT_KEY).unwrap().is_none());
}

#[tokio::test]
async fn test_no_memberships() {
    let h = harness();
    h.identity.session.set_session(fixtures::session());
    assert_eq!(h.identity.post_login_router().route(None).await, "/no-access");

    let h = harness();
    h.identity.session.set_session(fixtures::host_session());
    assert_eq!(
        h.identity.post_login_router().route(None).await,
        "/host/dashboard"
    );
}

#[tokio::test]
async fn test_without_session_routes_to_login() {
    let h = harness();

    assert_eq!(h.identity.post_login_router().route(Some("/reports")).await, "/login");
    assert_eq!(h.navigator.visited(), vec!["/login".to_string()]);
}
