mod common;

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use common::harness_at;
use tenant_identity::models::{ResolutionSource, TenantStatus};
use tenant_identity::testing::fixtures;

#[tokio::test]
async fn test_subdomain_wins_over_path() {
    let h = harness_at("https://stmarys.example.com/t/greenfield/dashboard");
    h.api.add_tenant(fixtures::tenant("t1", "stmarys"));
    h.api.add_tenant(fixtures::tenant("t2", "greenfield"));

    let tenant = h.identity.resolver.resolve_tenant().await.expect("resolved");

    assert_eq!(tenant.tenant_id, "t1");
    assert_eq!(tenant.resolved_from, ResolutionSource::Subdomain);
    assert_eq!(h.api.looked_up_slugs(), vec!["stmarys".to_string()]);
    assert_eq!(h.api.calls("get_tenant"), 0);
    assert_eq!(h.identity.resolver.status(), TenantStatus::Ready);
}

#[tokio::test]
async fn test_resolution_is_cached_once_ready() {
    let h = harness_at("https://stmarys.example.com/");
    h.api.add_tenant(fixtures::tenant("t1", "stmarys"));

    let first = h.identity.resolver.resolve_tenant().await.expect("resolved");
    let second = h.identity.resolver.resolve_tenant().await.expect("resolved");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(h.api.calls("resolve_slug"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_resolutions_share_one_lookup() {
    let h = harness_at("https://stmarys.example.com/");
    h.api.add_tenant(fixtures::tenant("t1", "stmarys"));
    h.api.set_latency(Duration::from_millis(100));

    let resolver = &h.identity.resolver;
    let (a, b) = tokio::join!(resolver.resolve_tenant(), resolver.resolve_tenant());

    assert_eq!(a.expect("resolved").tenant_id, "t1");
    assert_eq!(b.expect("resolved").tenant_id, "t1");
    assert_eq!(h.api.calls("resolve_slug"), 1);
}

#[tokio::test]
async fn test_path_resolution_on_localhost() {
    let h = harness_at("http://localhost:4200/t/greenfield/reports");
    h.api.add_tenant(fixtures::tenant("t2", "greenfield"));

    let tenant = h.identity.resolver.resolve_tenant().await.expect("resolved");

    assert_eq!(tenant.tenant_slug, "greenfield");
    assert_eq!(tenant.resolved_from, ResolutionSource::Path);
    assert_eq!(h.api.looked_up_slugs(), vec!["greenfield".to_string()]);
}

#[tokio::test]
async fn test_bare_first_segment_is_a_candidate_unless_reserved() {
    let h = harness_at("http://localhost:4200/greenfield");
    h.api.add_tenant(fixtures::tenant("t2", "greenfield"));
    assert!(h.identity.resolver.resolve_tenant().await.is_some());

    let h = harness_at("http://localhost:4200/dashboard");
    assert!(h.identity.resolver.resolve_tenant().await.is_none());
    assert!(h.api.looked_up_slugs().is_empty());
    assert_eq!(h.identity.resolver.status(), TenantStatus::NotFound);
}

#[tokio::test]
async fn test_reserved_subdomain_falls_through_to_token() {
    let h = harness_at("https://www.example.com/login");
    h.api.add_tenant(fixtures::tenant("t9", "northside"));
    let mut session = fixtures::session();
    session.tokens.access_token = fixtures::token(json!({ "sub": "user_123", "tenantId": "t9" }));
    h.identity.session.set_session(session);

    let tenant = h.identity.resolver.resolve_tenant().await.expect("resolved");

    assert_eq!(tenant.tenant_id, "t9");
    assert_eq!(tenant.resolved_from, ResolutionSource::Token);
    assert!(h.api.looked_up_slugs().is_empty());
    assert_eq!(h.api.calls("get_tenant"), 1);
}

#[tokio::test]
async fn test_unknown_slug_is_not_found() {
    let h = harness_at("https://unknown.example.com/");

    assert!(h.identity.resolver.resolve_tenant().await.is_none());
    assert_eq!(h.identity.resolver.status(), TenantStatus::NotFound);
    assert_eq!(h.api.looked_up_slugs(), vec!["unknown".to_string()]);
}

#[tokio::test]
async fn test_failed_lookups_fall_through_to_not_found() {
    let h = harness_at("https://stmarys.example.com/");
    h.api.fail_lookups();

    assert!(h.identity.resolver.resolve_tenant().await.is_none());
    assert_eq!(h.identity.resolver.status(), TenantStatus::NotFound);
}

#[tokio::test]
async fn test_clear_tenant_forces_fresh_resolution() {
    let h = harness_at("https://stmarys.example.com/");
    h.api.add_tenant(fixtures::tenant("t1", "stmarys"));
    h.identity.resolver.resolve_tenant().await.expect("resolved");

    h.identity.resolver.clear_tenant();
    assert_eq!(h.identity.resolver.status(), TenantStatus::Idle);
    assert!(h.identity.resolver.current().is_none());

    h.identity.resolver.resolve_tenant().await.expect("resolved again");
    assert_eq!(h.api.calls("resolve_slug"), 2);
}

#[tokio::test]
async fn test_location_change_is_picked_up_after_clear() {
    let h = harness_at("http://localhost:4200/t/stmarys");
    h.api.add_tenant(fixtures::tenant("t1", "stmarys"));
    h.api.add_tenant(fixtures::tenant("t2", "greenfield"));
    h.identity.resolver.resolve_tenant().await.expect("resolved");

    h.location.set_path("/t/greenfield/home").unwrap();
    h.identity.resolver.clear_tenant();

    let tenant = h.identity.resolver.resolve_tenant().await.expect("resolved");
    assert_eq!(tenant.tenant_id, "t2");
}
