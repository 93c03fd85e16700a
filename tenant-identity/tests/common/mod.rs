//! Shared setup for tenant-identity integration tests.
//!
//! Wires an [`IdentityContext`] against the scripted backend, an in-memory
//! store and a recording navigator.

#![allow(dead_code)]

use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;

use tenant_identity::config::Settings;
use tenant_identity::models::auth::ChallengeResponse;
use tenant_identity::models::TenantMembership;
use tenant_identity::services::UrlLocation;
use tenant_identity::storage::MemoryStore;
use tenant_identity::testing::{fixtures, MockIdentityApi, RecordingNavigator};
use tenant_identity::IdentityContext;

pub const DEFAULT_URL: &str = "http://localhost:4200/";

pub struct Harness {
    pub api: Arc<MockIdentityApi>,
    pub navigator: Arc<RecordingNavigator>,
    pub store: Arc<MemoryStore>,
    pub location: Arc<UrlLocation>,
    pub identity: IdentityContext,
}

pub fn harness() -> Harness {
    harness_at(DEFAULT_URL)
}

pub fn harness_at(url: &str) -> Harness {
    with_store(url, Arc::new(MemoryStore::new()))
}

/// A fresh client over an existing store, as after a process restart.
pub fn with_store(url: &str, store: Arc<MemoryStore>) -> Harness {
    with_settings(url, store, Settings::default())
}

pub fn with_settings(url: &str, store: Arc<MemoryStore>, settings: Settings) -> Harness {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();

    let api = Arc::new(MockIdentityApi::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let location = Arc::new(UrlLocation::parse(url).expect("valid test URL"));
    let identity = IdentityContext::new(
        settings,
        api.clone(),
        store.clone(),
        navigator.clone(),
        location.clone(),
    );

    Harness {
        api,
        navigator,
        store,
        location,
        identity,
    }
}

pub fn challenge(id: &str, cooldown: u32) -> ChallengeResponse {
    ChallengeResponse {
        challenge_id: id.to_string(),
        resend_cooldown: Some(cooldown),
        ..Default::default()
    }
}

/// Canonical session payload as embedded in verify and login responses.
pub fn session_payload(memberships: &[TenantMembership]) -> serde_json::Value {
    json!({
        "user": { "id": "user_123", "email": "user@example.com", "displayName": "Test User" },
        "memberships": memberships,
        "tokens": {
            "accessToken": fixtures::token(json!({ "sub": "user_123" })),
            "refreshToken": "refresh-token"
        },
        "expiresAt": (Utc::now() + Duration::minutes(30)).to_rfc3339(),
        "scope": "tenant"
    })
}
