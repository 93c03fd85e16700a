//! Test doubles shared by unit and integration tests.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::IdentityError;
use crate::models::auth::{
    ChallengeRequest, ChallengeResponse, ErrorBody, LoginRequest, MfaVerifyRequest,
    RefreshRequest, RefreshResponse, ResendRequest, VerifyOtpRequest, VerifyResponse,
};
use crate::models::tenant::TenantRecord;
use crate::models::{Entitlements, RolePermissions};
use crate::routing::Navigator;
use crate::services::api_client::{IdentityApi, TenantScope};

pub mod fixtures {
    use chrono::{Duration, Utc};
    use std::collections::BTreeSet;

    use crate::models::tenant::TenantRecord;
    use crate::models::{Session, SessionScope, SessionTokens, SessionUser, TenantMembership};
    use crate::utils::jwt::encode_unsigned;

    pub fn membership(tenant_id: &str, slug: &str, roles: &[&str]) -> TenantMembership {
        TenantMembership {
            tenant_id: tenant_id.to_string(),
            tenant_slug: slug.to_string(),
            tenant_name: format!("{} school", slug),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            permissions: None,
        }
    }

    pub fn membership_with_permissions(
        tenant_id: &str,
        slug: &str,
        permissions: &[&str],
    ) -> TenantMembership {
        TenantMembership {
            permissions: Some(permissions.iter().map(|p| p.to_string()).collect::<BTreeSet<_>>()),
            ..membership(tenant_id, slug, &["staff"])
        }
    }

    /// A valid, refreshable session without memberships.
    pub fn session() -> Session {
        session_with_memberships(vec![])
    }

    pub fn session_with_memberships(memberships: Vec<TenantMembership>) -> Session {
        let now = Utc::now();
        Session {
            user: SessionUser {
                id: "user_123".to_string(),
                email: "user@example.com".to_string(),
                display_name: Some("Test User".to_string()),
                avatar_url: None,
            },
            memberships,
            active_tenant_id: None,
            tokens: SessionTokens {
                access_token: "access-token".to_string(),
                refresh_token: Some("refresh-token".to_string()),
                token_type: "Bearer".to_string(),
            },
            expires_at: now + Duration::minutes(30),
            issued_at: Some(now),
            scope: SessionScope::Tenant,
        }
    }

    pub fn host_session() -> Session {
        Session {
            scope: SessionScope::Host,
            ..session()
        }
    }

    /// A session whose access token is already past the refresh skew.
    pub fn expired_session() -> Session {
        let mut session = session();
        session.expires_at = Utc::now() - Duration::minutes(1);
        session
    }

    /// Unsigned bearer token carrying the given claims.
    pub fn token(claims: serde_json::Value) -> String {
        encode_unsigned(&claims)
    }

    pub fn tenant(tenant_id: &str, slug: &str) -> TenantRecord {
        TenantRecord {
            tenant_id: tenant_id.to_string(),
            tenant_slug: slug.to_string(),
            tenant_name: format!("{} school", slug),
            branding: None,
        }
    }
}

/// Build the error a backend would produce for `status` and `code`.
pub fn http_error(status: u16, code: &str) -> IdentityError {
    IdentityError::Http {
        status: StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        body: ErrorBody {
            code: Some(code.to_string()),
            ..Default::default()
        },
        retry_after: None,
    }
}

fn unscripted(endpoint: &str) -> IdentityError {
    IdentityError::InvalidState(format!("no scripted response for {}", endpoint))
}

type Script<T> = Mutex<VecDeque<Result<T, IdentityError>>>;

/// Scripted [`IdentityApi`]. Each endpoint answers from its own queue;
/// tenant lookups answer from registered records. Every call is counted.
#[derive(Default)]
pub struct MockIdentityApi {
    challenges: Script<ChallengeResponse>,
    resends: Script<ChallengeResponse>,
    otp_verifications: Script<VerifyResponse>,
    mfa_verifications: Script<VerifyResponse>,
    refreshes: Script<RefreshResponse>,
    logins: Script<serde_json::Value>,
    tenants: Mutex<Vec<TenantRecord>>,
    failing_lookups: Mutex<bool>,
    permissions: Mutex<Option<RolePermissions>>,
    entitlements: Mutex<Option<Entitlements>>,
    latency: Mutex<Option<Duration>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    looked_up_slugs: Mutex<Vec<String>>,
    last_code: Mutex<Option<String>>,
}

impl MockIdentityApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_challenge(&self, result: Result<ChallengeResponse, IdentityError>) {
        push(&self.challenges, result);
    }

    pub fn push_resend(&self, result: Result<ChallengeResponse, IdentityError>) {
        push(&self.resends, result);
    }

    pub fn push_verify_otp(&self, result: Result<VerifyResponse, IdentityError>) {
        push(&self.otp_verifications, result);
    }

    pub fn push_verify_mfa(&self, result: Result<VerifyResponse, IdentityError>) {
        push(&self.mfa_verifications, result);
    }

    pub fn push_refresh(&self, result: Result<RefreshResponse, IdentityError>) {
        push(&self.refreshes, result);
    }

    pub fn push_login(&self, result: Result<serde_json::Value, IdentityError>) {
        push(&self.logins, result);
    }

    pub fn add_tenant(&self, record: TenantRecord) {
        lock(&self.tenants).push(record);
    }

    /// Make slug and id lookups fail with a 503 instead of answering.
    pub fn fail_lookups(&self) {
        *lock(&self.failing_lookups) = true;
    }

    pub fn set_permissions(&self, permissions: RolePermissions) {
        *lock(&self.permissions) = Some(permissions);
    }

    pub fn set_entitlements(&self, entitlements: Entitlements) {
        *lock(&self.entitlements) = Some(entitlements);
    }

    /// Delay every answer by `latency` (pairs with a paused tokio clock).
    pub fn set_latency(&self, latency: Duration) {
        *lock(&self.latency) = Some(latency);
    }

    pub fn calls(&self, endpoint: &str) -> usize {
        lock(&self.calls).get(endpoint).copied().unwrap_or(0)
    }

    pub fn looked_up_slugs(&self) -> Vec<String> {
        lock(&self.looked_up_slugs).clone()
    }

    /// Last OTP or MFA code submitted.
    pub fn last_code(&self) -> Option<String> {
        lock(&self.last_code).clone()
    }

    async fn enter(&self, endpoint: &'static str) {
        *lock(&self.calls).entry(endpoint).or_insert(0) += 1;
        let latency = *lock(&self.latency);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn find_tenant(&self, matches: impl Fn(&TenantRecord) -> bool) -> Result<Option<TenantRecord>, IdentityError> {
        if *lock(&self.failing_lookups) {
            return Err(http_error(503, "SERVICE_UNAVAILABLE"));
        }
        Ok(lock(&self.tenants).iter().find(|t| matches(t)).cloned())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn push<T>(script: &Script<T>, result: Result<T, IdentityError>) {
    lock(script).push_back(result);
}

fn pop<T>(script: &Script<T>, endpoint: &str) -> Result<T, IdentityError> {
    lock(script)
        .pop_front()
        .unwrap_or_else(|| Err(unscripted(endpoint)))
}

#[async_trait]
impl IdentityApi for MockIdentityApi {
    async fn request_challenge(
        &self,
        _req: &ChallengeRequest,
    ) -> Result<ChallengeResponse, IdentityError> {
        self.enter("challenge").await;
        pop(&self.challenges, "challenge")
    }

    async fn resend_challenge(
        &self,
        _req: &ResendRequest,
    ) -> Result<ChallengeResponse, IdentityError> {
        self.enter("resend").await;
        pop(&self.resends, "resend")
    }

    async fn verify_otp(&self, req: &VerifyOtpRequest) -> Result<VerifyResponse, IdentityError> {
        *lock(&self.last_code) = Some(req.code.clone());
        self.enter("verify").await;
        pop(&self.otp_verifications, "verify")
    }

    async fn verify_mfa(&self, req: &MfaVerifyRequest) -> Result<VerifyResponse, IdentityError> {
        *lock(&self.last_code) = Some(req.code.clone());
        self.enter("mfa_verify").await;
        pop(&self.mfa_verifications, "mfa_verify")
    }

    async fn refresh(&self, _req: &RefreshRequest) -> Result<RefreshResponse, IdentityError> {
        self.enter("refresh").await;
        pop(&self.refreshes, "refresh")
    }

    async fn login(&self, _req: &LoginRequest) -> Result<serde_json::Value, IdentityError> {
        self.enter("login").await;
        pop(&self.logins, "login")
    }

    async fn logout(&self, _access_token: Option<&str>) -> Result<(), IdentityError> {
        self.enter("logout").await;
        Ok(())
    }

    async fn resolve_tenant_slug(&self, slug: &str) -> Result<Option<TenantRecord>, IdentityError> {
        lock(&self.looked_up_slugs).push(slug.to_string());
        self.enter("resolve_slug").await;
        self.find_tenant(|t| t.tenant_slug == slug)
    }

    async fn get_tenant(
        &self,
        tenant_id: &str,
        _access_token: Option<&str>,
    ) -> Result<Option<TenantRecord>, IdentityError> {
        self.enter("get_tenant").await;
        self.find_tenant(|t| t.tenant_id == tenant_id)
    }

    async fn load_permissions(
        &self,
        _scope: &TenantScope,
    ) -> Result<RolePermissions, IdentityError> {
        self.enter("permissions").await;
        lock(&self.permissions)
            .clone()
            .ok_or_else(|| http_error(500, "SERVER_ERROR"))
    }

    async fn load_entitlements(&self, _scope: &TenantScope) -> Result<Entitlements, IdentityError> {
        self.enter("entitlements").await;
        lock(&self.entitlements)
            .clone()
            .ok_or_else(|| http_error(500, "SERVER_ERROR"))
    }
}

/// Navigator that records every destination.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> Vec<String> {
        lock(&self.visited).clone()
    }

    pub fn last(&self) -> Option<String> {
        lock(&self.visited).last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        lock(&self.visited).push(url.to_string());
    }
}
