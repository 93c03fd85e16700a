use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Authenticated user as delivered inside a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// A user's role/permission grant within one tenant.
///
/// Snapshot only; the backend stays authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantMembership {
    pub tenant_id: String,
    pub tenant_slug: String,
    pub tenant_name: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    /// `resource:action` strings, when the backend embeds them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<BTreeSet<String>>,
}

impl TenantMembership {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokens {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

pub fn default_token_type() -> String {
    "Bearer".to_string()
}

// Tokens never reach the logs.
impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &"[redacted]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[redacted]"),
            )
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Whether the session belongs to a tenant user or a platform operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionScope {
    #[default]
    Tenant,
    Host,
}

impl SessionScope {
    fn is_tenant(&self) -> bool {
        matches!(self, SessionScope::Tenant)
    }
}

/// The client's authenticated session.
///
/// `access_token` is always paired with `expires_at`; a session with a
/// refresh token is refreshable, one without is not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user: SessionUser,
    #[serde(default)]
    pub memberships: Vec<TenantMembership>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_tenant_id: Option<String>,
    pub tokens: SessionTokens,
    pub expires_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "SessionScope::is_tenant")]
    pub scope: SessionScope,
}

impl Session {
    pub fn is_refreshable(&self) -> bool {
        self.tokens
            .refresh_token
            .as_deref()
            .is_some_and(|t| !t.is_empty())
    }

    /// True when `expires_at - skew` is in the past relative to `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>, skew: Duration) -> bool {
        self.expires_at - skew <= now
    }

    pub fn is_host(&self) -> bool {
        self.scope == SessionScope::Host
    }

    pub fn membership(&self, tenant_id: &str) -> Option<&TenantMembership> {
        self.memberships.iter().find(|m| m.tenant_id == tenant_id)
    }

    /// Replace the token pair after a refresh; keeps the old refresh token
    /// unless the server rotated it.
    pub fn apply_refresh(
        &mut self,
        access_token: String,
        refresh_token: Option<String>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        self.tokens.access_token = access_token;
        if let Some(rotated) = refresh_token.filter(|t| !t.is_empty()) {
            self.tokens.refresh_token = Some(rotated);
        }
        self.expires_at = expires_at;
        self.issued_at = Some(now);
    }
}

/// Lifecycle status published by the session manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Bootstrapping; guards wait for this to change.
    Unresolved,
    Anonymous,
    Authenticated,
}
