//! Navigation guards.
//!
//! Guards never fail outward: every problem becomes a redirect.

pub mod auth;
pub mod permission;
pub mod tenant;

use serde::Deserialize;

pub use auth::AuthGuard;
pub use permission::PermissionGuard;
pub use tenant::TenantGuard;

/// Per-route guard configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteData {
    /// Bypass every guard.
    #[serde(default)]
    pub public: bool,
    /// Bypass the tenant guard only.
    #[serde(default)]
    pub skip_tenant: bool,
    /// Required `resource:action` pairs, all of them.
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl RouteData {
    pub fn public() -> Self {
        Self {
            public: true,
            ..Default::default()
        }
    }

    pub fn protected() -> Self {
        Self::default()
    }

    pub fn skip_tenant(mut self) -> Self {
        self.skip_tenant = true;
        self
    }

    pub fn requiring<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions.extend(permissions.into_iter().map(Into::into));
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    Allow,
    Redirect(String),
}

impl GuardOutcome {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardOutcome::Allow)
    }
}
