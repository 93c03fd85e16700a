//! Role permissions and entitlements of the active tenant.

use std::sync::Arc;

use crate::error::IdentityError;
use crate::models::{Entitlements, RolePermissions, TenantMembership};
use crate::services::api_client::IdentityApi;
use crate::services::session_manager::SessionManager;
use crate::services::tenant_context::TenantContextStore;
use crate::utils::StateCell;

pub struct PermissionService {
    api: Arc<dyn IdentityApi>,
    session: Arc<SessionManager>,
    context: Arc<TenantContextStore>,
    permissions: StateCell<RolePermissions>,
}

impl PermissionService {
    pub fn new(
        api: Arc<dyn IdentityApi>,
        session: Arc<SessionManager>,
        context: Arc<TenantContextStore>,
    ) -> Self {
        Self {
            api,
            session,
            context,
            permissions: StateCell::default(),
        }
    }

    /// Start from what the membership already carries, before the reload lands.
    pub fn seed(&self, membership: &TenantMembership) {
        let seeded = RolePermissions::from_strings(
            membership.roles.clone(),
            membership.permissions.iter().flatten(),
        );
        self.permissions.set(seeded);
    }

    pub async fn reload(&self) -> Result<RolePermissions, IdentityError> {
        let token = self.session.authorized_token().await;
        let scope = self.context.scope(token)?;
        let loaded = self.api.load_permissions(&scope).await?;
        tracing::debug!(tenant_id = %scope.tenant_id, entries = loaded.entries.len(), "Permissions loaded");
        self.permissions.set(loaded.clone());
        Ok(loaded)
    }

    pub fn current(&self) -> RolePermissions {
        self.permissions.get()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.permissions.get().roles.contains(role)
            || self.context.active().is_some_and(|m| m.has_role(role))
    }

    pub fn satisfies_all(&self, required: &[String]) -> bool {
        self.permissions.get().satisfies_all(required)
    }

    pub fn clear(&self) {
        self.permissions.set(RolePermissions::default());
    }
}

pub struct EntitlementService {
    api: Arc<dyn IdentityApi>,
    session: Arc<SessionManager>,
    context: Arc<TenantContextStore>,
    entitlements: StateCell<Option<Entitlements>>,
}

impl EntitlementService {
    pub fn new(
        api: Arc<dyn IdentityApi>,
        session: Arc<SessionManager>,
        context: Arc<TenantContextStore>,
    ) -> Self {
        Self {
            api,
            session,
            context,
            entitlements: StateCell::new(None),
        }
    }

    pub async fn reload(&self) -> Result<Entitlements, IdentityError> {
        let token = self.session.authorized_token().await;
        let scope = self.context.scope(token)?;
        let loaded = self.api.load_entitlements(&scope).await?;
        tracing::debug!(
            tenant_id = %scope.tenant_id,
            edition = ?loaded.edition.as_ref().map(|e| &e.id),
            "Entitlements loaded"
        );
        self.entitlements.set(Some(loaded.clone()));
        Ok(loaded)
    }

    /// Cached entitlements, loading them on first use.
    pub async fn ensure_loaded(&self) -> Result<Entitlements, IdentityError> {
        match self.current() {
            Some(loaded) => Ok(loaded),
            None => self.reload().await,
        }
    }

    pub fn current(&self) -> Option<Entitlements> {
        self.entitlements.get()
    }

    pub fn has_feature(&self, feature: &str) -> bool {
        self.current()
            .is_some_and(|e| e.features.iter().any(|f| f == feature))
    }

    pub fn clear(&self) {
        self.entitlements.set(None);
    }
}
