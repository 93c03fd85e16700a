use std::sync::Arc;
use tokio::sync::watch;

use crate::error::IdentityError;
use crate::models::{BootstrapStatus, TenantMembership};
use crate::services::permissions::{EntitlementService, PermissionService};
use crate::services::tenant_context::TenantContextStore;
use crate::utils::{StateCell, Transition};

/// Switches the active tenant and reloads what depends on it.
pub struct TenantBootstrap {
    context: Arc<TenantContextStore>,
    permissions: Arc<PermissionService>,
    entitlements: Arc<EntitlementService>,
    status: StateCell<BootstrapStatus>,
}

impl TenantBootstrap {
    pub fn new(
        context: Arc<TenantContextStore>,
        permissions: Arc<PermissionService>,
        entitlements: Arc<EntitlementService>,
    ) -> Self {
        Self {
            context,
            permissions,
            entitlements,
            status: StateCell::new(BootstrapStatus::Idle),
        }
    }

    /// Activate `membership` now, then reload permissions and entitlements
    /// side by side. Reload failures are logged; only a failed activation
    /// is an error.
    pub async fn switch_tenant(&self, membership: TenantMembership) -> Result<(), IdentityError> {
        self.status.set(BootstrapStatus::Switching);
        let tenant_id = membership.tenant_id.clone();

        if let Err(e) = self.context.activate(membership.clone()) {
            tracing::error!(tenant_id = %tenant_id, error = %e, "Tenant switch failed");
            self.status.set(BootstrapStatus::Error);
            return Err(e);
        }

        self.permissions.seed(&membership);
        self.entitlements.clear();

        let (permissions, entitlements) =
            tokio::join!(self.permissions.reload(), self.entitlements.reload());
        if let Err(e) = permissions {
            tracing::warn!(tenant_id = %tenant_id, error = %e, "Permission reload failed, keeping membership permissions");
        }
        if let Err(e) = entitlements {
            tracing::warn!(tenant_id = %tenant_id, error = %e, "Entitlement reload failed");
        }

        self.status.set(BootstrapStatus::Ready);
        tracing::info!(tenant_id = %tenant_id, "Tenant bootstrap complete");
        Ok(())
    }

    pub fn status(&self) -> BootstrapStatus {
        self.status.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<Transition<BootstrapStatus>> {
        self.status.subscribe()
    }
}
