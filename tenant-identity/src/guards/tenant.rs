use std::sync::Arc;

use super::{GuardOutcome, RouteData};
use crate::config::RouteSettings;
use crate::services::permissions::EntitlementService;
use crate::services::session_manager::SessionManager;
use crate::services::tenant_bootstrap::TenantBootstrap;
use crate::services::tenant_context::TenantContextStore;
use crate::services::tenant_resolver::TenantResolver;

/// Requires an active tenant that has picked an edition.
pub struct TenantGuard {
    session: Arc<SessionManager>,
    resolver: Arc<TenantResolver>,
    context: Arc<TenantContextStore>,
    bootstrap: Arc<TenantBootstrap>,
    entitlements: Arc<EntitlementService>,
    routes: RouteSettings,
}

impl TenantGuard {
    pub fn new(
        session: Arc<SessionManager>,
        resolver: Arc<TenantResolver>,
        context: Arc<TenantContextStore>,
        bootstrap: Arc<TenantBootstrap>,
        entitlements: Arc<EntitlementService>,
        routes: RouteSettings,
    ) -> Self {
        Self {
            session,
            resolver,
            context,
            bootstrap,
            entitlements,
            routes,
        }
    }

    pub async fn can_activate(&self, route: &RouteData) -> GuardOutcome {
        if route.public || route.skip_tenant {
            return GuardOutcome::Allow;
        }
        // Platform operators live outside tenant routes.
        if self.session.is_host_session() {
            return GuardOutcome::Redirect(self.routes.host_landing.clone());
        }

        if self.context.active().is_none() {
            if let Some(redirect) = self.activate_resolved_tenant().await {
                return GuardOutcome::Redirect(redirect);
            }
        }

        match self.entitlements.ensure_loaded().await {
            Ok(entitlements) if entitlements.has_edition() => GuardOutcome::Allow,
            Ok(_) => {
                tracing::info!("Tenant has no edition yet, redirecting to onboarding");
                GuardOutcome::Redirect(self.routes.onboarding.clone())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Entitlements unavailable");
                GuardOutcome::Redirect(self.routes.no_access.clone())
            }
        }
    }

    /// Resolve the tenant from the location and switch to it.
    /// Returns a redirect when that is not possible.
    async fn activate_resolved_tenant(&self) -> Option<String> {
        let Some(tenant) = self.resolver.resolve_tenant().await else {
            return Some(self.routes.tenant_select.clone());
        };

        let membership = self
            .session
            .current()
            .and_then(|s| s.membership(&tenant.tenant_id).cloned());
        let Some(membership) = membership else {
            tracing::info!(tenant_id = %tenant.tenant_id, "User is not a member of the resolved tenant");
            return Some(self.routes.no_access.clone());
        };

        match self.bootstrap.switch_tenant(membership).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Tenant switch failed in guard");
                Some(self.routes.tenant_select.clone())
            }
        }
    }
}
