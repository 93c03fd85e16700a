use std::sync::Arc;

use super::navigator::Navigator;
use super::return_url::sanitize_or;
use crate::config::RouteSettings;
use crate::services::session_manager::SessionManager;
use crate::services::tenant_bootstrap::TenantBootstrap;
use crate::services::tenant_context::TenantContextStore;

/// Picks the landing page once a session exists, by membership count.
pub struct PostLoginRouter {
    session: Arc<SessionManager>,
    context: Arc<TenantContextStore>,
    bootstrap: Arc<TenantBootstrap>,
    navigator: Arc<dyn Navigator>,
    routes: RouteSettings,
}

impl PostLoginRouter {
    pub fn new(
        session: Arc<SessionManager>,
        context: Arc<TenantContextStore>,
        bootstrap: Arc<TenantBootstrap>,
        navigator: Arc<dyn Navigator>,
        routes: RouteSettings,
    ) -> Self {
        Self {
            session,
            context,
            bootstrap,
            navigator,
            routes,
        }
    }

    /// Decide, navigate, and return the destination.
    pub async fn route(&self, return_url: Option<&str>) -> String {
        let destination = self.destination(return_url).await;
        self.navigator.navigate(&destination);
        destination
    }

    async fn destination(&self, return_url: Option<&str>) -> String {
        let Some(session) = self.session.current() else {
            return self.routes.login.clone();
        };
        let landing = sanitize_or(return_url, &self.routes.default_landing, &self.routes.login);

        match session.memberships.as_slice() {
            [] if session.is_host() => self.routes.host_landing.clone(),
            [] => {
                tracing::info!(user_id = %session.user.id, "User has no tenant memberships");
                self.routes.no_access.clone()
            }
            [only] => match self.bootstrap.switch_tenant(only.clone()).await {
                Ok(()) => landing,
                Err(e) => {
                    tracing::warn!(error = %e, "Automatic tenant selection failed");
                    self.routes.tenant_select.clone()
                }
            },
            many => match self.context.restore_from_memberships(many) {
                Some(restored) => match self.bootstrap.switch_tenant(restored).await {
                    Ok(()) => landing,
                    Err(e) => {
                        tracing::warn!(error = %e, "Restoring last tenant failed");
                        self.routes.tenant_select.clone()
                    }
                },
                None => self.routes.tenant_select.clone(),
            },
        }
    }
}
