use std::sync::Arc;

use super::{GuardOutcome, RouteData};
use crate::config::{GuardSettings, RouteSettings};
use crate::routing::return_url::login_url;
use crate::services::permissions::PermissionService;
use crate::services::session_manager::SessionManager;

pub struct PermissionGuard {
    session: Arc<SessionManager>,
    permissions: Arc<PermissionService>,
    routes: RouteSettings,
    super_role: String,
}

impl PermissionGuard {
    pub fn new(
        session: Arc<SessionManager>,
        permissions: Arc<PermissionService>,
        routes: RouteSettings,
        settings: &GuardSettings,
    ) -> Self {
        Self {
            session,
            permissions,
            routes,
            super_role: settings.super_role.clone(),
        }
    }

    pub fn can_activate(&self, route: &RouteData, attempted_url: &str) -> GuardOutcome {
        self.check(&route.permissions, attempted_url)
    }

    /// Match-time variant: the route is not resolved yet, so the attempted
    /// URL is rebuilt from the unmatched segments.
    pub fn can_match(&self, route: &RouteData, segments: &[&str]) -> GuardOutcome {
        let attempted_url = format!("/{}", segments.join("/"));
        self.check(&route.permissions, &attempted_url)
    }

    fn check(&self, required: &[String], attempted_url: &str) -> GuardOutcome {
        if required.is_empty() {
            return GuardOutcome::Allow;
        }
        if !self.session.is_authenticated() {
            return GuardOutcome::Redirect(login_url(&self.routes.login, attempted_url));
        }
        if self.permissions.has_role(&self.super_role) {
            return GuardOutcome::Allow;
        }
        if self.permissions.satisfies_all(required) {
            return GuardOutcome::Allow;
        }

        tracing::info!(?required, attempted_url, "Permission denied");
        GuardOutcome::Redirect(format!(
            "{}?from={}",
            self.routes.access_denied,
            urlencoding::encode(attempted_url)
        ))
    }
}
