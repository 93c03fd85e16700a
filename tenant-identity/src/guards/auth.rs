use std::sync::Arc;
use tokio::time::Instant;

use super::{GuardOutcome, RouteData};
use crate::config::{GuardSettings, RouteSettings};
use crate::models::SessionStatus;
use crate::routing::return_url::login_url;
use crate::services::session_manager::SessionManager;

pub struct AuthGuard {
    session: Arc<SessionManager>,
    routes: RouteSettings,
    settings: GuardSettings,
}

impl AuthGuard {
    pub fn new(session: Arc<SessionManager>, routes: RouteSettings, settings: GuardSettings) -> Self {
        Self {
            session,
            routes,
            settings,
        }
    }

    /// Wait (bounded) for session bootstrap, then require authentication.
    pub async fn can_activate(&self, route: &RouteData, attempted_url: &str) -> GuardOutcome {
        if route.public {
            return GuardOutcome::Allow;
        }

        let status = self.settled_status().await;
        if status == SessionStatus::Authenticated {
            return GuardOutcome::Allow;
        }

        tracing::debug!(?status, attempted_url, "Unauthenticated navigation, redirecting to login");
        GuardOutcome::Redirect(login_url(&self.routes.login, attempted_url))
    }

    async fn settled_status(&self) -> SessionStatus {
        let deadline = Instant::now() + self.settings.poll_timeout();
        loop {
            let status = self.session.status();
            if status != SessionStatus::Unresolved {
                return status;
            }
            if Instant::now() >= deadline {
                tracing::warn!("Session still unresolved after poll timeout");
                return status;
            }
            tokio::time::sleep(self.settings.poll_interval()).await;
        }
    }
}
