pub mod config;
pub mod error;
pub mod flow;
pub mod guards;
pub mod models;
pub mod routing;
pub mod services;
pub mod storage;
pub mod testing;
pub mod utils;

use std::sync::Arc;

use crate::config::Settings;
use crate::error::IdentityError;
use crate::flow::AuthFlowController;
use crate::guards::{AuthGuard, PermissionGuard, TenantGuard};
use crate::routing::{LoggingNavigator, Navigator, PostLoginRouter};
use crate::services::{
    EntitlementService, HttpIdentityApi, IdentityApi, LocationSource, PermissionService,
    SessionManager, SessionStorage, TenantBootstrap, TenantContextStore, TenantResolver,
    UrlLocation,
};
use crate::storage::{FileStore, KeyValueStore};

/// One client's worth of identity services, wired together.
#[derive(Clone)]
pub struct IdentityContext {
    pub settings: Settings,
    pub api: Arc<dyn IdentityApi>,
    pub navigator: Arc<dyn Navigator>,
    pub session: Arc<SessionManager>,
    pub tenant_context: Arc<TenantContextStore>,
    pub resolver: Arc<TenantResolver>,
    pub permissions: Arc<PermissionService>,
    pub entitlements: Arc<EntitlementService>,
    pub bootstrap: Arc<TenantBootstrap>,
}

impl IdentityContext {
    pub fn new(
        settings: Settings,
        api: Arc<dyn IdentityApi>,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        location: Arc<dyn LocationSource>,
    ) -> Self {
        let session = Arc::new(SessionManager::new(
            api.clone(),
            SessionStorage::new(store.clone()),
            navigator.clone(),
            settings.session.clone(),
            settings.routes.login.clone(),
        ));
        let tenant_context = Arc::new(TenantContextStore::new(store));
        let resolver = Arc::new(TenantResolver::new(
            api.clone(),
            session.clone(),
            location,
            settings.tenant.clone(),
        ));
        let permissions = Arc::new(PermissionService::new(
            api.clone(),
            session.clone(),
            tenant_context.clone(),
        ));
        let entitlements = Arc::new(EntitlementService::new(
            api.clone(),
            session.clone(),
            tenant_context.clone(),
        ));
        let bootstrap = Arc::new(TenantBootstrap::new(
            tenant_context.clone(),
            permissions.clone(),
            entitlements.clone(),
        ));

        Self {
            settings,
            api,
            navigator,
            session,
            tenant_context,
            resolver,
            permissions,
            entitlements,
            bootstrap,
        }
    }

    /// Production wiring: HTTP backend, file storage, logging navigator.
    pub fn from_settings(settings: Settings) -> Result<Self, IdentityError> {
        let api: Arc<dyn IdentityApi> = Arc::new(HttpIdentityApi::new(settings.api.clone())?);
        let store: Arc<dyn KeyValueStore> =
            Arc::new(FileStore::new(settings.session.storage_path.clone()));
        let location: Arc<dyn LocationSource> =
            Arc::new(UrlLocation::parse(&settings.client.location_url)?);
        let navigator: Arc<dyn Navigator> = Arc::new(LoggingNavigator::new());

        Ok(Self::new(settings, api, store, navigator, location))
    }

    pub fn auth_flow(&self) -> AuthFlowController {
        AuthFlowController::new(
            self.api.clone(),
            self.session.clone(),
            self.navigator.clone(),
            self.settings.auth.clone(),
        )
    }

    pub fn auth_guard(&self) -> AuthGuard {
        AuthGuard::new(
            self.session.clone(),
            self.settings.routes.clone(),
            self.settings.guards.clone(),
        )
    }

    pub fn tenant_guard(&self) -> TenantGuard {
        TenantGuard::new(
            self.session.clone(),
            self.resolver.clone(),
            self.tenant_context.clone(),
            self.bootstrap.clone(),
            self.entitlements.clone(),
            self.settings.routes.clone(),
        )
    }

    pub fn permission_guard(&self) -> PermissionGuard {
        PermissionGuard::new(
            self.session.clone(),
            self.permissions.clone(),
            self.settings.routes.clone(),
            &self.settings.guards,
        )
    }

    pub fn post_login_router(&self) -> PostLoginRouter {
        PostLoginRouter::new(
            self.session.clone(),
            self.tenant_context.clone(),
            self.bootstrap.clone(),
            self.navigator.clone(),
            self.settings.routes.clone(),
        )
    }

    /// Full sign-out: tenant state first, then the session (which redirects).
    pub async fn logout(&self, reason: Option<&str>) {
        self.resolver.clear_tenant();
        self.tenant_context.clear();
        self.permissions.clear();
        self.entitlements.clear();
        self.session.logout(reason).await;
    }
}
