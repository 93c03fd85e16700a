//! Tenant resolution.
//!
//! Strategies run in a fixed order and the first hit wins: subdomain, then
//! path, then the bearer token's tenant claim. Lookup failures fall through
//! to the next strategy.

use reqwest::Url;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;

use crate::config::TenantSettings;
use crate::error::IdentityError;
use crate::models::tenant::TenantRecord;
use crate::models::{ResolutionSource, TenantContext, TenantStatus};
use crate::services::api_client::IdentityApi;
use crate::services::session_manager::SessionManager;
use crate::utils::jwt::decode_token_hints;
use crate::utils::{SingleFlight, StateCell, Transition};

/// Where the client currently is.
pub trait LocationSource: Send + Sync {
    /// Hostname without port.
    fn host(&self) -> String;
    /// Path component, starting with `/`.
    fn path(&self) -> String;
}

/// [`LocationSource`] over a parsed URL that can be moved.
#[derive(Debug)]
pub struct UrlLocation {
    url: RwLock<Url>,
}

impl UrlLocation {
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let url = Url::parse(raw)
            .map_err(|e| IdentityError::InvalidState(format!("Invalid location URL {}: {}", raw, e)))?;
        Ok(Self {
            url: RwLock::new(url),
        })
    }

    /// Move to `path`, resolved against the current URL.
    pub fn set_path(&self, path: &str) -> Result<(), IdentityError> {
        let mut url = self.url.write().unwrap_or_else(|e| e.into_inner());
        let next = url
            .join(path)
            .map_err(|e| IdentityError::InvalidState(format!("Invalid path {}: {}", path, e)))?;
        *url = next;
        Ok(())
    }
}

impl LocationSource for UrlLocation {
    fn host(&self) -> String {
        self.url
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .host_str()
            .unwrap_or_default()
            .to_string()
    }

    fn path(&self) -> String {
        self.url
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .path()
            .to_string()
    }
}

/// Tenant slugs: 2 to 63 chars of `[a-z0-9-]`, no leading or trailing hyphen.
pub fn is_valid_slug(slug: &str) -> bool {
    (2..=63).contains(&slug.len())
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-')
}

pub struct TenantResolver {
    api: Arc<dyn IdentityApi>,
    session: Arc<SessionManager>,
    location: Arc<dyn LocationSource>,
    settings: TenantSettings,
    status: StateCell<TenantStatus>,
    tenant: RwLock<Option<Arc<TenantContext>>>,
    // Bumped by clear_tenant so a resolution started earlier cannot repopulate the cache.
    generation: AtomicU64,
    flight: SingleFlight<Option<Arc<TenantContext>>>,
}

impl TenantResolver {
    pub fn new(
        api: Arc<dyn IdentityApi>,
        session: Arc<SessionManager>,
        location: Arc<dyn LocationSource>,
        settings: TenantSettings,
    ) -> Self {
        Self {
            api,
            session,
            location,
            settings,
            status: StateCell::new(TenantStatus::Idle),
            tenant: RwLock::new(None),
            generation: AtomicU64::new(0),
            flight: SingleFlight::new("resolve-tenant"),
        }
    }

    /// Resolve the active tenant. Cached once READY; concurrent callers
    /// share one resolution.
    pub async fn resolve_tenant(self: &Arc<Self>) -> Option<Arc<TenantContext>> {
        if self.status() == TenantStatus::Ready {
            if let Some(cached) = self.current() {
                return Some(cached);
            }
        }

        let this = Arc::clone(self);
        self.flight
            .run(move || async move { this.resolve_once().await })
            .await
    }

    async fn resolve_once(self: Arc<Self>) -> Option<Arc<TenantContext>> {
        let generation = self.generation.load(Ordering::SeqCst);
        self.status.set(TenantStatus::Resolving);

        // A panic inside a strategy comes back as a JoinError.
        let strategies = Arc::clone(&self);
        let outcome = tokio::spawn(async move { strategies.run_strategies().await }).await;
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("Tenant cleared during resolution, discarding result");
            return outcome.ok().flatten().map(Arc::new);
        }

        match outcome {
            Ok(Some(context)) => {
                tracing::info!(
                    tenant_id = %context.tenant_id,
                    slug = %context.tenant_slug,
                    source = ?context.resolved_from,
                    "Tenant resolved"
                );
                let context = Arc::new(context);
                *self.tenant.write().unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&context));
                self.status.set(TenantStatus::Ready);
                Some(context)
            }
            Ok(None) => {
                tracing::info!("No tenant found for current location");
                self.status.set(TenantStatus::NotFound);
                None
            }
            Err(e) => {
                tracing::error!(error = %e, "Tenant resolution aborted");
                self.status.set(TenantStatus::Error);
                None
            }
        }
    }

    async fn run_strategies(&self) -> Option<TenantContext> {
        if let Some(slug) = self.subdomain_candidate() {
            if let Some(record) = self.lookup_slug(&slug).await {
                return Some(TenantContext::from_record(record, ResolutionSource::Subdomain));
            }
        }

        if let Some(slug) = self.path_candidate() {
            if let Some(record) = self.lookup_slug(&slug).await {
                return Some(TenantContext::from_record(record, ResolutionSource::Path));
            }
        }

        let (tenant_id, token) = self.token_candidate()?;
        match self.api.get_tenant(&tenant_id, Some(&token)).await {
            Ok(Some(record)) => Some(TenantContext::from_record(record, ResolutionSource::Token)),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(tenant_id = %tenant_id, error = %e, "Tenant lookup by id failed");
                None
            }
        }
    }

    async fn lookup_slug(&self, slug: &str) -> Option<TenantRecord> {
        match self.api.resolve_tenant_slug(slug).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(slug = %slug, error = %e, "Tenant lookup by slug failed");
                None
            }
        }
    }

    fn subdomain_candidate(&self) -> Option<String> {
        let host = self.location.host().to_ascii_lowercase();
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() || host == "localhost" || host.parse::<IpAddr>().is_ok() {
            return None;
        }

        let labels: Vec<&str> = host.split('.').collect();
        // A bare apex domain has no tenant label.
        if labels.len() < 3 {
            return None;
        }
        let label = labels[0];
        if self.is_reserved_subdomain(label) || !is_valid_slug(label) {
            return None;
        }
        Some(label.to_string())
    }

    fn path_candidate(&self) -> Option<String> {
        let path = self.location.path();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let candidate = match segments.as_slice() {
            ["t", slug, ..] => slug.to_ascii_lowercase(),
            [first, ..] if !self.is_reserved_route(first) => first.to_ascii_lowercase(),
            _ => return None,
        };
        is_valid_slug(&candidate).then_some(candidate)
    }

    fn token_candidate(&self) -> Option<(String, String)> {
        let token = self.session.access_token()?;
        match decode_token_hints(&token) {
            Ok(hints) => hints
                .tenant_id
                .filter(|id| !id.is_empty())
                .map(|id| (id, token)),
            Err(e) => {
                tracing::debug!(error = %e, "Access token carries no readable tenant claim");
                None
            }
        }
    }

    fn is_reserved_subdomain(&self, label: &str) -> bool {
        self.settings
            .reserved_subdomains
            .iter()
            .any(|r| r.eq_ignore_ascii_case(label))
    }

    fn is_reserved_route(&self, segment: &str) -> bool {
        self.settings
            .reserved_routes
            .iter()
            .any(|r| r.eq_ignore_ascii_case(segment))
    }

    /// Forget the resolved tenant and go back to idle.
    pub fn clear_tenant(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.tenant.write().unwrap_or_else(|e| e.into_inner()) = None;
        self.status.set(TenantStatus::Idle);
    }

    pub fn current(&self) -> Option<Arc<TenantContext>> {
        self.tenant
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn status(&self) -> TenantStatus {
        self.status.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<Transition<TenantStatus>> {
        self.status.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionSettings;
    use crate::services::session_storage::SessionStorage;
    use crate::storage::MemoryStore;
    use crate::testing::{fixtures, MockIdentityApi, RecordingNavigator};

    fn build(api: Arc<MockIdentityApi>, url: &str) -> (Arc<TenantResolver>, Arc<SessionManager>) {
        let session = Arc::new(SessionManager::new(
            api.clone(),
            SessionStorage::new(Arc::new(MemoryStore::new())),
            Arc::new(RecordingNavigator::new()),
            SessionSettings::default(),
            "/login",
        ));
        let resolver = Arc::new(TenantResolver::new(
            api,
            session.clone(),
            Arc::new(UrlLocation::parse(url).unwrap()),
            TenantSettings::default(),
        ));
        (resolver, session)
    }

    #[test]
    fn test_slug_validation() {
        assert!(is_valid_slug("stmarys"));
        assert!(is_valid_slug("st-marys-2"));
        assert!(!is_valid_slug("a"));
        assert!(!is_valid_slug("-stmarys"));
        assert!(!is_valid_slug("stmarys-"));
        assert!(!is_valid_slug("St_Marys"));
        assert!(!is_valid_slug(&"a".repeat(64)));
    }

    #[tokio::test]
    async fn test_subdomain_resolution() {
        let api = Arc::new(MockIdentityApi::new());
        api.add_tenant(fixtures::tenant("t1", "stmarys"));
        let (resolver, _) = build(api.clone(), "https://stmarys.example.com/dashboard");

        let context = resolver.resolve_tenant().await.unwrap();
        assert_eq!(context.tenant_id, "t1");
        assert_eq!(context.resolved_from, ResolutionSource::Subdomain);
        assert_eq!(resolver.status(), TenantStatus::Ready);
    }

    #[tokio::test]
    async fn test_reserved_and_local_hosts_are_skipped() {
        for url in [
            "https://www.example.com/",
            "http://localhost:4200/",
            "http://127.0.0.1:8080/",
            "https://example.com/",
        ] {
            let api = Arc::new(MockIdentityApi::new());
            let (resolver, _) = build(api.clone(), url);
            assert!(resolver.resolve_tenant().await.is_none());
            assert!(api.looked_up_slugs().is_empty(), "{url} should not look up a slug");
            assert_eq!(resolver.status(), TenantStatus::NotFound);
        }
    }

    #[tokio::test]
    async fn test_path_strategies() {
        let api = Arc::new(MockIdentityApi::new());
        api.add_tenant(fixtures::tenant("t1", "stmarys"));

        let (resolver, _) = build(api.clone(), "http://localhost:4200/t/stmarys/students");
        let context = resolver.resolve_tenant().await.unwrap();
        assert_eq!(context.resolved_from, ResolutionSource::Path);

        let (resolver, _) = build(api.clone(), "http://localhost:4200/stmarys/students");
        assert!(resolver.resolve_tenant().await.is_some());

        let api = Arc::new(MockIdentityApi::new());
        let (resolver, _) = build(api.clone(), "http://localhost:4200/dashboard");
        assert!(resolver.resolve_tenant().await.is_none());
        assert!(api.looked_up_slugs().is_empty());
    }

    #[tokio::test]
    async fn test_token_claim_strategy() {
        let api = Arc::new(MockIdentityApi::new());
        api.add_tenant(fixtures::tenant("t9", "riverside"));
        let (resolver, session) = build(api.clone(), "http://localhost:4200/");

        let mut s = fixtures::session();
        s.tokens.access_token = fixtures::token(serde_json::json!({"sub": "u1", "tenantId": "t9"}));
        session.set_session(s);

        let context = resolver.resolve_tenant().await.unwrap();
        assert_eq!(context.tenant_slug, "riverside");
        assert_eq!(context.resolved_from, ResolutionSource::Token);
        assert_eq!(api.calls("get_tenant"), 1);
    }

    #[tokio::test]
    async fn test_lookup_failures_fall_through_to_not_found() {
        let api = Arc::new(MockIdentityApi::new());
        api.fail_lookups();
        let (resolver, _) = build(api.clone(), "https://stmarys.example.com/t/greenfield");

        assert!(resolver.resolve_tenant().await.is_none());
        assert_eq!(
            api.looked_up_slugs(),
            vec!["stmarys".to_string(), "greenfield".to_string()]
        );
        assert_eq!(resolver.status(), TenantStatus::NotFound);
    }

    struct BrokenLocation;

    impl LocationSource for BrokenLocation {
        fn host(&self) -> String {
            panic!("location unavailable")
        }

        fn path(&self) -> String {
            panic!("location unavailable")
        }
    }

    #[tokio::test]
    async fn test_crashed_resolution_sets_error() {
        let api = Arc::new(MockIdentityApi::new());
        let (_, session) = build(api.clone(), "https://stmarys.example.com/");
        let resolver = Arc::new(TenantResolver::new(
            api,
            session,
            Arc::new(BrokenLocation),
            TenantSettings::default(),
        ));

        assert!(resolver.resolve_tenant().await.is_none());
        assert_eq!(resolver.status(), TenantStatus::Error);
        assert!(!resolver.flight.in_flight());
    }

    #[tokio::test]
    async fn test_clear_tenant_resets_to_idle() {
        let api = Arc::new(MockIdentityApi::new());
        api.add_tenant(fixtures::tenant("t1", "stmarys"));
        let (resolver, _) = build(api.clone(), "https://stmarys.example.com/");

        resolver.resolve_tenant().await.unwrap();
        resolver.clear_tenant();
        assert_eq!(resolver.status(), TenantStatus::Idle);
        assert!(resolver.current().is_none());

        resolver.resolve_tenant().await.unwrap();
        assert_eq!(api.calls("resolve_slug"), 2);
    }

    #[test]
    fn test_url_location_moves() {
        let location = UrlLocation::parse("https://stmarys.example.com/login").unwrap();
        location.set_path("/t/riverside/fees").unwrap();
        assert_eq!(location.host(), "stmarys.example.com");
        assert_eq!(location.path(), "/t/riverside/fees");
    }
}
