//! Session lifecycle: bootstrap from storage, single-flight refresh,
//! login normalization and logout.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, RwLock};
use tokio::sync::watch;

use crate::config::SessionSettings;
use crate::error::IdentityError;
use crate::models::auth::{CanonicalLogin, LegacyLogin, LoginRequest, LoginResponse, RefreshRequest};
use crate::models::{Session, SessionScope, SessionStatus, SessionTokens, SessionUser};
use crate::routing::Navigator;
use crate::services::api_client::IdentityApi;
use crate::services::session_storage::SessionStorage;
use crate::utils::jwt::decode_token_hints;
use crate::utils::{SingleFlight, StateCell, Transition};

pub struct SessionManager {
    api: Arc<dyn IdentityApi>,
    storage: SessionStorage,
    navigator: Arc<dyn Navigator>,
    settings: SessionSettings,
    login_route: String,
    status: StateCell<SessionStatus>,
    session: RwLock<Option<Session>>,
    refresh_flight: SingleFlight<bool>,
}

impl SessionManager {
    pub fn new(
        api: Arc<dyn IdentityApi>,
        storage: SessionStorage,
        navigator: Arc<dyn Navigator>,
        settings: SessionSettings,
        login_route: impl Into<String>,
    ) -> Self {
        Self {
            api,
            storage,
            navigator,
            settings,
            login_route: login_route.into(),
            status: StateCell::new(SessionStatus::Unresolved),
            session: RwLock::new(None),
            refresh_flight: SingleFlight::new("refresh"),
        }
    }

    fn skew(&self) -> Duration {
        Duration::seconds(self.settings.expiry_skew_secs)
    }

    /// Restore the session persisted by a previous run.
    pub async fn init(self: &Arc<Self>) -> SessionStatus {
        self.status.set(SessionStatus::Unresolved);

        let Some(stored) = self.storage.read() else {
            tracing::debug!("No stored session");
            self.status.set(SessionStatus::Anonymous);
            return SessionStatus::Anonymous;
        };

        if !stored.is_expired_at(Utc::now(), self.skew()) {
            tracing::info!(user_id = %stored.user.id, "Restored session");
            self.replace(Some(stored));
            self.status.set(SessionStatus::Authenticated);
            return SessionStatus::Authenticated;
        }

        if stored.is_refreshable() {
            tracing::info!(user_id = %stored.user.id, "Stored session expired, refreshing");
            self.replace(Some(stored));
            self.refresh().await;
            return self.status();
        }

        tracing::info!(user_id = %stored.user.id, "Stored session expired and cannot be refreshed");
        self.clear_session();
        SessionStatus::Anonymous
    }

    /// Refresh the access token. Concurrent callers share one request and
    /// one outcome.
    pub async fn refresh(self: &Arc<Self>) -> bool {
        let this = Arc::clone(self);
        self.refresh_flight
            .run(move || async move { this.refresh_once().await })
            .await
    }

    async fn refresh_once(&self) -> bool {
        let Some(refresh_token) = self
            .current()
            .and_then(|s| s.tokens.refresh_token)
            .filter(|t| !t.is_empty())
        else {
            tracing::info!("No refresh token, clearing session");
            self.clear_session();
            return false;
        };

        match self.api.refresh(&RefreshRequest { refresh_token }).await {
            Ok(response) => {
                let refreshed = {
                    let mut guard = self.session.write().unwrap_or_else(|e| e.into_inner());
                    match guard.as_mut() {
                        Some(session) => {
                            session.apply_refresh(
                                response.access_token,
                                response.refresh_token,
                                response.expires_at,
                                Utc::now(),
                            );
                            Some(session.clone())
                        }
                        None => None,
                    }
                };

                match refreshed {
                    Some(session) => {
                        self.storage.write(&session);
                        self.status.set(SessionStatus::Authenticated);
                        tracing::info!(expires_at = %session.expires_at, "Session refreshed");
                        true
                    }
                    None => {
                        tracing::debug!("Session cleared while refresh was in flight");
                        false
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed, clearing session");
                self.clear_session();
                false
            }
        }
    }

    pub fn set_session(&self, session: Session) {
        tracing::info!(user_id = %session.user.id, memberships = session.memberships.len(), "Session established");
        self.storage.write(&session);
        self.replace(Some(session));
        self.status.set(SessionStatus::Authenticated);
    }

    pub fn clear_session(&self) {
        self.replace(None);
        self.storage.clear();
        self.status.set(SessionStatus::Anonymous);
    }

    pub fn login_route(&self) -> &str {
        &self.login_route
    }

    /// Tell the backend (best effort), drop the session and go to login.
    pub async fn logout(&self, reason: Option<&str>) {
        let token = self.access_token();
        if let Err(e) = self.api.logout(token.as_deref()).await {
            tracing::warn!(error = %e, "Logout notification failed");
        }
        self.clear_session();

        let destination = match reason.filter(|r| !r.is_empty()) {
            Some(reason) => format!("{}?reason={}", self.login_route, urlencoding::encode(reason)),
            None => self.login_route.clone(),
        };
        self.navigator.navigate(&destination);
    }

    /// Password login. Both response shapes are accepted.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, IdentityError> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let raw = self.api.login(&request).await?;
        self.establish(raw)
    }

    /// Normalize a session payload from a login or verify response and adopt it.
    pub fn establish(&self, raw: serde_json::Value) -> Result<Session, IdentityError> {
        let session = self.normalize_login_response(raw, Utc::now())?;
        self.set_session(session.clone());
        Ok(session)
    }

    pub fn normalize_login_response(
        &self,
        raw: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Result<Session, IdentityError> {
        let ttl = Duration::seconds(self.settings.default_ttl_secs);
        match serde_json::from_value::<LoginResponse>(raw)? {
            LoginResponse::Canonical(login) => Ok(from_canonical(login, now, ttl)),
            LoginResponse::Legacy(login) => Ok(from_legacy(login, now, ttl)),
        }
    }

    /// Access token, refreshed first when it is inside the expiry skew.
    pub async fn authorized_token(self: &Arc<Self>) -> Option<String> {
        let session = self.current()?;
        if session.is_expired_at(Utc::now(), self.skew()) {
            if !session.is_refreshable() || !self.refresh().await {
                return None;
            }
        }
        self.access_token()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read_guard()
            .as_ref()
            .map(|s| s.tokens.access_token.clone())
    }

    pub fn current(&self) -> Option<Session> {
        self.read_guard().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.status() == SessionStatus::Authenticated
    }

    pub fn is_host_session(&self) -> bool {
        self.read_guard().as_ref().is_some_and(Session::is_host)
    }

    pub fn status(&self) -> SessionStatus {
        self.status.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<Transition<SessionStatus>> {
        self.status.subscribe()
    }

    fn read_guard(&self) -> std::sync::RwLockReadGuard<'_, Option<Session>> {
        self.session.read().unwrap_or_else(|e| e.into_inner())
    }

    fn replace(&self, session: Option<Session>) {
        *self.session.write().unwrap_or_else(|e| e.into_inner()) = session;
    }
}

/// `exp`/`iat` from the token when the payload omits them, else `now + ttl`.
fn token_times(
    access_token: &str,
    now: DateTime<Utc>,
    ttl: Duration,
) -> (DateTime<Utc>, Option<DateTime<Utc>>) {
    match decode_token_hints(access_token) {
        Ok(hints) => (
            hints.expires_at().unwrap_or(now + ttl),
            hints.issued_at().or(Some(now)),
        ),
        Err(e) => {
            tracing::debug!(error = %e, "Access token is not a readable JWT, assuming default TTL");
            (now + ttl, Some(now))
        }
    }
}

fn from_canonical(login: CanonicalLogin, now: DateTime<Utc>, ttl: Duration) -> Session {
    let (expires_at, issued_at) = match login.expires_at {
        Some(expires_at) => (expires_at, login.issued_at),
        None => {
            let (exp, iat) = token_times(&login.tokens.access_token, now, ttl);
            (exp, login.issued_at.or(iat))
        }
    };

    Session {
        user: login.user,
        memberships: login.memberships,
        active_tenant_id: login.active_tenant_id,
        tokens: SessionTokens {
            access_token: login.tokens.access_token,
            refresh_token: login.tokens.refresh_token,
            token_type: login
                .tokens
                .token_type
                .unwrap_or_else(crate::models::session::default_token_type),
        },
        expires_at,
        issued_at,
        scope: login.scope,
    }
}

fn from_legacy(login: LegacyLogin, now: DateTime<Utc>, ttl: Duration) -> Session {
    let (expires_at, issued_at) = token_times(&login.access_token, now, ttl);

    Session {
        user: SessionUser {
            id: login.user.id,
            email: login.user.email,
            display_name: login.user.display_name,
            avatar_url: login.user.avatar_url,
        },
        memberships: login.memberships,
        active_tenant_id: None,
        tokens: SessionTokens {
            access_token: login.access_token,
            refresh_token: login.refresh_token,
            token_type: login
                .token_type
                .unwrap_or_else(crate::models::session::default_token_type),
        },
        expires_at,
        issued_at,
        scope: if login.is_host {
            SessionScope::Host
        } else {
            SessionScope::Tenant
        },
    }
}
