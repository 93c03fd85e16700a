use std::sync::{Arc, RwLock};
use tokio::sync::watch;

use crate::error::IdentityError;
use crate::models::tenant::{SchoolPreference, TenantPreference};
use crate::models::TenantMembership;
use crate::services::api_client::TenantScope;
use crate::storage::{last_school_key, KeyValueStore, LAST_TENANT_KEY};
use crate::utils::{StateCell, Transition};

/// The tenant (and school) the user is working in, whichever way it was
/// picked. Mirrors the selection into durable preferences.
pub struct TenantContextStore {
    store: Arc<dyn KeyValueStore>,
    active: StateCell<Option<TenantMembership>>,
    school: RwLock<Option<String>>,
}

impl TenantContextStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            active: StateCell::new(None),
            school: RwLock::new(None),
        }
    }

    pub fn activate(&self, membership: TenantMembership) -> Result<(), IdentityError> {
        if membership.tenant_id.trim().is_empty() {
            return Err(IdentityError::InvalidState(
                "Cannot activate a membership without tenant id".to_string(),
            ));
        }

        let preference = TenantPreference {
            tenant_id: membership.tenant_id.clone(),
            slug: membership.tenant_slug.clone(),
        };
        self.write_json(LAST_TENANT_KEY, &preference);

        let school = self.stored_school(&membership.tenant_id);
        *self.school.write().unwrap_or_else(|e| e.into_inner()) = school;

        tracing::info!(tenant_id = %membership.tenant_id, slug = %membership.tenant_slug, "Tenant activated");
        self.active.set(Some(membership));
        Ok(())
    }

    /// Re-activate the last used tenant if the user still belongs to it.
    pub fn restore_from_memberships(
        &self,
        memberships: &[TenantMembership],
    ) -> Option<TenantMembership> {
        let preference = self.stored_tenant()?;

        let Some(membership) = memberships
            .iter()
            .find(|m| m.tenant_id == preference.tenant_id)
        else {
            tracing::info!(tenant_id = %preference.tenant_id, "Stored tenant no longer available, forgetting it");
            self.remove(LAST_TENANT_KEY);
            return None;
        };

        match self.activate(membership.clone()) {
            Ok(()) => Some(membership.clone()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to restore stored tenant");
                None
            }
        }
    }

    /// Drop the in-memory selection. Preferences stay for the next login.
    pub fn clear(&self) {
        self.active.set(None);
        *self.school.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn select_school(&self, school_id: &str) -> Result<(), IdentityError> {
        let tenant_id = self.active_tenant_id().ok_or_else(|| {
            IdentityError::InvalidState("Cannot select a school without an active tenant".to_string())
        })?;

        self.write_json(
            &last_school_key(&tenant_id),
            &SchoolPreference {
                school_id: school_id.to_string(),
            },
        );
        *self.school.write().unwrap_or_else(|e| e.into_inner()) = Some(school_id.to_string());
        Ok(())
    }

    pub fn active(&self) -> Option<TenantMembership> {
        self.active.get()
    }

    pub fn active_tenant_id(&self) -> Option<String> {
        self.active.get().map(|m| m.tenant_id)
    }

    pub fn active_school(&self) -> Option<String> {
        self.school
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Scope for a tenant-scoped request; unavailable without an active tenant.
    pub fn scope(&self, access_token: Option<String>) -> Result<TenantScope, IdentityError> {
        let membership = self.active().ok_or(IdentityError::ServiceUnavailable)?;
        Ok(TenantScope {
            tenant_id: membership.tenant_id,
            tenant_slug: membership.tenant_slug,
            school_id: self.active_school(),
            access_token,
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<Transition<Option<TenantMembership>>> {
        self.active.subscribe()
    }

    fn stored_tenant(&self) -> Option<TenantPreference> {
        self.read_json(LAST_TENANT_KEY)
    }

    fn stored_school(&self, tenant_id: &str) -> Option<String> {
        self.read_json::<SchoolPreference>(&last_school_key(tenant_id))
            .map(|p| p.school_id)
    }

    // Preferences are advisory: unreadable entries are dropped, write errors logged.
    fn read_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read preference");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding unreadable preference");
                self.remove(key);
                None
            }
        }
    }

    fn write_json<T: serde::Serialize>(&self, key: &str, value: &T) {
        let result = serde_json::to_string(value)
            .map_err(anyhow::Error::from)
            .and_then(|raw| self.store.set(key, &raw));
        if let Err(e) = result {
            tracing::warn!(key, error = %e, "Failed to persist preference");
        }
    }

    fn remove(&self, key: &str) {
        if let Err(e) = self.store.remove(key) {
            tracing::warn!(key, error = %e, "Failed to remove preference");
        }
    }
}
