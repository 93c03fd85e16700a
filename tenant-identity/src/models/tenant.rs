use serde::{Deserialize, Serialize};

/// Which resolution strategy produced a tenant context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Subdomain,
    Path,
    Token,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TenantBranding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Tenant as returned by `/platform/tenants/resolve` and `/tenants/:id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantRecord {
    pub tenant_id: String,
    pub tenant_slug: String,
    pub tenant_name: String,
    #[serde(default)]
    pub branding: Option<TenantBranding>,
}

/// The tenant the client is currently operating in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantContext {
    pub tenant_id: String,
    pub tenant_slug: String,
    pub tenant_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branding: Option<TenantBranding>,
    pub resolved_from: ResolutionSource,
}

impl TenantContext {
    pub fn from_record(record: TenantRecord, resolved_from: ResolutionSource) -> Self {
        Self {
            tenant_id: record.tenant_id,
            tenant_slug: record.tenant_slug,
            tenant_name: record.tenant_name,
            branding: record.branding,
            resolved_from,
        }
    }
}

/// Lifecycle of the tenant resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantStatus {
    Idle,
    Resolving,
    Ready,
    NotFound,
    Error,
}

/// Persisted "last tenant" preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantPreference {
    pub tenant_id: String,
    pub slug: String,
}

/// Persisted per-tenant "last school" preference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolPreference {
    pub school_id: String,
}

/// Body of `POST /platform/tenants/resolve`.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveTenantRequest<'a> {
    pub slug: &'a str,
}

/// Status of the tenant bootstrap coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStatus {
    Idle,
    Switching,
    Ready,
    Error,
}
