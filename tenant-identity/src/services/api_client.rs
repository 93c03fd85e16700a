use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use service_core::observability::TracedClientExt;

use crate::config::ApiSettings;
use crate::error::IdentityError;
use crate::models::auth::{
    ChallengeRequest, ChallengeResponse, ErrorBody, LoginRequest, MfaVerifyRequest,
    RefreshRequest, RefreshResponse, ResendRequest, VerifyOtpRequest, VerifyResponse,
};
use crate::models::tenant::{ResolveTenantRequest, TenantRecord};
use crate::models::{Entitlements, RolePermissions};

pub const TENANT_ID_HEADER: &str = "X-Tenant-Id";
pub const TENANT_SLUG_HEADER: &str = "X-Tenant-Slug";
pub const SCHOOL_ID_HEADER: &str = "X-School-Id";
pub const TENANT_CONTEXT_HEADER: &str = "X-Tenant-Context";

/// Everything a tenant-scoped request needs: who is asking and for which
/// tenant/school.
#[derive(Clone, PartialEq, Eq)]
pub struct TenantScope {
    pub tenant_id: String,
    pub tenant_slug: String,
    pub school_id: Option<String>,
    pub access_token: Option<String>,
}

impl std::fmt::Debug for TenantScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantScope")
            .field("tenant_id", &self.tenant_id)
            .field("tenant_slug", &self.tenant_slug)
            .field("school_id", &self.school_id)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TenantContextHeader<'a> {
    tenant_id: &'a str,
    tenant_slug: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    school_id: Option<&'a str>,
}

impl TenantScope {
    /// Outbound tenant headers. Values that are not valid header text are skipped.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        insert_header(&mut headers, TENANT_ID_HEADER, &self.tenant_id);
        insert_header(&mut headers, TENANT_SLUG_HEADER, &self.tenant_slug);
        if let Some(school_id) = self.school_id.as_deref() {
            insert_header(&mut headers, SCHOOL_ID_HEADER, school_id);
        }

        let context = TenantContextHeader {
            tenant_id: &self.tenant_id,
            tenant_slug: &self.tenant_slug,
            school_id: self.school_id.as_deref(),
        };
        if let Ok(json) = serde_json::to_string(&context) {
            insert_header(&mut headers, TENANT_CONTEXT_HEADER, &json);
        }
        headers
    }
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::warn!(header = name, "Skipping invalid header value"),
    }
}

/// The backend as seen by the identity core.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    async fn request_challenge(
        &self,
        req: &ChallengeRequest,
    ) -> Result<ChallengeResponse, IdentityError>;

    async fn resend_challenge(&self, req: &ResendRequest)
        -> Result<ChallengeResponse, IdentityError>;

    async fn verify_otp(&self, req: &VerifyOtpRequest) -> Result<VerifyResponse, IdentityError>;

    async fn verify_mfa(&self, req: &MfaVerifyRequest) -> Result<VerifyResponse, IdentityError>;

    async fn refresh(&self, req: &RefreshRequest) -> Result<RefreshResponse, IdentityError>;

    /// Raw JSON: canonical or legacy shape, normalized by the session manager.
    async fn login(&self, req: &LoginRequest) -> Result<serde_json::Value, IdentityError>;

    async fn logout(&self, access_token: Option<&str>) -> Result<(), IdentityError>;

    /// `Ok(None)` when no tenant has that slug.
    async fn resolve_tenant_slug(&self, slug: &str) -> Result<Option<TenantRecord>, IdentityError>;

    /// `Ok(None)` when no tenant has that id.
    async fn get_tenant(
        &self,
        tenant_id: &str,
        access_token: Option<&str>,
    ) -> Result<Option<TenantRecord>, IdentityError>;

    async fn load_permissions(&self, scope: &TenantScope)
        -> Result<RolePermissions, IdentityError>;

    async fn load_entitlements(&self, scope: &TenantScope) -> Result<Entitlements, IdentityError>;
}

/// reqwest-backed [`IdentityApi`].
pub struct HttpIdentityApi {
    client: Client,
    settings: ApiSettings,
}

impl HttpIdentityApi {
    pub fn new(settings: ApiSettings) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;
        Ok(Self { client, settings })
    }

    pub fn base_url(&self) -> &str {
        &self.settings.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, IdentityError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let response = self
            .client
            .traced_post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send POST request to {}: {}", url, e);
                IdentityError::Transport(e)
            })?;

        decode(response).await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        access_token: Option<&str>,
        headers: HeaderMap,
    ) -> Result<T, IdentityError> {
        let url = self.url(path);
        let mut request = self.client.traced_get(&url).headers(headers);
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("Failed to send GET request to {}: {}", url, e);
            IdentityError::Transport(e)
        })?;

        decode(response).await
    }
}

/// Turn a response into `T` or a structured [`IdentityError::Http`].
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, IdentityError> {
    let status = response.status();
    if status.is_success() {
        let bytes = response.bytes().await?;
        return Ok(serde_json::from_slice(&bytes)?);
    }

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    // Error bodies are best effort; a non-JSON body still yields the status.
    let body = response
        .json::<ErrorBody>()
        .await
        .unwrap_or_default();

    tracing::debug!(status = %status, code = ?body.code, "Backend returned an error");
    Err(IdentityError::Http {
        status,
        body,
        retry_after,
    })
}

fn none_if_not_found<T>(result: Result<T, IdentityError>) -> Result<Option<T>, IdentityError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => Ok(None),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl IdentityApi for HttpIdentityApi {
    async fn request_challenge(
        &self,
        req: &ChallengeRequest,
    ) -> Result<ChallengeResponse, IdentityError> {
        self.post_json("/auth/passwordless/challenge", req).await
    }

    async fn resend_challenge(
        &self,
        req: &ResendRequest,
    ) -> Result<ChallengeResponse, IdentityError> {
        self.post_json("/auth/passwordless/resend", req).await
    }

    async fn verify_otp(&self, req: &VerifyOtpRequest) -> Result<VerifyResponse, IdentityError> {
        self.post_json("/auth/passwordless/verify", req).await
    }

    async fn verify_mfa(&self, req: &MfaVerifyRequest) -> Result<VerifyResponse, IdentityError> {
        self.post_json("/auth/mfa/verify", req).await
    }

    async fn refresh(&self, req: &RefreshRequest) -> Result<RefreshResponse, IdentityError> {
        self.post_json("/auth/refresh", req).await
    }

    async fn login(&self, req: &LoginRequest) -> Result<serde_json::Value, IdentityError> {
        self.post_json("/auth/login", req).await
    }

    async fn logout(&self, access_token: Option<&str>) -> Result<(), IdentityError> {
        let url = self.url("/auth/logout");
        let mut request = self.client.traced_post(&url);
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(IdentityError::Http {
                status: response.status(),
                body: ErrorBody::default(),
                retry_after: None,
            });
        }
        Ok(())
    }

    async fn resolve_tenant_slug(&self, slug: &str) -> Result<Option<TenantRecord>, IdentityError> {
        none_if_not_found(
            self.post_json("/platform/tenants/resolve", &ResolveTenantRequest { slug })
                .await,
        )
    }

    async fn get_tenant(
        &self,
        tenant_id: &str,
        access_token: Option<&str>,
    ) -> Result<Option<TenantRecord>, IdentityError> {
        let path = format!("/tenants/{}", urlencoding::encode(tenant_id));
        none_if_not_found(self.get_json(&path, access_token, HeaderMap::new()).await)
    }

    async fn load_permissions(
        &self,
        scope: &TenantScope,
    ) -> Result<RolePermissions, IdentityError> {
        let path = format!("/tenants/{}/permissions", urlencoding::encode(&scope.tenant_id));
        self.get_json(&path, scope.access_token.as_deref(), scope.headers())
            .await
    }

    async fn load_entitlements(&self, scope: &TenantScope) -> Result<Entitlements, IdentityError> {
        let path = format!("/tenants/{}/entitlements", urlencoding::encode(&scope.tenant_id));
        self.get_json(&path, scope.access_token.as_deref(), scope.headers())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> TenantScope {
        TenantScope {
            tenant_id: "t1".to_string(),
            tenant_slug: "stmarys".to_string(),
            school_id: Some("s9".to_string()),
            access_token: Some("secret".to_string()),
        }
    }

    #[test]
    fn test_tenant_headers() {
        let headers = scope().headers();
        assert_eq!(headers.get(TENANT_ID_HEADER).unwrap(), "t1");
        assert_eq!(headers.get(TENANT_SLUG_HEADER).unwrap(), "stmarys");
        assert_eq!(headers.get(SCHOOL_ID_HEADER).unwrap(), "s9");

        let context: serde_json::Value =
            serde_json::from_str(headers.get(TENANT_CONTEXT_HEADER).unwrap().to_str().unwrap())
                .unwrap();
        assert_eq!(context["tenantId"], "t1");
        assert_eq!(context["schoolId"], "s9");
    }

    #[test]
    fn test_school_header_omitted_without_school() {
        let mut scope = scope();
        scope.school_id = None;
        let headers = scope.headers();
        assert!(headers.get(SCHOOL_ID_HEADER).is_none());
        assert!(!headers
            .get(TENANT_CONTEXT_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .contains("schoolId"));
    }

    #[test]
    fn test_scope_debug_hides_token() {
        assert!(!format!("{:?}", scope()).contains("secret"));
    }

    #[test]
    fn test_url_joins_base() {
        let api = HttpIdentityApi::new(ApiSettings {
            base_url: "http://backend/api/".to_string(),
            request_timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(api.url("/auth/refresh"), "http://backend/api/auth/refresh");
    }
}
