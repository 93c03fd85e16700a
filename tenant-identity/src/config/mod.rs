use crate::models::auth::ChallengeChannel;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub client: ClientSettings,
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub auth: AuthFlowSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub tenant: TenantSettings,
    #[serde(default)]
    pub routes: RouteSettings,
    #[serde(default)]
    pub guards: GuardSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientSettings {
    /// Name reported in logs.
    #[serde(default = "default_client_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// `json` or `pretty`.
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// URL the client is "running at"; drives subdomain/path tenant resolution.
    #[serde(default = "default_location_url")]
    pub location_url: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            name: default_client_name(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            location_url: default_location_url(),
        }
    }
}

fn default_client_name() -> String {
    "tenant-identity".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_location_url() -> String {
    "http://localhost:4200/".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    /// Backend base URL, without trailing slash.
    #[serde(default = "default_api_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ApiSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_api_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_request_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthFlowSettings {
    /// Channels the user may pick from. The first entry is the initial channel.
    #[serde(default = "default_channels")]
    pub available_channels: Vec<ChallengeChannel>,
    /// Used when the server does not send `resendCooldown`.
    #[serde(default = "default_resend_cooldown_secs")]
    pub default_resend_cooldown_secs: u32,
    #[serde(default = "default_true")]
    pub mfa_enabled: bool,
    /// Provider offered when the server asks for MFA without listing any.
    #[serde(default = "default_mfa_provider")]
    pub default_mfa_provider: String,
    /// Redirect target used when neither the caller nor the server supplies one.
    #[serde(default = "default_landing")]
    pub default_redirect: String,
    /// Delay between the post-login redirect and the flow resetting itself.
    #[serde(default = "default_reset_delay_ms")]
    pub reset_delay_ms: u64,
}

impl Default for AuthFlowSettings {
    fn default() -> Self {
        Self {
            available_channels: default_channels(),
            default_resend_cooldown_secs: default_resend_cooldown_secs(),
            mfa_enabled: true,
            default_mfa_provider: default_mfa_provider(),
            default_redirect: default_landing(),
            reset_delay_ms: default_reset_delay_ms(),
        }
    }
}

impl AuthFlowSettings {
    pub fn initial_channel(&self) -> ChallengeChannel {
        self.available_channels
            .first()
            .copied()
            .unwrap_or(ChallengeChannel::EmailOtp)
    }
}

fn default_channels() -> Vec<ChallengeChannel> {
    vec![ChallengeChannel::EmailOtp, ChallengeChannel::SmsOtp]
}

fn default_resend_cooldown_secs() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

fn default_mfa_provider() -> String {
    "totp".to_string()
}

fn default_reset_delay_ms() -> u64 {
    250
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionSettings {
    /// File backing durable client storage.
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
    /// Tokens are treated as expired this many seconds early.
    #[serde(default = "default_skew_secs")]
    pub expiry_skew_secs: i64,
    /// TTL assumed when a legacy login response carries no decodable `exp`.
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: i64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            expiry_skew_secs: default_skew_secs(),
            default_ttl_secs: default_ttl_secs(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from(".tenant-identity/storage.json")
}

fn default_skew_secs() -> i64 {
    60
}

fn default_ttl_secs() -> i64 {
    600
}

#[derive(Debug, Deserialize, Clone)]
pub struct TenantSettings {
    /// Subdomain labels that never name a tenant.
    #[serde(default = "default_reserved_subdomains")]
    pub reserved_subdomains: Vec<String>,
    /// First path segments that belong to the application, not to a tenant.
    #[serde(default = "default_reserved_routes")]
    pub reserved_routes: Vec<String>,
}

impl Default for TenantSettings {
    fn default() -> Self {
        Self {
            reserved_subdomains: default_reserved_subdomains(),
            reserved_routes: default_reserved_routes(),
        }
    }
}

fn default_reserved_subdomains() -> Vec<String> {
    ["www", "api", "app", "admin", "auth", "static", "cdn", "mail"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_reserved_routes() -> Vec<String> {
    [
        "t",
        "login",
        "logout",
        "auth",
        "host",
        "tenant-select",
        "no-access",
        "access-denied",
        "onboarding",
        "dashboard",
        "settings",
        "profile",
        "assets",
        "api",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RouteSettings {
    #[serde(default = "default_login")]
    pub login: String,
    #[serde(default = "default_host_landing")]
    pub host_landing: String,
    #[serde(default = "default_tenant_select")]
    pub tenant_select: String,
    #[serde(default = "default_no_access")]
    pub no_access: String,
    #[serde(default = "default_access_denied")]
    pub access_denied: String,
    #[serde(default = "default_onboarding")]
    pub onboarding: String,
    #[serde(default = "default_landing")]
    pub default_landing: String,
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self {
            login: default_login(),
            host_landing: default_host_landing(),
            tenant_select: default_tenant_select(),
            no_access: default_no_access(),
            access_denied: default_access_denied(),
            onboarding: default_onboarding(),
            default_landing: default_landing(),
        }
    }
}

fn default_login() -> String {
    "/login".to_string()
}

fn default_host_landing() -> String {
    "/host/dashboard".to_string()
}

fn default_tenant_select() -> String {
    "/tenant-select".to_string()
}

fn default_no_access() -> String {
    "/no-access".to_string()
}

fn default_access_denied() -> String {
    "/access-denied".to_string()
}

fn default_onboarding() -> String {
    "/onboarding/edition".to_string()
}

fn default_landing() -> String {
    "/dashboard".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GuardSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    /// Role that bypasses every permission check.
    #[serde(default = "default_super_role")]
    pub super_role: String,
}

impl Default for GuardSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            poll_timeout_ms: default_poll_timeout_ms(),
            super_role: default_super_role(),
        }
    }
}

impl GuardSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_poll_timeout_ms() -> u64 {
    5_000
}

fn default_super_role() -> String {
    "super_admin".to_string()
}

/// Load settings from `config/identity.yaml` (optional) and `APP_*` variables.
pub fn get_configuration() -> Result<Settings, service_core::error::CoreError> {
    let config_file = std::env::var("APP_CONFIG_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config/identity.yaml"));

    service_core::config::load_settings(Some(&config_file))
}
