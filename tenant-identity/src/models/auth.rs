use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::session::{SessionScope, SessionUser, TenantMembership};

/// Delivery channel for a passwordless challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeChannel {
    EmailOtp,
    SmsOtp,
    WhatsappOtp,
    MagicLink,
}

impl fmt::Display for ChallengeChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChallengeChannel::EmailOtp => "email_otp",
            ChallengeChannel::SmsOtp => "sms_otp",
            ChallengeChannel::WhatsappOtp => "whatsapp_otp",
            ChallengeChannel::MagicLink => "magic_link",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Request DTOs
// ============================================================================

/// Body of `POST /auth/passwordless/challenge`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeRequest {
    pub identifier: String,
    pub channel: ChallengeChannel,
}

/// Body of `POST /auth/passwordless/resend`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendRequest {
    pub identifier: String,
    pub channel: ChallengeChannel,
    pub challenge_id: String,
}

/// Body of `POST /auth/passwordless/verify`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub identifier: String,
    pub channel: ChallengeChannel,
    pub challenge_id: String,
    pub code: String,
}

/// Body of `POST /auth/mfa/verify`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MfaVerifyRequest {
    pub identifier: String,
    pub challenge_id: String,
    pub provider: String,
    pub code: String,
}

/// Body of `POST /auth/refresh`.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

impl fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshRequest")
            .field("refresh_token", &"[redacted]")
            .finish()
    }
}

/// Body of `POST /auth/login`.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .finish()
    }
}

// ============================================================================
// Response DTOs
// ============================================================================

/// Response of challenge and resend.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    pub challenge_id: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resend_cooldown: Option<u32>,
    #[serde(default)]
    pub attempt_count: Option<u32>,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of OTP and MFA verification.
///
/// `session` is kept as raw JSON so both the canonical and the legacy login
/// shapes can be normalized by the session manager.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    #[serde(default)]
    pub session: Option<serde_json::Value>,
    #[serde(default)]
    pub mfa_required: Option<bool>,
    #[serde(default)]
    pub mfa_providers: Option<Vec<String>>,
    #[serde(default)]
    pub lockout_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub redirect_url: Option<String>,
}

/// Response of `POST /auth/refresh`.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl fmt::Debug for RefreshResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshResponse")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Session-shaped login response. `expiresAt` may be missing on older servers.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalLogin {
    pub user: SessionUser,
    #[serde(default)]
    pub memberships: Vec<TenantMembership>,
    #[serde(default)]
    pub active_tenant_id: Option<String>,
    pub tokens: CanonicalTokens,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scope: SessionScope,
}

/// User object of the legacy flat response, which used snake_case keys.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyUser {
    #[serde(alias = "_id", alias = "user_id")]
    pub id: String,
    pub email: String,
    #[serde(default, alias = "displayName", alias = "name")]
    pub display_name: Option<String>,
    #[serde(default, alias = "avatarUrl")]
    pub avatar_url: Option<String>,
}

/// Older flat `{access_token, user}` login response.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyLogin {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    pub user: LegacyUser,
    #[serde(default, alias = "tenants")]
    pub memberships: Vec<TenantMembership>,
    #[serde(default)]
    pub is_host: bool,
}

/// Any accepted login response shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LoginResponse {
    Canonical(CanonicalLogin),
    Legacy(LegacyLogin),
}

/// Error body returned by the backend on non-2xx responses.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default, alias = "error_code")]
    pub code: Option<String>,
    #[serde(default, alias = "error")]
    pub message: Option<String>,
    #[serde(default)]
    pub retryable: Option<bool>,
    #[serde(default, alias = "lockout_until")]
    pub lockout_until: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_wire_names() {
        let json = serde_json::to_string(&ChallengeChannel::EmailOtp).unwrap();
        assert_eq!(json, "\"email_otp\"");
        assert_eq!(ChallengeChannel::SmsOtp.to_string(), "sms_otp");
    }

    #[test]
    fn test_challenge_request_is_camel_case() {
        let body = serde_json::to_value(ResendRequest {
            identifier: "user@example.com".to_string(),
            channel: ChallengeChannel::EmailOtp,
            challenge_id: "c1".to_string(),
        })
        .unwrap();
        assert_eq!(body["challengeId"], "c1");
        assert_eq!(body["channel"], "email_otp");
    }

    #[test]
    fn test_login_response_shapes() {
        let canonical = serde_json::json!({
            "user": {"id": "u1", "email": "a@b.com"},
            "tokens": {"accessToken": "t"},
            "expiresAt": "2030-01-01T00:00:00Z"
        });
        assert!(matches!(
            serde_json::from_value::<LoginResponse>(canonical).unwrap(),
            LoginResponse::Canonical(_)
        ));

        let legacy = serde_json::json!({
            "access_token": "t",
            "user": {"id": "u1", "email": "a@b.com"}
        });
        assert!(matches!(
            serde_json::from_value::<LoginResponse>(legacy).unwrap(),
            LoginResponse::Legacy(_)
        ));
    }

    #[test]
    fn test_error_body_aliases() {
        let body: ErrorBody = serde_json::from_value(serde_json::json!({
            "error_code": "INVALID_OTP",
            "error": "Wrong code"
        }))
        .unwrap();
        assert_eq!(body.code.as_deref(), Some("INVALID_OTP"));
        assert_eq!(body.message.as_deref(), Some("Wrong code"));
    }
}
