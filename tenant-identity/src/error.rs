//! Error taxonomy for the identity core.
//!
//! Transport and backend failures surface as [`IdentityError`]. Before any of
//! them reaches flow state they are translated exactly once into an
//! [`ApiError`] descriptor by [`ApiError::from_error`].

use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use thiserror::Error;

use crate::models::auth::ErrorBody;

const GENERIC_CONNECTIVITY: &str =
    "We couldn't reach the server. Check your connection and try again.";
const GENERIC_SERVER: &str = "Something went wrong on our side. Please try again.";
const GENERIC_UNKNOWN: &str = "Something went wrong. Please try again.";

#[derive(Debug, Error)]
pub enum IdentityError {
    /// Connect, timeout and other transport failures.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response with whatever error body the backend sent.
    #[error("Backend returned {status}")]
    Http {
        status: StatusCode,
        body: ErrorBody,
        retry_after: Option<u64>,
    },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Synthesized when a tenant-scoped request has no resolvable tenant.
    #[error("Service unavailable: no active tenant")]
    ServiceUnavailable,

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<serde_json::Error> for IdentityError {
    fn from(err: serde_json::Error) -> Self {
        IdentityError::Decode(err.to_string())
    }
}

impl IdentityError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            IdentityError::Http { status, .. } => Some(*status),
            IdentityError::Transport(e) => e.status(),
            IdentityError::ServiceUnavailable => Some(StatusCode::SERVICE_UNAVAILABLE),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

/// Normalized error codes the flow controller reasons about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidIdentifier,
    InvalidOtp,
    ExpiredOtp,
    TooManyAttempts,
    LockedOut,
    RateLimited,
    Network,
    Server,
    ServiceUnavailable,
    Unknown,
    /// A backend code this client does not know; handled like `Unknown`.
    Other(String),
}

impl ErrorCode {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "INVALID_IDENTIFIER" => ErrorCode::InvalidIdentifier,
            "INVALID_OTP" | "INVALID_CODE" => ErrorCode::InvalidOtp,
            "EXPIRED_OTP" | "EXPIRED_CODE" => ErrorCode::ExpiredOtp,
            "TOO_MANY_ATTEMPTS" => ErrorCode::TooManyAttempts,
            "LOCKED_OUT" => ErrorCode::LockedOut,
            "RATE_LIMITED" => ErrorCode::RateLimited,
            "NETWORK_ERROR" => ErrorCode::Network,
            "SERVER_ERROR" => ErrorCode::Server,
            "SERVICE_UNAVAILABLE" => ErrorCode::ServiceUnavailable,
            "UNKNOWN" => ErrorCode::Unknown,
            other => ErrorCode::Other(other.to_string()),
        }
    }

    /// Retry policy when the backend does not say.
    pub fn default_retryable(&self) -> bool {
        !matches!(
            self,
            ErrorCode::TooManyAttempts | ErrorCode::LockedOut | ErrorCode::RateLimited
        )
    }

    /// Wrong or stale code for the current challenge.
    pub fn is_otp_rejection(&self) -> bool {
        matches!(self, ErrorCode::InvalidOtp | ErrorCode::ExpiredOtp)
    }

    fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidIdentifier => "That email or phone number doesn't look right.",
            ErrorCode::InvalidOtp => "That code is incorrect. Please try again.",
            ErrorCode::ExpiredOtp => "That code has expired. Request a new one.",
            ErrorCode::TooManyAttempts => "Too many attempts. Please try again later.",
            ErrorCode::LockedOut => "Your account is temporarily locked.",
            ErrorCode::RateLimited => "Too many requests. Please slow down.",
            ErrorCode::Network => GENERIC_CONNECTIVITY,
            ErrorCode::Server | ErrorCode::ServiceUnavailable => GENERIC_SERVER,
            ErrorCode::Unknown | ErrorCode::Other(_) => GENERIC_UNKNOWN,
        }
    }
}

/// Normalized error descriptor applied to flow state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    pub retryable: bool,
    pub lockout_until: Option<DateTime<Utc>>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        let retryable = code.default_retryable();
        Self {
            code,
            message: message.into(),
            retryable,
            lockout_until: None,
        }
    }

    /// Terminal "unknown" outcome used when a verify response carries
    /// neither a session nor an MFA request.
    pub fn unknown() -> Self {
        Self {
            code: ErrorCode::Unknown,
            message: GENERIC_UNKNOWN.to_string(),
            retryable: false,
            lockout_until: None,
        }
    }

    pub fn is_lockout(&self) -> bool {
        self.lockout_until.is_some()
    }

    /// Translate a transport/backend error. `now` anchors `Retry-After`.
    pub fn from_error(err: &IdentityError, now: DateTime<Utc>) -> Self {
        match err {
            IdentityError::Transport(e) => {
                // reqwest surfaces HTTP status only via error_for_status, which
                // this client does not use; a status here is unexpected.
                let code = match e.status() {
                    Some(status) if status.is_server_error() => ErrorCode::Server,
                    Some(_) => ErrorCode::Unknown,
                    None => ErrorCode::Network,
                };
                Self::new(code.clone(), code.default_message())
            }
            IdentityError::Http {
                status,
                body,
                retry_after,
            } => Self::from_http(*status, body, *retry_after, now),
            IdentityError::ServiceUnavailable => Self::new(
                ErrorCode::ServiceUnavailable,
                ErrorCode::ServiceUnavailable.default_message(),
            ),
            IdentityError::Decode(_)
            | IdentityError::InvalidState(_)
            | IdentityError::Internal(_) => Self::new(ErrorCode::Unknown, GENERIC_UNKNOWN),
        }
    }

    fn from_http(
        status: StatusCode,
        body: &ErrorBody,
        retry_after: Option<u64>,
        now: DateTime<Utc>,
    ) -> Self {
        let code = match body.code.as_deref() {
            Some(raw) => ErrorCode::parse(raw),
            None if status == StatusCode::TOO_MANY_REQUESTS => ErrorCode::RateLimited,
            None if status.is_server_error() => ErrorCode::Server,
            None => ErrorCode::Unknown,
        };

        // Server errors always get the generic message; raw bodies stay out of state.
        let message = match (&code, body.message.as_deref()) {
            (ErrorCode::Server | ErrorCode::Unknown | ErrorCode::Other(_), _) => {
                code.default_message().to_string()
            }
            (_, Some(msg)) if !msg.trim().is_empty() => msg.to_string(),
            _ => code.default_message().to_string(),
        };

        let retryable = if status.is_server_error() {
            true
        } else {
            body.retryable.unwrap_or_else(|| code.default_retryable())
        };

        let lockout_until = body.lockout_until.or_else(|| {
            let locking = matches!(
                code,
                ErrorCode::TooManyAttempts | ErrorCode::LockedOut | ErrorCode::RateLimited
            );
            retry_after
                .filter(|_| locking)
                .map(|secs| now + Duration::seconds(secs as i64))
        });

        Self {
            code,
            message,
            retryable,
            lockout_until,
        }
    }
}
