use anyhow::Result;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;

/// Claims the client reads from a bearer token. All optional: the client
/// only uses them as hints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenHints {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default, alias = "tenant_id", alias = "tid")]
    pub tenant_id: Option<String>,
}

impl TokenHints {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.iat.and_then(|secs| Utc.timestamp_opt(secs, 0).single())
    }
}

/// Decode JWT claims without validation
///
/// Signature verification stays on the backend. The decoded values are
/// UX hints only (expiry for scheduling refresh, tenant id for routing) and
/// must never be used to make an access decision.
pub fn decode_token_hints(token: &str) -> Result<TokenHints> {
    let parts: Vec<&str> = token.split('.').collect();

    if parts.len() != 3 {
        return Err(anyhow::anyhow!("Invalid JWT format"));
    }

    // Decode the payload (second part). Some issuers keep the padding.
    let payload = general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| anyhow::anyhow!("Failed to decode JWT payload: {}", e))?;

    let claims: TokenHints = serde_json::from_slice(&payload)
        .map_err(|e| anyhow::anyhow!("Failed to parse JWT claims: {}", e))?;

    Ok(claims)
}

/// Build an unsigned token around `claims`. Used by tests and local tooling.
pub fn encode_unsigned(claims: &serde_json::Value) -> String {
    let header = general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = general_purpose::URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_token_hints() {
        // Payload: {"sub":"user_123","email":"test@example.com","exp":9999999999,"iat":1736500000,"jti":"abc123"}
        let token = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.eyJzdWIiOiJ1c2VyXzEyMyIsImVtYWlsIjoidGVzdEBleGFtcGxlLmNvbSIsImV4cCI6OTk5OTk5OTk5OSwiaWF0IjoxNzM2NTAwMDAwLCJqdGkiOiJhYmMxMjMifQ.signature";

        let hints = decode_token_hints(token).unwrap();
        assert_eq!(hints.sub.as_deref(), Some("user_123"));
        assert_eq!(hints.exp, Some(9999999999));
        assert_eq!(hints.issued_at().map(|t| t.timestamp()), Some(1736500000));
        assert!(hints.tenant_id.is_none());
    }

    #[test]
    fn test_tenant_claim_aliases() {
        let token = encode_unsigned(&serde_json::json!({"tenant_id": "t-1"}));
        assert_eq!(decode_token_hints(&token).unwrap().tenant_id.as_deref(), Some("t-1"));

        let token = encode_unsigned(&serde_json::json!({"tenantId": "t-2"}));
        assert_eq!(decode_token_hints(&token).unwrap().tenant_id.as_deref(), Some("t-2"));
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        assert!(decode_token_hints("not-a-jwt").is_err());
        assert!(decode_token_hints("a.!!!.c").is_err());
        assert!(decode_token_hints("a.bm90LWpzb24.c").is_err());
    }
}
