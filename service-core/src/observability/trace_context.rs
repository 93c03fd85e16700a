//! Request correlation for outbound HTTP calls.
//!
//! Every request sent through [`TracedRequest`] carries an `x-request-id`
//! header. The id is recorded on a debug event so client logs can be joined
//! with backend logs.

use reqwest::header::HeaderMap;

/// Header name for request correlation ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Generate a fresh request id.
pub fn new_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Inject a request ID into headers. Invalid header values are skipped.
pub fn inject_request_id(headers: &mut HeaderMap, request_id: &str) {
    if let Ok(value) = request_id.parse() {
        headers.insert(REQUEST_ID_HEADER, value);
    }
}

/// Extract request ID from response or request headers.
pub fn extract_request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Wraps reqwest's RequestBuilder to inject correlation headers on send.
pub struct TracedRequest {
    request: reqwest::RequestBuilder,
    extra: HeaderMap,
}

impl TracedRequest {
    pub fn new(request: reqwest::RequestBuilder) -> Self {
        Self {
            request,
            extra: HeaderMap::new(),
        }
    }

    /// Add a header to the request.
    pub fn header(self, key: &str, value: &str) -> Self {
        Self {
            request: self.request.header(key, value),
            ..self
        }
    }

    /// Merge a prepared header map (tenant headers and the like).
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.extra.extend(headers);
        self
    }

    /// Add JSON body to the request.
    pub fn json<T: serde::Serialize + ?Sized>(self, json: &T) -> Self {
        Self {
            request: self.request.json(json),
            ..self
        }
    }

    /// Add bearer auth token.
    pub fn bearer_auth<T: std::fmt::Display>(self, token: T) -> Self {
        Self {
            request: self.request.bearer_auth(token),
            ..self
        }
    }

    /// Send the request with a generated request id.
    pub async fn send(self) -> Result<reqwest::Response, reqwest::Error> {
        let request_id = new_request_id();
        self.send_with_request_id(&request_id).await
    }

    /// Send the request with a caller supplied request id.
    pub async fn send_with_request_id(
        self,
        request_id: &str,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let mut headers = self.extra;
        inject_request_id(&mut headers, request_id);
        tracing::debug!(request_id = %request_id, "Sending HTTP request");

        self.request.headers(headers).send().await
    }
}

/// Extension trait for reqwest::Client to create traced requests.
pub trait TracedClientExt {
    fn traced_get(&self, url: &str) -> TracedRequest;
    fn traced_post(&self, url: &str) -> TracedRequest;
}

impl TracedClientExt for reqwest::Client {
    fn traced_get(&self, url: &str) -> TracedRequest {
        TracedRequest::new(self.get(url))
    }

    fn traced_post(&self, url: &str) -> TracedRequest {
        TracedRequest::new(self.post(url))
    }
}
