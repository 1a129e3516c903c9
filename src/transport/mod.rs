//! HTTP transport abstraction
//!
//! Backends describe requests as `ApiRequest` values and hand them to a
//! `Transport`. The transport only reports network failures as errors;
//! every HTTP response, successful or not, comes back as an `ApiResponse`
//! so the backend can classify the status itself.
//!
//! - HttpTransport: reqwest client authenticated for one host (feature `http`)

use async_trait::async_trait;
use serde::de::DeserializeOwned;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::{Auth, HttpTransport};

/// User agent sent with every request
pub const DEFAULT_USER_AGENT: &str = concat!("gitsync-sdk/", env!("CARGO_PKG_VERSION"));

/// HTTP methods used by the hosting APIs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// True for methods that change repository state
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Method::Get)
    }
}

/// A request against a hosting REST API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self::with_body(Method::Post, url, body)
    }

    pub fn put(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self::with_body(Method::Put, url, body)
    }

    pub fn delete(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self::with_body(Method::Delete, url, body)
    }

    fn with_body(method: Method, url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method,
            url: url.into(),
            body: Some(body),
        }
    }
}

/// Status and raw body of a hosting API response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Deserialize the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// Human-readable error message from the body.
    ///
    /// Both hosts answer errors with a JSON object carrying `message`
    /// (GitLab sometimes uses `error`); anything else is returned verbatim.
    pub fn message(&self) -> String {
        let parsed = serde_json::from_str::<serde_json::Value>(&self.body).ok();
        let field = parsed.as_ref().and_then(|value| {
            value
                .get("message")
                .or_else(|| value.get("error"))
                .map(|m| match m.as_str() {
                    Some(s) => s.to_string(),
                    None => m.to_string(),
                })
        });

        match field {
            Some(message) => message,
            None if self.body.trim().is_empty() => format!("HTTP {}", self.status),
            None => self.body.trim().to_string(),
        }
    }
}

/// Network-level failure: the request never produced an HTTP response
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Sends requests to a hosting API
///
/// Implementations must be safe to share between tasks; a backend handle
/// holds its transport for its whole lifetime.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and return the response, whatever its status
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_from_json() {
        let response = ApiResponse::new(409, r#"{"message":"sha does not match"}"#);
        assert_eq!(response.message(), "sha does not match");

        let response = ApiResponse::new(400, r#"{"error":"branch is missing"}"#);
        assert_eq!(response.message(), "branch is missing");

        let response = ApiResponse::new(400, r#"{"message":{"base":["invalid"]}}"#);
        assert_eq!(response.message(), r#"{"base":["invalid"]}"#);
    }

    #[test]
    fn test_message_fallbacks() {
        let response = ApiResponse::new(502, "Bad Gateway\n");
        assert_eq!(response.message(), "Bad Gateway");

        let response = ApiResponse::new(500, "");
        assert_eq!(response.message(), "HTTP 500");
    }

    #[test]
    fn test_request_builders() {
        let request = ApiRequest::get("https://example.com/a");
        assert_eq!(request.method, Method::Get);
        assert!(request.body.is_none());
        assert!(!request.method.is_mutating());

        let request = ApiRequest::put("https://example.com/a", serde_json::json!({"k": "v"}));
        assert!(request.method.is_mutating());
        assert_eq!(request.body.unwrap()["k"], "v");
    }

    #[test]
    fn test_is_success() {
        assert!(ApiResponse::new(200, "").is_success());
        assert!(ApiResponse::new(201, "").is_success());
        assert!(!ApiResponse::new(304, "").is_success());
        assert!(!ApiResponse::new(404, "").is_success());
    }
}
