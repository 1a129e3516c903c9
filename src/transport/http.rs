//! reqwest-backed transport
//!
//! Authenticates every request with the caller's personal access token,
//! in the header style the target host expects.

use std::fmt;

use async_trait::async_trait;
use tracing::debug;

use super::{ApiRequest, ApiResponse, DEFAULT_USER_AGENT, Method, Transport, TransportError};

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// How a token is presented to the host
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// `Authorization: Bearer <token>` plus the GitHub REST media headers
    GitHub(String),
    /// `PRIVATE-TOKEN: <token>`
    GitLab(String),
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::GitHub(_) => f.write_str("GitHub(<redacted>)"),
            Auth::GitLab(_) => f.write_str("GitLab(<redacted>)"),
        }
    }
}

/// Transport that talks to a hosting API over HTTPS
#[derive(Debug, Clone)]
pub struct HttpTransport {
    auth: Auth,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with the default user agent
    ///
    /// # Example
    ///
    /// ```rust
    /// use gitsync_sdk::transport::{Auth, HttpTransport};
    ///
    /// let transport = HttpTransport::new(Auth::GitHub("ghp_example".to_string())).unwrap();
    /// ```
    pub fn new(auth: Auth) -> Result<Self, TransportError> {
        Self::with_user_agent(auth, DEFAULT_USER_AGENT)
    }

    /// Create a transport that identifies itself with `user_agent`
    pub fn with_user_agent(auth: Auth, user_agent: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| TransportError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { auth, client })
    }

    /// Build a request with authentication headers
    fn build_request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.request(method, url);

        match &self.auth {
            Auth::GitHub(token) => request
                .bearer_auth(token)
                .header("Accept", GITHUB_ACCEPT)
                .header("X-GitHub-Api-Version", GITHUB_API_VERSION),
            Auth::GitLab(token) => request.header("PRIVATE-TOKEN", token.as_str()),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.build_request(method, &request.url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(method = ?request.method, url = %request.url, "Sending hosting API request");

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError(format!("Request to {} timed out: {}", request.url, e))
            } else if e.is_connect() {
                TransportError(format!("Failed to connect to {}: {}", request.url, e))
            } else {
                TransportError(format!("Request to {} failed: {}", request.url, e))
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError(format!("Failed to read response body: {}", e)))?;

        debug!(status, url = %request.url, "Received hosting API response");

        Ok(ApiResponse { status, body })
    }
}
