//! GitHub backend
//!
//! Implements GitBackend against the GitHub REST contents API
//! (`/repos/{owner}/{repo}/contents/{path}`). The revision token is the
//! file's blob SHA; GitHub rejects an update or delete whose SHA is stale.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{
    BackendKind, FileChange, GitBackend, RemoteFile, commit_message, decode_content,
    encode_content, send, validate_target,
};
use crate::context::Context;
use crate::error::{FileLocation, GitError, Result};
use crate::resolver::RepositoryLocation;
use crate::retry::RetryPolicy;
use crate::transport::{ApiRequest, ApiResponse, Transport};

/// The only host routed to this backend
pub const GITHUB_HOST: &str = "github.com";

/// Public REST endpoint
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// Contents API entry for a single file
#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    sha: String,
}

/// Backend for repositories on github.com
pub struct GitHubBackend {
    host: String,
    owner: String,
    repository: String,
    api_url: String,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
}

impl GitHubBackend {
    /// Create a backend for `location` that sends requests through `transport`
    pub fn new(location: &RepositoryLocation, transport: Arc<dyn Transport>) -> Self {
        Self {
            host: location.host.clone(),
            owner: location.owner.clone(),
            repository: location.repository.clone(),
            api_url: GITHUB_API_URL.to_string(),
            transport,
            retry: RetryPolicy::github(),
        }
    }

    /// Create a backend with an HTTPS transport authenticated by `token`
    #[cfg(feature = "http")]
    pub fn connect(location: &RepositoryLocation, token: &str) -> Result<Self> {
        use crate::transport::{Auth, HttpTransport};

        let transport = HttpTransport::new(Auth::GitHub(token.to_string()))
            .map_err(|e| GitError::Client(e.to_string()))?;
        Ok(Self::new(location, Arc::new(transport)))
    }

    /// Override the REST endpoint (GitHub Enterprise Server, test servers)
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn contents_url(&self, path: &str) -> String {
        let encoded_path: Vec<String> = path
            .trim_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();

        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_url,
            urlencoding::encode(&self.owner),
            urlencoding::encode(&self.repository),
            encoded_path.join("/")
        )
    }

    fn error_for(&self, location: &FileLocation, response: &ApiResponse) -> GitError {
        GitError::from_response(location, response, self.retry.conflict_statuses())
    }

    /// Fetch the contents entry for a file on `heads/{branch}`
    async fn get(&self, ctx: &Context, location: &FileLocation) -> Result<ContentResponse> {
        let git_ref = format!("heads/{}", location.branch);
        let url = format!(
            "{}?ref={}",
            self.contents_url(&location.path),
            urlencoding::encode(&git_ref)
        );

        let response = send(ctx, self.transport.as_ref(), ApiRequest::get(url), location).await?;
        if !response.is_success() {
            // Reads never conflict
            return Err(GitError::from_response(location, &response, &[]));
        }

        let value: serde_json::Value = response
            .json()
            .map_err(|e| GitError::decode(location, format!("invalid contents response: {}", e)))?;

        // A directory answers with a listing rather than a single entry
        if value.is_array() {
            return Err(GitError::NotFound {
                location: location.clone(),
            });
        }

        let entry: ContentResponse = serde_json::from_value(value)
            .map_err(|e| GitError::decode(location, format!("invalid contents response: {}", e)))?;

        if entry.kind != "file" {
            return Err(GitError::NotFound {
                location: location.clone(),
            });
        }

        Ok(entry)
    }

    /// Current blob SHA, required before any update or delete
    async fn current_sha(&self, ctx: &Context, location: &FileLocation) -> Result<String> {
        let entry = self.get(ctx, location).await?;
        if entry.sha.is_empty() {
            return Err(GitError::NotFound {
                location: location.clone(),
            });
        }
        Ok(entry.sha)
    }

    async fn submit(
        &self,
        ctx: &Context,
        request: ApiRequest,
        location: &FileLocation,
    ) -> Result<()> {
        let response = send(ctx, self.transport.as_ref(), request, location).await?;
        if response.is_success() {
            Ok(())
        } else {
            Err(self.error_for(location, &response))
        }
    }
}

#[async_trait]
impl GitBackend for GitHubBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::GitHub
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn owner(&self) -> &str {
        &self.owner
    }

    fn repository(&self) -> &str {
        &self.repository
    }

    async fn create(&self, ctx: &Context, change: &FileChange) -> Result<()> {
        change.validate()?;
        let location = &change.location();
        let url = &self.contents_url(&change.path);

        self.retry
            .run(ctx, || async move {
                let body = json!({
                    "message": commit_message("Create", location),
                    "content": encode_content(&change.content),
                    "branch": location.branch,
                });

                let response =
                    send(ctx, self.transport.as_ref(), ApiRequest::put(url, body), location)
                        .await?;
                if response.is_success() {
                    debug!(path = %location.path, branch = %location.branch, "Created file on GitHub");
                    return Ok(());
                }

                // Without a SHA GitHub refuses to overwrite: `"sha" wasn't supplied`
                if response.status == 422 && response.body.contains("sha") {
                    return Err(GitError::AlreadyExists {
                        location: location.clone(),
                    });
                }

                Err(self.error_for(location, &response))
            })
            .await
    }

    async fn read(&self, ctx: &Context, path: &str, branch: &str) -> Result<RemoteFile> {
        validate_target(path, branch)?;
        let location = FileLocation::new(path, branch);
        let entry = self.get(ctx, &location).await?;

        let raw = entry.content.unwrap_or_default();
        let content = match entry.encoding.as_deref() {
            Some("base64") => decode_content(&raw, &location)?,
            None | Some("") => raw,
            Some(other) => {
                return Err(GitError::decode(
                    &location,
                    format!("unsupported content encoding: {}", other),
                ));
            }
        };

        Ok(RemoteFile {
            content,
            revision: entry.sha,
        })
    }

    async fn update(&self, ctx: &Context, change: &FileChange) -> Result<()> {
        change.validate()?;
        let location = &change.location();
        let url = &self.contents_url(&change.path);

        self.retry
            .run(ctx, || async move {
                let sha = self.current_sha(ctx, location).await?;
                let body = json!({
                    "message": commit_message("Update", location),
                    "content": encode_content(&change.content),
                    "branch": location.branch,
                    "sha": sha,
                });

                self.submit(ctx, ApiRequest::put(url, body), location).await
            })
            .await
    }

    async fn delete(&self, ctx: &Context, path: &str, branch: &str) -> Result<()> {
        validate_target(path, branch)?;
        let location = &FileLocation::new(path, branch);
        let url = &self.contents_url(path);

        self.retry
            .run(ctx, || async move {
                let sha = self.current_sha(ctx, location).await?;
                let body = json!({
                    "message": commit_message("Delete", location),
                    "branch": location.branch,
                    "sha": sha,
                });

                self.submit(ctx, ApiRequest::delete(url, body), location).await
            })
            .await
    }
}
