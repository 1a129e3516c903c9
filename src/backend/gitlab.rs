//! GitLab backend
//!
//! Implements GitBackend against the GitLab v4 repository files API. Works
//! with gitlab.com and self-hosted instances: any host that is not
//! github.com is treated as GitLab and reached at `https://{host}/api/v4`.
//!
//! The revision token is the file's `last_commit_id`. GitLab reports a stale
//! token (and some other write races) as HTTP 400, so 400 is retried along
//! with 409.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::{
    BackendKind, FileChange, GitBackend, RemoteFile, commit_message, decode_content, send,
    validate_target,
};
use crate::context::Context;
use crate::error::{FileLocation, GitError, Result};
use crate::resolver::RepositoryLocation;
use crate::retry::RetryPolicy;
use crate::transport::{ApiRequest, ApiResponse, Transport};

#[derive(Debug, Deserialize)]
struct FileResponse {
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    last_commit_id: String,
}

/// Backend for gitlab.com and self-hosted GitLab
pub struct GitLabBackend {
    host: String,
    owner: String,
    repository: String,
    api_url: String,
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
}

impl GitLabBackend {
    pub fn new(location: &RepositoryLocation, transport: Arc<dyn Transport>) -> Self {
        Self {
            host: location.host.clone(),
            owner: location.owner.clone(),
            repository: location.repository.clone(),
            api_url: format!("https://{}/api/v4", location.host),
            transport,
            retry: RetryPolicy::gitlab(),
        }
    }

    /// Create a backend with an HTTPS transport authenticated by `token`
    #[cfg(feature = "http")]
    pub fn connect(location: &RepositoryLocation, token: &str) -> Result<Self> {
        use crate::transport::{Auth, HttpTransport};

        let transport = HttpTransport::new(Auth::GitLab(token.to_string()))
            .map_err(|e| GitError::Client(e.to_string()))?;
        Ok(Self::new(location, Arc::new(transport)))
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Project ID in its URL-encoded `namespace/project` form
    fn project_id(&self) -> String {
        urlencoding::encode(&format!("{}/{}", self.owner, self.repository)).into_owned()
    }

    fn file_url(&self, path: &str) -> String {
        format!(
            "{}/projects/{}/repository/files/{}",
            self.api_url,
            self.project_id(),
            urlencoding::encode(path.trim_matches('/'))
        )
    }

    fn error_for(&self, location: &FileLocation, response: &ApiResponse) -> GitError {
        GitError::from_response(location, response, self.retry.conflict_statuses())
    }

    async fn get(&self, ctx: &Context, location: &FileLocation) -> Result<FileResponse> {
        let url = format!(
            "{}?ref={}",
            self.file_url(&location.path),
            urlencoding::encode(&location.branch)
        );

        let response = send(ctx, self.transport.as_ref(), ApiRequest::get(url), location).await?;
        if !response.is_success() {
            // Reads never conflict
            return Err(GitError::from_response(location, &response, &[]));
        }

        response
            .json()
            .map_err(|e| GitError::decode(location, format!("invalid file response: {}", e)))
    }

    async fn last_commit_id(&self, ctx: &Context, location: &FileLocation) -> Result<String> {
        let file = self.get(ctx, location).await?;
        if file.last_commit_id.is_empty() {
            return Err(GitError::NotFound {
                location: location.clone(),
            });
        }
        Ok(file.last_commit_id)
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
impl GitBackend for GitLabBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::GitLab
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
        let url = &self.file_url(&change.path);

        self.retry
            .run(ctx, || async move {
                let body = json!({
                    "branch": location.branch,
                    "content": change.content,
                    "commit_message": commit_message("Create", location),
                });

                let response =
                    send(ctx, self.transport.as_ref(), ApiRequest::post(url, body), location)
                        .await?;
                if response.is_success() {
                    debug!(path = %location.path, branch = %location.branch, "Created file on GitLab");
                    return Ok(());
                }

                // "A file with this name already exists" comes back as a 400,
                // which must not be retried as a conflict
                if response.status == 400 && response.message().contains("already exists") {
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
        let file = self.get(ctx, &location).await?;

        let content = match file.encoding.as_deref() {
            Some("base64") => decode_content(&file.content, &location)?,
            None | Some("") | Some("text") => file.content,
            Some(other) => {
                return Err(GitError::decode(
                    &location,
                    format!("unsupported content encoding: {}", other),
                ));
            }
        };

        Ok(RemoteFile {
            content,
            revision: file.last_commit_id,
        })
    }

    async fn update(&self, ctx: &Context, change: &FileChange) -> Result<()> {
        change.validate()?;
        let location = &change.location();
        let url = &self.file_url(&change.path);

        self.retry
            .run(ctx, || async move {
                let last_commit_id = self.last_commit_id(ctx, location).await?;
                let body = json!({
                    "branch": location.branch,
                    "content": change.content,
                    "commit_message": commit_message("Update", location),
                    "last_commit_id": last_commit_id,
                });

                self.submit(ctx, ApiRequest::put(url, body), location).await
            })
            .await
    }

    async fn delete(&self, ctx: &Context, path: &str, branch: &str) -> Result<()> {
        validate_target(path, branch)?;
        let location = &FileLocation::new(path, branch);
        let url = &self.file_url(path);

        self.retry
            .run(ctx, || async move {
                let last_commit_id = self.last_commit_id(ctx, location).await?;
                let body = json!({
                    "branch": location.branch,
                    "commit_message": commit_message("Delete", location),
                    "last_commit_id": last_commit_id,
                });

                self.submit(ctx, ApiRequest::delete(url, body), location).await
            })
            .await
    }
}
