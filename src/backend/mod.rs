//! Git hosting backends
//!
//! Defines the GitBackend trait and its implementations:
//! - GitHubBackend: github.com contents API
//! - GitLabBackend: GitLab v4 repository files API (gitlab.com and self-hosted)
//!
//! A backend handle is immutable after construction and owns no file state,
//! so it can be shared between tasks without locking. Every operation
//! re-fetches what it needs from the host.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::error::{FileLocation, GitError, Result};
use crate::identity::ResourceIdentity;
use crate::transport::{ApiRequest, ApiResponse, Transport};

pub mod github;
pub mod gitlab;

pub use github::GitHubBackend;
pub use gitlab::GitLabBackend;

/// Branch used when a caller does not name one
pub const DEFAULT_BRANCH: &str = "main";

/// Provider family a backend talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    GitHub,
    GitLab,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::GitHub => "github",
            BackendKind::GitLab => "gitlab",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content to write to one file on one branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Repository-relative path
    pub path: String,
    pub branch: String,
    /// Raw payload, may be empty
    pub content: String,
}

impl FileChange {
    /// Create a change targeting [`DEFAULT_BRANCH`]
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            branch: DEFAULT_BRANCH.to_string(),
            content: content.into(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn location(&self) -> FileLocation {
        FileLocation::new(self.path.clone(), self.branch.clone())
    }

    /// Reject changes with an empty path or branch
    pub fn validate(&self) -> Result<()> {
        validate_target(&self.path, &self.branch)
    }
}

/// A file as currently stored on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    /// Decoded content
    pub content: String,
    /// Optimistic-concurrency token: the blob SHA on GitHub, the last
    /// commit id on GitLab
    pub revision: String,
}

/// A handle to one repository on one host
///
/// # Example
///
/// ```rust,no_run
/// # use gitsync_sdk::{Context, FileChange, GitBackend};
/// # async fn example(backend: &dyn GitBackend) -> gitsync_sdk::Result<()> {
/// let ctx = Context::background();
/// backend
///     .create(&ctx, &FileChange::new("env/values.yaml", "replicas: 2\n"))
///     .await?;
/// let file = backend.read(&ctx, "env/values.yaml", "main").await?;
/// println!("{}", file.content);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait GitBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn host(&self) -> &str;

    fn owner(&self) -> &str;

    fn repository(&self) -> &str;

    /// Deterministic external key for a file managed through this handle
    fn identity(&self, branch: &str, path: &str) -> String {
        ResourceIdentity::new(self.kind(), self.owner(), self.repository(), branch, path)
            .to_string()
    }

    /// Create a file. Fails with `AlreadyExists` if the path is taken.
    async fn create(&self, ctx: &Context, change: &FileChange) -> Result<()>;

    /// Fetch a file. Fails with `NotFound` if there is no file at the path.
    async fn read(&self, ctx: &Context, path: &str, branch: &str) -> Result<RemoteFile>;

    /// Replace the content of an existing file
    async fn update(&self, ctx: &Context, change: &FileChange) -> Result<()>;

    /// Remove an existing file
    async fn delete(&self, ctx: &Context, path: &str, branch: &str) -> Result<()>;
}

/// Backend handle shared across tasks
pub type SharedBackend = Arc<dyn GitBackend>;

pub(crate) fn validate_target(path: &str, branch: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(GitError::InvalidChange("path cannot be empty".to_string()));
    }
    if branch.trim().is_empty() {
        return Err(GitError::InvalidChange(format!(
            "branch cannot be empty for {:?}",
            path
        )));
    }
    Ok(())
}

/// Send a request, stopping early if the context ends
pub(crate) async fn send(
    ctx: &Context,
    transport: &dyn Transport,
    request: ApiRequest,
    location: &FileLocation,
) -> Result<ApiResponse> {
    if let Some(reason) = ctx.err() {
        return Err(GitError::interrupted(reason, None));
    }

    tokio::select! {
        response = transport.send(request) => response.map_err(|e| GitError::Transport {
            location: location.clone(),
            message: e.to_string(),
        }),
        reason = ctx.done() => Err(GitError::interrupted(reason, None)),
    }
}

pub(crate) fn commit_message(action: &str, location: &FileLocation) -> String {
    let preposition = if action == "Delete" { "from" } else { "at" };
    format!(
        "{} {:?} {} branch {:?}",
        action, location.path, preposition, location.branch
    )
}

/// Decode base64 content as the hosts deliver it (GitHub wraps lines)
pub(crate) fn decode_content(encoded: &str, location: &FileLocation) -> Result<String> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| GitError::decode(location, format!("invalid base64 content: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| GitError::decode(location, format!("content is not UTF-8: {}", e)))
}

pub(crate) fn encode_content(content: &str) -> String {
    STANDARD.encode(content.as_bytes())
}
