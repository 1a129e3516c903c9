//! GitSync SDK - manage single files in hosted Git repositories
//!
//! Provides unified interfaces for:
//! - Repository URL resolution and backend routing (GitHub, GitLab)
//! - File create/read/update/delete through the hosts' REST APIs
//! - Conflict retry around optimistic-concurrency tokens
//! - Content validation for YAML and JSON files
//! - Managed file resources with deterministic IDs

pub mod backend;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod factory;
pub mod identity;
pub mod resolver;
pub mod resource;
pub mod retry;
pub mod transport;
pub mod validation;

// Re-export commonly used types
pub use backend::{
    BackendKind, DEFAULT_BRANCH, FileChange, GitBackend, GitHubBackend, GitLabBackend,
    RemoteFile, SharedBackend,
};
pub use config::{ConfigError, GitSyncConfig};
pub use context::{CancelHandle, Context, ContextError};
pub use error::{FileLocation, GitError, Result};
pub use factory::{BackendConstructor, BackendFactory, route};
#[cfg(feature = "http")]
pub use factory::create_backend;
pub use identity::ResourceIdentity;
pub use resolver::{RepositoryLocation, resolve};
pub use resource::{FileResource, FileSpec, FileState, ResourceError};
pub use retry::{RetryPolicy, RetrySettings, with_retry};
pub use transport::{ApiRequest, ApiResponse, Method, Transport, TransportError};
#[cfg(feature = "http")]
pub use transport::{Auth, HttpTransport};
pub use validation::{FileFormat, ValidationError};
