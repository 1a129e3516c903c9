//! Error types for hosted-repository file operations
//!
//! Every failure the hosting layer can produce is a `GitError`. File-level
//! variants carry the `FileLocation` they refer to, so callers can compose
//! messages without threading the path and branch through separately.

use std::fmt;

use crate::context::ContextError;
use crate::transport::ApiResponse;

/// A file inside a repository, addressed by path and branch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileLocation {
    pub path: String,
    pub branch: String,
}

impl FileLocation {
    pub fn new(path: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            branch: branch.into(),
        }
    }
}

impl fmt::Display for FileLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} on branch {:?}", self.path, self.branch)
    }
}

/// Error type for hosting operations
#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("invalid git URL: {0}")]
    InvalidUrl(String),
    #[error("unsupported URL scheme {0:?}, expected http or https")]
    UnsupportedScheme(String),
    #[error("invalid git URL path, expected format: <host>/<owner>/<repo>: {0}")]
    InvalidPath(String),
    #[error("invalid file change: {0}")]
    InvalidChange(String),
    #[error("failed to build HTTP client: {0}")]
    Client(String),
    #[error("file {location} does not exist")]
    NotFound { location: FileLocation },
    #[error("file {location} already exists")]
    AlreadyExists { location: FileLocation },
    #[error("conflicting write to {location} (HTTP {status}): {message}")]
    Conflict {
        location: FileLocation,
        status: u16,
        message: String,
    },
    #[error("permission denied for {location} (HTTP {status}): {message}")]
    PermissionDenied {
        location: FileLocation,
        status: u16,
        message: String,
    },
    #[error("API error for {location} (HTTP {status}): {message}")]
    Api {
        location: FileLocation,
        status: u16,
        message: String,
    },
    #[error("transport error for {location}: {message}")]
    Transport {
        location: FileLocation,
        message: String,
    },
    #[error("failed to decode {location}: {message}")]
    Decode {
        location: FileLocation,
        message: String,
    },
    #[error("operation cancelled{}", describe_last(.last))]
    Cancelled { last: Option<Box<GitError>> },
    #[error("operation deadline exceeded{}", describe_last(.last))]
    DeadlineExceeded { last: Option<Box<GitError>> },
}

fn describe_last(last: &Option<Box<GitError>>) -> String {
    match last {
        Some(err) => format!(" (last error: {})", err),
        None => String::new(),
    }
}

/// Result type for hosting operations
pub type Result<T> = std::result::Result<T, GitError>;

impl GitError {
    /// Classify a non-success API response.
    ///
    /// `conflict_statuses` is the backend's set of statuses that signal a
    /// stale revision token or a concurrent write.
    pub(crate) fn from_response(
        location: &FileLocation,
        response: &ApiResponse,
        conflict_statuses: &[u16],
    ) -> Self {
        let location = location.clone();
        let status = response.status;
        let message = response.message();

        match status {
            404 => GitError::NotFound { location },
            401 | 403 => GitError::PermissionDenied {
                location,
                status,
                message,
            },
            s if conflict_statuses.contains(&s) => GitError::Conflict {
                location,
                status,
                message,
            },
            _ => GitError::Api {
                location,
                status,
                message,
            },
        }
    }

    pub(crate) fn interrupted(reason: ContextError, last: Option<GitError>) -> Self {
        let last = last.map(Box::new);
        match reason {
            ContextError::Cancelled => GitError::Cancelled { last },
            ContextError::DeadlineExceeded => GitError::DeadlineExceeded { last },
        }
    }

    /// Fill in `last` on a cancellation that was raised without one
    pub(crate) fn or_last(self, fallback: Option<GitError>) -> Self {
        match self {
            GitError::Cancelled { last: None } => GitError::Cancelled {
                last: fallback.map(Box::new),
            },
            GitError::DeadlineExceeded { last: None } => GitError::DeadlineExceeded {
                last: fallback.map(Box::new),
            },
            other => other,
        }
    }

    pub(crate) fn decode(location: &FileLocation, message: impl fmt::Display) -> Self {
        GitError::Decode {
            location: location.clone(),
            message: message.to_string(),
        }
    }

    /// HTTP status reported by the host, if the error came from an API response
    pub fn status(&self) -> Option<u16> {
        match self {
            GitError::Conflict { status, .. }
            | GitError::PermissionDenied { status, .. }
            | GitError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The file the error refers to
    pub fn location(&self) -> Option<&FileLocation> {
        match self {
            GitError::NotFound { location }
            | GitError::AlreadyExists { location }
            | GitError::Conflict { location, .. }
            | GitError::PermissionDenied { location, .. }
            | GitError::Api { location, .. }
            | GitError::Transport { location, .. }
            | GitError::Decode { location, .. } => Some(location),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GitError::NotFound { .. })
    }

    /// True when the caller's context stopped the operation
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            GitError::Cancelled { .. } | GitError::DeadlineExceeded { .. }
        )
    }
}
