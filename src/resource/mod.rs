//! Managed file resources
//!
//! A `FileResource` manages YAML or JSON files in one repository. It applies
//! the default branch, checks the file extension and content syntax before
//! anything is sent, and reports state in a shape a provisioning tool can
//! store: `{ id, path, branch, content }`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::{DEFAULT_BRANCH, FileChange, SharedBackend};
use crate::context::Context;
use crate::error::GitError;
use crate::validation::{FileFormat, ValidationError};

/// Error from a managed file operation
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("invalid file extension for {path:?}, must be one of {expected:?}")]
    InvalidExtension {
        path: String,
        expected: &'static [&'static str],
    },
    #[error("invalid {format} content: {source}")]
    InvalidContent {
        format: FileFormat,
        #[source]
        source: ValidationError,
    },
    #[error("invalid import ID {0:?}: must be in format 'branch:path' or 'path'")]
    InvalidImportId(String),
    #[error(transparent)]
    Git(#[from] GitError),
}

/// Result type for managed file operations
pub type Result<T> = std::result::Result<T, ResourceError>;

/// Desired state of a managed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSpec {
    pub path: String,
    /// Target branch; the resource's default branch when absent or empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub content: String,
}

impl FileSpec {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            branch: None,
            content: content.into(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }
}

/// Observed state of a managed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileState {
    pub id: String,
    pub path: String,
    pub branch: String,
    pub content: String,
}

/// Import ID parsed into its branch and path
///
/// `"branch:path"` names both; a bare `"path"` (or an empty branch) uses
/// `default_branch`. Only the first `:` separates, so paths may contain `:`.
pub fn parse_import_id(import_id: &str, default_branch: &str) -> Result<(String, String)> {
    let (branch, path) = match import_id.split_once(':') {
        Some((branch, path)) => (branch, path),
        None => ("", import_id),
    };

    if path.is_empty() {
        return Err(ResourceError::InvalidImportId(import_id.to_string()));
    }

    let branch = if branch.is_empty() { default_branch } else { branch };
    Ok((branch.to_string(), path.to_string()))
}

/// Lifecycle operations for files of one format in one repository
#[derive(Clone)]
pub struct FileResource {
    backend: SharedBackend,
    format: FileFormat,
    default_branch: String,
}

impl FileResource {
    pub fn new(backend: SharedBackend, format: FileFormat) -> Self {
        Self {
            backend,
            format,
            default_branch: DEFAULT_BRANCH.to_string(),
        }
    }

    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = branch.into();
        self
    }

    pub fn format(&self) -> FileFormat {
        self.format
    }

    pub fn default_branch(&self) -> &str {
        &self.default_branch
    }

    fn branch_for(&self, spec: &FileSpec) -> String {
        match spec.branch.as_deref() {
            Some(branch) if !branch.is_empty() => branch.to_string(),
            _ => self.default_branch.clone(),
        }
    }

    fn check(&self, spec: &FileSpec) -> Result<()> {
        match self.format.validate(&spec.path, &spec.content) {
            Ok(()) => Ok(()),
            Err(ValidationError::Extension { path, expected }) => {
                Err(ResourceError::InvalidExtension { path, expected })
            }
            Err(source) => Err(ResourceError::InvalidContent {
                format: self.format,
                source,
            }),
        }
    }

    fn state(&self, path: &str, branch: &str, content: String) -> FileState {
        FileState {
            id: self.backend.identity(branch, path),
            path: path.to_string(),
            branch: branch.to_string(),
            content,
        }
    }

    /// Validate and create the file, failing if it already exists
    pub async fn create(&self, ctx: &Context, spec: &FileSpec) -> Result<FileState> {
        self.check(spec)?;
        let branch = self.branch_for(spec);
        let change = FileChange::new(&spec.path, &spec.content).with_branch(&branch);

        self.backend.create(ctx, &change).await?;
        debug!(path = %spec.path, branch = %branch, "Created managed file");

        Ok(self.state(&spec.path, &branch, spec.content.clone()))
    }

    /// Refresh state from the repository; `None` once the file is gone
    pub async fn read(&self, ctx: &Context, path: &str, branch: &str) -> Result<Option<FileState>> {
        match self.backend.read(ctx, path, branch).await {
            Ok(file) => Ok(Some(self.state(path, branch, file.content))),
            Err(err) if err.is_not_found() => {
                debug!(path, branch, "Managed file no longer exists");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Validate and replace the content of an existing file
    pub async fn update(&self, ctx: &Context, spec: &FileSpec) -> Result<FileState> {
        self.check(spec)?;
        let branch = self.branch_for(spec);
        let change = FileChange::new(&spec.path, &spec.content).with_branch(&branch);

        self.backend.update(ctx, &change).await?;
        debug!(path = %spec.path, branch = %branch, "Updated managed file");

        Ok(self.state(&spec.path, &branch, spec.content.clone()))
    }

    /// Remove the file; a file that is already gone counts as deleted
    pub async fn delete(&self, ctx: &Context, path: &str, branch: &str) -> Result<()> {
        match self.backend.delete(ctx, path, branch).await {
            Ok(()) => Ok(()),
            Err(err) if err.is_not_found() => {
                debug!(path, branch, "Managed file already deleted");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Adopt an existing file by import ID (`"branch:path"` or `"path"`)
    pub async fn import(&self, ctx: &Context, import_id: &str) -> Result<FileState> {
        let (branch, path) = parse_import_id(import_id, &self.default_branch)?;
        let file = self.backend.read(ctx, &path, &branch).await?;
        Ok(self.state(&path, &branch, file.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_import_id() {
        assert_eq!(
            parse_import_id("dev:env/values.yaml", "main").unwrap(),
            ("dev".to_string(), "env/values.yaml".to_string())
        );
        assert_eq!(
            parse_import_id("env/values.yaml", "main").unwrap(),
            ("main".to_string(), "env/values.yaml".to_string())
        );
        assert_eq!(
            parse_import_id(":values.yaml", "trunk").unwrap(),
            ("trunk".to_string(), "values.yaml".to_string())
        );
        assert_eq!(
            parse_import_id("dev:a:b.yaml", "main").unwrap(),
            ("dev".to_string(), "a:b.yaml".to_string())
        );
    }

    #[test]
    fn test_parse_import_id_rejects_empty_path() {
        assert!(matches!(
            parse_import_id("", "main"),
            Err(ResourceError::InvalidImportId(_))
        ));
        assert!(matches!(
            parse_import_id("dev:", "main"),
            Err(ResourceError::InvalidImportId(_))
        ));
    }

    #[test]
    fn test_file_spec_serde() {
        let spec: FileSpec =
            serde_json::from_str(r#"{"path":"values.yaml","content":"a: 1"}"#).unwrap();
        assert_eq!(spec, FileSpec::new("values.yaml", "a: 1"));
        assert!(spec.branch.is_none());
    }
}
