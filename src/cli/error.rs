//! CLI error types

use std::path::PathBuf;

use crate::config::ConfigError;
use crate::resource::ResourceError;

/// Errors surfaced by CLI commands
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Failed to read {0}: {1}")]
    FileReadError(PathBuf, String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
}
