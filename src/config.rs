//! Configuration for connecting to a hosted repository
//!
//! Values can come from code, a TOML document or the environment:
//! - `GITSYNC_URL`: repository URL
//! - `GITSYNC_TOKEN`: personal access token
//! - `GITSYNC_BRANCH`: default branch
//!
//! Explicit values always win over the environment.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::backend::{DEFAULT_BRANCH, SharedBackend};
use crate::context::Context;
use crate::error::GitError;
use crate::retry::RetrySettings;

pub const ENV_URL: &str = "GITSYNC_URL";
pub const ENV_TOKEN: &str = "GITSYNC_TOKEN";
pub const ENV_BRANCH: &str = "GITSYNC_BRANCH";

/// Error loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing {attribute}: Set the {attribute} value in the configuration or use the {env} environment variable")]
    Missing {
        attribute: &'static str,
        env: &'static str,
    },
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Git(#[from] GitError),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Connection settings for one repository
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct GitSyncConfig {
    /// Repository URL, e.g. `https://github.com/owner/repo`
    #[serde(default)]
    pub url: Option<String>,

    /// Personal access token; never written back out
    #[serde(default, skip_serializing)]
    pub token: Option<String>,

    /// Branch used when an operation does not name one; `main` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,

    /// User agent override for HTTP requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    #[serde(default)]
    pub retry: RetrySettings,
}

impl Default for GitSyncConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            default_branch: None,
            retry: RetrySettings::default(),
            user_agent: None,
        }
    }
}

impl fmt::Debug for GitSyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GitSyncConfig")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("default_branch", &self.default_branch)
            .field("retry", &self.retry)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl GitSyncConfig {
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            token: Some(token.into()),
            ..Self::default()
        }
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source shaped like the environment
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().merge_lookup(lookup)
    }

    /// Parse a TOML document
    ///
    /// # Example
    ///
    /// ```rust
    /// use gitsync_sdk::config::GitSyncConfig;
    ///
    /// let config = GitSyncConfig::from_toml_str(r#"
    ///     url = "https://gitlab.com/foo/bar"
    ///     default_branch = "develop"
    ///
    ///     [retry]
    ///     initial_interval_ms = 250
    /// "#).unwrap();
    /// assert_eq!(config.branch_or_default(None), "develop");
    /// assert_eq!(config.retry.initial_interval_ms, 250);
    /// ```
    pub fn from_toml_str(document: &str) -> Result<Self> {
        Ok(toml::from_str(document)?)
    }

    /// Fill unset values from the process environment
    pub fn merge_env(self) -> Self {
        self.merge_lookup(|key| std::env::var(key).ok())
    }

    /// Fill unset values from `lookup`; values already set are kept
    pub fn merge_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if self.url.as_deref().is_none_or(str::is_empty) {
            self.url = lookup(ENV_URL);
        }
        if self.token.as_deref().is_none_or(str::is_empty) {
            self.token = lookup(ENV_TOKEN);
        }
        if self.default_branch.as_deref().is_none_or(|b| b.trim().is_empty()) {
            self.default_branch = lookup(ENV_BRANCH);
        }
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = Some(branch.into());
        self
    }

    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Check that the URL and token are present, returning them
    pub fn validate(&self) -> Result<(&str, &str)> {
        let url = required(self.url.as_deref(), "url", ENV_URL)?;
        let token = required(self.token.as_deref(), "token", ENV_TOKEN)?;
        Ok((url, token))
    }

    /// Branch to use for an operation, falling back to the configured default
    pub fn branch_or_default<'a>(&'a self, branch: Option<&'a str>) -> &'a str {
        match branch {
            Some(branch) if !branch.trim().is_empty() => branch,
            _ => match self.default_branch.as_deref() {
                Some(default) if !default.trim().is_empty() => default,
                _ => DEFAULT_BRANCH,
            },
        }
    }

    /// Build a backend handle for the configured repository
    #[cfg(feature = "http")]
    pub fn connect(&self, ctx: &Context) -> Result<SharedBackend> {
        let (url, token) = self.validate()?;
        let factory =
            crate::factory::BackendFactory::http(self.retry.clone(), self.user_agent.clone());
        Ok(factory.create_backend(ctx, url, token)?)
    }

    /// Build a backend handle through a custom factory
    pub fn connect_with(
        &self,
        ctx: &Context,
        factory: &crate::factory::BackendFactory,
    ) -> Result<SharedBackend> {
        let (url, token) = self.validate()?;
        Ok(factory.create_backend(ctx, url, token)?)
    }
}

fn required<'a>(
    value: Option<&'a str>,
    attribute: &'static str,
    env: &'static str,
) -> Result<&'a str> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing { attribute, env }),
    }
}
