//! Backend routing
//!
//! Picks a backend implementation from a repository URL. Exactly one host,
//! `github.com`, routes to GitHub; every other host (gitlab.com and any
//! self-hosted domain) routes to the GitLab-compatible backend.
//!
//! Constructors are injected, so tests can substitute fakes without touching
//! global state.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::backend::github::GITHUB_HOST;
use crate::backend::{BackendKind, SharedBackend};
use crate::context::Context;
use crate::error::{GitError, Result};
use crate::resolver::{RepositoryLocation, resolve};

/// Builds a backend for a resolved repository and access token
pub type BackendConstructor =
    Arc<dyn Fn(&RepositoryLocation, &str) -> Result<SharedBackend> + Send + Sync>;

/// Which backend family serves `host`
pub fn route(host: &str) -> BackendKind {
    if host == GITHUB_HOST {
        BackendKind::GitHub
    } else {
        BackendKind::GitLab
    }
}

/// Creates backend handles from repository URLs
#[derive(Clone)]
pub struct BackendFactory {
    github: BackendConstructor,
    gitlab: BackendConstructor,
}

impl fmt::Debug for BackendFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendFactory").finish_non_exhaustive()
    }
}

impl BackendFactory {
    /// Create a factory from one constructor per backend family
    pub fn new(github: BackendConstructor, gitlab: BackendConstructor) -> Self {
        Self { github, gitlab }
    }

    pub fn with_github(mut self, github: BackendConstructor) -> Self {
        self.github = github;
        self
    }

    pub fn with_gitlab(mut self, gitlab: BackendConstructor) -> Self {
        self.gitlab = gitlab;
        self
    }

    /// Resolve `repo_url` and build the backend its host routes to
    pub fn create_backend(
        &self,
        ctx: &Context,
        repo_url: &str,
        token: &str,
    ) -> Result<SharedBackend> {
        if let Some(reason) = ctx.err() {
            return Err(GitError::interrupted(reason, None));
        }

        let location = resolve(repo_url)?;
        let kind = route(&location.host);
        debug!(
            host = %location.host,
            owner = %location.owner,
            repository = %location.repository,
            backend = %kind,
            "Resolved repository"
        );

        match kind {
            BackendKind::GitHub => (self.github)(&location, token),
            BackendKind::GitLab => (self.gitlab)(&location, token),
        }
    }
}

#[cfg(feature = "http")]
mod http {
    use super::*;
    use crate::backend::{GitHubBackend, GitLabBackend};
    use crate::retry::{RetryPolicy, RetrySettings};
    use crate::transport::{Auth, HttpTransport};

    impl BackendFactory {
        /// Factory for real hosts: HTTPS transport, given retry schedule and
        /// user agent
        pub fn http(settings: RetrySettings, user_agent: Option<String>) -> Self {
            let github_settings = settings.clone();
            let github_agent = user_agent.clone();
            let github: BackendConstructor =
                Arc::new(move |location: &RepositoryLocation, token: &str| {
                    let auth = Auth::GitHub(token.to_string());
                    let transport = build_transport(auth, github_agent.as_deref())?;
                    let retry = RetryPolicy::github().with_settings(github_settings.clone());
                    let backend = GitHubBackend::new(location, transport).with_retry(retry);
                    Ok(Arc::new(backend) as SharedBackend)
                });

            let gitlab: BackendConstructor =
                Arc::new(move |location: &RepositoryLocation, token: &str| {
                    let auth = Auth::GitLab(token.to_string());
                    let transport = build_transport(auth, user_agent.as_deref())?;
                    let retry = RetryPolicy::gitlab().with_settings(settings.clone());
                    let backend = GitLabBackend::new(location, transport).with_retry(retry);
                    Ok(Arc::new(backend) as SharedBackend)
                });

            Self::new(github, gitlab)
        }
    }

    impl Default for BackendFactory {
        fn default() -> Self {
            Self::http(RetrySettings::default(), None)
        }
    }

    fn build_transport(auth: Auth, user_agent: Option<&str>) -> Result<Arc<HttpTransport>> {
        let transport = match user_agent {
            Some(agent) => HttpTransport::with_user_agent(auth, agent),
            None => HttpTransport::new(auth),
        };
        transport
            .map(Arc::new)
            .map_err(|e| GitError::Client(e.to_string()))
    }

    /// Build a backend for `repo_url` with the default HTTPS factory
    pub fn create_backend(ctx: &Context, repo_url: &str, token: &str) -> Result<SharedBackend> {
        BackendFactory::default().create_backend(ctx, repo_url, token)
    }
}

#[cfg(feature = "http")]
pub use http::create_backend;
