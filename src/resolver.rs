//! Repository URL resolution
//!
//! Turns `scheme://host/owner/repo[.git]` into its host, owner and
//! repository path. Only `http` and `https` URLs are accepted; SSH and
//! scp-style remotes are rejected.

use url::Url;

use crate::error::{GitError, Result};

/// Where a repository lives, as parsed from its URL
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryLocation {
    /// Host name, including a non-default port if the URL had one
    pub host: String,
    /// First path segment: user, organisation or top-level group
    pub owner: String,
    /// Remaining path segments, `/`-joined, without a `.git` suffix.
    /// May contain subgroups (`group/sub/repo`).
    pub repository: String,
}

/// Parse a repository URL
///
/// # Example
///
/// ```rust
/// use gitsync_sdk::resolver::resolve;
///
/// let location = resolve("https://gitlab.com/foo/group/bar.git").unwrap();
/// assert_eq!(location.host, "gitlab.com");
/// assert_eq!(location.owner, "foo");
/// assert_eq!(location.repository, "group/bar");
/// ```
pub fn resolve(repo_url: &str) -> Result<RepositoryLocation> {
    let shown = redact(repo_url);
    let parsed = Url::parse(repo_url.trim())
        .map_err(|e| GitError::InvalidUrl(format!("{:?}: {}", shown, e)))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(GitError::UnsupportedScheme(other.to_string())),
    }

    let host = match parsed.host_str() {
        Some(host) if !host.is_empty() => match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        },
        _ => return Err(GitError::InvalidUrl(format!("{:?} has no host", shown))),
    };

    let mut segments = Vec::new();
    for raw in parsed.path().split('/').filter(|s| !s.is_empty()) {
        let decoded = urlencoding::decode(raw)
            .map_err(|e| GitError::InvalidPath(format!("{:?}: {}", shown, e)))?;
        segments.push(decoded.into_owned());
    }

    if segments.len() < 2 {
        return Err(GitError::InvalidPath(shown.clone()));
    }

    let owner = segments.remove(0);
    let joined = segments.join("/");
    let repository = joined.strip_suffix(".git").unwrap_or(&joined).to_string();
    if repository.is_empty() || repository.ends_with('/') {
        return Err(GitError::InvalidPath(shown.clone()));
    }

    Ok(RepositoryLocation {
        host,
        owner,
        repository,
    })
}

/// Replace any `user:password@` in the authority with `***@` for display
fn redact(repo_url: &str) -> String {
    let Some((scheme, rest)) = repo_url.split_once("://") else {
        return repo_url.to_string();
    };
    let authority_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{}://***@{}", scheme, &rest[at + 1..]),
        None => repo_url.to_string(),
    }
}
