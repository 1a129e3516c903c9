//! Deterministic resource identifiers
//!
//! An identity correlates a (backend, owner, repository, branch, path) tuple
//! across operations. It is only ever used as an external key and is never
//! sent to a hosting API.

use std::fmt;

use crate::backend::BackendKind;

/// Replace path separators and dots with `-` so the value is usable as a key
pub fn sanitize(segment: &str) -> String {
    segment.replace(['/', '.'], "-")
}

/// Identity of a managed file: `{backend}-{owner}-{repository}-{branch}-{path}`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdentity {
    pub kind: BackendKind,
    pub owner: String,
    pub repository: String,
    pub branch: String,
    pub path: String,
}

impl ResourceIdentity {
    pub fn new(
        kind: BackendKind,
        owner: impl Into<String>,
        repository: impl Into<String>,
        branch: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            owner: owner.into(),
            repository: repository.into(),
            branch: branch.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}-{}",
            self.kind,
            self.owner,
            self.repository,
            sanitize(&self.branch),
            sanitize(&self.path)
        )
    }
}
