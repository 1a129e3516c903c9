//! Tests for backend routing with injected constructors

mod common;

use std::sync::{Arc, Mutex};

use common::StubBackend;
use gitsync_sdk::{
    BackendConstructor, BackendFactory, BackendKind, Context, GitError, RepositoryLocation,
    SharedBackend,
};

fn stub(kind: BackendKind, seen: Arc<Mutex<Vec<String>>>) -> BackendConstructor {
    Arc::new(move |location: &RepositoryLocation, token: &str| {
        seen.lock().unwrap().push(format!("{}:{}", kind, location.host));
        Ok(Arc::new(StubBackend {
            kind,
            location: location.clone(),
            token: token.to_string(),
        }) as SharedBackend)
    })
}

fn factory() -> (BackendFactory, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let factory = BackendFactory::new(
        stub(BackendKind::GitHub, seen.clone()),
        stub(BackendKind::GitLab, seen.clone()),
    );
    (factory, seen)
}

mod routing_tests {
    use super::*;

    #[test]
    fn test_github_dot_com_routes_to_github() {
        let (factory, seen) = factory();
        let backend = factory
            .create_backend(&Context::background(), "https://github.com/foo/bar.git", "t")
            .unwrap();

        assert_eq!(backend.kind(), BackendKind::GitHub);
        assert_eq!(backend.owner(), "foo");
        assert_eq!(backend.repository(), "bar");
        assert_eq!(seen.lock().unwrap().as_slice(), ["github:github.com"]);
    }

    #[test]
    fn test_every_other_host_routes_to_gitlab() {
        let (factory, _) = factory();
        for url in [
            "https://gitlab.com/foo/bar",
            "https://mycompany.com/foo/bar",
            "https://git.mycompany.com:8443/team/group/app.git",
            "https://api.github.com/foo/bar",
        ] {
            let backend = factory
                .create_backend(&Context::background(), url, "t")
                .unwrap();
            assert_eq!(backend.kind(), BackendKind::GitLab, "{}", url);
        }
    }

    #[test]
    fn test_self_hosted_host_is_passed_through() {
        let (factory, _) = factory();
        let backend = factory
            .create_backend(
                &Context::background(),
                "https://git.mycompany.com:8443/team/group/app.git",
                "t",
            )
            .unwrap();
        assert_eq!(backend.host(), "git.mycompany.com:8443");
        assert_eq!(backend.repository(), "group/app");
    }
}

mod error_tests {
    use super::*;

    #[test]
    fn test_resolver_errors_propagate_without_construction() {
        let (factory, seen) = factory();
        let ctx = Context::background();

        assert!(matches!(
            factory.create_backend(&ctx, "ssh://github.com/foo/bar", "t"),
            Err(GitError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            factory.create_backend(&ctx, "https://github.com/foo", "t"),
            Err(GitError::InvalidPath(_))
        ));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_cancelled_context_is_rejected() {
        let (factory, seen) = factory();
        let (ctx, cancel) = Context::background().with_cancel();
        cancel.cancel();

        let result = factory.create_backend(&ctx, "https://github.com/foo/bar", "t");
        assert!(matches!(result, Err(GitError::Cancelled { last: None })));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_constructor_errors_propagate() {
        let (factory, _) = factory();
        let failing: BackendConstructor =
            Arc::new(|_: &RepositoryLocation, _: &str| Err(GitError::Client("boom".to_string())));
        let factory = factory.with_gitlab(failing);

        assert!(matches!(
            factory.create_backend(&Context::background(), "https://gitlab.com/a/b", "t"),
            Err(GitError::Client(_))
        ));
        assert!(
            factory
                .create_backend(&Context::background(), "https://github.com/a/b", "t")
                .is_ok()
        );
    }
}

mod identity_tests {
    use super::*;

    #[test]
    fn test_identity_through_handle() {
        let (factory, _) = factory();
        let ctx = Context::background();
        let github = factory
            .create_backend(&ctx, "https://github.com/foo/bar", "t")
            .unwrap();
        let gitlab = factory
            .create_backend(&ctx, "https://gitlab.com/foo/bar", "t")
            .unwrap();

        assert_eq!(
            github.identity("main", "env/values.yaml"),
            "github-foo-bar-main-env-values-yaml"
        );
        assert_eq!(
            gitlab.identity("main", "env/values.yaml"),
            "gitlab-foo-bar-main-env-values-yaml"
        );
        assert_eq!(
            github.identity("main", "env/values.yaml"),
            github.identity("main", "env/values.yaml")
        );
    }
}
