//! Tests for the GitLab backend against a scripted transport

mod common;

use std::sync::Arc;

use common::{ScriptedTransport, b64, location};
use gitsync_sdk::transport::Method;
use gitsync_sdk::{Context, FileChange, GitBackend, GitError, GitLabBackend};
use serde_json::json;

const FILE_URL: &str =
    "https://gitlab.example.com/api/v4/projects/foo%2Fgroup%2Fbar/repository/files/env%2Fvalues.yaml";

fn backend(transport: &Arc<ScriptedTransport>) -> GitLabBackend {
    GitLabBackend::new(
        &location("gitlab.example.com", "foo", "group/bar"),
        transport.clone(),
    )
}

fn file_response(content: &str, last_commit_id: &str) -> serde_json::Value {
    json!({
        "file_name": "values.yaml",
        "file_path": "env/values.yaml",
        "encoding": "base64",
        "content": b64(content),
        "ref": "main",
        "blob_id": "b1",
        "commit_id": "c0",
        "last_commit_id": last_commit_id,
    })
}

mod read_tests {
    use super::*;

    #[tokio::test]
    async fn test_read_decodes_content() {
        let transport = ScriptedTransport::new();
        transport.respond_json(200, file_response("{\"a\": 1}", "c1"));

        let file = backend(&transport)
            .read(&Context::background(), "env/values.yaml", "main")
            .await
            .unwrap();

        assert_eq!(file.content, "{\"a\": 1}");
        assert_eq!(file.revision, "c1");
        assert_eq!(transport.requests()[0].url, format!("{}?ref=main", FILE_URL));
    }

    #[tokio::test]
    async fn test_read_encodes_branch() {
        let transport = ScriptedTransport::new();
        transport.respond_json(200, file_response("a: 1", "c1"));

        backend(&transport)
            .read(&Context::background(), "env/values.yaml", "feature/x")
            .await
            .unwrap();

        assert!(transport.requests()[0].url.ends_with("?ref=feature%2Fx"));
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let transport = ScriptedTransport::new();
        transport.respond_json(404, json!({"message": "404 File Not Found"}));

        let err = backend(&transport)
            .read(&Context::background(), "env/values.yaml", "main")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_read_bad_request_is_api_error() {
        let transport = ScriptedTransport::new();
        transport.respond_json(400, json!({"message": "invalid ref"}));

        let err = backend(&transport)
            .read(&Context::background(), "env/values.yaml", "main")
            .await
            .unwrap_err();

        assert!(matches!(err, GitError::Api { status: 400, .. }));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_read_invalid_base64_is_decode_error() {
        let transport = ScriptedTransport::new();
        transport.respond_json(
            200,
            json!({"encoding": "base64", "content": "not base64!", "last_commit_id": "c1"}),
        );

        let err = backend(&transport)
            .read(&Context::background(), "env/values.yaml", "main")
            .await
            .unwrap_err();
        assert!(matches!(err, GitError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_read_malformed_json_is_decode_error() {
        let transport = ScriptedTransport::new();
        transport.respond(200, "<html>");

        let err = backend(&transport)
            .read(&Context::background(), "env/values.yaml", "main")
            .await
            .unwrap_err();
        assert!(matches!(err, GitError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_api_url_override() {
        let transport = ScriptedTransport::new();
        transport.respond_json(200, file_response("a: 1", "c1"));

        backend(&transport)
            .with_api_url("http://localhost:8080/api/v4/")
            .read(&Context::background(), "a.yaml", "main")
            .await
            .unwrap();

        assert!(
            transport.requests()[0]
                .url
                .starts_with("http://localhost:8080/api/v4/projects/")
        );
    }
}

mod create_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_posts_content() {
        let transport = ScriptedTransport::new();
        transport.respond_json(201, json!({"file_path": "env/values.yaml", "branch": "main"}));

        backend(&transport)
            .create(
                &Context::background(),
                &FileChange::new("env/values.yaml", "a: 1\n"),
            )
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].url, FILE_URL);

        let body = requests[0].body.as_ref().unwrap();
        assert_eq!(body["branch"], "main");
        assert_eq!(body["content"], "a: 1\n");
        assert_eq!(
            body["commit_message"],
            r#"Create "env/values.yaml" at branch "main""#
        );
    }

    #[tokio::test]
    async fn test_create_existing_file_is_not_retried() {
        let transport = ScriptedTransport::new();
        transport.respond_json(400, json!({"message": "A file with this name already exists"}));

        let err = backend(&transport)
            .create(
                &Context::background(),
                &FileChange::new("env/values.yaml", "a: 1"),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, GitError::AlreadyExists { .. }));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_retries_bad_request_race() {
        let transport = ScriptedTransport::new();
        transport
            .respond_json(400, json!({"message": "Branch is being updated"}))
            .respond_json(201, json!({"file_path": "env/values.yaml"}));

        backend(&transport)
            .create(
                &Context::background(),
                &FileChange::new("env/values.yaml", "a: 1"),
            )
            .await
            .unwrap();

        assert_eq!(transport.methods(), [Method::Post, Method::Post]);
    }
}

mod update_tests {
    use super::*;

    #[tokio::test]
    async fn test_update_sends_last_commit_id() {
        let transport = ScriptedTransport::new();
        transport
            .respond_json(200, file_response("a: 1", "c1"))
            .respond_json(200, json!({"file_path": "env/values.yaml"}));

        backend(&transport)
            .update(
                &Context::background(),
                &FileChange::new("env/values.yaml", "a: 2"),
            )
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(transport.methods(), [Method::Get, Method::Put]);
        let body = requests[1].body.as_ref().unwrap();
        assert_eq!(body["last_commit_id"], "c1");
        assert_eq!(body["content"], "a: 2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_stale_commit_is_retried_with_fresh_token() {
        let transport = ScriptedTransport::new();
        transport
            .respond_json(200, file_response("a: 1", "c1"))
            .respond_json(
                400,
                json!({"message": "You are attempting to update a file that has changed since you started editing it."}),
            )
            .respond_json(200, file_response("a: 5", "c2"))
            .respond_json(200, json!({"file_path": "env/values.yaml"}));

        backend(&transport)
            .update(
                &Context::background(),
                &FileChange::new("env/values.yaml", "a: 2"),
            )
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[1].body.as_ref().unwrap()["last_commit_id"], "c1");
        assert_eq!(requests[3].body.as_ref().unwrap()["last_commit_id"], "c2");
    }

    #[tokio::test]
    async fn test_update_missing_file_sends_no_mutation() {
        let transport = ScriptedTransport::new();
        transport.respond_json(404, json!({"message": "404 File Not Found"}));

        let err = backend(&transport)
            .update(
                &Context::background(),
                &FileChange::new("env/values.yaml", "a: 2"),
            )
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(transport.mutating_requests().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_cancelled_mid_retry() {
        let transport = ScriptedTransport::new();
        for _ in 0..50 {
            transport
                .respond_json(200, file_response("a: 1", "c1"))
                .respond_json(409, json!({"message": "conflict"}));
        }

        let ctx = Context::background().with_timeout(std::time::Duration::from_secs(5));
        let err = backend(&transport)
            .update(&ctx, &FileChange::new("env/values.yaml", "a: 2"))
            .await
            .unwrap_err();

        assert!(matches!(err, GitError::DeadlineExceeded { last: Some(_) }));
        assert_eq!(err.status(), None);
    }
}

mod delete_tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_sends_last_commit_id() {
        let transport = ScriptedTransport::new();
        transport
            .respond_json(200, file_response("a: 1", "c1"))
            .respond(204, "");

        backend(&transport)
            .delete(&Context::background(), "env/values.yaml", "main")
            .await
            .unwrap();

        let requests = transport.requests();
        assert_eq!(transport.methods(), [Method::Get, Method::Delete]);
        let body = requests[1].body.as_ref().unwrap();
        assert_eq!(body["last_commit_id"], "c1");
        assert_eq!(body["branch"], "main");
        assert_eq!(
            body["commit_message"],
            r#"Delete "env/values.yaml" from branch "main""#
        );
    }

    #[tokio::test]
    async fn test_delete_missing_file_sends_no_mutation() {
        let transport = ScriptedTransport::new();
        transport.respond_json(404, json!({"message": "404 File Not Found"}));

        let err = backend(&transport)
            .delete(&Context::background(), "env/values.yaml", "main")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(transport.mutating_requests().is_empty());
    }
}
