//! Shared fakes for integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use gitsync_sdk::backend::{BackendKind, FileChange, GitBackend, RemoteFile};
use gitsync_sdk::transport::{ApiRequest, ApiResponse, Method, Transport, TransportError};
use gitsync_sdk::{Context, GitError, RepositoryLocation, Result};

/// Transport that answers from a script and records every request
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<std::result::Result<ApiResponse, TransportError>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, status: u16, body: impl Into<String>) -> &Self {
        self.push(Ok(ApiResponse::new(status, body)))
    }

    pub fn respond_json(&self, status: u16, body: serde_json::Value) -> &Self {
        self.respond(status, body.to_string())
    }

    pub fn fail(&self, message: &str) -> &Self {
        self.push(Err(TransportError(message.to_string())))
    }

    fn push(&self, response: std::result::Result<ApiResponse, TransportError>) -> &Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn mutating_requests(&self) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method.is_mutating())
            .collect()
    }

    pub fn methods(&self) -> Vec<Method> {
        self.requests().iter().map(|r| r.method).collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> std::result::Result<ApiResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError("script exhausted".to_string())))
    }
}

pub fn b64(content: &str) -> String {
    STANDARD.encode(content)
}

pub fn location(host: &str, owner: &str, repository: &str) -> RepositoryLocation {
    RepositoryLocation {
        host: host.to_string(),
        owner: owner.to_string(),
        repository: repository.to_string(),
    }
}

/// Backend that only records which constructor produced it
pub struct StubBackend {
    pub kind: BackendKind,
    pub location: RepositoryLocation,
    pub token: String,
}

#[async_trait]
impl GitBackend for StubBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn host(&self) -> &str {
        &self.location.host
    }

    fn owner(&self) -> &str {
        &self.location.owner
    }

    fn repository(&self) -> &str {
        &self.location.repository
    }

    async fn create(&self, _ctx: &Context, _change: &FileChange) -> Result<()> {
        Ok(())
    }

    async fn read(&self, _ctx: &Context, path: &str, branch: &str) -> Result<RemoteFile> {
        Err(GitError::NotFound {
            location: gitsync_sdk::FileLocation::new(path, branch),
        })
    }

    async fn update(&self, _ctx: &Context, _change: &FileChange) -> Result<()> {
        Ok(())
    }

    async fn delete(&self, _ctx: &Context, _path: &str, _branch: &str) -> Result<()> {
        Ok(())
    }
}
