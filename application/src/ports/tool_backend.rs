//! Tool backend port
//!
//! A backend is a remote tool-serving node. The aggregator talks to every
//! configured backend through this trait; the infrastructure layer provides
//! the HTTP implementation.

use async_trait::async_trait;
use relay_domain::{BackendEndpoint, ExecutionRecord, ExecutionStatus, ToolDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a run request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRequest {
    pub tool_name: String,
    #[serde(default)]
    pub args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

impl RunRequest {
    pub fn new(tool_name: impl Into<String>, args: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            args,
            callback_url: None,
        }
    }

    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }
}

/// Backend answer to a run request
#[derive(Debug, Clone, PartialEq)]
pub enum RunResponse {
    /// The backend queued the work (202-style)
    Accepted {
        execution_id: String,
        status: ExecutionStatus,
    },
    /// The backend answered synchronously
    Inline(Value),
}

/// Errors talking to a backend
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend {backend} unreachable: {message}")]
    Unreachable { backend: String, message: String },
    #[error("backend {backend} returned HTTP {status}: {body}")]
    Status {
        backend: String,
        status: u16,
        body: String,
    },
    #[error("backend {backend} sent an invalid response: {message}")]
    InvalidResponse { backend: String, message: String },
}

/// Port for one remote tool-serving backend
#[async_trait]
pub trait ToolBackend: Send + Sync {
    /// Address of this backend
    fn endpoint(&self) -> &BackendEndpoint;

    /// Discovery request: list the tools this backend serves
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, BackendError>;

    /// Run request
    async fn run(&self, request: &RunRequest) -> Result<RunResponse, BackendError>;

    /// Status request; `Ok(None)` if the backend has no such execution
    async fn status(&self, execution_id: &str) -> Result<Option<ExecutionRecord>, BackendError>;

    /// Registration request
    async fn register(&self, descriptor: &ToolDescriptor) -> Result<(), BackendError>;
}
