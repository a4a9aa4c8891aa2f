//! Task queue port
//!
//! The queue carries [`ToolTask`]s from dispatchers to worker slots. Delivery
//! is at-least-once: a handler may see the same execution id more than once.

use async_trait::async_trait;
use relay_domain::ExecutionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One queued tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolTask {
    pub execution_id: ExecutionId,
    pub tool: String,
    pub args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

/// What a handler did with a task.
///
/// Tool failures are captured in the execution record, never surfaced as a
/// queue-level failure. Only [`TaskReport::Unstored`] asks the queue to
/// deliver the task again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskReport {
    /// The tool ran and the record was moved to `completed`
    Completed,
    /// The tool could not be resolved, validated or run; record moved to `error`
    Failed,
    /// The record was already terminal (duplicate delivery); tool not run
    Duplicate,
    /// No record exists for the execution id; nothing stored, nobody notified
    Orphaned,
    /// The outcome could not be written to the store; the record is still
    /// pending and the task should be redelivered
    Unstored,
}

impl TaskReport {
    /// Whether the queue should hand the task out again
    pub fn wants_redelivery(&self) -> bool {
        matches!(self, TaskReport::Unstored)
    }
}

/// Queue errors surfaced at submit time
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("no workers bound to queue '{0}'")]
    UnknownQueue(String),
    #[error("queue '{0}' is shut down")]
    Closed(String),
    #[error("queue '{0}' is full")]
    Full(String),
    #[error("queue unavailable: {0}")]
    Unavailable(String),
}

/// Submit side of the task queue
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Enqueue a task on the named queue and return the queue-assigned task id.
    async fn submit(&self, queue: &str, task: ToolTask) -> Result<String, QueueError>;
}

/// Worker side of the task queue
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Process one delivered task.
    async fn handle(&self, task: ToolTask) -> TaskReport;
}
