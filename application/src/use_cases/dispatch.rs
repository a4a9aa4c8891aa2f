//! Dispatch use case
//!
//! Turns an execution request into a durable pending record plus a queued
//! task, and hands the caller an execution id without waiting for the tool.
//!
//! Ordering: the pending record is written *before* the task is queued, so
//! no worker can observe an execution id that has no record.

use crate::ports::execution_logger::{ExecutionEvent, ExecutionLogger, NoExecutionLogger};
use crate::ports::task_queue::{TaskQueue, ToolTask};
use crate::use_cases::ledger::{ExecutionLedger, LedgerError};
use crate::use_cases::registry::{RegistryError, ToolRegistry};
use relay_domain::{
    ExecutionId, ExecutionOutcome, ExecutionRecord, ExecutionStatus, ToolError,
};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Errors surfaced synchronously to the submitter
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("tool '{0}' not found")]
    ToolNotFound(String),

    #[error("registry error: {0}")]
    Registry(RegistryError),

    #[error("failed to record execution: {0}")]
    Ledger(#[from] LedgerError),
}

impl From<RegistryError> for DispatchError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotFound(name) => DispatchError::ToolNotFound(name),
            other => DispatchError::Registry(other),
        }
    }
}

/// Input for the dispatcher
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub tool_name: String,
    pub args: Value,
    pub callback_url: Option<String>,
}

impl SubmitRequest {
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

/// What the submitter gets back: always an id it can poll
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmitReceipt {
    pub execution_id: ExecutionId,
    /// `pending`, or `error` when the queue refused the task
    pub status: ExecutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Use case for submitting tool executions
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    ledger: Arc<ExecutionLedger>,
    queue: Arc<dyn TaskQueue>,
    logger: Arc<dyn ExecutionLogger>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ToolRegistry>,
        ledger: Arc<ExecutionLedger>,
        queue: Arc<dyn TaskQueue>,
    ) -> Self {
        Self {
            registry,
            ledger,
            queue,
            logger: Arc::new(NoExecutionLogger),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn ExecutionLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Submit an execution.
    ///
    /// Unknown tools fail before anything is written or queued. A queue
    /// failure is recorded in the execution record and reported in the
    /// receipt, but the id is still returned.
    pub async fn submit(&self, request: SubmitRequest) -> Result<SubmitReceipt, DispatchError> {
        let descriptor = self.registry.resolve(&request.tool_name).await?;

        let execution_id = ExecutionId::generate();
        let record = ExecutionRecord::pending(
            &descriptor.name,
            request.args.clone(),
            request.callback_url.clone(),
        );
        self.ledger.create_pending(&execution_id, &record).await?;

        self.logger.log(ExecutionEvent::new(
            ExecutionEvent::SUBMITTED,
            json!({
                "execution_id": execution_id.as_str(),
                "tool": descriptor.name,
                "queue": descriptor.queue,
                "callback_url": request.callback_url,
            }),
        ));

        let task = ToolTask {
            execution_id: execution_id.clone(),
            tool: descriptor.name.clone(),
            args: request.args,
            callback_url: request.callback_url,
        };

        match self.queue.submit(&descriptor.queue, task).await {
            Ok(task_id) => {
                info!(
                    execution_id = %execution_id,
                    tool = %descriptor.name,
                    queue = %descriptor.queue,
                    task_id = %task_id,
                    "Execution dispatched"
                );
                Ok(SubmitReceipt {
                    execution_id,
                    status: ExecutionStatus::Pending,
                    error: None,
                })
            }
            Err(e) => {
                let message = format!("failed to queue task: {e}");
                warn!(
                    execution_id = %execution_id,
                    tool = %descriptor.name,
                    queue = %descriptor.queue,
                    error = %e,
                    "Dispatch failed"
                );
                let outcome = ExecutionOutcome::Failed(ToolError::dispatch_failed(&message));
                if let Err(ledger_err) = self.ledger.finish(&execution_id, &outcome).await {
                    warn!(
                        execution_id = %execution_id,
                        error = %ledger_err,
                        "Failed to record dispatch failure"
                    );
                }
                self.logger.log(ExecutionEvent::new(
                    ExecutionEvent::DISPATCH_FAILED,
                    json!({
                        "execution_id": execution_id.as_str(),
                        "tool": descriptor.name,
                        "queue": descriptor.queue,
                        "error": message,
                    }),
                ));
                Ok(SubmitReceipt {
                    execution_id,
                    status: ExecutionStatus::Error,
                    error: Some(message),
                })
            }
        }
    }

    /// Current record of an execution; `None` for ids this store never issued.
    pub async fn status(&self, execution_id: &str) -> Result<Option<ExecutionRecord>, DispatchError> {
        let Ok(id) = ExecutionId::parse(execution_id) else {
            return Ok(None);
        };
        Ok(self.ledger.get(&id).await?)
    }
}
