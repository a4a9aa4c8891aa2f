//! Worker execution wrapper
//!
//! Queue-side entry point for a [`ToolTask`]. Per task:
//!
//! ```text
//! Received ──▶ Resolving ──▶ Executing ──▶ Completed
//!                  │             │
//!                  └─────────────┴───────▶ Failed
//! ```
//!
//! The outcome is written to the execution record first and pushed to the
//! task's callback address second. Tool failures (unknown tool, bad
//! arguments, error return, panic) are captured as a `Failed` outcome and the
//! task is still acknowledged, so the queue never redelivers a
//! deterministically failing job. When the record cannot be written, no
//! callback is sent and the task is reported [`TaskReport::Unstored`] so the
//! queue delivers it again.

use crate::ports::callback_sender::CallbackSender;
use crate::ports::execution_logger::{ExecutionEvent, ExecutionLogger, NoExecutionLogger};
use crate::ports::task_queue::{TaskHandler, TaskReport, ToolTask};
use crate::use_cases::ledger::{ExecutionLedger, FinishResult};
use async_trait::async_trait;
use relay_domain::{
    CallbackPayload, DefaultToolValidator, ExecutionOutcome, ToolCatalog, ToolError,
    ToolValidator,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Stage of a single task inside the worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerStage {
    Received,
    Resolving,
    Executing,
    Completed,
    Failed,
}

impl WorkerStage {
    pub fn as_str(&self) -> &str {
        match self {
            WorkerStage::Received => "received",
            WorkerStage::Resolving => "resolving",
            WorkerStage::Executing => "executing",
            WorkerStage::Completed => "completed",
            WorkerStage::Failed => "failed",
        }
    }
}

impl std::fmt::Display for WorkerStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Runs catalog tools for queued tasks
pub struct WorkerExecutor {
    catalog: Arc<ToolCatalog>,
    ledger: Arc<ExecutionLedger>,
    callbacks: Arc<dyn CallbackSender>,
    validator: Arc<dyn ToolValidator>,
    logger: Arc<dyn ExecutionLogger>,
}

impl WorkerExecutor {
    pub fn new(
        catalog: Arc<ToolCatalog>,
        ledger: Arc<ExecutionLedger>,
        callbacks: Arc<dyn CallbackSender>,
    ) -> Self {
        Self {
            catalog,
            ledger,
            callbacks,
            validator: Arc::new(DefaultToolValidator),
            logger: Arc::new(NoExecutionLogger),
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn ToolValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn ExecutionLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Resolve and run the task's tool, capturing every failure.
    pub async fn execute(&self, task: &ToolTask) -> ExecutionOutcome {
        self.trace_stage(task, WorkerStage::Resolving);
        let Some(tool) = self.catalog.get(&task.tool) else {
            return ExecutionOutcome::Failed(ToolError::not_found(&task.tool));
        };

        if let Err(e) = self.validator.validate(&task.args, &tool.descriptor()) {
            return ExecutionOutcome::Failed(e);
        }
        let args = task.args.as_object().cloned().unwrap_or_default();

        self.trace_stage(task, WorkerStage::Executing);
        // Tools are synchronous; keep them off the async workers and turn a
        // panic into an ordinary failure.
        match tokio::task::spawn_blocking(move || tool.invoke(&args)).await {
            Ok(result) => result.into(),
            Err(join_err) if join_err.is_panic() => {
                let panic = join_err.into_panic();
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                ExecutionOutcome::Failed(ToolError::execution_failed(format!(
                    "tool panicked: {message}"
                )))
            }
            Err(join_err) => ExecutionOutcome::Failed(ToolError::execution_failed(format!(
                "tool task aborted: {join_err}"
            ))),
        }
    }

    /// Store-then-notify for one task.
    async fn process(&self, task: ToolTask) -> TaskReport {
        self.trace_stage(&task, WorkerStage::Received);

        // Redelivery of an execution that already finished: acknowledge
        // without running the tool again.
        match self.ledger.get(&task.execution_id).await {
            Ok(Some(record)) if record.is_terminal() => {
                self.log_duplicate(&task, record.status.as_str(), "before_execution");
                return TaskReport::Duplicate;
            }
            Ok(Some(_)) => {}
            Ok(None) => warn!(
                execution_id = %task.execution_id,
                tool = %task.tool,
                "No execution record for task; running anyway"
            ),
            Err(e) => warn!(
                execution_id = %task.execution_id,
                error = %e,
                "Could not read execution record before running"
            ),
        }

        let outcome = self.execute(&task).await;
        let stage = if outcome.is_success() {
            WorkerStage::Completed
        } else {
            WorkerStage::Failed
        };
        self.trace_stage(&task, stage);

        // The callback must never announce a result the store does not hold.
        match self.ledger.finish(&task.execution_id, &outcome).await {
            Ok(FinishResult::Written(_)) => {}
            Ok(FinishResult::AlreadyTerminal(record)) => {
                self.log_duplicate(&task, record.status.as_str(), "after_execution");
                return TaskReport::Duplicate;
            }
            Ok(FinishResult::Missing) => {
                warn!(
                    execution_id = %task.execution_id,
                    tool = %task.tool,
                    "Execution record vanished; outcome dropped"
                );
                return TaskReport::Orphaned;
            }
            Err(e) => {
                error!(
                    execution_id = %task.execution_id,
                    tool = %task.tool,
                    error = %e,
                    "Failed to store execution outcome"
                );
                self.logger.log(ExecutionEvent::new(
                    ExecutionEvent::STORE_FAILED,
                    json!({
                        "execution_id": task.execution_id.as_str(),
                        "tool": task.tool,
                        "error": e.to_string(),
                    }),
                ));
                return TaskReport::Unstored;
            }
        }

        match &outcome {
            ExecutionOutcome::Completed(_) => info!(
                execution_id = %task.execution_id,
                tool = %task.tool,
                "Execution completed"
            ),
            ExecutionOutcome::Failed(e) => warn!(
                execution_id = %task.execution_id,
                tool = %task.tool,
                error = %e,
                "Execution failed"
            ),
        }
        self.logger.log(ExecutionEvent::new(
            ExecutionEvent::FINISHED,
            json!({
                "execution_id": task.execution_id.as_str(),
                "tool": task.tool,
                "status": outcome.status().as_str(),
                "result": outcome.result_payload(),
            }),
        ));

        if let Some(url) = &task.callback_url {
            self.notify(&task, url, &outcome).await;
        }

        if outcome.is_success() {
            TaskReport::Completed
        } else {
            TaskReport::Failed
        }
    }

    async fn notify(&self, task: &ToolTask, url: &str, outcome: &ExecutionOutcome) {
        let payload = CallbackPayload::from_outcome(task.execution_id.as_str(), outcome);
        match self.callbacks.send(url, &payload).await {
            Ok(()) => debug!(execution_id = %task.execution_id, url, "Callback delivered"),
            Err(e) => {
                warn!(execution_id = %task.execution_id, url, error = %e, "Callback failed");
                self.logger.log(ExecutionEvent::new(
                    ExecutionEvent::CALLBACK_FAILED,
                    json!({
                        "execution_id": task.execution_id.as_str(),
                        "url": url,
                        "error": e.to_string(),
                    }),
                ));
            }
        }
    }

    fn log_duplicate(&self, task: &ToolTask, stored_status: &str, when: &str) {
        warn!(
            execution_id = %task.execution_id,
            tool = %task.tool,
            status = stored_status,
            "Duplicate delivery of a finished execution"
        );
        self.logger.log(ExecutionEvent::new(
            ExecutionEvent::DUPLICATE_REJECTED,
            json!({
                "execution_id": task.execution_id.as_str(),
                "tool": task.tool,
                "stored_status": stored_status,
                "detected": when,
            }),
        ));
    }

    fn trace_stage(&self, task: &ToolTask, stage: WorkerStage) {
        debug!(execution_id = %task.execution_id, tool = %task.tool, stage = %stage, "Worker stage");
    }
}

#[async_trait]
impl TaskHandler for WorkerExecutor {
    async fn handle(&self, task: ToolTask) -> TaskReport {
        self.process(task).await
    }
}
