//! Multi-backend aggregator
//!
//! Client-side view over several tool-serving backends.
//!
//! - **Discovery** fans a listing request out to every backend concurrently.
//!   Unreachable backends are skipped; the rest are merged by tool name,
//!   later backends overwriting earlier ones.
//! - **Invocation** sends the run request to the first backend with a
//!   callback address pointing at this process, waits on the
//!   [`NotificationMediator`] and falls back to polling the backend's status
//!   endpoint when no callback shows up in time.

use crate::config::WaitParams;
use crate::ports::invocation_progress::{InvocationProgress, NoInvocationProgress};
use crate::ports::tool_backend::{BackendError, RunRequest, RunResponse, ToolBackend};
use crate::use_cases::notification::{NotificationMediator, WaitOutcome};
use futures::future::join_all;
use relay_domain::{BackendEndpoint, BackendSet, ExecutionOutcome, ToolDescriptor};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum InvokeError {
    #[error("no backends configured")]
    NoBackends,

    #[error("tool '{0}' not found")]
    ToolNotFound(String),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("no result for execution {execution_id} after {waited:?}")]
    WaitTimeout {
        execution_id: String,
        waited: Duration,
    },
}

/// Result of one discovery round
#[derive(Debug, Clone, Default)]
pub struct DiscoveryReport {
    /// Merged tools, sorted by name
    pub tools: Vec<ToolDescriptor>,
    /// Backends whose listing failed, with the reason
    pub failed_backends: Vec<(BackendEndpoint, String)>,
}

pub struct MultiBackendAggregator {
    backends: Vec<Arc<dyn ToolBackend>>,
    mediator: Arc<NotificationMediator>,
    callback_url: Option<String>,
    params: WaitParams,
    tools: RwLock<HashMap<String, ToolDescriptor>>,
}

impl MultiBackendAggregator {
    /// Backends with the same normalized endpoint are kept once.
    pub fn new(
        backends: impl IntoIterator<Item = Arc<dyn ToolBackend>>,
        mediator: Arc<NotificationMediator>,
    ) -> Self {
        let mut seen = BackendSet::new();
        let backends = backends
            .into_iter()
            .filter(|b| seen.insert(b.endpoint().clone()))
            .collect();
        Self {
            backends,
            mediator,
            callback_url: None,
            params: WaitParams::default(),
            tools: RwLock::new(HashMap::new()),
        }
    }

    /// Address backends should POST callbacks to
    pub fn with_callback_url(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }

    pub fn with_wait_params(mut self, params: WaitParams) -> Self {
        self.params = params;
        self
    }

    pub fn backends(&self) -> impl Iterator<Item = &BackendEndpoint> {
        self.backends.iter().map(|b| b.endpoint())
    }

    /// Backend used for invocation, status and registration
    pub fn primary(&self) -> Option<&Arc<dyn ToolBackend>> {
        self.backends.first()
    }

    /// Query every backend and merge their tool lists.
    pub async fn discover(&self) -> DiscoveryReport {
        let listings = join_all(self.backends.iter().map(|backend| async move {
            (backend.endpoint().clone(), backend.list_tools().await)
        }))
        .await;

        let mut merged: HashMap<String, ToolDescriptor> = HashMap::new();
        let mut failed_backends = Vec::new();
        for (endpoint, listing) in listings {
            match listing {
                Ok(tools) => {
                    debug!(backend = %endpoint, count = tools.len(), "Backend listed tools");
                    for tool in tools {
                        merged.insert(tool.name.clone(), tool);
                    }
                }
                Err(e) => {
                    warn!(backend = %endpoint, error = %e, "Backend discovery failed");
                    failed_backends.push((endpoint, e.to_string()));
                }
            }
        }

        let mut tools: Vec<ToolDescriptor> = merged.values().cloned().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        info!(
            tools = tools.len(),
            failed = failed_backends.len(),
            "Discovery finished"
        );
        *self.tools.write().await = merged;

        DiscoveryReport {
            tools,
            failed_backends,
        }
    }

    /// Tools from the last discovery round, sorted by name
    pub async fn cached_tools(&self) -> Vec<ToolDescriptor> {
        let mut tools: Vec<ToolDescriptor> = self.tools.read().await.values().cloned().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    pub async fn invoke(&self, tool: &str, args: Value) -> Result<ExecutionOutcome, InvokeError> {
        self.invoke_with_progress(tool, args, &NoInvocationProgress)
            .await
    }

    /// Run a tool on the primary backend and block until its outcome is known.
    pub async fn invoke_with_progress(
        &self,
        tool: &str,
        args: Value,
        progress: &dyn InvocationProgress,
    ) -> Result<ExecutionOutcome, InvokeError> {
        let backend = self.primary().ok_or(InvokeError::NoBackends)?;

        let mut request = RunRequest::new(tool, args);
        if let Some(url) = &self.callback_url {
            request = request.with_callback_url(url.clone());
        }

        let response = backend.run(&request).await.map_err(|e| match e {
            BackendError::Status { status: 404, .. } => InvokeError::ToolNotFound(tool.to_string()),
            other => InvokeError::Backend(other),
        })?;

        let (execution_id, status) = match response {
            RunResponse::Inline(value) => {
                let outcome = ExecutionOutcome::Completed(value);
                progress.on_finished(tool, &outcome);
                return Ok(outcome);
            }
            RunResponse::Accepted {
                execution_id,
                status,
            } => (execution_id, status),
        };

        info!(
            execution_id = %execution_id,
            tool,
            backend = %backend.endpoint(),
            "Execution accepted"
        );
        progress.on_dispatched(tool, backend.endpoint(), &execution_id);

        // A terminal status here means the backend failed to queue the task;
        // no callback will follow.
        let expect_callback = self.callback_url.is_some() && !status.is_terminal();
        let result = self
            .await_outcome(backend.as_ref(), &execution_id, expect_callback, progress)
            .await;
        self.mediator.cleanup(&execution_id);

        if let Ok(outcome) = &result {
            progress.on_finished(tool, outcome);
        }
        result
    }

    async fn await_outcome(
        &self,
        backend: &dyn ToolBackend,
        execution_id: &str,
        expect_callback: bool,
        progress: &dyn InvocationProgress,
    ) -> Result<ExecutionOutcome, InvokeError> {
        let started = tokio::time::Instant::now();

        if expect_callback {
            match self
                .mediator
                .wait(execution_id, self.params.callback_timeout)
                .await
            {
                WaitOutcome::Delivered(payload) => {
                    if let Some(outcome) = payload.outcome() {
                        debug!(execution_id, "Result delivered by callback");
                        return Ok(outcome);
                    }
                }
                WaitOutcome::TimedOut => {
                    debug!(execution_id, "No callback in time; polling");
                    progress.on_callback_timeout(execution_id, self.params.callback_timeout);
                }
            }
        }

        let budget = self.params.poll_attempts;
        for attempt in 1..=budget {
            // A callback may still land while polling
            if let Some(outcome) = self
                .mediator
                .try_result(execution_id)
                .and_then(|p| p.outcome())
            {
                return Ok(outcome);
            }

            match backend.status(execution_id).await {
                Ok(Some(record)) => {
                    if let Some(outcome) = record.outcome() {
                        debug!(execution_id, attempt, "Result found by polling");
                        return Ok(outcome);
                    }
                }
                Ok(None) => debug!(execution_id, attempt, "Backend does not know execution yet"),
                Err(e) => warn!(execution_id, attempt, error = %e, "Status poll failed"),
            }

            progress.on_poll_attempt(execution_id, attempt, budget);
            if attempt < budget {
                tokio::time::sleep(self.params.poll_interval).await;
            }
        }

        Err(InvokeError::WaitTimeout {
            execution_id: execution_id.to_string(),
            waited: started.elapsed(),
        })
    }
}
