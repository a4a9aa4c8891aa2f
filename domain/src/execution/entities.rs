//! Execution entities: ids, status, records and outcomes

use crate::core::error::DomainError;
use crate::tool::value_objects::ToolError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque correlation token for one execution.
///
/// Generated ids are UUID v4 strings; ids received from elsewhere are
/// accepted as-is as long as they are non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    /// Generates a fresh, globally unique id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Accepts an id received from a caller or backend.
    pub fn parse(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() || trimmed.contains(char::is_whitespace) {
            return Err(DomainError::InvalidExecutionId(id));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of an execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Completed,
    Error,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ExecutionStatus::Pending)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Terminal result of running a tool
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    Completed(Value),
    Failed(ToolError),
}

impl ExecutionOutcome {
    pub fn status(&self) -> ExecutionStatus {
        match self {
            ExecutionOutcome::Completed(_) => ExecutionStatus::Completed,
            ExecutionOutcome::Failed(_) => ExecutionStatus::Error,
        }
    }

    /// Value stored in the record's `result` field
    pub fn result_payload(&self) -> Value {
        match self {
            ExecutionOutcome::Completed(value) => value.clone(),
            ExecutionOutcome::Failed(error) => error.to_payload(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Completed(_))
    }

    pub fn into_result(self) -> Result<Value, ToolError> {
        match self {
            ExecutionOutcome::Completed(value) => Ok(value),
            ExecutionOutcome::Failed(error) => Err(error),
        }
    }
}

impl From<Result<Value, ToolError>> for ExecutionOutcome {
    fn from(result: Result<Value, ToolError>) -> Self {
        match result {
            Ok(value) => ExecutionOutcome::Completed(value),
            Err(error) => ExecutionOutcome::Failed(error),
        }
    }
}

/// Durable state of one execution, stored under `execution:<id>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub status: ExecutionStatus,
    pub tool: String,
    #[serde(default)]
    pub args: Value,
    /// Tool output, error payload, or null while pending
    #[serde(default)]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ExecutionRecord {
    /// A freshly dispatched execution
    pub fn pending(tool: impl Into<String>, args: Value, callback_url: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            status: ExecutionStatus::Pending,
            tool: tool.into(),
            args,
            result: Value::Null,
            callback_url,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move a pending record to its terminal state.
    ///
    /// Tool, args and callback address are preserved; status and result are
    /// replaced. A terminal record is never changed.
    pub fn finish(&mut self, outcome: &ExecutionOutcome) -> Result<(), DomainError> {
        if self.is_terminal() {
            return Err(DomainError::InvalidTransition {
                from: self.status.to_string(),
                to: outcome.status().to_string(),
            });
        }
        self.status = outcome.status();
        self.result = outcome.result_payload();
        self.updated_at = Some(Utc::now());
        Ok(())
    }

    /// Terminal outcome, if the record has one
    pub fn outcome(&self) -> Option<ExecutionOutcome> {
        match self.status {
            ExecutionStatus::Pending => None,
            ExecutionStatus::Completed => Some(ExecutionOutcome::Completed(self.result.clone())),
            ExecutionStatus::Error => Some(ExecutionOutcome::Failed(ToolError::from_payload(
                &self.result,
            ))),
        }
    }
}
