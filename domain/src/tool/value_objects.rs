//! Tool domain value objects: immutable error types
//!
//! A [`ToolError`] is how every tool failure is represented once it leaves
//! the implementation: in the execution record, in the callback payload and
//! in the final result handed back to the caller.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Error that occurred while resolving or executing a tool.
///
/// | Code | Description |
/// |------|-------------|
/// | `NOT_FOUND` | Unknown tool |
/// | `INVALID_ARGUMENT` | Arguments do not match the tool's schema |
/// | `EXECUTION_FAILED` | The implementation returned an error or panicked |
/// | `DISPATCH_FAILED` | The task could not be handed to the queue |
/// | `TIMEOUT` | No result within the wait budget |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolError {
    /// Error code (e.g., "NOT_FOUND", "EXECUTION_FAILED")
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub const NOT_FOUND: &'static str = "NOT_FOUND";
    pub const INVALID_ARGUMENT: &'static str = "INVALID_ARGUMENT";
    pub const EXECUTION_FAILED: &'static str = "EXECUTION_FAILED";
    pub const DISPATCH_FAILED: &'static str = "DISPATCH_FAILED";
    pub const TIMEOUT: &'static str = "TIMEOUT";

    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Common error constructors
    pub fn not_found(tool: impl Into<String>) -> Self {
        Self::new(
            Self::NOT_FOUND,
            format!("Tool {} not found", tool.into()),
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(Self::INVALID_ARGUMENT, message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new(Self::EXECUTION_FAILED, message)
    }

    pub fn dispatch_failed(message: impl Into<String>) -> Self {
        Self::new(Self::DISPATCH_FAILED, message)
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(
            Self::TIMEOUT,
            format!("Operation timed out: {}", operation.into()),
        )
    }

    /// The shape stored in an execution record's `result` field:
    /// `{"error": "<message>", "code": "<code>"}`
    pub fn to_payload(&self) -> Value {
        let mut payload = json!({ "error": self.message, "code": self.code });
        if let Some(details) = &self.details {
            payload["details"] = json!(details);
        }
        payload
    }

    /// Read an error back from a stored payload.
    ///
    /// Accepts the structured form as well as a bare string, which is what
    /// older workers and foreign backends send.
    pub fn from_payload(payload: &Value) -> Self {
        match payload {
            Value::String(message) => Self::execution_failed(message.clone()),
            Value::Object(map) => {
                let message = map
                    .get("error")
                    .or_else(|| map.get("message"))
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                let code = map
                    .get("code")
                    .and_then(Value::as_str)
                    .unwrap_or(Self::EXECUTION_FAILED);
                let mut error = Self::new(code, message);
                if let Some(details) = map.get("details").and_then(Value::as_str) {
                    error = error.with_details(details);
                }
                error
            }
            Value::Null => Self::execution_failed("unknown error"),
            other => Self::execution_failed(other.to_string()),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code == Self::NOT_FOUND
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolError {}
