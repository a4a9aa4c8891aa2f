//! Callback payload sent from a worker to the caller's callback address

use super::entities::{ExecutionOutcome, ExecutionStatus};
use crate::tool::value_objects::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{"execution_id", "status", "result" | "error"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallbackPayload {
    pub execution_id: String,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error message when `status` is `error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl CallbackPayload {
    pub fn from_outcome(execution_id: impl Into<String>, outcome: &ExecutionOutcome) -> Self {
        let execution_id = execution_id.into();
        match outcome {
            ExecutionOutcome::Completed(value) => Self {
                execution_id,
                status: ExecutionStatus::Completed,
                result: Some(value.clone()),
                error: None,
                code: None,
            },
            ExecutionOutcome::Failed(error) => Self {
                execution_id,
                status: ExecutionStatus::Error,
                result: None,
                error: Some(error.message.clone()),
                code: Some(error.code.clone()),
            },
        }
    }

    /// Terminal outcome carried by this payload; `None` for a pending status
    pub fn outcome(&self) -> Option<ExecutionOutcome> {
        match self.status {
            ExecutionStatus::Pending => None,
            ExecutionStatus::Completed => Some(ExecutionOutcome::Completed(
                self.result.clone().unwrap_or(Value::Null),
            )),
            ExecutionStatus::Error => {
                let message = self
                    .error
                    .clone()
                    .or_else(|| self.result.as_ref().map(|r| ToolError::from_payload(r).message))
                    .unwrap_or_else(|| "unknown error".to_string());
                let code = self
                    .code
                    .clone()
                    .unwrap_or_else(|| ToolError::EXECUTION_FAILED.to_string());
                Some(ExecutionOutcome::Failed(ToolError::new(code, message)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_completed_payload_json() {
        let payload = CallbackPayload::from_outcome("e-1", &ExecutionOutcome::Completed(json!(5.0)));
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"execution_id": "e-1", "status": "completed", "result": 5.0})
        );
    }

    #[test]
    fn test_error_payload_round_trip_to_outcome() {
        let outcome = ExecutionOutcome::Failed(ToolError::execution_failed("division by zero"));
        let payload = CallbackPayload::from_outcome("e-2", &outcome);

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["error"], "division by zero");
        assert!(value.get("result").is_none());
        assert_eq!(payload.outcome(), Some(outcome));
    }

    #[test]
    fn test_bare_error_payload_defaults_code() {
        let payload: CallbackPayload = serde_json::from_value(
            json!({"execution_id": "e-3", "status": "error", "error": "boom"}),
        )
        .unwrap();

        match payload.outcome() {
            Some(ExecutionOutcome::Failed(err)) => {
                assert_eq!(err.code, "EXECUTION_FAILED");
                assert_eq!(err.message, "boom");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_pending_payload_has_no_outcome() {
        let payload: CallbackPayload =
            serde_json::from_value(json!({"execution_id": "e-4", "status": "pending"})).unwrap();
        assert!(payload.outcome().is_none());
    }
}
