//! Callback intake
//!
//! Front door of the notification mediator for callbacks arriving over the
//! network. With an [`ExecutionLookup`] configured, a delivery is accepted
//! only when it matches a finished execution the lookup knows about:
//!
//! | Check | Rejection |
//! |-------|-----------|
//! | id is known | [`IntakeError::UnknownExecution`] |
//! | record is terminal | [`IntakeError::NotTerminal`] |
//! | claimed status matches stored status | [`IntakeError::StatusMismatch`] |
//! | claimed result matches stored result | [`IntakeError::ResultMismatch`] |
//!
//! A verified delivery hands the mediator the outcome read from the record,
//! not the one in the request body. Without a lookup every well-formed
//! delivery is accepted as sent.

use crate::ports::execution_logger::{ExecutionEvent, ExecutionLogger, NoExecutionLogger};
use crate::ports::execution_lookup::{ExecutionLookup, LookupError};
use crate::use_cases::notification::NotificationMediator;
use relay_domain::{CallbackPayload, DomainError, ExecutionId, ExecutionStatus};
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum IntakeError {
    #[error(transparent)]
    InvalidId(#[from] DomainError),

    #[error("unknown execution {0}")]
    UnknownExecution(String),

    #[error("execution {0} has not finished")]
    NotTerminal(String),

    #[error("execution {execution_id} is {stored}, callback claims {claimed}")]
    StatusMismatch {
        execution_id: String,
        claimed: ExecutionStatus,
        stored: ExecutionStatus,
    },

    #[error("execution {0} result does not match the stored record")]
    ResultMismatch(String),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

pub struct CallbackIntake {
    mediator: Arc<NotificationMediator>,
    lookup: Option<Arc<dyn ExecutionLookup>>,
    logger: Arc<dyn ExecutionLogger>,
}

impl CallbackIntake {
    pub fn new(mediator: Arc<NotificationMediator>) -> Self {
        Self {
            mediator,
            lookup: None,
            logger: Arc::new(NoExecutionLogger),
        }
    }

    /// Verify deliveries against execution records before accepting them
    pub fn with_lookup(mut self, lookup: Arc<dyn ExecutionLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn ExecutionLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Validate a delivery and hand it to the mediator.
    pub async fn accept(&self, payload: CallbackPayload) -> Result<(), IntakeError> {
        let execution_id = ExecutionId::parse(payload.execution_id.as_str())?;

        let payload = match self.verify(&execution_id, payload).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(execution_id = %execution_id, error = %e, "Callback rejected");
                return Err(e);
            }
        };

        let had_waiter = self.mediator.deliver(payload.clone());
        debug!(execution_id = %execution_id, had_waiter, "Callback accepted");
        self.logger.log(ExecutionEvent::new(
            ExecutionEvent::CALLBACK_RECEIVED,
            json!({
                "execution_id": execution_id.as_str(),
                "status": payload.status.as_str(),
                "had_waiter": had_waiter,
            }),
        ));
        Ok(())
    }

    /// Payload to deliver: the request body as-is without a lookup, otherwise
    /// the outcome of the stored record it was checked against.
    async fn verify(
        &self,
        execution_id: &ExecutionId,
        payload: CallbackPayload,
    ) -> Result<CallbackPayload, IntakeError> {
        let Some(lookup) = &self.lookup else {
            return Ok(payload);
        };
        let record = lookup
            .lookup(execution_id.as_str())
            .await?
            .ok_or_else(|| IntakeError::UnknownExecution(execution_id.to_string()))?;

        let Some(stored) = record.outcome() else {
            return Err(IntakeError::NotTerminal(execution_id.to_string()));
        };
        if record.status != payload.status {
            return Err(IntakeError::StatusMismatch {
                execution_id: execution_id.to_string(),
                claimed: payload.status,
                stored: record.status,
            });
        }

        let verified = CallbackPayload::from_outcome(execution_id.as_str(), &stored);
        let matches = match payload.status {
            ExecutionStatus::Error => {
                payload.error == verified.error
                    && payload
                        .code
                        .as_ref()
                        .is_none_or(|code| Some(code) == verified.code.as_ref())
            }
            _ => {
                payload.result.unwrap_or(Value::Null)
                    == verified.result.clone().unwrap_or(Value::Null)
            }
        };
        if !matches {
            return Err(IntakeError::ResultMismatch(execution_id.to_string()));
        }
        Ok(verified)
    }
}
