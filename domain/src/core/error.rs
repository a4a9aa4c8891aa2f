//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Tool name must not be empty")]
    EmptyToolName,

    #[error("Invalid execution id: {0:?}")]
    InvalidExecutionId(String),

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Invalid backend endpoint {url:?}: {reason}")]
    InvalidEndpoint { url: String, reason: String },
}

impl DomainError {
    /// Check if this error is a rejected write to a terminal record
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, DomainError::InvalidTransition { .. })
    }
}
