//! Port for structured execution audit logging.
//!
//! Defines the [`ExecutionLogger`] trait for recording execution lifecycle
//! events (submission, dispatch failure, completion, duplicate deliveries,
//! callback traffic) to a structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures an audit
//! trail in a machine-readable format (JSONL).

use serde_json::Value;

/// A structured execution event for logging.
///
/// Each event has a type string and a JSON payload containing event-specific
/// fields. The logger adds the timestamp.
pub struct ExecutionEvent {
    /// Event type identifier (e.g., "execution_submitted", "callback_failed").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl ExecutionEvent {
    pub const SUBMITTED: &'static str = "execution_submitted";
    pub const DISPATCH_FAILED: &'static str = "dispatch_failed";
    pub const FINISHED: &'static str = "execution_finished";
    pub const DUPLICATE_REJECTED: &'static str = "duplicate_rejected";
    pub const STORE_FAILED: &'static str = "store_failed";
    pub const CALLBACK_FAILED: &'static str = "callback_failed";
    pub const CALLBACK_RECEIVED: &'static str = "callback_received";

    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging execution events to a structured log.
///
/// The `log` method is synchronous and non-fallible so it never disturbs
/// the dispatch or worker path; logging failures are silently ignored.
pub trait ExecutionLogger: Send + Sync {
    /// Record an execution event.
    fn log(&self, event: ExecutionEvent);
}

/// No-op implementation for tests and when audit logging is disabled.
pub struct NoExecutionLogger;

impl ExecutionLogger for NoExecutionLogger {
    fn log(&self, _event: ExecutionEvent) {}
}
