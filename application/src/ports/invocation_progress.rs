//! Invocation progress port
//!
//! Lets the presentation layer follow an aggregator invocation while the
//! caller is blocked waiting for a result.

use relay_domain::{BackendEndpoint, ExecutionOutcome};
use std::time::Duration;

/// Callback for progress updates during an aggregator invocation
///
/// Implementations live in the presentation layer (spinner, plain log, ...).
pub trait InvocationProgress: Send + Sync {
    /// The run request was accepted by `backend`
    fn on_dispatched(&self, tool: &str, backend: &BackendEndpoint, execution_id: &str);

    /// No callback arrived within `waited`; falling back to polling
    fn on_callback_timeout(&self, _execution_id: &str, _waited: Duration) {}

    /// Poll attempt `attempt` of `budget` found the execution still pending
    fn on_poll_attempt(&self, _execution_id: &str, _attempt: u32, _budget: u32) {}

    /// A terminal outcome is available
    fn on_finished(&self, tool: &str, outcome: &ExecutionOutcome);
}

/// No-op progress for when progress reporting is not needed
pub struct NoInvocationProgress;

impl InvocationProgress for NoInvocationProgress {
    fn on_dispatched(&self, _tool: &str, _backend: &BackendEndpoint, _execution_id: &str) {}
    fn on_finished(&self, _tool: &str, _outcome: &ExecutionOutcome) {}
}
