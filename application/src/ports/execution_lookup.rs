//! Execution lookup port
//!
//! Read access to execution records, used by the callback intake to check
//! that a delivery refers to an execution this caller actually dispatched.

use async_trait::async_trait;
use relay_domain::ExecutionRecord;

#[derive(Debug, thiserror::Error)]
#[error("execution lookup failed: {0}")]
pub struct LookupError(pub String);

#[async_trait]
pub trait ExecutionLookup: Send + Sync {
    /// Current record for `execution_id`, or `None` if unknown
    async fn lookup(&self, execution_id: &str) -> Result<Option<ExecutionRecord>, LookupError>;
}
