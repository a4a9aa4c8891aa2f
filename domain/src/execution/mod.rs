//! Execution domain module
//!
//! One dispatched invocation of a tool is an *execution*. It is identified by
//! an opaque [`ExecutionId`](entities::ExecutionId) handed to the caller at
//! dispatch time and tracked by a durable
//! [`ExecutionRecord`](entities::ExecutionRecord):
//!
//! ```text
//!            finish(Completed)
//! pending ─────────────────────▶ completed
//!    │
//!    └─────────────────────────▶ error
//!            finish(Failed)
//! ```
//!
//! Terminal states are final. The worker reports the outcome to the caller
//! through a [`CallbackPayload`](notification::CallbackPayload) after the record
//! write.

pub mod entities;
pub mod notification;

pub use entities::{ExecutionId, ExecutionOutcome, ExecutionRecord, ExecutionStatus};
pub use notification::CallbackPayload;
