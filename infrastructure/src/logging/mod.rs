//! Logging infrastructure: the execution audit trail.
//!
//! Provides [`JsonlExecutionLogger`], an append-only JSONL writer that
//! implements the [`ExecutionLogger`](relay_application::ExecutionLogger) port.

mod jsonl_logger;

pub use jsonl_logger::JsonlExecutionLogger;
