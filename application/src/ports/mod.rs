//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod callback_sender;
pub mod execution_logger;
pub mod execution_lookup;
pub mod invocation_progress;
pub mod store;
pub mod task_queue;
pub mod tool_backend;
