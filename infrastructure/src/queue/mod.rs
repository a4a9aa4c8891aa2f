//! Task queue adapters

mod local;

pub use local::{DEFAULT_QUEUE_CAPACITY, LocalTaskQueue};
