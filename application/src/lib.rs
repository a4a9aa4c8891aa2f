//! Application layer for tool-relay
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::WaitParams;
pub use ports::{
    callback_sender::{CallbackSender, DeliveryError, NoCallbackSender},
    execution_logger::{ExecutionEvent, ExecutionLogger, NoExecutionLogger},
    execution_lookup::{ExecutionLookup, LookupError},
    invocation_progress::{InvocationProgress, NoInvocationProgress},
    store::{KeyValueStore, KeyValueStoreExt, StoreError},
    task_queue::{QueueError, TaskHandler, TaskQueue, TaskReport, ToolTask},
    tool_backend::{BackendError, RunRequest, RunResponse, ToolBackend},
};
pub use use_cases::aggregator::{DiscoveryReport, InvokeError, MultiBackendAggregator};
pub use use_cases::dispatch::{DispatchError, Dispatcher, SubmitReceipt, SubmitRequest};
pub use use_cases::intake::{CallbackIntake, IntakeError};
pub use use_cases::ledger::{ExecutionLedger, FinishResult, LedgerError};
pub use use_cases::notification::{NotificationMediator, WaitOutcome};
pub use use_cases::registry::{RegistryError, ToolRegistry};
pub use use_cases::worker::{WorkerExecutor, WorkerStage};
