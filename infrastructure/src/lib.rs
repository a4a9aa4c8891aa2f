//! Infrastructure layer for tool-relay
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: storage, task queues, HTTP transport,
//! built-in tools, configuration file loading and audit logging.

pub mod config;
pub mod http;
pub mod logging;
pub mod queue;
pub mod store;
pub mod tools;

// Re-export commonly used types
pub use config::{
    ConfigError, ConfigIssue, ConfigLoader, FileClientConfig, FileConfig, FileLoggingConfig,
    FileNotificationConfig, FileRegistryConfig, FileServerConfig, FileWorkersConfig,
};
pub use http::{
    ApiError, BackendState, HttpBackendClient, HttpCallbackSender, HttpServer, backend_router,
    callback_router,
};
pub use logging::JsonlExecutionLogger;
pub use queue::LocalTaskQueue;
pub use store::MemoryKeyValueStore;
pub use tools::builtin_catalog;
