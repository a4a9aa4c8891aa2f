//! Domain layer for tool-relay
//!
//! This crate contains the core types of the relay: tool descriptors and their
//! argument schemas, execution records and their state machine, callback
//! payloads and backend endpoints. It has no dependencies on infrastructure or
//! presentation concerns.
//!
//! # Core Concepts
//!
//! ## Tools
//!
//! A tool is a named, schema-described unit of work. Front-ends learn about
//! tools through [`ToolDescriptor`]s; workers run them through a statically
//! built [`ToolCatalog`] of [`ToolImplementation`]s.
//!
//! ## Executions
//!
//! Every dispatched invocation gets an opaque [`ExecutionId`] and a durable
//! [`ExecutionRecord`]. Records move `pending -> {completed, error}` exactly
//! once; terminal records are final.

pub mod backend;
pub mod core;
pub mod execution;
pub mod tool;

// Re-export commonly used types
pub use backend::{BackendEndpoint, BackendSet};
pub use core::error::DomainError;
pub use execution::{
    entities::{ExecutionId, ExecutionOutcome, ExecutionRecord, ExecutionStatus},
    notification::CallbackPayload,
};
pub use tool::{
    entities::{ArgSpec, ArgType, ArgsSchema, ToolDescriptor},
    implementation::{ToolCatalog, ToolImplementation},
    traits::{DefaultToolValidator, ToolValidator},
    value_objects::ToolError,
};
