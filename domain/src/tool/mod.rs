//! Tool domain module
//!
//! Defines what a tool *is* to the relay: how it is described to callers,
//! how its arguments are checked, and how a worker actually runs it.
//!
//! ```text
//! ┌────────────────┐   register / discover   ┌──────────────┐
//! │ ToolDescriptor │ ──────────────────────▶ │ tool:<name>  │ (durable store)
//! │ name, queue,   │                         └──────────────┘
//! │ args_schema    │
//! └───────┬────────┘
//!         │ validate(args)
//!         ▼
//! ┌────────────────┐   name -> Arc<dyn ToolImplementation>
//! │ ToolCatalog    │ ────────────────────────────────────▶ invoke(args)
//! └────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`ToolDescriptor`]: name, description, version, target queue and argument schema
//! - [`ArgsSchema`]: ordered argument specs, serialized as a JSON-Schema-like object
//! - [`ToolImplementation`]: the worker-side callable for one tool
//! - [`ToolCatalog`]: static name → implementation mapping built once at startup
//! - [`ToolValidator`]: pure argument validation against a descriptor
//! - [`ToolError`]: structured tool failure (`code` + `message`)
//!
//! # Architecture
//!
//! - **Domain** (this module): pure definitions, no I/O
//! - **Application**: the registry resolves descriptors, the worker executor
//!   runs implementations
//! - **Infrastructure**: built-in tool implementations (math, text)

pub mod entities;
pub mod implementation;
pub mod traits;
pub mod value_objects;

pub use entities::{ArgSpec, ArgType, ArgsSchema, ToolDescriptor};
pub use implementation::{ToolCatalog, ToolImplementation};
pub use traits::{DefaultToolValidator, ToolValidator};
pub use value_objects::ToolError;
