//! Tool domain traits
//!
//! Contains pure domain logic traits for argument validation.
//! Execution of tools lives in the application layer (worker executor).

use super::entities::ToolDescriptor;
use super::value_objects::ToolError;
use serde_json::Value;

/// Validator for tool arguments
///
/// This is a pure domain trait that validates invocation arguments
/// against a tool's descriptor without any I/O operations.
pub trait ToolValidator: Send + Sync {
    /// Validate `args` against the descriptor's argument schema
    fn validate(&self, args: &Value, descriptor: &ToolDescriptor) -> Result<(), ToolError>;
}

/// Default implementation of ToolValidator
#[derive(Debug, Clone, Default)]
pub struct DefaultToolValidator;

impl ToolValidator for DefaultToolValidator {
    fn validate(&self, args: &Value, descriptor: &ToolDescriptor) -> Result<(), ToolError> {
        let Some(arguments) = args.as_object() else {
            return Err(ToolError::invalid_argument(format!(
                "Arguments for tool '{}' must be an object",
                descriptor.name
            )));
        };

        let schema = &descriptor.args_schema;

        // Check that all required parameters are present
        for spec in schema.required() {
            if !arguments.contains_key(&spec.name) {
                return Err(ToolError::invalid_argument(format!(
                    "Missing required parameter '{}' for tool '{}'",
                    spec.name, descriptor.name
                )));
            }
        }

        // Check that all provided arguments are known and well-typed
        for (name, value) in arguments {
            let Some(spec) = schema.get(name) else {
                return Err(ToolError::invalid_argument(format!(
                    "Unknown parameter '{}' for tool '{}'",
                    name, descriptor.name
                )));
            };
            if !spec.arg_type.accepts(value) {
                return Err(ToolError::invalid_argument(format!(
                    "Parameter '{}' for tool '{}' must be of type {}",
                    name, descriptor.name, spec.arg_type
                )));
            }
        }

        Ok(())
    }
}
