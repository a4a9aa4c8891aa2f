//! Text tools: uppercase, lowercase

use relay_domain::{ArgType, ToolDescriptor, ToolError, ToolImplementation};
use serde_json::{Map, Value};

/// Tool name constants
pub const UPPERCASE: &str = "uppercase";
pub const LOWERCASE: &str = "lowercase";

/// Queue served by the text workers
pub const TEXT_QUEUE: &str = "text_queue";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseConversion {
    Upper,
    Lower,
}

/// Case conversion of the `text` argument
#[derive(Debug, Clone, Copy)]
pub struct CaseTool {
    conversion: CaseConversion,
}

impl CaseTool {
    pub fn uppercase() -> Self {
        Self {
            conversion: CaseConversion::Upper,
        }
    }

    pub fn lowercase() -> Self {
        Self {
            conversion: CaseConversion::Lower,
        }
    }
}

impl ToolImplementation for CaseTool {
    fn descriptor(&self) -> ToolDescriptor {
        let (name, description) = match self.conversion {
            CaseConversion::Upper => (UPPERCASE, "Convert text to upper case"),
            CaseConversion::Lower => (LOWERCASE, "Convert text to lower case"),
        };
        ToolDescriptor::new(name, description)
            .with_queue(TEXT_QUEUE)
            .with_arg("text", ArgType::String, true)
    }

    fn invoke(&self, args: &Map<String, Value>) -> Result<Value, ToolError> {
        let text = args
            .get("text")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::invalid_argument("Argument 'text' must be a string"))?;

        Ok(Value::String(match self.conversion {
            CaseConversion::Upper => text.to_uppercase(),
            CaseConversion::Lower => text.to_lowercase(),
        }))
    }
}
