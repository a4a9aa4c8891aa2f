//! Tool domain entities

use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Version assigned to descriptors that do not declare one
pub const DEFAULT_VERSION: &str = "1.0";

/// Queue assigned to descriptors that do not declare one
pub const DEFAULT_QUEUE: &str = "default";

/// Type tag of a single tool argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgType {
    Integer,
    Number,
    String,
    Boolean,
    Array,
    Object,
    /// Unknown or missing tag; accepts any value
    Any,
}

impl ArgType {
    pub fn as_str(&self) -> &str {
        match self {
            ArgType::Integer => "integer",
            ArgType::Number => "number",
            ArgType::String => "string",
            ArgType::Boolean => "boolean",
            ArgType::Array => "array",
            ArgType::Object => "object",
            ArgType::Any => "any",
        }
    }

    /// Parse a wire type tag. Unknown tags read as [`ArgType::Any`].
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "integer" | "int" => ArgType::Integer,
            "number" | "float" => ArgType::Number,
            "string" | "str" => ArgType::String,
            "boolean" | "bool" => ArgType::Boolean,
            "array" | "list" => ArgType::Array,
            "object" | "dict" => ArgType::Object,
            _ => ArgType::Any,
        }
    }

    /// Whether `value` is acceptable for an argument of this type
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            ArgType::Integer => match value {
                Value::Number(n) => {
                    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
                }
                _ => false,
            },
            ArgType::Number => value.is_number(),
            ArgType::String => value.is_string(),
            ArgType::Boolean => value.is_boolean(),
            ArgType::Array => value.is_array(),
            ArgType::Object => value.is_object(),
            ArgType::Any => true,
        }
    }
}

impl std::fmt::Display for ArgType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Specification of one tool argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSpec {
    pub name: String,
    pub arg_type: ArgType,
    pub required: bool,
}

impl ArgSpec {
    pub fn new(name: impl Into<String>, arg_type: ArgType, required: bool) -> Self {
        Self {
            name: name.into(),
            arg_type,
            required,
        }
    }
}

/// Ordered argument schema of a tool.
///
/// On the wire this is a JSON-Schema-like object:
///
/// ```json
/// {"type": "object",
///  "properties": {"a": {"type": "number"}, "b": {"type": "number"}},
///  "required": ["a", "b"]}
/// ```
///
/// Declaration order is preserved through serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SchemaWire", into = "SchemaWire")]
pub struct ArgsSchema {
    args: Vec<ArgSpec>,
}

impl ArgsSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument, replacing any previous argument of the same name
    pub fn with_arg(mut self, name: impl Into<String>, arg_type: ArgType, required: bool) -> Self {
        let spec = ArgSpec::new(name, arg_type, required);
        match self.args.iter_mut().find(|a| a.name == spec.name) {
            Some(existing) => *existing = spec,
            None => self.args.push(spec),
        }
        self
    }

    pub fn args(&self) -> &[ArgSpec] {
        &self.args
    }

    pub fn get(&self, name: &str) -> Option<&ArgSpec> {
        self.args.iter().find(|a| a.name == name)
    }

    pub fn required(&self) -> impl Iterator<Item = &ArgSpec> {
        self.args.iter().filter(|a| a.required)
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }
}

#[derive(Serialize, Deserialize)]
struct SchemaWire {
    #[serde(rename = "type", default = "object_tag")]
    kind: String,
    #[serde(default)]
    properties: Map<String, Value>,
    #[serde(default)]
    required: Vec<String>,
}

fn object_tag() -> String {
    "object".to_string()
}

impl From<SchemaWire> for ArgsSchema {
    fn from(wire: SchemaWire) -> Self {
        let mut schema = ArgsSchema::new();
        for (name, property) in &wire.properties {
            let arg_type = property
                .get("type")
                .and_then(Value::as_str)
                .map(ArgType::parse)
                .unwrap_or(ArgType::Any);
            let required = wire.required.iter().any(|r| r == name);
            schema = schema.with_arg(name.clone(), arg_type, required);
        }
        // Required names without a property entry still count as arguments
        for name in &wire.required {
            if schema.get(name).is_none() {
                schema = schema.with_arg(name.clone(), ArgType::Any, true);
            }
        }
        schema
    }
}

impl From<ArgsSchema> for SchemaWire {
    fn from(schema: ArgsSchema) -> Self {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for arg in schema.args {
            properties.insert(arg.name.clone(), json!({ "type": arg.arg_type.as_str() }));
            if arg.required {
                required.push(arg.name);
            }
        }
        Self {
            kind: object_tag(),
            properties,
            required,
        }
    }
}

/// Description of a tool as seen by callers and the registry.
///
/// Stored under `tool:<name>`; re-registration overwrites the whole
/// descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool name (e.g., "divide")
    pub name: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
    /// Semantic version of the tool
    #[serde(default = "default_version")]
    pub version: String,
    /// Queue whose workers run this tool
    #[serde(default = "default_queue")]
    pub queue: String,
    /// Argument schema
    #[serde(default)]
    pub args_schema: ArgsSchema,
}

fn default_version() -> String {
    DEFAULT_VERSION.to_string()
}

fn default_queue() -> String {
    DEFAULT_QUEUE.to_string()
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            version: default_version(),
            queue: default_queue(),
            args_schema: ArgsSchema::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    pub fn with_arg(mut self, name: impl Into<String>, arg_type: ArgType, required: bool) -> Self {
        self.args_schema = self.args_schema.with_arg(name, arg_type, required);
        self
    }

    pub fn with_args_schema(mut self, args_schema: ArgsSchema) -> Self {
        self.args_schema = args_schema;
        self
    }

    /// The only structural requirement on a descriptor: a non-empty name
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::EmptyToolName);
        }
        Ok(())
    }
}
