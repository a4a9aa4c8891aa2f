//! Worker-side tool implementations and the static catalog that maps names to them.

use super::entities::ToolDescriptor;
use super::value_objects::ToolError;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// A concrete, synchronously executed tool.
///
/// Implementations run on a worker slot. They receive already-validated
/// arguments and either produce a JSON result or a [`ToolError`].
pub trait ToolImplementation: Send + Sync {
    /// Descriptor advertised for this tool (name, queue, schema)
    fn descriptor(&self) -> ToolDescriptor;

    /// Run the tool
    fn invoke(&self, args: &Map<String, Value>) -> Result<Value, ToolError>;
}

/// Static name → implementation mapping, built once at startup.
#[derive(Clone, Default)]
pub struct ToolCatalog {
    tools: HashMap<String, Arc<dyn ToolImplementation>>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, keyed by its descriptor name. A later tool with the same
    /// name replaces the earlier one.
    pub fn with_tool(mut self, tool: impl ToolImplementation + 'static) -> Self {
        self.register(Arc::new(tool));
        self
    }

    pub fn register(&mut self, tool: Arc<dyn ToolImplementation>) {
        self.tools.insert(tool.descriptor().name, tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolImplementation>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Descriptors of every tool in the catalog, sorted by name
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<ToolDescriptor> =
            self.tools.values().map(|t| t.descriptor()).collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Distinct queue names used by the catalog's tools
    pub fn queues(&self) -> Vec<String> {
        let mut queues: Vec<String> = self.tools.values().map(|t| t.descriptor().queue).collect();
        queues.sort();
        queues.dedup();
        queues
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl std::fmt::Debug for ToolCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.tools.keys().collect();
        names.sort();
        f.debug_struct("ToolCatalog").field("tools", &names).finish()
    }
}
