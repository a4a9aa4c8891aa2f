//! Tool registry
//!
//! Resolves tool names to [`ToolDescriptor`]s through three tiers:
//!
//! 1. in-process cache
//! 2. durable store (`tool:<name>`)
//! 3. discovery request to a configured backend
//!
//! Whatever a lower tier yields is written back to the tiers above it.
//! Failures in the store read or in discovery are logged and end up as
//! [`RegistryError::NotFound`]; callers cannot tell "absent" from "degraded".

use crate::ports::store::{KeyValueStore, KeyValueStoreExt, StoreError, TOOL_KEY_PREFIX, tool_key};
use crate::ports::tool_backend::ToolBackend;
use relay_domain::{DomainError, ToolDescriptor};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("tool '{0}' not found")]
    NotFound(String),

    #[error("invalid descriptor: {0}")]
    Invalid(#[from] DomainError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Registry of tool descriptors, shared by the dispatcher and HTTP routes.
pub struct ToolRegistry {
    store: Arc<dyn KeyValueStore>,
    cache: RwLock<HashMap<String, ToolDescriptor>>,
    discovery: Option<Arc<dyn ToolBackend>>,
}

impl ToolRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            cache: RwLock::new(HashMap::new()),
            discovery: None,
        }
    }

    /// Backend queried when a tool is in neither the cache nor the store
    pub fn with_discovery(mut self, backend: Arc<dyn ToolBackend>) -> Self {
        self.discovery = Some(backend);
        self
    }

    /// Resolve a tool name to its descriptor.
    pub async fn resolve(&self, name: &str) -> Result<ToolDescriptor, RegistryError> {
        if let Some(descriptor) = self.cache.read().await.get(name) {
            return Ok(descriptor.clone());
        }

        match self.store.get_json::<ToolDescriptor>(&tool_key(name)).await {
            Ok(Some(descriptor)) => {
                debug!(tool = name, "Tool descriptor loaded from store");
                self.cache_insert(descriptor.clone()).await;
                return Ok(descriptor);
            }
            Ok(None) => {}
            Err(e) => warn!(tool = name, error = %e, "Failed to read tool descriptor from store"),
        }

        if let Some(descriptor) = self.discover(name).await {
            if let Err(e) = self.store.set_json(&tool_key(name), &descriptor).await {
                warn!(tool = name, error = %e, "Failed to persist discovered tool descriptor");
            }
            self.cache_insert(descriptor.clone()).await;
            return Ok(descriptor);
        }

        Err(RegistryError::NotFound(name.to_string()))
    }

    /// Register (or re-register) a tool. Overwrites any existing descriptor
    /// of the same name in both store and cache.
    pub async fn register(&self, descriptor: ToolDescriptor) -> Result<(), RegistryError> {
        descriptor.validate()?;
        self.store
            .set_json(&tool_key(&descriptor.name), &descriptor)
            .await?;
        info!(
            tool = %descriptor.name,
            queue = %descriptor.queue,
            version = %descriptor.version,
            "Tool registered"
        );
        self.cache_insert(descriptor).await;
        Ok(())
    }

    /// Every descriptor in the store, sorted by name.
    pub async fn list(&self) -> Result<Vec<ToolDescriptor>, RegistryError> {
        let keys = self.store.keys_with_prefix(TOOL_KEY_PREFIX).await?;
        let mut descriptors = Vec::with_capacity(keys.len());
        for key in keys {
            match self.store.get_json::<ToolDescriptor>(&key).await {
                Ok(Some(descriptor)) => descriptors.push(descriptor),
                Ok(None) => {}
                Err(e) => warn!(key = %key, error = %e, "Skipping unreadable tool descriptor"),
            }
        }
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(descriptors)
    }

    /// Drop a name from the in-process cache; the store is untouched.
    pub async fn evict(&self, name: &str) -> bool {
        self.cache.write().await.remove(name).is_some()
    }

    async fn cache_insert(&self, descriptor: ToolDescriptor) {
        self.cache
            .write()
            .await
            .insert(descriptor.name.clone(), descriptor);
    }

    async fn discover(&self, name: &str) -> Option<ToolDescriptor> {
        let backend = self.discovery.as_ref()?;
        match backend.list_tools().await {
            Ok(tools) => {
                let found = tools.into_iter().find(|t| t.name == name);
                if found.is_some() {
                    info!(tool = name, backend = %backend.endpoint(), "Tool discovered");
                }
                found
            }
            Err(e) => {
                warn!(tool = name, backend = %backend.endpoint(), error = %e, "Tool discovery failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::test_support::{FakeBackend, FakeStore, divide_descriptor};
    use relay_domain::ArgType;
    use serde_json::json;

    #[tokio::test]
    async fn test_resolve_twice_returns_identical_descriptor() {
        let store = Arc::new(FakeStore::default());
        store.put_raw("tool:divide", serde_json::to_value(divide_descriptor()).unwrap());
        let registry = ToolRegistry::new(store.clone());

        let first = registry.resolve("divide").await.unwrap();
        let second = registry.resolve("divide").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.queue, "math_queue");
    }

    #[tokio::test]
    async fn test_cache_survives_store_removal() {
        let store = Arc::new(FakeStore::default());
        let registry = ToolRegistry::new(store.clone());
        registry.register(divide_descriptor()).await.unwrap();

        store.delete("tool:divide").await.unwrap();
        assert!(registry.resolve("divide").await.is_ok());

        assert!(registry.evict("divide").await);
        assert!(matches!(
            registry.resolve("divide").await,
            Err(RegistryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_discovery_persists_to_store() {
        let store = Arc::new(FakeStore::default());
        let backend = FakeBackend::new("http://tools:8000").with_tools(vec![divide_descriptor()]);
        let registry = ToolRegistry::new(store.clone()).with_discovery(Arc::new(backend));

        let descriptor = registry.resolve("divide").await.unwrap();
        assert_eq!(descriptor, divide_descriptor());
        assert_eq!(store.raw("tool:divide").unwrap()["queue"], "math_queue");
    }

    #[tokio::test]
    async fn test_discovery_failure_reads_as_not_found() {
        let store = Arc::new(FakeStore::default());
        let backend = FakeBackend::new("http://tools:8000").unreachable();
        let registry = ToolRegistry::new(store.clone()).with_discovery(Arc::new(backend));

        assert!(matches!(
            registry.resolve("divide").await,
            Err(RegistryError::NotFound(name)) if name == "divide"
        ));
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn test_register_overwrites_wholesale() {
        let store = Arc::new(FakeStore::default());
        let registry = ToolRegistry::new(store.clone());
        registry.register(divide_descriptor()).await.unwrap();

        let replacement = ToolDescriptor::new("divide", "Integer division")
            .with_version("2.0")
            .with_arg("n", ArgType::Integer, true);
        registry.register(replacement.clone()).await.unwrap();

        assert_eq!(registry.resolve("divide").await.unwrap(), replacement);
        assert_eq!(store.raw("tool:divide").unwrap()["queue"], "default");
    }

    #[tokio::test]
    async fn test_register_rejects_empty_name() {
        let registry = ToolRegistry::new(Arc::new(FakeStore::default()));
        let result = registry.register(ToolDescriptor::new("", "nameless")).await;
        assert!(matches!(result, Err(RegistryError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_list_skips_other_keys_and_corrupt_entries() {
        let store = Arc::new(FakeStore::default());
        let registry = ToolRegistry::new(store.clone());
        registry.register(divide_descriptor()).await.unwrap();
        registry
            .register(ToolDescriptor::new("add", "Add"))
            .await
            .unwrap();
        store.put_raw("execution:abc", json!({"status": "pending", "tool": "add"}));
        store.put_raw("tool:broken", json!(42));

        let names: Vec<String> = registry
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["add", "divide"]);
    }
}
