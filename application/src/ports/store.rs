//! Key-value store port
//!
//! The durable store is the single source of truth for tool descriptors and
//! execution records. Keys are namespaced strings:
//!
//! | Key | Value |
//! |-----|-------|
//! | `tool:<name>` | [`ToolDescriptor`](relay_domain::ToolDescriptor) JSON |
//! | `execution:<id>` | [`ExecutionRecord`](relay_domain::ExecutionRecord) JSON |

use async_trait::async_trait;
use relay_domain::ExecutionId;

/// Prefix of tool descriptor keys
pub const TOOL_KEY_PREFIX: &str = "tool:";

/// Prefix of execution record keys
pub const EXECUTION_KEY_PREFIX: &str = "execution:";

/// Key of a tool descriptor
pub fn tool_key(name: &str) -> String {
    format!("{TOOL_KEY_PREFIX}{name}")
}

/// Key of an execution record
pub fn execution_key(id: &ExecutionId) -> String {
    format!("{EXECUTION_KEY_PREFIX}{id}")
}

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Async key-value storage shared by dispatchers and workers.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key; `Ok(None)` if the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Set a value, replacing any previous one.
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Delete a key. Returns whether the key existed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Atomically replace the value at `key` only if it currently equals
    /// `expected`. Returns `Ok(false)` without writing otherwise, including
    /// when the key does not exist.
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        value: Vec<u8>,
    ) -> Result<bool, StoreError>;

    /// All keys starting with `prefix`, in no particular order.
    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

/// Extension trait for KeyValueStore that provides JSON convenience methods
#[async_trait]
pub trait KeyValueStoreExt: KeyValueStore {
    /// Get a value and deserialize it from JSON.
    async fn get_json<T: serde::de::DeserializeOwned + Send>(
        &self,
        key: &str,
    ) -> Result<Option<T>, StoreError> {
        match self.get(key).await? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    /// Serialize a value to JSON and store it.
    async fn set_json<T: serde::Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.set(key, bytes).await
    }
}

// Blanket implementation for all KeyValueStore implementations
impl<T: KeyValueStore + ?Sized> KeyValueStoreExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_layout() {
        assert_eq!(tool_key("divide"), "tool:divide");
        let id = ExecutionId::parse("abc-123").unwrap();
        assert_eq!(execution_key(&id), "execution:abc-123");
    }
}
