//! In-memory implementation of KeyValueStore.

use async_trait::async_trait;
use relay_application::ports::store::{KeyValueStore, StoreError};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// In-memory key-value store.
///
/// Suitable for tests and single-node deployments where the dispatcher and
/// the worker pool share a process. State is lost on restart.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKeyValueStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of entries in the store.
    pub fn len(&self) -> usize {
        self.data().map(|d| d.len()).unwrap_or_default()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn data(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<u8>>>, StoreError> {
        self.data
            .lock()
            .map_err(|_| StoreError::Storage("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.data()?.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.data()?.remove(key).is_some())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        value: Vec<u8>,
    ) -> Result<bool, StoreError> {
        let mut data = self.data()?;
        match data.get_mut(key) {
            Some(current) if current.as_slice() == expected => {
                *current = value;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .data()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_application::KeyValueStoreExt;
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_basic_operations() {
        let store = MemoryKeyValueStore::new();

        store.set("key1", b"value1".to_vec()).await.unwrap();
        assert_eq!(store.get("key1").await.unwrap(), Some(b"value1".to_vec()));
        assert_eq!(store.get("missing").await.unwrap(), None);

        assert!(store.delete("key1").await.unwrap());
        assert!(!store.delete("key1").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_compare_and_swap() {
        let store = MemoryKeyValueStore::new();
        store.set("k", b"old".to_vec()).await.unwrap();

        assert!(!store.compare_and_swap("k", b"stale", b"new".to_vec()).await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some(b"old".to_vec()));

        assert!(store.compare_and_swap("k", b"old", b"new".to_vec()).await.unwrap());
        assert_eq!(store.get("k").await.unwrap(), Some(b"new".to_vec()));

        assert!(!store.compare_and_swap("absent", b"", b"x".to_vec()).await.unwrap());
        assert_eq!(store.get("absent").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_concurrent_swaps_have_one_winner() {
        let store = Arc::new(MemoryKeyValueStore::new());
        store.set("k", b"pending".to_vec()).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .compare_and_swap("k", b"pending", format!("done-{i}").into_bytes())
                    .await
                    .unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_prefix_listing_and_json() {
        let store = MemoryKeyValueStore::new();
        store.set_json("tool:add", &json!({"name": "add"})).await.unwrap();
        store.set_json("tool:divide", &json!({"name": "divide"})).await.unwrap();
        store.set_json("execution:1", &json!({"status": "pending"})).await.unwrap();

        let mut keys = store.keys_with_prefix("tool:").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["tool:add", "tool:divide"]);

        let value: Option<serde_json::Value> = store.get_json("execution:1").await.unwrap();
        assert_eq!(value, Some(json!({"status": "pending"})));
    }
}
