//! Key-value intent store
//!
//! Carries the captured destination string from the home page across a full
//! page navigation to the results page. Keys are namespaced as
//! `"<site>:<logical key>"`; last write wins.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
}

/// The key-value persistence boundary
#[async_trait]
pub trait IntentStore: Send + Sync {
    /// Store a value under a namespaced key, returning the value as stored
    async fn set(&self, key: &str, value: &str) -> Result<String, StoreError>;

    /// Read a value by namespaced key
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
}

/// Shared handle to an intent store
pub type SharedIntentStore = Arc<dyn IntentStore>;

/// In-process store; lives as long as the hosting process
#[derive(Default)]
pub struct MemoryIntentStore {
    entries: DashMap<String, String>,
}

impl MemoryIntentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IntentStore for MemoryIntentStore {
    async fn set(&self, key: &str, value: &str) -> Result<String, StoreError> {
        debug!(key, "intent stored");
        self.entries.insert(key.to_string(), value.to_string());
        Ok(value.to_string())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get() {
        let store = MemoryIntentStore::new();
        let stored = store.set("skyscanner:DESTINATION", "Rome").await.unwrap();
        assert_eq!(stored, "Rome");

        let value = store.get("skyscanner:DESTINATION").await.unwrap();
        assert_eq!(value.as_deref(), Some("Rome"));
    }

    #[tokio::test]
    async fn test_keys_are_namespaced() {
        let store = MemoryIntentStore::new();
        store.set("skyscanner:DESTINATION", "Rome").await.unwrap();

        assert!(store.get("kayak:DESTINATION").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let store = MemoryIntentStore::new();
        store.set("kayak:DESTINATION", "Rome").await.unwrap();
        store.set("kayak:DESTINATION", "Paris").await.unwrap();

        let value = store.get("kayak:DESTINATION").await.unwrap();
        assert_eq!(value.as_deref(), Some("Paris"));
    }
}
