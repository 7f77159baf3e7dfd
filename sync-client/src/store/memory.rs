//! In-memory store for testing.
//!
//! Allows inspecting writes and forcing failures.

use super::{StateStore, StoreError};
use async_trait::async_trait;
use clicker_sync_types::Payload;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory store for testing.
///
/// Clones share state, so a test can keep one copy for inspection after
/// handing another to the coordinator.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    entries: HashMap<String, Payload>,
    writes: Vec<(String, Payload)>,
    fail_next_get: Option<String>,
    fail_next_put: Option<String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry without recording it as a write.
    pub fn insert(&self, key: &str, payload: Payload) {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.insert(key.to_string(), payload);
    }

    /// Current payload stored under `key`.
    pub fn payload(&self, key: &str) -> Option<Payload> {
        let inner = self.inner.lock().unwrap();
        inner.entries.get(key).cloned()
    }

    /// Every successful `put`, in order.
    pub fn writes(&self) -> Vec<(String, Payload)> {
        let inner = self.inner.lock().unwrap();
        inner.writes.clone()
    }

    /// Cause the next `get()` to fail with the given error.
    pub fn fail_next_get(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_get = Some(error.to_string());
    }

    /// Cause the next `put()` to fail with the given error.
    pub fn fail_next_put(&self, error: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_next_put = Some(error.to_string());
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Payload>, StoreError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(error) = inner.fail_next_get.take() {
            return Err(StoreError::ReadFailed(error));
        }

        Ok(inner.entries.get(key).cloned())
    }

    async fn put(&self, key: &str, payload: Payload) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(error) = inner.fail_next_put.take() {
            return Err(StoreError::WriteFailed(error));
        }

        inner.entries.insert(key.to_string(), payload.clone());
        inner.writes.push((key.to_string(), payload));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clicker_sync_types::Counter;

    #[tokio::test]
    async fn get_missing_key_is_none() {
        let store = MemoryStore::new();
        assert!(store.get("clicker").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_then_get() {
        let store = MemoryStore::new();
        store.put("clicker", Counter::new(3).to_payload()).await.unwrap();

        let payload = store.get("clicker").await.unwrap().unwrap();
        assert_eq!(Counter::from_payload(&payload), Counter::new(3));
        assert_eq!(store.writes().len(), 1);
    }

    #[tokio::test]
    async fn insert_is_not_a_write() {
        let store = MemoryStore::new();
        store.insert("clicker", Counter::new(1).to_payload());
        assert!(store.writes().is_empty());
        assert!(store.payload("clicker").is_some());
    }

    #[tokio::test]
    async fn forced_put_failure_is_one_shot() {
        let store = MemoryStore::new();
        store.fail_next_put("disk full");

        let result = store.put("clicker", Counter::new(1).to_payload()).await;
        assert!(matches!(result, Err(StoreError::WriteFailed(_))));
        assert!(store.payload("clicker").is_none());

        store.put("clicker", Counter::new(1).to_payload()).await.unwrap();
        assert!(store.payload("clicker").is_some());
    }

    #[tokio::test]
    async fn forced_get_failure_is_one_shot() {
        let store = MemoryStore::new();
        store.fail_next_get("locked");

        assert!(matches!(
            store.get("clicker").await,
            Err(StoreError::ReadFailed(_))
        ));
        assert!(store.get("clicker").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let store1 = MemoryStore::new();
        let store2 = store1.clone();

        store1.put("k", Payload::new()).await.unwrap();
        assert!(store2.payload("k").is_some());
    }
}
