//! In-memory adapter, used by tests and by hosts that handle durability
//! themselves.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::traits::PersistenceAdapter;
use crate::error::StorageError;

#[derive(Debug, Default)]
pub struct MemoryAdapter {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the adapter with a raw value, e.g. a record written by an
    /// older build.
    pub fn with_entry(key: &str, value: &str) -> Self {
        let mut entries = HashMap::new();
        entries.insert(key.to_string(), value.to_string());
        Self {
            entries: RwLock::new(entries),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl PersistenceAdapter for MemoryAdapter {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_remove() {
        let adapter = MemoryAdapter::new();
        assert_eq!(adapter.get("k").await.unwrap(), None);

        adapter.set("k", "one").await.unwrap();
        adapter.set("k", "two").await.unwrap();
        assert_eq!(adapter.get("k").await.unwrap().as_deref(), Some("two"));
        assert_eq!(adapter.len().await, 1);

        adapter.remove("k").await.unwrap();
        assert!(adapter.is_empty().await);
        // Removing again is fine
        adapter.remove("k").await.unwrap();
    }

    #[tokio::test]
    async fn seeded_entry_is_visible() {
        let adapter = MemoryAdapter::with_entry("onboarding_state", "{}");
        assert_eq!(
            adapter.get("onboarding_state").await.unwrap().as_deref(),
            Some("{}")
        );
    }
}
