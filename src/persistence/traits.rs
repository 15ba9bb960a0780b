//! `PersistenceAdapter` trait — the opaque key-value seam the engagement
//! store loads from at boot and writes through to after each mutation.

use async_trait::async_trait;

use crate::error::StorageError;

/// Async string key-value storage.
///
/// Implementations only need whole-value semantics: the store always writes
/// the full serialized record under a single key.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
