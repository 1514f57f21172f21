//! Key-value persistence port.

use async_trait::async_trait;

use super::error::StorageError;

/// String key-value store. Values are JSON documents owned by the caller.
///
/// Implementations must make `set` durable before returning so a fresh
/// process sees the last successful write.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;
    /// Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}
