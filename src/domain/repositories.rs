//! Domain repository traits - Abstractions for data persistence

use crate::domain::errors::StorageError;
use async_trait::async_trait;

/// String-keyed store of JSON documents.
///
/// This trait defines the contract for the persistence adapter without
/// specifying the backing medium (browser storage, files, memory, ...).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the raw value for a key, `None` when absent
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a raw value, replacing any previous one
    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key; removing an absent key succeeds
    async fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// List stored keys in ascending order
    async fn keys(&self) -> Result<Vec<String>, StorageError>;
}
