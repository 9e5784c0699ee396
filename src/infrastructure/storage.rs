//! Key/value store implementations and the typed JSON persistence adapter

use crate::domain::errors::StorageError;
use crate::domain::repositories::KeyValueStore;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// Typed JSON access over a [`KeyValueStore`]
#[derive(Clone)]
pub struct GameStorage {
    store: Arc<dyn KeyValueStore>,
}

impl GameStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub async fn read_raw(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.store.get_item(key).await
    }

    pub async fn write_raw(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.store.set_item(key, value).await
    }

    /// Read and parse a JSON document; `Ok(None)` when the key is absent
    pub async fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.store.get_item(key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    pub async fn write<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let json = serde_json::to_string(value).map_err(|e| StorageError::Serialization {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.store.set_item(key, &json).await
    }

    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.store.remove_item(key).await
    }
}

/// In-memory store, optionally with a byte quota
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that rejects writes once keys and values exceed `bytes` in total
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            items: Mutex::new(BTreeMap::new()),
            quota: Some(bytes),
        }
    }

    /// Raw value for a key, bypassing the async interface
    pub fn snapshot(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = self.lock();
        if let Some(quota) = self.quota {
            let used: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if used + key.len() + value.len() > quota {
                return Err(StorageError::QuotaExceeded {
                    key: key.to_string(),
                });
            }
        }
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.lock().remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.lock().keys().cloned().collect())
    }
}

/// File-backed store: one `<key>.json` file per key under a directory
pub struct JsonFileStore {
    base_path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(base_path: P) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &std::path::Path {
        &self.base_path
    }

    fn get_item_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::io(
                key,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid storage key"),
            ));
        }
        Ok(self.base_path.join(format!("{key}.json")))
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.get_item_path(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(key, e)),
        }
    }

    async fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.get_item_path(key)?;

        tokio::fs::create_dir_all(&self.base_path)
            .await
            .map_err(|e| StorageError::io(key, e))?;

        // Write then rename so a crash never leaves a half-written document
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value)
            .await
            .map_err(|e| StorageError::io(key, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StorageError::io(key, e))
    }

    async fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.get_item_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(key, e)),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();

        let mut entries = match tokio::fs::read_dir(&self.base_path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(StorageError::io(self.base_path.display().to_string(), e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(self.base_path.display().to_string(), e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                keys.push(stem.to_string());
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[tokio::test]
    async fn memory_store_set_get_remove() {
        let store = MemoryStore::new();
        store.set_item("save_1", "{}").await.unwrap();
        assert_eq!(store.get_item("save_1").await.unwrap().as_deref(), Some("{}"));
        store.remove_item("save_1").await.unwrap();
        assert!(store.get_item("save_1").await.unwrap().is_none());
        // Removing again is fine
        store.remove_item("save_1").await.unwrap();
    }

    #[tokio::test]
    async fn memory_store_quota_rejects_large_writes() {
        let store = MemoryStore::with_quota(16);
        store.set_item("a", "12345").await.unwrap();
        let err = store.set_item("b", "0123456789abcdef").await.unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        // Overwriting an existing key only counts the new value
        store.set_item("a", "1234567890").await.unwrap();
    }

    #[tokio::test]
    async fn game_storage_reports_corrupt_json() {
        let store = Arc::new(MemoryStore::new());
        store.set_item("gameState", "{not json").await.unwrap();
        let storage = GameStorage::new(store);
        let err = storage.read::<Value>("gameState").await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { ref key, .. } if key == "gameState"));
    }

    #[tokio::test]
    async fn game_storage_round_trips_documents() {
        let storage = GameStorage::new(Arc::new(MemoryStore::new()));
        storage.write("gameState", &json!({"flags": {"a": true}})).await.unwrap();
        let value: Option<Value> = storage.read("gameState").await.unwrap();
        assert_eq!(value, Some(json!({"flags": {"a": true}})));
        assert!(storage.read::<Value>("save_2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn json_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("saves"));
        store.set_item("save_2", "{\"x\":1}").await.unwrap();
        store.set_item("gameState", "{}").await.unwrap();

        let reopened = JsonFileStore::new(dir.path().join("saves"));
        assert_eq!(
            reopened.get_item("save_2").await.unwrap().as_deref(),
            Some("{\"x\":1}")
        );
        assert_eq!(reopened.keys().await.unwrap(), vec!["gameState", "save_2"]);

        reopened.remove_item("save_2").await.unwrap();
        assert!(reopened.get_item("save_2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn json_file_store_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(store.set_item("../escape", "{}").await.is_err());
        assert!(store.get_item("").await.is_err());
    }

    #[tokio::test]
    async fn json_file_store_missing_dir_has_no_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("absent"));
        assert!(store.keys().await.unwrap().is_empty());
        assert!(store.get_item("gameState").await.unwrap().is_none());
    }
}
