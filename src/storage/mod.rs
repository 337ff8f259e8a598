//! Key-value storage abstraction over the adapter.
//!
//! This module provides the convenience seam most callers want: string
//! keys, serde values, one transaction per operation. On WASM targets it
//! is backed by IndexedDB. On native targets an in-memory store with the
//! same semantics backs development and unit tests.

#[cfg(target_arch = "wasm32")]
mod indexeddb;

#[cfg(target_arch = "wasm32")]
pub use indexeddb::IndexedDbStore;

use crate::error::StoreError;
use crate::query::KeyRange;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;

/// A generic key-value storage interface.
///
/// Implementations share the host engine's semantics: `put` overwrites,
/// reads of missing keys are `Ok(None)`, deletes of missing keys
/// succeed, and keys come back in ascending key order.
///
/// Note: this trait does not require `Send` bounds since WASM is
/// single-threaded and JS types cannot be sent between threads.
pub trait KeyValueStore {
    /// Stores a value under the given key, overwriting any existing one.
    fn put<T: Serialize + 'static>(
        &self,
        key: &str,
        value: &T,
    ) -> impl Future<Output = Result<(), StoreError>>;

    /// Retrieves a value by key. Returns `Ok(None)` if the key doesn't
    /// exist.
    fn get<T: DeserializeOwned + 'static>(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<T>, StoreError>>;

    /// Deletes a value by key. Returns `Ok(())` even if the key didn't
    /// exist.
    fn delete(&self, key: &str) -> impl Future<Output = Result<(), StoreError>>;

    /// Removes all entries from the store.
    fn clear(&self) -> impl Future<Output = Result<(), StoreError>>;

    /// Counts the entries in the store.
    fn count(&self) -> impl Future<Output = Result<u32, StoreError>>;

    /// Retrieves all keys in the store, in ascending key order.
    fn get_all_keys(&self) -> impl Future<Output = Result<Vec<String>, StoreError>>;

    /// Retrieves up to `limit` keys falling in `range`, in ascending key
    /// order.
    fn keys_in_range(
        &self,
        range: &KeyRange,
        limit: Option<u32>,
    ) -> impl Future<Output = Result<Vec<String>, StoreError>>;
}

/// Configuration for creating a storage instance.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Name of the database.
    pub database_name: String,
    /// Name of the object store within the database.
    pub store_name: String,
    /// Database version (incrementing triggers upgrade).
    pub version: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_name: "idb-store".to_string(),
            store_name: "keyval".to_string(),
            version: 1,
        }
    }
}

impl StorageConfig {
    /// Creates a new configuration with the given database and store names.
    pub fn new(database_name: impl Into<String>, store_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            store_name: store_name.into(),
            version: 1,
        }
    }

    /// Sets the database version.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }
}

// Native stand-in for development and testing
#[cfg(not(target_arch = "wasm32"))]
pub mod native {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::{Arc, RwLock};

    /// A simple in-memory store for native builds.
    ///
    /// Data is not persisted across restarts. A `BTreeMap` keeps keys in
    /// ascending order, matching the engine's key ordering on WASM.
    #[derive(Clone, Default)]
    pub struct MemoryStore {
        data: Arc<RwLock<BTreeMap<String, String>>>,
    }

    impl MemoryStore {
        pub fn new(_config: StorageConfig) -> Self {
            Self {
                data: Arc::new(RwLock::new(BTreeMap::new())),
            }
        }
    }

    impl KeyValueStore for MemoryStore {
        async fn put<T: Serialize + 'static>(
            &self,
            key: &str,
            value: &T,
        ) -> Result<(), StoreError> {
            let json = serde_json::to_string(value)
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            self.data
                .write()
                .map_err(|e| StoreError::Other(e.to_string()))?
                .insert(key.to_string(), json);
            Ok(())
        }

        async fn get<T: DeserializeOwned + 'static>(
            &self,
            key: &str,
        ) -> Result<Option<T>, StoreError> {
            let data = self
                .data
                .read()
                .map_err(|e| StoreError::Other(e.to_string()))?;
            match data.get(key) {
                Some(json) => {
                    let value = serde_json::from_str(json)
                        .map_err(|e| StoreError::Serialization(e.to_string()))?;
                    Ok(Some(value))
                }
                None => Ok(None),
            }
        }

        async fn delete(&self, key: &str) -> Result<(), StoreError> {
            self.data
                .write()
                .map_err(|e| StoreError::Other(e.to_string()))?
                .remove(key);
            Ok(())
        }

        async fn clear(&self) -> Result<(), StoreError> {
            self.data
                .write()
                .map_err(|e| StoreError::Other(e.to_string()))?
                .clear();
            Ok(())
        }

        async fn count(&self) -> Result<u32, StoreError> {
            let data = self
                .data
                .read()
                .map_err(|e| StoreError::Other(e.to_string()))?;
            Ok(data.len() as u32)
        }

        async fn get_all_keys(&self) -> Result<Vec<String>, StoreError> {
            let data = self
                .data
                .read()
                .map_err(|e| StoreError::Other(e.to_string()))?;
            Ok(data.keys().cloned().collect())
        }

        async fn keys_in_range(
            &self,
            range: &KeyRange,
            limit: Option<u32>,
        ) -> Result<Vec<String>, StoreError> {
            let data = self
                .data
                .read()
                .map_err(|e| StoreError::Other(e.to_string()))?;
            let take = limit.map(|l| l as usize).unwrap_or(usize::MAX);
            Ok(data
                .keys()
                .filter(|k| range.contains(k))
                .take(take)
                .cloned()
                .collect())
        }
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::native::MemoryStore;
    use super::*;
    use futures_executor::block_on;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct CacheEntry {
        site: String,
        size_bytes: u64,
    }

    fn entry(site: &str, size_bytes: u64) -> CacheEntry {
        CacheEntry {
            site: site.to_string(),
            size_bytes,
        }
    }

    #[test]
    fn test_put_get_roundtrip() {
        let store = MemoryStore::new(StorageConfig::default());

        block_on(async {
            store.put("KDMX|1700000000000", &entry("KDMX", 4096)).await.unwrap();

            let loaded: Option<CacheEntry> = store.get("KDMX|1700000000000").await.unwrap();
            assert_eq!(loaded, Some(entry("KDMX", 4096)));
        });
    }

    #[test]
    fn test_get_missing_key_is_none() {
        let store = MemoryStore::new(StorageConfig::default());

        block_on(async {
            let loaded: Option<CacheEntry> = store.get("missing").await.unwrap();
            assert_eq!(loaded, None);
        });
    }

    #[test]
    fn test_put_overwrites() {
        let store = MemoryStore::new(StorageConfig::default());

        block_on(async {
            store.put("k", &entry("KDMX", 1)).await.unwrap();
            store.put("k", &entry("KTLX", 2)).await.unwrap();

            let loaded: Option<CacheEntry> = store.get("k").await.unwrap();
            assert_eq!(loaded, Some(entry("KTLX", 2)));
            assert_eq!(store.count().await.unwrap(), 1);
        });
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = MemoryStore::new(StorageConfig::default());

        block_on(async {
            store.put("k", &entry("KDMX", 1)).await.unwrap();
            store.delete("k").await.unwrap();
            store.delete("k").await.unwrap();

            let loaded: Option<CacheEntry> = store.get("k").await.unwrap();
            assert_eq!(loaded, None);
        });
    }

    #[test]
    fn test_clear_and_count() {
        let store = MemoryStore::new(StorageConfig::default());

        block_on(async {
            store.put("a", &entry("KDMX", 1)).await.unwrap();
            store.put("b", &entry("KTLX", 2)).await.unwrap();
            assert_eq!(store.count().await.unwrap(), 2);

            store.clear().await.unwrap();
            assert_eq!(store.count().await.unwrap(), 0);
            assert!(store.get_all_keys().await.unwrap().is_empty());
        });
    }

    #[test]
    fn test_keys_come_back_sorted() {
        let store = MemoryStore::new(StorageConfig::default());

        block_on(async {
            store.put("b", &entry("x", 1)).await.unwrap();
            store.put("a", &entry("x", 1)).await.unwrap();
            store.put("c", &entry("x", 1)).await.unwrap();

            assert_eq!(store.get_all_keys().await.unwrap(), ["a", "b", "c"]);
        });
    }

    #[test]
    fn test_keys_in_range_with_limit() {
        let store = MemoryStore::new(StorageConfig::default());

        block_on(async {
            for key in ["KDMX|1", "KDMX|2", "KDMX|3", "KTLX|1"] {
                store.put(key, &entry("x", 1)).await.unwrap();
            }

            let keys = store
                .keys_in_range(&KeyRange::prefix("KDMX|"), None)
                .await
                .unwrap();
            assert_eq!(keys, ["KDMX|1", "KDMX|2", "KDMX|3"]);

            let keys = store
                .keys_in_range(&KeyRange::prefix("KDMX|"), Some(2))
                .await
                .unwrap();
            assert_eq!(keys, ["KDMX|1", "KDMX|2"]);

            let keys = store
                .keys_in_range(&KeyRange::between("KDMX|2", "KTLX|1"), None)
                .await
                .unwrap();
            assert_eq!(keys, ["KDMX|2", "KDMX|3", "KTLX|1"]);
        });
    }

    #[test]
    fn test_config_builders() {
        let config = StorageConfig::new("app-cache", "records").with_version(4);
        assert_eq!(config.database_name, "app-cache");
        assert_eq!(config.store_name, "records");
        assert_eq!(config.version, 4);

        let config = StorageConfig::default();
        assert_eq!(config.version, 1);
    }
}
