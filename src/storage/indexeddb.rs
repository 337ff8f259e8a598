//! IndexedDB-backed implementation of [`KeyValueStore`] for WASM targets.
//!
//! Each operation opens (or reuses) the database handle, starts a
//! single-store transaction, and issues one wrapped engine call.

use super::{KeyValueStore, StorageConfig};
use crate::error::StoreError;
use crate::idb::{self, Database, OpenHooks, TransactionMode};
use crate::query::KeyRange;
use crate::schema::{DatabaseSchema, StoreSpec};
use serde::{de::DeserializeOwned, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsValue;

/// IndexedDB-based key-value store.
///
/// The database is opened lazily on first use and the handle is cached
/// for the lifetime of the store.
#[derive(Clone)]
pub struct IndexedDbStore {
    config: StorageConfig,
    db: Rc<RefCell<Option<Rc<Database>>>>,
}

impl IndexedDbStore {
    /// Creates a new IndexedDB store with the given configuration.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: Rc::new(RefCell::new(None)),
        }
    }

    fn schema(&self) -> DatabaseSchema {
        DatabaseSchema::new(&self.config.database_name)
            .with_version(self.config.version)
            .store(StoreSpec::new(&self.config.store_name))
    }

    /// Gets the database handle, opening it if necessary.
    async fn database(&self) -> Result<Rc<Database>, StoreError> {
        if let Some(db) = self.db.borrow().clone() {
            return Ok(db);
        }

        let db = Rc::new(idb::open_database(&self.schema(), OpenHooks::new()).await?);
        *self.db.borrow_mut() = Some(db.clone());
        Ok(db)
    }

    fn store_tx(
        &self,
        db: &Database,
        mode: TransactionMode,
    ) -> Result<(idb::Transaction, idb::StoreHandle), StoreError> {
        let tx = db.transaction(&[&self.config.store_name], mode)?;
        let store = tx.store(&self.config.store_name)?;
        Ok((tx, store))
    }
}

impl KeyValueStore for IndexedDbStore {
    async fn put<T: Serialize + 'static>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let db = self.database().await?;
        let (tx, store) = self.store_tx(&db, TransactionMode::ReadWrite)?;

        let js_value = idb::to_js(value)?;
        store.put(&js_value, Some(&JsValue::from_str(key))).await?;

        tx.done().await
    }

    async fn get<T: DeserializeOwned + 'static>(
        &self,
        key: &str,
    ) -> Result<Option<T>, StoreError> {
        let db = self.database().await?;
        let (_tx, store) = self.store_tx(&db, TransactionMode::ReadOnly)?;

        match store.get(&JsValue::from_str(key)).await? {
            Some(value) => Ok(Some(idb::from_js(value)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let db = self.database().await?;
        let (tx, store) = self.store_tx(&db, TransactionMode::ReadWrite)?;

        store.delete(&JsValue::from_str(key)).await?;

        tx.done().await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let db = self.database().await?;
        let (tx, store) = self.store_tx(&db, TransactionMode::ReadWrite)?;

        store.clear().await?;

        tx.done().await
    }

    async fn count(&self) -> Result<u32, StoreError> {
        let db = self.database().await?;
        let (_tx, store) = self.store_tx(&db, TransactionMode::ReadOnly)?;

        store.count(&KeyRange::All).await
    }

    async fn get_all_keys(&self) -> Result<Vec<String>, StoreError> {
        self.keys_in_range(&KeyRange::All, None).await
    }

    async fn keys_in_range(
        &self,
        range: &KeyRange,
        limit: Option<u32>,
    ) -> Result<Vec<String>, StoreError> {
        let db = self.database().await?;
        let (_tx, store) = self.store_tx(&db, TransactionMode::ReadOnly)?;

        let keys = store.get_all_keys(range, limit).await?;
        Ok(keys.into_iter().filter_map(|k| k.as_string()).collect())
    }
}
