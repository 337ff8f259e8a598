//! Transaction and object-store operation wrappers.
//!
//! Every operation follows the same shape: issue one engine call, await
//! its request, decode the result. The engine auto-commits a transaction
//! once no further requests are issued from its callbacks; [`Transaction::done`]
//! awaits that commit when the caller needs durability confirmation.

use super::cursor::Cursor;
use super::request::{await_request, await_transaction};
use crate::error::{js_error_string, StoreError};
use crate::query::{Direction, KeyRange};
use wasm_bindgen::prelude::*;
use web_sys::{IdbIndex, IdbObjectStore, IdbTransaction, IdbTransactionMode};

/// Transaction access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionMode {
    #[default]
    ReadOnly,
    ReadWrite,
}

impl TransactionMode {
    pub(crate) fn to_idb(self) -> IdbTransactionMode {
        match self {
            TransactionMode::ReadOnly => IdbTransactionMode::Readonly,
            TransactionMode::ReadWrite => IdbTransactionMode::Readwrite,
        }
    }
}

/// A transaction over one or more object stores.
pub struct Transaction {
    inner: IdbTransaction,
}

impl Transaction {
    pub(crate) fn new(inner: IdbTransaction) -> Self {
        Self { inner }
    }

    /// Opens one of the object stores this transaction covers.
    pub fn store(&self, name: &str) -> Result<StoreHandle, StoreError> {
        let store = self
            .inner
            .object_store(name)
            .map_err(|e| StoreError::TransactionFailed(js_error_string(&e)))?;
        Ok(StoreHandle { inner: store })
    }

    /// Rolls the transaction back.
    pub fn abort(&self) -> Result<(), StoreError> {
        self.inner
            .abort()
            .map_err(|e| StoreError::TransactionFailed(js_error_string(&e)))
    }

    /// Waits for the transaction to commit.
    pub async fn done(self) -> Result<(), StoreError> {
        await_transaction(&self.inner).await
    }
}

/// An object store opened within a transaction.
pub struct StoreHandle {
    inner: IdbObjectStore,
}

impl StoreHandle {
    pub(crate) fn new(inner: IdbObjectStore) -> Self {
        Self { inner }
    }

    /// Gets the value stored under `key`, or `None`.
    pub async fn get(&self, key: &JsValue) -> Result<Option<JsValue>, StoreError> {
        let request = self
            .inner
            .get(key)
            .map_err(|e| StoreError::request("get", js_error_string(&e)))?;

        let result = await_request(&request, "get").await?;
        Ok(defined(result))
    }

    /// Gets up to `limit` values whose keys fall in `range`.
    pub async fn get_all(
        &self,
        range: &KeyRange,
        limit: Option<u32>,
    ) -> Result<Vec<JsValue>, StoreError> {
        let query = range_query(range)?;
        let request = match limit {
            Some(limit) => self.inner.get_all_with_key_and_limit(&query, limit),
            None => self.inner.get_all_with_key(&query),
        }
        .map_err(|e| StoreError::request("getAll", js_error_string(&e)))?;

        let result = await_request(&request, "getAll").await?;
        Ok(js_sys::Array::from(&result).iter().collect())
    }

    /// Gets up to `limit` keys in `range`, in ascending key order.
    pub async fn get_all_keys(
        &self,
        range: &KeyRange,
        limit: Option<u32>,
    ) -> Result<Vec<JsValue>, StoreError> {
        let query = range_query(range)?;
        let request = match limit {
            Some(limit) => self.inner.get_all_keys_with_key_and_limit(&query, limit),
            None => self.inner.get_all_keys_with_key(&query),
        }
        .map_err(|e| StoreError::request("getAllKeys", js_error_string(&e)))?;

        let result = await_request(&request, "getAllKeys").await?;
        Ok(js_sys::Array::from(&result).iter().collect())
    }

    /// Counts the records in `range`.
    pub async fn count(&self, range: &KeyRange) -> Result<u32, StoreError> {
        let request = match range.to_idb()? {
            Some(idb_range) => self.inner.count_with_key(idb_range.as_ref()),
            None => self.inner.count(),
        }
        .map_err(|e| StoreError::request("count", js_error_string(&e)))?;

        let result = await_request(&request, "count").await?;
        Ok(result.as_f64().unwrap_or(0.0) as u32)
    }

    /// Stores `value`, overwriting any record at the same key. Returns
    /// the record's key (generated when the store auto-increments).
    pub async fn put(&self, value: &JsValue, key: Option<&JsValue>) -> Result<JsValue, StoreError> {
        let request = match key {
            Some(key) => self.inner.put_with_key(value, key),
            None => self.inner.put(value),
        }
        .map_err(|e| StoreError::request("put", js_error_string(&e)))?;

        await_request(&request, "put").await
    }

    /// Stores `value` under a key that must not already exist. A
    /// duplicate surfaces the engine's ConstraintError.
    pub async fn add(&self, value: &JsValue, key: Option<&JsValue>) -> Result<JsValue, StoreError> {
        let request = match key {
            Some(key) => self.inner.add_with_key(value, key),
            None => self.inner.add(value),
        }
        .map_err(|e| StoreError::request("add", js_error_string(&e)))?;

        await_request(&request, "add").await
    }

    /// Deletes the record at `key`. Deleting a missing key succeeds.
    pub async fn delete(&self, key: &JsValue) -> Result<(), StoreError> {
        let request = self
            .inner
            .delete(key)
            .map_err(|e| StoreError::request("delete", js_error_string(&e)))?;

        await_request(&request, "delete").await?;
        Ok(())
    }

    /// Deletes every record whose key falls in `range`.
    pub async fn delete_range(&self, range: &KeyRange) -> Result<(), StoreError> {
        // delete() rejects an unbounded query; route it to clear().
        let Some(idb_range) = range.to_idb()? else {
            return self.clear().await;
        };

        let request = self
            .inner
            .delete(idb_range.as_ref())
            .map_err(|e| StoreError::request("delete", js_error_string(&e)))?;

        await_request(&request, "delete").await?;
        Ok(())
    }

    /// Removes every record in the store.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let request = self
            .inner
            .clear()
            .map_err(|e| StoreError::request("clear", js_error_string(&e)))?;

        await_request(&request, "clear").await?;
        Ok(())
    }

    /// Opens a named index on this store.
    pub fn index(&self, name: &str) -> Result<IndexHandle, StoreError> {
        let index = self
            .inner
            .index(name)
            .map_err(|e| StoreError::request("index", js_error_string(&e)))?;
        Ok(IndexHandle { inner: index })
    }

    /// Opens a cursor over `range`, or `None` when the range is empty.
    pub async fn open_cursor(
        &self,
        range: &KeyRange,
        direction: Direction,
    ) -> Result<Option<Cursor>, StoreError> {
        let query = range_query(range)?;
        let request = self
            .inner
            .open_cursor_with_range_and_direction(&query, direction.to_idb())
            .map_err(|e| StoreError::request("openCursor", js_error_string(&e)))?;

        Cursor::open(request).await
    }

    /// Walks a cursor over `range`, collecting up to `limit` key/value
    /// pairs in the given direction.
    pub async fn scan(
        &self,
        range: &KeyRange,
        direction: Direction,
        limit: Option<u32>,
    ) -> Result<Vec<(JsValue, JsValue)>, StoreError> {
        let mut entries = Vec::new();
        let mut cursor = self.open_cursor(range, direction).await?;

        while let Some(cur) = cursor {
            if let Some(limit) = limit {
                if entries.len() >= limit as usize {
                    break;
                }
            }
            entries.push((cur.key()?, cur.value()?));
            cursor = cur.advance().await?;
        }

        Ok(entries)
    }
}

/// An index opened within a transaction.
pub struct IndexHandle {
    inner: IdbIndex,
}

impl IndexHandle {
    /// Gets the first value whose index key matches `key`, or `None`.
    pub async fn get(&self, key: &JsValue) -> Result<Option<JsValue>, StoreError> {
        let request = self
            .inner
            .get(key)
            .map_err(|e| StoreError::request("indexGet", js_error_string(&e)))?;

        let result = await_request(&request, "indexGet").await?;
        Ok(defined(result))
    }

    /// Gets up to `limit` values whose index keys fall in `range`.
    pub async fn get_all(
        &self,
        range: &KeyRange,
        limit: Option<u32>,
    ) -> Result<Vec<JsValue>, StoreError> {
        let query = range_query(range)?;
        let request = match limit {
            Some(limit) => self.inner.get_all_with_key_and_limit(&query, limit),
            None => self.inner.get_all_with_key(&query),
        }
        .map_err(|e| StoreError::request("indexGetAll", js_error_string(&e)))?;

        let result = await_request(&request, "indexGetAll").await?;
        Ok(js_sys::Array::from(&result).iter().collect())
    }

    /// Counts the records whose index keys fall in `range`.
    pub async fn count(&self, range: &KeyRange) -> Result<u32, StoreError> {
        let request = match range.to_idb()? {
            Some(idb_range) => self.inner.count_with_key(idb_range.as_ref()),
            None => self.inner.count(),
        }
        .map_err(|e| StoreError::request("indexCount", js_error_string(&e)))?;

        let result = await_request(&request, "indexCount").await?;
        Ok(result.as_f64().unwrap_or(0.0) as u32)
    }

    /// Opens a cursor over `range`, or `None` when the range is empty.
    pub async fn open_cursor(
        &self,
        range: &KeyRange,
        direction: Direction,
    ) -> Result<Option<Cursor>, StoreError> {
        let query = range_query(range)?;
        let request = self
            .inner
            .open_cursor_with_range_and_direction(&query, direction.to_idb())
            .map_err(|e| StoreError::request("indexOpenCursor", js_error_string(&e)))?;

        Cursor::open(request).await
    }
}

/// Converts a range to the query argument the engine expects. Unbounded
/// ranges become `undefined`, which the engine treats as "all keys".
fn range_query(range: &KeyRange) -> Result<JsValue, StoreError> {
    Ok(match range.to_idb()? {
        Some(idb_range) => idb_range.into(),
        None => JsValue::UNDEFINED,
    })
}

/// Maps the engine's miss sentinel (undefined/null result) to `None`.
fn defined(value: JsValue) -> Option<JsValue> {
    if value.is_undefined() || value.is_null() {
        None
    } else {
        Some(value)
    }
}
