//! Cursor stepping over a store or index.
//!
//! A cursor shares one request with the engine: `continue_()` re-fires
//! success on the request that opened it, so each step re-awaits the
//! same request. A null/undefined result terminates iteration.

use super::request::await_request;
use crate::error::{js_error_string, StoreError};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{IdbCursorWithValue, IdbRequest};

/// A positioned cursor with a value.
pub struct Cursor {
    request: IdbRequest,
    inner: IdbCursorWithValue,
}

impl Cursor {
    /// Awaits an open-cursor request. Resolves to `None` when no record
    /// falls in the cursor's range.
    pub(crate) async fn open(request: IdbRequest) -> Result<Option<Cursor>, StoreError> {
        let result = await_request(&request, "openCursor").await?;
        Self::from_result(request, result)
    }

    fn from_result(request: IdbRequest, result: JsValue) -> Result<Option<Cursor>, StoreError> {
        if result.is_undefined() || result.is_null() {
            return Ok(None);
        }

        let inner: IdbCursorWithValue = result
            .dyn_into()
            .map_err(|_| StoreError::Other("expected an IdbCursorWithValue".to_string()))?;

        Ok(Some(Cursor { request, inner }))
    }

    /// The key at the cursor's current position.
    pub fn key(&self) -> Result<JsValue, StoreError> {
        self.inner
            .key()
            .map_err(|e| StoreError::request("cursorKey", js_error_string(&e)))
    }

    /// The primary key of the current record. Differs from [`Cursor::key`]
    /// only when iterating an index.
    pub fn primary_key(&self) -> Result<JsValue, StoreError> {
        self.inner
            .primary_key()
            .map_err(|e| StoreError::request("cursorPrimaryKey", js_error_string(&e)))
    }

    /// The value of the current record.
    pub fn value(&self) -> Result<JsValue, StoreError> {
        self.inner
            .value()
            .map_err(|e| StoreError::request("cursorValue", js_error_string(&e)))
    }

    /// Replaces the current record's value in place. Requires a
    /// readwrite transaction.
    pub async fn update(&self, value: &JsValue) -> Result<(), StoreError> {
        let request = self
            .inner
            .update(value)
            .map_err(|e| StoreError::request("cursorUpdate", js_error_string(&e)))?;

        await_request(&request, "cursorUpdate").await?;
        Ok(())
    }

    /// Deletes the current record. The cursor stays positioned and can
    /// still advance.
    pub async fn delete(&self) -> Result<(), StoreError> {
        let request = self
            .inner
            .delete()
            .map_err(|e| StoreError::request("cursorDelete", js_error_string(&e)))?;

        await_request(&request, "cursorDelete").await?;
        Ok(())
    }

    /// Steps to the next record, consuming this position. Resolves to
    /// `None` at the end of the range.
    pub async fn advance(self) -> Result<Option<Cursor>, StoreError> {
        self.inner
            .continue_()
            .map_err(|e| StoreError::request("cursorContinue", js_error_string(&e)))?;

        let result = await_request(&self.request, "cursorContinue").await?;
        Self::from_result(self.request, result)
    }
}
