//! Serde <-> JsValue conversion for stored values.
//!
//! Values cross the boundary as plain JS objects (the JSON-compatible
//! serializer), which keeps them structured-clone safe and readable in
//! browser devtools.

use crate::error::StoreError;
use serde::{de::DeserializeOwned, Serialize};
use wasm_bindgen::JsValue;

pub fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, StoreError> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    value
        .serialize(&serializer)
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

pub fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, StoreError> {
    serde_wasm_bindgen::from_value(value).map_err(|e| StoreError::Serialization(e.to_string()))
}
