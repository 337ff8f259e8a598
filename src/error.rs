//! Errors surfaced by the storage adapter.
//!
//! Every failure mode maps back to one of the underlying engine's event
//! sources: the open request, the version-change upgrade, a transaction,
//! or an individual operation request. Serialization failures happen on
//! our side of the boundary and get their own variant.

use thiserror::Error;

/// Errors that can occur while opening a database or running operations
/// against it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// IndexedDB is not available in this context (no window, or the
    /// engine is disabled).
    #[error("IndexedDB is not available: {0}")]
    Unsupported(String),

    /// The open request failed.
    #[error("failed to open database '{name}': {reason}")]
    OpenFailed { name: String, reason: String },

    /// The schema-upgrade callback (or schema application) failed. The
    /// version-change transaction is aborted and the database is left at
    /// its previous version.
    #[error("upgrade from v{old_version} to v{new_version} failed: {reason}")]
    UpgradeFailed {
        old_version: u32,
        new_version: u32,
        reason: String,
    },

    /// The schema description was rejected before any engine call.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// An operation was attempted on a connection that has been closed.
    #[error("database connection is not open")]
    NotOpen,

    /// A transaction could not be created or failed to complete.
    #[error("transaction failed: {0}")]
    TransactionFailed(String),

    /// The transaction was aborted, either explicitly or by the engine
    /// after a request error.
    #[error("transaction was aborted")]
    TransactionAborted,

    /// A single engine request's error event.
    #[error("{op} request failed: {reason}")]
    RequestFailed { op: &'static str, reason: String },

    /// Value serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// An unexpected state, such as an event channel closing early.
    #[error("storage error: {0}")]
    Other(String),
}

impl StoreError {
    pub(crate) fn request(op: &'static str, reason: impl Into<String>) -> Self {
        StoreError::RequestFailed {
            op,
            reason: reason.into(),
        }
    }
}

#[cfg(target_arch = "wasm32")]
pub(crate) fn js_error_string(value: &wasm_bindgen::JsValue) -> String {
    use wasm_bindgen::JsCast;

    if let Some(exception) = value.dyn_ref::<web_sys::DomException>() {
        format!("{}: {}", exception.name(), exception.message())
    } else if let Some(s) = value.as_string() {
        s
    } else {
        format!("{:?}", value)
    }
}
