//! A future-based adapter over the browser's IndexedDB storage engine.
//!
//! IndexedDB exposes everything through events: open requests fire
//! `upgradeneeded`/`blocked`/`success`, transactions fire
//! `complete`/`abort`, and every operation is a request with
//! `success`/`error` callbacks. This crate shepherds those callbacks
//! into async Rust and provides plug-in points for the two decisions
//! the engine delegates to the application: how to upgrade the schema,
//! and what to do on a version conflict.
//!
//! ## Layers
//!
//! ```text
//! storage  - KeyValueStore: string keys, serde values, one txn per op
//! idb      - Database / Transaction / StoreHandle / Cursor wrappers
//! schema   - pure description of stores and indexes, applied on upgrade
//! query    - key ranges and cursor directions
//! ```
//!
//! On native targets the `idb` layer is absent and
//! `storage::native::MemoryStore` provides the same `KeyValueStore`
//! semantics for development and tests.

pub mod error;
pub mod query;
pub mod schema;
pub mod storage;

#[cfg(target_arch = "wasm32")]
pub mod idb;

pub use error::StoreError;
pub use query::{Direction, KeyRange};
pub use schema::{DatabaseSchema, IndexSpec, KeyPath, StoreSpec};
pub use storage::{KeyValueStore, StorageConfig};

#[cfg(target_arch = "wasm32")]
pub use idb::{
    delete_database, open_database, Cursor, Database, OpenHooks, Transaction, TransactionMode,
    Upgrade,
};

#[cfg(target_arch = "wasm32")]
pub use storage::IndexedDbStore;

#[cfg(not(target_arch = "wasm32"))]
pub use storage::native::MemoryStore;
