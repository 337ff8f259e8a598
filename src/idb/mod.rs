//! Future-based wrappers over the browser's IndexedDB API.
//!
//! ## Open lifecycle
//!
//! Opening a database drives the engine's version-change protocol:
//!
//! 1. `open(name, version)` is issued against the window's factory.
//! 2. If the on-disk version is older, the engine fires `upgradeneeded`
//!    with a version-change transaction active. The upgrade callback
//!    runs synchronously inside that event; by default it applies the
//!    [`DatabaseSchema`] diff (create missing stores and indexes, drop
//!    indexes removed from a store's spec, leave unknown stores alone).
//!    An upgrade error aborts the version-change transaction, which
//!    fails the open.
//! 3. If another connection still holds an older version open, the
//!    engine fires `blocked`. The open keeps waiting; the `on_blocked`
//!    hook (or a warning log) is the observability.
//! 4. On `success` the handle is wrapped in [`Database`] and a
//!    `versionchange` listener is installed so this connection hears
//!    about other contexts requesting a newer version.
//!
//! ## Operation shape
//!
//! Every operation wrapper follows the same sequence: open or reuse a
//! handle, start a transaction, issue one engine request, await its
//! success/error events. See [`transaction::StoreHandle`].

mod codec;
mod cursor;
mod request;
mod transaction;

pub use codec::{from_js, to_js};
pub use cursor::Cursor;
pub use transaction::{IndexHandle, StoreHandle, Transaction, TransactionMode};

use crate::error::{js_error_string, StoreError};
use crate::schema::{DatabaseSchema, IndexSpec, KeyPath, StoreSpec};
use request::await_request;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    IdbDatabase, IdbIndexParameters, IdbObjectStore, IdbObjectStoreParameters, IdbOpenDbRequest,
    IdbTransaction, IdbVersionChangeEvent,
};

/// Schema-upgrade callback, run inside the version-change transaction.
pub type UpgradeHook = Box<dyn FnOnce(&Upgrade) -> Result<(), StoreError>>;

/// Version-conflict callback: receives the conflicting connection's old
/// version and the requested new version (`None` for a deletion).
pub type ConflictHook = Box<dyn FnMut(u32, Option<u32>)>;

/// Plug-in points for the open lifecycle.
#[derive(Default)]
pub struct OpenHooks {
    upgrade: Option<UpgradeHook>,
    blocked: Option<ConflictHook>,
    version_change: Option<ConflictHook>,
}

impl OpenHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the default schema-diff upgrade. The hook can still call
    /// [`Upgrade::apply`] and then migrate data through [`Upgrade::store`].
    pub fn on_upgrade(
        mut self,
        hook: impl FnOnce(&Upgrade) -> Result<(), StoreError> + 'static,
    ) -> Self {
        self.upgrade = Some(Box::new(hook));
        self
    }

    /// Called when this open is blocked by a connection at an older
    /// version.
    pub fn on_blocked(mut self, hook: impl FnMut(u32, Option<u32>) + 'static) -> Self {
        self.blocked = Some(Box::new(hook));
        self
    }

    /// Called when another context requests a newer version while this
    /// connection is open. Typically the hook closes the database so the
    /// upgrade elsewhere can proceed.
    pub fn on_version_change(mut self, hook: impl FnMut(u32, Option<u32>) + 'static) -> Self {
        self.version_change = Some(Box::new(hook));
        self
    }
}

/// Context handed to the upgrade callback while the version-change
/// transaction is active.
pub struct Upgrade {
    db: IdbDatabase,
    tx: IdbTransaction,
    pub old_version: u32,
    pub new_version: u32,
}

impl Upgrade {
    pub fn has_store(&self, name: &str) -> bool {
        self.db.object_store_names().contains(name)
    }

    /// Creates an object store and its indexes.
    pub fn create_store(&self, spec: &StoreSpec) -> Result<(), StoreError> {
        let params = IdbObjectStoreParameters::new();
        if let Some(key_path) = &spec.key_path {
            params.set_key_path(&key_path_js(key_path));
        }
        if spec.auto_increment {
            params.set_auto_increment(true);
        }

        let store = self
            .db
            .create_object_store_with_optional_parameters(&spec.name, &params)
            .map_err(|e| self.fail(format!("creating store '{}': {}", spec.name, js_error_string(&e))))?;

        for index in &spec.indexes {
            self.create_index(&store, &spec.name, index)?;
        }

        log::info!("Created object store '{}'", spec.name);
        Ok(())
    }

    /// Deletes an object store and everything in it.
    pub fn delete_store(&self, name: &str) -> Result<(), StoreError> {
        self.db
            .delete_object_store(name)
            .map_err(|e| self.fail(format!("deleting store '{}': {}", name, js_error_string(&e))))?;
        log::info!("Deleted object store '{}'", name);
        Ok(())
    }

    /// Opens a store through the version-change transaction, for data
    /// migration between schema versions.
    pub fn store(&self, name: &str) -> Result<StoreHandle, StoreError> {
        let store = self
            .tx
            .object_store(name)
            .map_err(|e| self.fail(format!("opening store '{}': {}", name, js_error_string(&e))))?;
        Ok(StoreHandle::new(store))
    }

    /// Applies the schema diff: creates missing stores, syncs indexes on
    /// stores the schema owns, and leaves unknown stores in place so
    /// older data survives for lazy migration.
    pub fn apply(&self, schema: &DatabaseSchema) -> Result<(), StoreError> {
        for spec in &schema.stores {
            if self.has_store(&spec.name) {
                let store = self.tx.object_store(&spec.name).map_err(|e| {
                    self.fail(format!("opening store '{}': {}", spec.name, js_error_string(&e)))
                })?;
                self.sync_indexes(&store, spec)?;
            } else {
                self.create_store(spec)?;
            }
        }
        Ok(())
    }

    fn sync_indexes(&self, store: &IdbObjectStore, spec: &StoreSpec) -> Result<(), StoreError> {
        let existing = store.index_names();

        for index in &spec.indexes {
            if !existing.contains(&index.name) {
                self.create_index(store, &spec.name, index)?;
            }
        }

        let mut stale = Vec::new();
        for i in 0..existing.length() {
            if let Some(name) = existing.item(i) {
                if !spec.indexes.iter().any(|ix| ix.name == name) {
                    stale.push(name);
                }
            }
        }
        for name in stale {
            store.delete_index(&name).map_err(|e| {
                self.fail(format!("deleting index '{}': {}", name, js_error_string(&e)))
            })?;
            log::info!("Dropped index '{}' from store '{}'", name, spec.name);
        }

        Ok(())
    }

    fn create_index(
        &self,
        store: &IdbObjectStore,
        store_name: &str,
        spec: &IndexSpec,
    ) -> Result<(), StoreError> {
        let params = IdbIndexParameters::new();
        params.set_unique(spec.unique);
        params.set_multi_entry(spec.multi_entry);

        let result = match &spec.key_path {
            KeyPath::Single(path) => {
                store.create_index_with_str_and_optional_parameters(&spec.name, path, &params)
            }
            KeyPath::Compound(paths) => {
                let array = js_sys::Array::new();
                for path in paths {
                    array.push(&JsValue::from_str(path));
                }
                store.create_index_with_str_sequence_and_optional_parameters(
                    &spec.name,
                    &JsValue::from(array),
                    &params,
                )
            }
        };

        result.map_err(|e| {
            self.fail(format!(
                "creating index '{}' on store '{}': {}",
                spec.name, store_name, js_error_string(&e)
            ))
        })?;
        Ok(())
    }

    fn fail(&self, reason: String) -> StoreError {
        StoreError::UpgradeFailed {
            old_version: self.old_version,
            new_version: self.new_version,
            reason,
        }
    }
}

/// An open database connection.
///
/// Dropping the handle closes the connection.
pub struct Database {
    inner: IdbDatabase,
    name: String,
    version: u32,
    closed: Cell<bool>,
}

impl Database {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn store_names(&self) -> Vec<String> {
        let names = self.inner.object_store_names();
        (0..names.length()).filter_map(|i| names.item(i)).collect()
    }

    /// Starts a transaction over the given stores.
    pub fn transaction(
        &self,
        stores: &[&str],
        mode: TransactionMode,
    ) -> Result<Transaction, StoreError> {
        if self.closed.get() {
            return Err(StoreError::NotOpen);
        }

        let inner = if stores.len() == 1 {
            self.inner
                .transaction_with_str_and_mode(stores[0], mode.to_idb())
        } else {
            let names = js_sys::Array::new();
            for name in stores {
                names.push(&JsValue::from_str(name));
            }
            self.inner
                .transaction_with_str_sequence_and_mode(&JsValue::from(names), mode.to_idb())
        }
        .map_err(|e| StoreError::TransactionFailed(js_error_string(&e)))?;

        Ok(Transaction::new(inner))
    }

    /// Closes the connection. Idempotent; later operations return
    /// [`StoreError::NotOpen`].
    pub fn close(&self) {
        if !self.closed.replace(true) {
            self.inner.close();
            log::debug!("Closed database '{}'", self.name);
        }
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opens (and if necessary creates or upgrades) a database described by
/// `schema`, wiring the lifecycle hooks in `hooks`.
pub async fn open_database(
    schema: &DatabaseSchema,
    hooks: OpenHooks,
) -> Result<Database, StoreError> {
    schema.validate()?;

    let OpenHooks {
        upgrade,
        blocked,
        version_change,
    } = hooks;

    let factory = factory()?;
    let request = factory
        .open_with_u32(&schema.name, schema.version)
        .map_err(|e| StoreError::OpenFailed {
            name: schema.name.clone(),
            reason: js_error_string(&e),
        })?;

    // The upgrade callback must run synchronously inside the event: the
    // version-change transaction is only guaranteed active there. Errors
    // are stashed and re-raised once the open settles.
    let upgrade_error: Rc<RefCell<Option<StoreError>>> = Rc::new(RefCell::new(None));

    let hook_slot = Rc::new(RefCell::new(upgrade));
    let error_slot = upgrade_error.clone();
    let upgrade_schema = schema.clone();
    let onupgradeneeded = Closure::wrap(Box::new(move |event: IdbVersionChangeEvent| {
        let old_version = event.old_version() as u32;
        let new_version = event
            .new_version()
            .map(|v| v as u32)
            .unwrap_or(upgrade_schema.version);

        let request: IdbOpenDbRequest = event
            .target()
            .unwrap()
            .dyn_into()
            .expect("event target should be an IdbOpenDbRequest");
        let db: IdbDatabase = request
            .result()
            .expect("open request should have a result")
            .dyn_into()
            .expect("open result should be an IdbDatabase");

        let Some(tx) = request.transaction() else {
            *error_slot.borrow_mut() = Some(StoreError::UpgradeFailed {
                old_version,
                new_version,
                reason: "missing version-change transaction".to_string(),
            });
            return;
        };

        log::info!(
            "Upgrading database '{}' from v{} to v{}",
            upgrade_schema.name,
            old_version,
            new_version
        );

        let upgrade = Upgrade {
            db,
            tx,
            old_version,
            new_version,
        };

        let outcome = match hook_slot.borrow_mut().take() {
            Some(hook) => hook(&upgrade),
            None => upgrade.apply(&upgrade_schema),
        };

        if let Err(e) = outcome {
            log::error!("Upgrade of '{}' failed: {}", upgrade_schema.name, e);
            let _ = upgrade.tx.abort();
            *error_slot.borrow_mut() = Some(StoreError::UpgradeFailed {
                old_version,
                new_version,
                reason: e.to_string(),
            });
        }
    }) as Box<dyn FnMut(_)>);
    request.set_onupgradeneeded(Some(onupgradeneeded.as_ref().unchecked_ref()));

    let mut blocked_hook = blocked;
    let blocked_name = schema.name.clone();
    let onblocked = Closure::wrap(Box::new(move |event: IdbVersionChangeEvent| {
        let old = event.old_version() as u32;
        let new = event.new_version().map(|v| v as u32);
        match blocked_hook.as_mut() {
            Some(hook) => hook(old, new),
            None => log::warn!(
                "Open of '{}' is blocked by a connection at v{} (upgrading to {:?})",
                blocked_name,
                old,
                new
            ),
        }
    }) as Box<dyn FnMut(_)>);
    request.set_onblocked(Some(onblocked.as_ref().unchecked_ref()));

    let result = await_request(&request, "open").await;

    request.set_onupgradeneeded(None);
    request.set_onblocked(None);
    drop(onupgradeneeded);
    drop(onblocked);

    if let Some(err) = upgrade_error.borrow_mut().take() {
        return Err(err);
    }

    let result = result.map_err(|e| match e {
        StoreError::RequestFailed { reason, .. } => StoreError::OpenFailed {
            name: schema.name.clone(),
            reason,
        },
        other => other,
    })?;

    let db: IdbDatabase = result.dyn_into().map_err(|_| StoreError::OpenFailed {
        name: schema.name.clone(),
        reason: "open result was not a database handle".to_string(),
    })?;

    // The connection outlives this call, so the listener leaks with it.
    let mut conflict_hook = version_change;
    let conflict_name = schema.name.clone();
    let onversionchange = Closure::wrap(Box::new(move |event: IdbVersionChangeEvent| {
        let old = event.old_version() as u32;
        let new = event.new_version().map(|v| v as u32);
        match conflict_hook.as_mut() {
            Some(hook) => hook(old, new),
            None => log::warn!(
                "Database '{}' (v{}) is blocking a version change to {:?}",
                conflict_name,
                old,
                new
            ),
        }
    }) as Box<dyn FnMut(_)>);
    db.set_onversionchange(Some(onversionchange.as_ref().unchecked_ref()));
    onversionchange.forget();

    log::info!("Opened database '{}' v{}", schema.name, schema.version);

    Ok(Database {
        inner: db,
        name: schema.name.clone(),
        version: schema.version,
        closed: Cell::new(false),
    })
}

/// Deletes a database. Resolves once the engine confirms the deletion;
/// a blocked deletion waits for open connections to close.
pub async fn delete_database(name: &str) -> Result<(), StoreError> {
    let factory = factory()?;
    let request = factory
        .delete_database(name)
        .map_err(|e| StoreError::OpenFailed {
            name: name.to_string(),
            reason: js_error_string(&e),
        })?;

    let blocked_name = name.to_string();
    let onblocked = Closure::wrap(Box::new(move |event: IdbVersionChangeEvent| {
        let old = event.old_version() as u32;
        log::warn!(
            "Deletion of '{}' is blocked by a connection at v{}",
            blocked_name,
            old
        );
    }) as Box<dyn FnMut(_)>);
    request.set_onblocked(Some(onblocked.as_ref().unchecked_ref()));

    let result = await_request(&request, "deleteDatabase").await;

    request.set_onblocked(None);
    drop(onblocked);

    result?;
    log::info!("Deleted database '{}'", name);
    Ok(())
}

fn factory() -> Result<web_sys::IdbFactory, StoreError> {
    let window =
        web_sys::window().ok_or_else(|| StoreError::Unsupported("no window object".to_string()))?;

    window
        .indexed_db()
        .map_err(|e| StoreError::Unsupported(js_error_string(&e)))?
        .ok_or_else(|| StoreError::Unsupported("IndexedDB not available".to_string()))
}

fn key_path_js(key_path: &KeyPath) -> JsValue {
    match key_path {
        KeyPath::Single(path) => JsValue::from_str(path),
        KeyPath::Compound(paths) => {
            let array = js_sys::Array::new();
            for path in paths {
                array.push(&JsValue::from_str(path));
            }
            JsValue::from(array)
        }
    }
}
