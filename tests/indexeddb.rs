//! Browser integration tests for the IndexedDB adapter.
//!
//! These run under `wasm-pack test --headless --chrome` (or firefox);
//! on native targets this file compiles to nothing.

#![cfg(target_arch = "wasm32")]

use idb_store::{
    delete_database, open_database, DatabaseSchema, Direction, IndexSpec, IndexedDbStore, KeyPath,
    KeyRange, KeyValueStore, OpenHooks, StorageConfig, StoreError, StoreSpec, TransactionMode,
};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::JsValue;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Entry {
    site: String,
    size_bytes: u64,
}

fn entry(site: &str, size_bytes: u64) -> Entry {
    Entry {
        site: site.to_string(),
        size_bytes,
    }
}

#[wasm_bindgen_test]
async fn open_creates_declared_stores() {
    let name = "idb-store-test-open";
    delete_database(name).await.unwrap();

    let schema = DatabaseSchema::new(name)
        .store(
            StoreSpec::new("records")
                .index(IndexSpec::new("by_site", KeyPath::single("site"))),
        )
        .store(StoreSpec::new("blobs"));

    let db = open_database(&schema, OpenHooks::new()).await.unwrap();

    let mut names = db.store_names();
    names.sort();
    assert_eq!(names, ["blobs", "records"]);

    db.close();
    delete_database(name).await.unwrap();
}

#[wasm_bindgen_test]
async fn put_get_delete_roundtrip() {
    let config = StorageConfig::new("idb-store-test-kv", "cache");
    delete_database(&config.database_name).await.unwrap();

    let store = IndexedDbStore::new(config);

    store.put("KDMX|1700000000000", &entry("KDMX", 4096)).await.unwrap();

    let loaded: Option<Entry> = store.get("KDMX|1700000000000").await.unwrap();
    assert_eq!(loaded, Some(entry("KDMX", 4096)));

    let missing: Option<Entry> = store.get("missing").await.unwrap();
    assert_eq!(missing, None);

    store.delete("KDMX|1700000000000").await.unwrap();
    let gone: Option<Entry> = store.get("KDMX|1700000000000").await.unwrap();
    assert_eq!(gone, None);

    // Deleting again still succeeds.
    store.delete("KDMX|1700000000000").await.unwrap();
}

#[wasm_bindgen_test]
async fn keys_and_count_follow_range() {
    let config = StorageConfig::new("idb-store-test-range", "cache");
    delete_database(&config.database_name).await.unwrap();

    let store = IndexedDbStore::new(config);

    for key in ["KDMX|1", "KDMX|2", "KDMX|3", "KTLX|1"] {
        store.put(key, &entry("x", 1)).await.unwrap();
    }

    assert_eq!(store.count().await.unwrap(), 4);
    assert_eq!(
        store.get_all_keys().await.unwrap(),
        ["KDMX|1", "KDMX|2", "KDMX|3", "KTLX|1"]
    );

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
}

#[wasm_bindgen_test]
async fn reopen_at_higher_version_runs_upgrade() {
    let name = "idb-store-test-upgrade";
    delete_database(name).await.unwrap();

    let v1 = DatabaseSchema::new(name).store(StoreSpec::new("records"));
    let db = open_database(&v1, OpenHooks::new()).await.unwrap();
    db.close();

    let seen_old = Rc::new(Cell::new(u32::MAX));
    let seen_new = Rc::new(Cell::new(u32::MAX));

    let v2 = DatabaseSchema::new(name)
        .with_version(2)
        .store(StoreSpec::new("records"))
        .store(StoreSpec::new("blobs"));

    let old_slot = seen_old.clone();
    let new_slot = seen_new.clone();
    let v2_applied = v2.clone();
    let hooks = OpenHooks::new().on_upgrade(move |upgrade| {
        old_slot.set(upgrade.old_version);
        new_slot.set(upgrade.new_version);
        upgrade.apply(&v2_applied)
    });

    let db = open_database(&v2, hooks).await.unwrap();

    assert_eq!(seen_old.get(), 1);
    assert_eq!(seen_new.get(), 2);
    assert!(db.store_names().contains(&"blobs".to_string()));

    db.close();
    delete_database(name).await.unwrap();
}

#[wasm_bindgen_test]
async fn cursor_scan_follows_direction() {
    let name = "idb-store-test-cursor";
    delete_database(name).await.unwrap();

    let schema = DatabaseSchema::new(name).store(StoreSpec::new("records"));
    let db = open_database(&schema, OpenHooks::new()).await.unwrap();

    let tx = db.transaction(&["records"], TransactionMode::ReadWrite).unwrap();
    let store = tx.store("records").unwrap();
    for key in ["a", "b", "c"] {
        store
            .put(&JsValue::from_str(key), Some(&JsValue::from_str(key)))
            .await
            .unwrap();
    }
    tx.done().await.unwrap();

    let tx = db.transaction(&["records"], TransactionMode::ReadOnly).unwrap();
    let store = tx.store("records").unwrap();

    let forward = store
        .scan(&KeyRange::all(), Direction::Forward, None)
        .await
        .unwrap();
    let keys: Vec<String> = forward.iter().filter_map(|(k, _)| k.as_string()).collect();
    assert_eq!(keys, ["a", "b", "c"]);

    let reverse = store
        .scan(&KeyRange::all(), Direction::Reverse, Some(2))
        .await
        .unwrap();
    let keys: Vec<String> = reverse.iter().filter_map(|(k, _)| k.as_string()).collect();
    assert_eq!(keys, ["c", "b"]);

    db.close();
    delete_database(name).await.unwrap();
}

#[wasm_bindgen_test]
async fn add_rejects_duplicate_keys() {
    let name = "idb-store-test-add";
    delete_database(name).await.unwrap();

    let schema = DatabaseSchema::new(name).store(StoreSpec::new("records"));
    let db = open_database(&schema, OpenHooks::new()).await.unwrap();

    let tx = db.transaction(&["records"], TransactionMode::ReadWrite).unwrap();
    let store = tx.store("records").unwrap();

    store
        .add(&JsValue::from_str("v1"), Some(&JsValue::from_str("k")))
        .await
        .unwrap();

    let duplicate = store
        .add(&JsValue::from_str("v2"), Some(&JsValue::from_str("k")))
        .await;
    assert!(matches!(duplicate, Err(StoreError::RequestFailed { .. })));

    db.close();
    delete_database(name).await.unwrap();
}
