//! Schema descriptions applied during the version-change upgrade.
//!
//! A [`DatabaseSchema`] is a pure description of the object stores and
//! indexes a database should contain. It is validated before any engine
//! call, and the default upgrade callback materializes it by diffing
//! against whatever stores already exist (see `idb::open`).

use crate::error::StoreError;

/// A key path into stored values.
///
/// IndexedDB accepts either a single property path ("meta.id") or an
/// array of paths for compound keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPath {
    Single(String),
    Compound(Vec<String>),
}

impl KeyPath {
    pub fn single(path: impl Into<String>) -> Self {
        KeyPath::Single(path.into())
    }

    pub fn compound<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeyPath::Compound(paths.into_iter().map(Into::into).collect())
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, KeyPath::Compound(_))
    }
}

/// An index on an object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub key_path: KeyPath,
    /// Reject records whose index key duplicates an existing one.
    pub unique: bool,
    /// Index each element of an array value separately. Not valid on
    /// compound key paths (engine rule).
    pub multi_entry: bool,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>, key_path: KeyPath) -> Self {
        Self {
            name: name.into(),
            key_path,
            unique: false,
            multi_entry: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn multi_entry(mut self) -> Self {
        self.multi_entry = true;
        self
    }
}

/// An object store within a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSpec {
    pub name: String,
    /// In-line key path. `None` means out-of-line keys supplied per call.
    pub key_path: Option<KeyPath>,
    pub auto_increment: bool,
    pub indexes: Vec<IndexSpec>,
}

impl StoreSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key_path: None,
            auto_increment: false,
            indexes: Vec::new(),
        }
    }

    pub fn key_path(mut self, key_path: KeyPath) -> Self {
        self.key_path = Some(key_path);
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }
}

/// The stores and indexes a database should contain at a given version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSchema {
    pub name: String,
    pub version: u32,
    pub stores: Vec<StoreSpec>,
}

impl DatabaseSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: 1,
            stores: Vec::new(),
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn store(mut self, store: StoreSpec) -> Self {
        self.stores.push(store);
        self
    }

    pub fn store_names(&self) -> impl Iterator<Item = &str> {
        self.stores.iter().map(|s| s.name.as_str())
    }

    pub fn store_spec(&self, name: &str) -> Option<&StoreSpec> {
        self.stores.iter().find(|s| s.name == name)
    }

    /// Checks the schema before it reaches the engine.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.name.is_empty() {
            return Err(StoreError::InvalidSchema(
                "database name must not be empty".to_string(),
            ));
        }
        if self.version == 0 {
            return Err(StoreError::InvalidSchema(
                "database version must be >= 1".to_string(),
            ));
        }

        for (i, store) in self.stores.iter().enumerate() {
            if store.name.is_empty() {
                return Err(StoreError::InvalidSchema(
                    "object store name must not be empty".to_string(),
                ));
            }
            if self.stores[..i].iter().any(|s| s.name == store.name) {
                return Err(StoreError::InvalidSchema(format!(
                    "duplicate object store '{}'",
                    store.name
                )));
            }

            for (j, index) in store.indexes.iter().enumerate() {
                if index.name.is_empty() {
                    return Err(StoreError::InvalidSchema(format!(
                        "index on store '{}' has an empty name",
                        store.name
                    )));
                }
                if store.indexes[..j].iter().any(|x| x.name == index.name) {
                    return Err(StoreError::InvalidSchema(format!(
                        "duplicate index '{}' on store '{}'",
                        index.name, store.name
                    )));
                }
                if index.multi_entry && index.key_path.is_compound() {
                    return Err(StoreError::InvalidSchema(format!(
                        "index '{}' on store '{}' is multi-entry with a compound key path",
                        index.name, store.name
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_produces_valid_schema() {
        let schema = DatabaseSchema::new("app-cache")
            .with_version(3)
            .store(
                StoreSpec::new("records")
                    .key_path(KeyPath::single("id"))
                    .index(IndexSpec::new("by_time", KeyPath::single("updated_at")))
                    .index(
                        IndexSpec::new(
                            "by_site_time",
                            KeyPath::compound(["site", "updated_at"]),
                        )
                        .unique(),
                    ),
            )
            .store(StoreSpec::new("blobs"));

        assert!(schema.validate().is_ok());
        assert_eq!(schema.store_names().collect::<Vec<_>>(), ["records", "blobs"]);
        assert!(schema.store_spec("records").is_some());
        assert!(schema.store_spec("missing").is_none());
    }

    #[test]
    fn test_version_zero_rejected() {
        let schema = DatabaseSchema::new("db").with_version(0);
        assert!(matches!(
            schema.validate(),
            Err(StoreError::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_duplicate_store_rejected() {
        let schema = DatabaseSchema::new("db")
            .store(StoreSpec::new("records"))
            .store(StoreSpec::new("records"));
        assert!(matches!(
            schema.validate(),
            Err(StoreError::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let schema = DatabaseSchema::new("db").store(
            StoreSpec::new("records")
                .index(IndexSpec::new("by_time", KeyPath::single("t")))
                .index(IndexSpec::new("by_time", KeyPath::single("t2"))),
        );
        assert!(matches!(
            schema.validate(),
            Err(StoreError::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_multi_entry_compound_rejected() {
        let schema = DatabaseSchema::new("db").store(
            StoreSpec::new("records").index(
                IndexSpec::new("tags", KeyPath::compound(["a", "b"])).multi_entry(),
            ),
        );
        assert!(matches!(
            schema.validate(),
            Err(StoreError::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_empty_names_rejected() {
        assert!(DatabaseSchema::new("").validate().is_err());
        assert!(DatabaseSchema::new("db")
            .store(StoreSpec::new(""))
            .validate()
            .is_err());
    }
}
