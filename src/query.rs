//! Key ranges and cursor directions for range queries.
//!
//! [`KeyRange`] is a pure description of a span of string keys. On wasm
//! it converts to the engine's `IDBKeyRange`; natively the same range
//! backs the in-memory store via [`KeyRange::contains`], so both
//! backends agree on membership semantics.

/// A span of string keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRange {
    /// Every key.
    All,
    /// Exactly one key.
    Only(String),
    /// Keys `>= lower` (or `> lower` when open).
    AtLeast { lower: String, open: bool },
    /// Keys `<= upper` (or `< upper` when open).
    AtMost { upper: String, open: bool },
    /// Keys between the two bounds.
    Between {
        lower: String,
        upper: String,
        lower_open: bool,
        upper_open: bool,
    },
    /// Keys starting with the given prefix.
    Prefix(String),
}

impl KeyRange {
    pub fn all() -> Self {
        KeyRange::All
    }

    pub fn only(key: impl Into<String>) -> Self {
        KeyRange::Only(key.into())
    }

    pub fn at_least(lower: impl Into<String>) -> Self {
        KeyRange::AtLeast {
            lower: lower.into(),
            open: false,
        }
    }

    /// Keys strictly greater than `lower`.
    pub fn after(lower: impl Into<String>) -> Self {
        KeyRange::AtLeast {
            lower: lower.into(),
            open: true,
        }
    }

    pub fn at_most(upper: impl Into<String>) -> Self {
        KeyRange::AtMost {
            upper: upper.into(),
            open: false,
        }
    }

    /// Keys strictly less than `upper`.
    pub fn before(upper: impl Into<String>) -> Self {
        KeyRange::AtMost {
            upper: upper.into(),
            open: true,
        }
    }

    /// Keys in `[lower, upper]`, both bounds inclusive.
    pub fn between(lower: impl Into<String>, upper: impl Into<String>) -> Self {
        KeyRange::Between {
            lower: lower.into(),
            upper: upper.into(),
            lower_open: false,
            upper_open: false,
        }
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        KeyRange::Prefix(prefix.into())
    }

    /// Whether `key` falls inside this range.
    pub fn contains(&self, key: &str) -> bool {
        match self {
            KeyRange::All => true,
            KeyRange::Only(k) => key == k,
            KeyRange::AtLeast { lower, open } => {
                if *open {
                    key > lower.as_str()
                } else {
                    key >= lower.as_str()
                }
            }
            KeyRange::AtMost { upper, open } => {
                if *open {
                    key < upper.as_str()
                } else {
                    key <= upper.as_str()
                }
            }
            KeyRange::Between {
                lower,
                upper,
                lower_open,
                upper_open,
            } => {
                let above = if *lower_open {
                    key > lower.as_str()
                } else {
                    key >= lower.as_str()
                };
                let below = if *upper_open {
                    key < upper.as_str()
                } else {
                    key <= upper.as_str()
                };
                above && below
            }
            KeyRange::Prefix(p) => key.starts_with(p.as_str()),
        }
    }
}

/// Cursor traversal order, mapping onto the engine's cursor directions.
///
/// The `*Unique` variants skip duplicate keys, which only matters when
/// iterating a non-unique index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    ForwardUnique,
    Reverse,
    ReverseUnique,
}

#[cfg(target_arch = "wasm32")]
mod wasm {
    use super::{Direction, KeyRange};
    use crate::error::{js_error_string, StoreError};
    use wasm_bindgen::JsValue;
    use web_sys::{IdbCursorDirection, IdbKeyRange};

    /// Sentinel appended to a prefix to form its upper bound. Keys that
    /// themselves contain U+FFFF fall outside the converted range.
    const PREFIX_SENTINEL: char = '\u{ffff}';

    impl KeyRange {
        /// Converts to an engine key range. `All` converts to `None`,
        /// which the engine treats as an unbounded query.
        pub(crate) fn to_idb(&self) -> Result<Option<IdbKeyRange>, StoreError> {
            let range = match self {
                KeyRange::All => return Ok(None),
                KeyRange::Only(k) => IdbKeyRange::only(&JsValue::from_str(k)),
                KeyRange::AtLeast { lower, open } => {
                    IdbKeyRange::lower_bound_with_open(&JsValue::from_str(lower), *open)
                }
                KeyRange::AtMost { upper, open } => {
                    IdbKeyRange::upper_bound_with_open(&JsValue::from_str(upper), *open)
                }
                KeyRange::Between {
                    lower,
                    upper,
                    lower_open,
                    upper_open,
                } => IdbKeyRange::bound_with_lower_open_and_upper_open(
                    &JsValue::from_str(lower),
                    &JsValue::from_str(upper),
                    *lower_open,
                    *upper_open,
                ),
                KeyRange::Prefix(p) => {
                    let mut upper = p.clone();
                    upper.push(PREFIX_SENTINEL);
                    IdbKeyRange::bound(&JsValue::from_str(p), &JsValue::from_str(&upper))
                }
            };
            range
                .map(Some)
                .map_err(|e| StoreError::request("keyRange", js_error_string(&e)))
        }
    }

    impl Direction {
        pub(crate) fn to_idb(self) -> IdbCursorDirection {
            match self {
                Direction::Forward => IdbCursorDirection::Next,
                Direction::ForwardUnique => IdbCursorDirection::Nextunique,
                Direction::Reverse => IdbCursorDirection::Prev,
                Direction::ReverseUnique => IdbCursorDirection::Prevunique,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_and_all() {
        assert!(KeyRange::all().contains("anything"));
        assert!(KeyRange::only("a").contains("a"));
        assert!(!KeyRange::only("a").contains("b"));
    }

    #[test]
    fn test_bound_openness() {
        assert!(KeyRange::at_least("m").contains("m"));
        assert!(!KeyRange::after("m").contains("m"));
        assert!(KeyRange::after("m").contains("n"));

        assert!(KeyRange::at_most("m").contains("m"));
        assert!(!KeyRange::before("m").contains("m"));
        assert!(KeyRange::before("m").contains("l"));
    }

    #[test]
    fn test_between_inclusive() {
        let range = KeyRange::between("b", "d");
        assert!(!range.contains("a"));
        assert!(range.contains("b"));
        assert!(range.contains("c"));
        assert!(range.contains("d"));
        assert!(!range.contains("e"));
    }

    #[test]
    fn test_inverted_between_matches_nothing() {
        let range = KeyRange::between("d", "b");
        assert!(!range.contains("b"));
        assert!(!range.contains("c"));
        assert!(!range.contains("d"));
    }

    #[test]
    fn test_prefix() {
        let range = KeyRange::prefix("KDMX|");
        assert!(range.contains("KDMX|1700000000000"));
        assert!(range.contains("KDMX|"));
        assert!(!range.contains("KTLX|1700000000000"));

        // Empty prefix matches everything.
        assert!(KeyRange::prefix("").contains("anything"));
    }
}
