//! Value types returned by multi-value and batch operations.

use serde::Deserialize;
use serde::Serialize;

/// One `(sort_key, value)` pair under a hash-key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyValueEntry {
    pub sort_key: Vec<u8>,
    pub value: Vec<u8>,
}

impl KeyValueEntry {
    pub fn new(sort_key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            sort_key: sort_key.into(),
            value: value.into(),
        }
    }
}

/// Result of a multi-get under one hash-key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiGetResult {
    /// `true` iff the store exhausted the requested range; `false` when a
    /// fetch-count or fetch-size cap truncated it.
    pub all_fetched: bool,
    /// Entries in the order the store returned them.
    pub entries: Vec<KeyValueEntry>,
}

/// Result of a sort-key-only multi-get.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiGetSortKeysResult {
    pub all_fetched: bool,
    pub sort_keys: Vec<Vec<u8>>,
}

/// Entries grouped under one hash-key; the unit of batched multi-value calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashKeyData {
    pub hash_key: Vec<u8>,
    pub entries: Vec<KeyValueEntry>,
}

impl HashKeyData {
    pub fn new(hash_key: impl Into<Vec<u8>>, entries: Vec<KeyValueEntry>) -> Self {
        Self {
            hash_key: hash_key.into(),
            entries,
        }
    }
}

/// One item of a batched set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetItem {
    pub hash_key: Vec<u8>,
    pub sort_key: Vec<u8>,
    pub value: Vec<u8>,
    /// Seconds until expiry; `0` means the value never expires.
    #[serde(default)]
    pub ttl_seconds: u32,
}

impl SetItem {
    pub fn new(hash_key: impl Into<Vec<u8>>, sort_key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            hash_key: hash_key.into(),
            sort_key: sort_key.into(),
            value: value.into(),
            ttl_seconds: 0,
        }
    }

    pub fn with_ttl(mut self, ttl_seconds: u32) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }
}
