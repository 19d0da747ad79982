//! Store verbs and their responses.
//!
//! A [`StoreRequest`] is what the client hands to a [`Transport`] for one
//! partition. Keys inside requests are already composed where the verb
//! addresses a single key; multi-value verbs carry the hash-key and raw
//! sort-keys separately.
//!
//! [`Transport`]: crate::traits::Transport

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::entry::KeyValueEntry;
use crate::options::FilterType;

/// TTL reported for a key that exists without expiry.
pub const TTL_NO_EXPIRE: i32 = -1;

/// TTL reported for a key that does not exist.
pub const TTL_NOT_FOUND: i32 = -2;

/// Raw store status attached to every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreStatus(pub i32);

impl StoreStatus {
    pub const OK: Self = Self(0);
    pub const NOT_FOUND: Self = Self(1);
    /// The result was truncated by a fetch limit.
    pub const INCOMPLETE: Self = Self(7);

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }

    pub fn code(self) -> i32 {
        self.0
    }
}

impl fmt::Display for StoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::OK => write!(f, "OK"),
            Self::NOT_FOUND => write!(f, "NOT_FOUND"),
            Self::INCOMPLETE => write!(f, "INCOMPLETE"),
            Self(code) => write!(f, "{code}"),
        }
    }
}

/// Verb tag of a request, used in logs and batch errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verb {
    Get,
    Put,
    MultiGet,
    MultiPut,
    Remove,
    MultiRemove,
    Ttl,
    SortKeyCount,
    GetScanner,
    Scan,
    ClearScanner,
}

impl Verb {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put => "put",
            Self::MultiGet => "multi_get",
            Self::MultiPut => "multi_put",
            Self::Remove => "remove",
            Self::MultiRemove => "multi_remove",
            Self::Ttl => "ttl",
            Self::SortKeyCount => "sortkey_count",
            Self::GetScanner => "get_scanner",
            Self::Scan => "scan",
            Self::ClearScanner => "clear_scanner",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Multi-get under one hash-key.
///
/// A non-empty `sort_keys` selects exactly those keys; otherwise the range
/// and filter fields select the entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiGetRequest {
    pub hash_key: Vec<u8>,
    pub sort_keys: Vec<Vec<u8>>,
    pub max_kv_count: u32,
    pub max_kv_size: u32,
    pub no_value: bool,
    pub start_sort_key: Vec<u8>,
    pub stop_sort_key: Vec<u8>,
    pub start_inclusive: bool,
    pub stop_inclusive: bool,
    pub sort_key_filter_type: FilterType,
    pub sort_key_filter_pattern: Vec<u8>,
    pub reverse: bool,
}

/// Opens a server-side cursor and returns its first batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetScannerRequest {
    /// Composed lower bound; empty means the start of the partition.
    pub start_key: Vec<u8>,
    /// Composed upper bound; empty means the end of the partition.
    pub stop_key: Vec<u8>,
    pub start_inclusive: bool,
    pub stop_inclusive: bool,
    pub batch_size: u32,
    pub no_value: bool,
    pub sort_key_filter_type: FilterType,
    pub sort_key_filter_pattern: Vec<u8>,
    pub reverse: bool,
}

/// One remote call against one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreRequest {
    Get {
        key: Vec<u8>,
    },
    Put {
        key: Vec<u8>,
        value: Vec<u8>,
        /// Absolute expiry in epoch seconds; `0` never expires.
        expire_ts_seconds: u32,
    },
    MultiGet(MultiGetRequest),
    MultiPut {
        hash_key: Vec<u8>,
        entries: Vec<KeyValueEntry>,
        expire_ts_seconds: u32,
    },
    Remove {
        key: Vec<u8>,
    },
    MultiRemove {
        hash_key: Vec<u8>,
        sort_keys: Vec<Vec<u8>>,
        max_count: u32,
    },
    Ttl {
        key: Vec<u8>,
    },
    SortKeyCount {
        hash_key: Vec<u8>,
    },
    GetScanner(GetScannerRequest),
    Scan {
        context_id: i64,
    },
    ClearScanner {
        context_id: i64,
    },
}

impl StoreRequest {
    pub fn verb(&self) -> Verb {
        match self {
            Self::Get { .. } => Verb::Get,
            Self::Put { .. } => Verb::Put,
            Self::MultiGet(_) => Verb::MultiGet,
            Self::MultiPut { .. } => Verb::MultiPut,
            Self::Remove { .. } => Verb::Remove,
            Self::MultiRemove { .. } => Verb::MultiRemove,
            Self::Ttl { .. } => Verb::Ttl,
            Self::SortKeyCount { .. } => Verb::SortKeyCount,
            Self::GetScanner(_) => Verb::GetScanner,
            Self::Scan { .. } => Verb::Scan,
            Self::ClearScanner { .. } => Verb::ClearScanner,
        }
    }
}

/// A `(composed_key, value)` pair returned by a scan round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Verb-specific payload of a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseBody {
    Empty,
    Value(Vec<u8>),
    Entries(Vec<KeyValueEntry>),
    Removed { count: u64 },
    Ttl { seconds: i32 },
    Count { count: i64 },
    /// One scan batch and the cursor to continue from.
    ScanBatch { entries: Vec<RawEntry>, context_id: i64 },
}

/// The store's answer to one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreResponse {
    pub status: StoreStatus,
    pub body: ResponseBody,
}

impl StoreResponse {
    pub fn ok(body: ResponseBody) -> Self {
        Self {
            status: StoreStatus::OK,
            body,
        }
    }

    pub fn with_status(status: StoreStatus, body: ResponseBody) -> Self {
        Self { status, body }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_display() {
        assert_eq!(StoreStatus::OK.to_string(), "OK");
        assert_eq!(StoreStatus::INCOMPLETE.to_string(), "INCOMPLETE");
        assert_eq!(StoreStatus(9).to_string(), "9");
    }

    #[test]
    fn verb_of_request() {
        assert_eq!(StoreRequest::Ttl { key: vec![] }.verb(), Verb::Ttl);
        assert_eq!(StoreRequest::ClearScanner { context_id: 3 }.verb().to_string(), "clear_scanner");
    }

    #[test]
    fn request_serde_roundtrip() {
        let request = StoreRequest::MultiRemove {
            hash_key: b"h".to_vec(),
            sort_keys: vec![b"a".to_vec()],
            max_count: 100,
        };
        let json = serde_json::to_string(&request).unwrap();
        let back: StoreRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }
}
