//! Scan descriptors: the resolved request, the planned key range and the
//! items a scanner yields.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::options::FilterType;
use crate::options::ScanOptions;
use crate::partition::PartitionId;

/// A fully resolved scan over one hash-key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSpec {
    pub hash_key: Vec<u8>,
    /// `None` or empty scans from the first sort-key.
    pub start_sort_key: Option<Vec<u8>>,
    /// `None` or empty scans through the last sort-key.
    pub stop_sort_key: Option<Vec<u8>>,
    pub start_inclusive: bool,
    pub stop_inclusive: bool,
    pub filter_type: FilterType,
    pub filter_pattern: Option<Vec<u8>>,
    pub reverse: bool,
    pub no_value: bool,
    pub batch_size: u32,
    pub timeout: Duration,
}

impl ScanSpec {
    pub fn new(
        hash_key: impl Into<Vec<u8>>,
        start_sort_key: Option<Vec<u8>>,
        stop_sort_key: Option<Vec<u8>>,
        options: &ScanOptions,
    ) -> Self {
        let filter_pattern = if options.sort_key_filter_pattern.is_empty() {
            None
        } else {
            Some(options.sort_key_filter_pattern.clone())
        };
        Self {
            hash_key: hash_key.into(),
            start_sort_key,
            stop_sort_key,
            start_inclusive: options.start_inclusive,
            stop_inclusive: options.stop_inclusive,
            filter_type: options.sort_key_filter_type,
            filter_pattern,
            reverse: options.reverse,
            no_value: options.no_value,
            batch_size: options.batch_size,
            timeout: options.timeout,
        }
    }

    /// The filter prefix, if this spec carries a non-empty prefix filter.
    pub fn prefix(&self) -> Option<&[u8]> {
        match (self.filter_type, self.filter_pattern.as_deref()) {
            (FilterType::MatchPrefix, Some(pattern)) if !pattern.is_empty() => Some(pattern),
            _ => None,
        }
    }
}

/// A planned, immutable key range and the partitions it covers.
///
/// Bounds are composed keys. An empty `upper_bound` means the range runs to
/// the end of each partition; unordered scanners use that form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRange {
    pub lower_bound: Vec<u8>,
    pub lower_inclusive: bool,
    pub upper_bound: Vec<u8>,
    pub upper_inclusive: bool,
    pub partitions: Vec<PartitionId>,
}

impl ScanRange {
    /// Whole-partition range over `partitions`.
    pub fn full(partitions: Vec<PartitionId>) -> Self {
        Self {
            lower_bound: Vec::new(),
            lower_inclusive: true,
            upper_bound: Vec::new(),
            upper_inclusive: false,
            partitions,
        }
    }

    /// An empty range covers no partition and needs no remote call.
    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }
}

/// One entry produced by a scanner, decoded from its composed key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanItem {
    pub hash_key: Vec<u8>,
    pub sort_key: Vec<u8>,
    pub value: Vec<u8>,
}
