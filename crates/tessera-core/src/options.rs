//! Per-call options for range multi-gets and scans.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tessera_constants::scan::DEFAULT_SCAN_BATCH_SIZE;

use crate::error::ClientError;

/// Default scan timeout (5 seconds).
pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_millis(5_000);

/// Sort-key filter evaluated by the store.
///
/// Only [`FilterType::MatchPrefix`] also narrows the client-computed key
/// range; the other kinds are applied server-side to every candidate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterType {
    #[default]
    NoFilter,
    MatchAnywhere,
    MatchPrefix,
    MatchPostfix,
}

impl FilterType {
    /// Wire value of the filter kind.
    pub const fn as_wire(self) -> i32 {
        match self {
            Self::NoFilter => 0,
            Self::MatchAnywhere => 1,
            Self::MatchPrefix => 2,
            Self::MatchPostfix => 3,
        }
    }

    /// Whether `sort_key` passes this filter with `pattern`.
    ///
    /// An empty pattern matches everything.
    pub fn matches(self, pattern: &[u8], sort_key: &[u8]) -> bool {
        if pattern.is_empty() {
            return true;
        }
        match self {
            Self::NoFilter => true,
            Self::MatchAnywhere => sort_key.windows(pattern.len()).any(|w| w == pattern),
            Self::MatchPrefix => sort_key.starts_with(pattern),
            Self::MatchPostfix => sort_key.ends_with(pattern),
        }
    }
}

impl TryFrom<i32> for FilterType {
    type Error = ClientError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::NoFilter),
            1 => Ok(Self::MatchAnywhere),
            2 => Ok(Self::MatchPrefix),
            3 => Ok(Self::MatchPostfix),
            other => Err(ClientError::invalid_argument(format!("unknown filter type {other}"))),
        }
    }
}

/// Options for a range multi-get.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiGetOptions {
    pub start_inclusive: bool,
    pub stop_inclusive: bool,
    pub sort_key_filter_type: FilterType,
    pub sort_key_filter_pattern: Vec<u8>,
    /// Return sort-keys with empty values.
    pub no_value: bool,
    /// Return entries in descending sort-key order.
    pub reverse: bool,
}

impl Default for MultiGetOptions {
    fn default() -> Self {
        Self {
            start_inclusive: true,
            stop_inclusive: false,
            sort_key_filter_type: FilterType::NoFilter,
            sort_key_filter_pattern: Vec::new(),
            no_value: false,
            reverse: false,
        }
    }
}

/// Options for a scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOptions {
    /// Per-call timeout for every open/fetch/clear round-trip. Zero means
    /// the table default.
    pub timeout: Duration,
    /// Entries fetched per round-trip.
    pub batch_size: u32,
    pub start_inclusive: bool,
    pub stop_inclusive: bool,
    pub sort_key_filter_type: FilterType,
    pub sort_key_filter_pattern: Vec<u8>,
    pub no_value: bool,
    pub reverse: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_SCAN_TIMEOUT,
            batch_size: DEFAULT_SCAN_BATCH_SIZE,
            start_inclusive: true,
            stop_inclusive: false,
            sort_key_filter_type: FilterType::NoFilter,
            sort_key_filter_pattern: Vec::new(),
            no_value: false,
            reverse: false,
        }
    }
}

impl ScanOptions {
    /// Options for unordered scanners: only timeout, batch size, value
    /// suppression and the sort-key filter carry over.
    pub fn for_unordered(&self) -> Self {
        Self {
            timeout: self.timeout,
            batch_size: self.batch_size,
            sort_key_filter_type: self.sort_key_filter_type,
            sort_key_filter_pattern: self.sort_key_filter_pattern.clone(),
            no_value: self.no_value,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_wire_values() {
        for (filter, wire) in [
            (FilterType::NoFilter, 0),
            (FilterType::MatchAnywhere, 1),
            (FilterType::MatchPrefix, 2),
            (FilterType::MatchPostfix, 3),
        ] {
            assert_eq!(filter.as_wire(), wire);
            assert_eq!(FilterType::try_from(wire).unwrap(), filter);
        }
        assert!(FilterType::try_from(4).is_err());
    }

    #[test]
    fn filter_matching() {
        assert!(FilterType::MatchAnywhere.matches(b"bc", b"abcd"));
        assert!(!FilterType::MatchAnywhere.matches(b"bd", b"abcd"));
        assert!(FilterType::MatchPrefix.matches(b"ab", b"abcd"));
        assert!(!FilterType::MatchPrefix.matches(b"bc", b"abcd"));
        assert!(FilterType::MatchPostfix.matches(b"cd", b"abcd"));
        assert!(!FilterType::MatchPostfix.matches(b"longer-than-key", b"abcd"));
        assert!(FilterType::MatchPrefix.matches(b"", b"anything"));
    }

    #[test]
    fn scan_defaults() {
        let options = ScanOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.batch_size, 100);
        assert!(options.start_inclusive);
        assert!(!options.stop_inclusive);
    }

    #[test]
    fn unordered_resets_range_flags() {
        let options = ScanOptions {
            timeout: Duration::from_millis(750),
            batch_size: 7,
            start_inclusive: false,
            stop_inclusive: true,
            sort_key_filter_type: FilterType::MatchPostfix,
            sort_key_filter_pattern: b"x".to_vec(),
            no_value: true,
            reverse: true,
        };
        let unordered = options.for_unordered();
        assert_eq!(unordered.timeout, Duration::from_millis(750));
        assert_eq!(unordered.batch_size, 7);
        assert!(unordered.no_value);
        assert_eq!(unordered.sort_key_filter_type, FilterType::MatchPostfix);
        assert!(unordered.start_inclusive);
        assert!(!unordered.stop_inclusive);
        assert!(!unordered.reverse);
    }
}
