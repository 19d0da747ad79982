//! Public API bounds for key composition and multi-value fetches.

// ============================================================================
// Key Bounds
// ============================================================================

/// Exclusive upper bound on hash-key length in bytes.
///
/// The hash-key length travels as a big-endian `u16` prefix, and `0xFFFF`
/// is reserved, so a valid hash-key is `1..MAX_HASH_KEY_LEN` bytes long.
pub const MAX_HASH_KEY_LEN: usize = 0xFFFF;

/// Width of the hash-key length prefix in a composed key.
pub const HASH_KEY_LEN_PREFIX_BYTES: usize = 2;

// ============================================================================
// Multi-Value Fetch Limits
// ============================================================================

/// Default cap on entries returned by one multi-get (100 entries).
///
/// Hitting the cap truncates the result; the store then reports
/// `INCOMPLETE` and the client surfaces `all_fetched = false`.
pub const DEFAULT_MAX_FETCH_COUNT: u32 = 100;

/// Default cap on total key + value bytes returned by one multi-get (1 MB).
pub const DEFAULT_MAX_FETCH_SIZE: u32 = 1_000_000;

/// Default `max_count` carried by a multi-remove request.
pub const DEFAULT_MULTI_REMOVE_MAX_COUNT: u32 = 100;
