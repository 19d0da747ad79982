//! Scanner defaults and server-side cursor sentinels.

/// Default number of entries fetched per scan round-trip.
pub const DEFAULT_SCAN_BATCH_SIZE: u32 = 100;

/// Context id returned by the store when a partition scan is exhausted.
///
/// A cursor reported with this id holds no server state and needs no release.
pub const SCAN_CONTEXT_COMPLETED: i64 = -1;

/// Context id returned by the store when the cursor has expired or never existed.
pub const SCAN_CONTEXT_NOT_EXIST: i64 = -2;
