//! Timeout defaults.

/// Table-wide default timeout in milliseconds (1 second).
///
/// Applied whenever a caller passes a zero timeout.
pub const DEFAULT_OPERATION_TIMEOUT_MS: u64 = 1_000;
