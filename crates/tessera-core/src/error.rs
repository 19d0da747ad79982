//! Error types for tessera client operations.
//!
//! Every failure a caller can observe is a [`ClientError`]. Errors are
//! cloneable so batch results can hand each caller its own copy.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

/// Transport-level failure codes, reported before any store status exists.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteErrorCode {
    /// The call did not complete within its timeout.
    #[error("ERR_TIMEOUT")]
    Timeout,
    /// The partition could not be resolved to a serving replica.
    #[error("ERR_OBJECT_NOT_FOUND")]
    ObjectNotFound,
    /// The replica is not in a state that can serve the request.
    #[error("ERR_INVALID_STATE")]
    InvalidState,
    /// The connection to the replica failed.
    #[error("ERR_NETWORK_FAILURE")]
    NetworkFailure,
    /// The session was reset while the call was in flight.
    #[error("ERR_SESSION_RESET")]
    SessionReset,
    /// The replica rejected the call because it is overloaded.
    #[error("ERR_BUSY")]
    Busy,
    /// Any other code, carried verbatim.
    #[error("ERR_UNKNOWN({0})")]
    Unknown(i32),
}

/// Coarse classification of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    Timeout,
    Remote,
    Store,
    InvariantViolation,
}

/// Errors returned by tessera client operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Rejected before dispatch; no remote call was made.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// The local wait or the per-call timeout expired.
    #[error("operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Routing, connection or replica failure reported by the transport.
    #[error("remote call failed: {code}")]
    Remote { code: RemoteErrorCode },

    /// The store answered with a non-zero status that is not a typed outcome.
    #[error("store error: status {status}")]
    Store { status: i32 },

    /// The store answered in a shape the client cannot accept.
    #[error("invariant violated: {reason}")]
    InvariantViolation { reason: String },

    /// A batch item failed; `index` is its position in the batch input.
    #[error("{verb} of item [{index}] failed: {source}")]
    BatchItem {
        verb: String,
        index: usize,
        source: Box<ClientError>,
    },
}

impl ClientError {
    /// Shorthand for [`ClientError::InvalidArgument`].
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument { reason: reason.into() }
    }

    /// Shorthand for [`ClientError::InvariantViolation`].
    pub fn invariant(reason: impl Into<String>) -> Self {
        Self::InvariantViolation { reason: reason.into() }
    }

    /// Timeout error for the given wait.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout {
            duration_ms: duration.as_millis() as u64,
        }
    }

    /// Translate a transport failure code.
    ///
    /// A transport timeout becomes [`ClientError::Timeout`] so callers see
    /// one timeout shape regardless of where the deadline fired.
    pub fn from_remote(code: RemoteErrorCode, timeout: Duration) -> Self {
        match code {
            RemoteErrorCode::Timeout => Self::timeout(timeout),
            code => Self::Remote { code },
        }
    }

    /// Wrap this error with its batch position.
    pub fn at_index(self, verb: impl Into<String>, index: usize) -> Self {
        Self::BatchItem {
            verb: verb.into(),
            index,
            source: Box::new(self),
        }
    }

    /// Coarse classification; batch wrappers report the kind of their source.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Remote { .. } => ErrorKind::Remote,
            Self::Store { .. } => ErrorKind::Store,
            Self::InvariantViolation { .. } => ErrorKind::InvariantViolation,
            Self::BatchItem { source, .. } => source.kind(),
        }
    }

    /// Batch position of the failure, if this error came out of a batch.
    pub fn batch_index(&self) -> Option<usize> {
        match self {
            Self::BatchItem { index, .. } => Some(*index),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_argument_display() {
        let err = ClientError::invalid_argument("hash key must not be empty");
        assert_eq!(err.to_string(), "invalid argument: hash key must not be empty");
    }

    #[test]
    fn timeout_display() {
        let err = ClientError::timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "operation timed out after 1500ms");
    }

    #[test]
    fn remote_display() {
        let err = ClientError::Remote {
            code: RemoteErrorCode::ObjectNotFound,
        };
        assert_eq!(err.to_string(), "remote call failed: ERR_OBJECT_NOT_FOUND");
    }

    #[test]
    fn store_display() {
        let err = ClientError::Store { status: 3 };
        assert_eq!(err.to_string(), "store error: status 3");
    }

    #[test]
    fn remote_timeout_becomes_timeout() {
        let err = ClientError::from_remote(RemoteErrorCode::Timeout, Duration::from_millis(250));
        assert_eq!(err, ClientError::Timeout { duration_ms: 250 });
        assert!(err.is_timeout());
    }

    #[test]
    fn other_remote_codes_are_preserved() {
        let err = ClientError::from_remote(RemoteErrorCode::Unknown(42), Duration::from_secs(1));
        assert_eq!(
            err,
            ClientError::Remote {
                code: RemoteErrorCode::Unknown(42)
            }
        );
        assert_eq!(err.kind(), ErrorKind::Remote);
    }

    #[test]
    fn batch_item_reports_source_kind_and_index() {
        let err = ClientError::Store { status: 5 }.at_index("set", 1);
        assert_eq!(err.kind(), ErrorKind::Store);
        assert_eq!(err.batch_index(), Some(1));
        assert_eq!(err.to_string(), "set of item [1] failed: store error: status 5");
    }

    #[test]
    fn batch_index_absent_outside_batches() {
        assert_eq!(ClientError::invariant("x").batch_index(), None);
    }

    #[test]
    fn client_error_clone_and_eq() {
        let err = ClientError::invariant("removed 2 of 3");
        assert_eq!(err, err.clone());
        assert_ne!(err, ClientError::invariant("removed 1 of 3"));
    }
}
