//! Argument validation performed before any dispatch.
//!
//! Every check here runs before a request is built, so a rejected call
//! never reaches the transport.

use tessera_constants::api::MAX_HASH_KEY_LEN;

use crate::error::ClientError;

/// Validate a hash-key: non-empty and shorter than [`MAX_HASH_KEY_LEN`].
pub fn validate_hash_key(hash_key: &[u8]) -> Result<(), ClientError> {
    if hash_key.is_empty() {
        return Err(ClientError::invalid_argument("hash key must not be empty"));
    }
    if hash_key.len() >= MAX_HASH_KEY_LEN {
        return Err(ClientError::invalid_argument(format!(
            "hash key length {} must be less than {}",
            hash_key.len(),
            MAX_HASH_KEY_LEN
        )));
    }
    Ok(())
}

/// Reject an empty collection argument.
pub fn validate_non_empty<T>(items: &[T], name: &str) -> Result<(), ClientError> {
    if items.is_empty() {
        return Err(ClientError::invalid_argument(format!("{name} must not be empty")));
    }
    Ok(())
}

/// Reject a zero limit or count.
pub fn validate_positive(value: u32, name: &str) -> Result<(), ClientError> {
    if value == 0 {
        return Err(ClientError::invalid_argument(format!("{name} must be greater than 0")));
    }
    Ok(())
}
