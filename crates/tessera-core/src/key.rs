//! Compound key codec.
//!
//! A composed key is the big-endian `u16` length of the hash-key, the
//! hash-key bytes, then the raw sort-key bytes:
//!
//! ```text
//! +--------+----------------+-------------------+
//! | len BE | hash_key bytes | sort_key bytes... |
//! +--------+----------------+-------------------+
//! ```
//!
//! The sort-key carries no length of its own; it occupies the remainder of
//! the buffer. Because every composed key under one hash-key shares the same
//! prefix, all of them sort contiguously under unsigned byte comparison.
//!
//! All functions here are pure and never touch the network.

use std::cmp::Ordering;

use tessera_constants::api::HASH_KEY_LEN_PREFIX_BYTES;

use crate::error::ClientError;
use crate::validation::validate_hash_key;

/// Compose the wire key for `(hash_key, sort_key)`.
///
/// Fails with `InvalidArgument` if the hash-key is empty or too long.
pub fn compose(hash_key: &[u8], sort_key: &[u8]) -> Result<Vec<u8>, ClientError> {
    validate_hash_key(hash_key)?;

    let mut key = Vec::with_capacity(HASH_KEY_LEN_PREFIX_BYTES + hash_key.len() + sort_key.len());
    key.extend_from_slice(&(hash_key.len() as u16).to_be_bytes());
    key.extend_from_slice(hash_key);
    key.extend_from_slice(sort_key);
    Ok(key)
}

/// Split a composed key back into `(hash_key, sort_key)`.
pub fn decompose(key: &[u8]) -> Result<(&[u8], &[u8]), ClientError> {
    if key.len() < HASH_KEY_LEN_PREFIX_BYTES {
        return Err(ClientError::invalid_argument(format!(
            "composed key of {} bytes is shorter than its length prefix",
            key.len()
        )));
    }

    let hash_key_len = u16::from_be_bytes([key[0], key[1]]) as usize;
    let rest = &key[HASH_KEY_LEN_PREFIX_BYTES..];
    if hash_key_len > rest.len() {
        return Err(ClientError::invalid_argument(format!(
            "composed key declares a {}-byte hash key but holds only {} bytes",
            hash_key_len,
            rest.len()
        )));
    }

    Ok(rest.split_at(hash_key_len))
}

/// Exclusive upper bound of every composed key under `hash_key`.
///
/// Strictly greater than `compose(hash_key, s)` for every sort-key `s`,
/// including the empty one and runs of `0xFF`.
pub fn successor(hash_key: &[u8]) -> Result<Vec<u8>, ClientError> {
    successor_with_prefix(hash_key, &[])
}

/// Exclusive upper bound of every composed key under `hash_key` whose
/// sort-key starts with `prefix`.
pub fn successor_with_prefix(hash_key: &[u8], prefix: &[u8]) -> Result<Vec<u8>, ClientError> {
    let mut key = compose(hash_key, prefix)?;
    increment(&mut key);
    Ok(key)
}

/// Unsigned lexicographic comparison; the only ordering used for ranges.
#[inline]
pub fn compare_bytes(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

/// Add one to `bytes` read as a big-endian unsigned integer.
///
/// Trailing `0xFF` bytes carry into the previous byte. An all-`0xFF` input
/// cannot carry, so a zero byte is appended instead. Composed keys never
/// hit that case: the length prefix is at most `0xFFFE`.
fn increment(bytes: &mut Vec<u8>) {
    match bytes.iter().rposition(|&b| b != u8::MAX) {
        Some(pos) => {
            bytes[pos] += 1;
            for b in &mut bytes[pos + 1..] {
                *b = 0;
            }
        }
        None => bytes.push(0),
    }
}
