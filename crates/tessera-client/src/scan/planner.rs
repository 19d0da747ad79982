//! Scan planning.
//!
//! Pure functions: turn a [`ScanSpec`] into a bounded [`ScanRange`], and a
//! table's partition list into groups for parallel unordered scans. No
//! remote call happens here.

use std::cmp::Ordering;

use tessera_core::ClientError;
use tessera_core::PartitionId;
use tessera_core::ScanRange;
use tessera_core::ScanSpec;
use tessera_core::compare_bytes;
use tessera_core::compose;
use tessera_core::successor;
use tessera_core::successor_with_prefix;
use tracing::trace;

/// Plan the key range of `spec`, owned by partition `owner`.
///
/// 1. Lower bound: the composed start key (empty start means the first sort-key).
/// 2. Upper bound: the composed stop key, or the hash-key successor
///    (exclusive) when no stop key is given.
/// 3. A prefix filter tightens either bound where it is stricter.
/// 4. An empty range covers no partition.
pub fn plan_range(spec: &ScanSpec, owner: PartitionId) -> Result<ScanRange, ClientError> {
    let hash_key = spec.hash_key.as_slice();
    let start = spec.start_sort_key.as_deref().unwrap_or_default();

    let mut lower_bound = compose(hash_key, start)?;
    let mut lower_inclusive = spec.start_inclusive;

    let (mut upper_bound, mut upper_inclusive) = match spec.stop_sort_key.as_deref() {
        Some(stop) if !stop.is_empty() => (compose(hash_key, stop)?, spec.stop_inclusive),
        _ => (successor(hash_key)?, false),
    };

    if let Some(prefix) = spec.prefix() {
        let prefix_lower = compose(hash_key, prefix)?;
        if compare_bytes(&prefix_lower, &lower_bound) == Ordering::Greater {
            lower_bound = prefix_lower;
            lower_inclusive = true;
        }
        let prefix_upper = successor_with_prefix(hash_key, prefix)?;
        if compare_bytes(&prefix_upper, &upper_bound) != Ordering::Greater {
            upper_bound = prefix_upper;
            upper_inclusive = false;
        }
    }

    let empty = match compare_bytes(&lower_bound, &upper_bound) {
        Ordering::Less => false,
        Ordering::Equal => !(lower_inclusive && upper_inclusive),
        Ordering::Greater => true,
    };
    trace!(%owner, empty, lower_inclusive, upper_inclusive, "planned scan range");

    Ok(ScanRange {
        lower_bound,
        lower_inclusive,
        upper_bound,
        upper_inclusive,
        partitions: if empty { Vec::new() } else { vec![owner] },
    })
}

/// Split `partitions` into at most `max_split` contiguous groups whose sizes
/// differ by at most one, larger groups first.
///
/// Every partition lands in exactly one group. `max_split` must be positive.
pub fn split_partitions(partitions: &[PartitionId], max_split: usize) -> Result<Vec<Vec<PartitionId>>, ClientError> {
    if max_split == 0 {
        return Err(ClientError::invalid_argument("max split count must be greater than 0"));
    }
    if partitions.is_empty() {
        return Ok(Vec::new());
    }

    let split = partitions.len().min(max_split);
    let size = partitions.len() / split;
    let more = partitions.len() % split;

    let mut groups = Vec::with_capacity(split);
    let mut rest = partitions;
    for i in 0..split {
        let take = if i < more { size + 1 } else { size };
        let (group, tail) = rest.split_at(take);
        groups.push(group.to_vec());
        rest = tail;
    }
    trace!(partitions = partitions.len(), groups = split, size, more, "split partitions");
    Ok(groups)
}
