//! Partition identity.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// A routing unit of a table: one independently served, ordered slice of
/// the keyspace.
///
/// Ordered by `(app_id, partition_index)`, which is also the order in which
/// a transport enumerates a table's partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PartitionId {
    /// Table the partition belongs to.
    pub app_id: u32,
    /// Position of the partition within its table.
    pub partition_index: u32,
}

impl PartitionId {
    pub const fn new(app_id: u32, partition_index: u32) -> Self {
        Self {
            app_id,
            partition_index,
        }
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.app_id, self.partition_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_app_dot_index() {
        assert_eq!(PartitionId::new(3, 14).to_string(), "3.14");
    }

    #[test]
    fn orders_by_app_then_index() {
        let mut ids = vec![PartitionId::new(2, 0), PartitionId::new(1, 5), PartitionId::new(1, 2)];
        ids.sort();
        assert_eq!(ids, vec![PartitionId::new(1, 2), PartitionId::new(1, 5), PartitionId::new(2, 0)]);
    }
}
