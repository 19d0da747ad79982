//! The transport seam between the client and the store.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::RemoteErrorCode;
use crate::partition::PartitionId;
use crate::request::StoreRequest;
use crate::request::StoreResponse;

/// Routes requests to partitions and carries them to the serving replica.
///
/// Implementations own partition resolution, sessions to replicas, retries
/// on stale routing, and enforcement of the per-call timeout. A failure
/// before the store answers is a [`RemoteErrorCode`]; once the store
/// answers, its status travels in the [`StoreResponse`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Name of the table this transport serves.
    fn table_name(&self) -> &str;

    /// Partition owning every key under `hash_key`.
    fn route(&self, hash_key: &[u8]) -> PartitionId;

    /// All partitions of the table, in ascending order.
    fn all_partitions(&self) -> Vec<PartitionId>;

    /// Send one request to one partition.
    async fn call(
        &self,
        partition: PartitionId,
        request: StoreRequest,
        timeout: Duration,
    ) -> Result<StoreResponse, RemoteErrorCode>;
}

// Blanket implementation for Arc<T>
#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn table_name(&self) -> &str {
        (**self).table_name()
    }

    fn route(&self, hash_key: &[u8]) -> PartitionId {
        (**self).route(hash_key)
    }

    fn all_partitions(&self) -> Vec<PartitionId> {
        (**self).all_partitions()
    }

    async fn call(
        &self,
        partition: PartitionId,
        request: StoreRequest,
        timeout: Duration,
    ) -> Result<StoreResponse, RemoteErrorCode> {
        (**self).call(partition, request, timeout).await
    }
}
