//! Batch engine.
//!
//! A batch spawns one task per item before awaiting any of them, so every
//! sub-operation is in flight at once and the batch takes as long as its
//! slowest item. Results are then awaited in input order:
//!
//! - fail-fast returns the first failure by input position, tagged with its
//!   index; later successes are dropped from the result
//! - collect-all returns every outcome in input position and never fails
//!
//! Neither policy cancels siblings: a fail-fast return leaves the remaining
//! tasks running to completion, and their writes land at the store.

use std::future::Future;
use std::time::Duration;

use tessera_core::ClientError;
use tessera_core::HashKeyData;
use tessera_core::KeyValueEntry;
use tessera_core::SetItem;
use tessera_core::Verb;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::warn;

use crate::table::Table;

/// Per-item outcomes of a collect-all batch, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResults<T> {
    pub outcomes: Vec<Result<T, ClientError>>,
    pub success_count: usize,
}

impl<T> BatchResults<T> {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn all_succeeded(&self) -> bool {
        self.success_count == self.outcomes.len()
    }

    /// `(index, error)` for every failed item.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &ClientError)> {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(index, outcome)| outcome.as_ref().err().map(|err| (index, err)))
    }
}

fn spawn_all<I, T, F, Fut>(items: Vec<I>, op: F) -> Vec<JoinHandle<Result<T, ClientError>>>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    T: Send + 'static,
{
    items.into_iter().map(|item| tokio::spawn(op(item))).collect()
}

async fn join<T>(handle: JoinHandle<Result<T, ClientError>>) -> Result<T, ClientError> {
    match handle.await {
        Ok(outcome) => outcome,
        Err(e) => Err(ClientError::invariant(format!("batch task did not complete: {e}"))),
    }
}

/// Dispatch every item, then return all values or the first failure.
pub(crate) async fn fail_fast<I, T, F, Fut>(verb: Verb, items: Vec<I>, op: F) -> Result<Vec<T>, ClientError>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    T: Send + 'static,
{
    let handles = spawn_all(items, op);
    debug!(%verb, items = handles.len(), policy = "fail_fast", "dispatched batch");

    let mut values = Vec::with_capacity(handles.len());
    for (index, handle) in handles.into_iter().enumerate() {
        match join(handle).await {
            Ok(value) => values.push(value),
            Err(err) => {
                warn!(%verb, index, error = %err, "batch item failed");
                return Err(err.at_index(verb.as_str(), index));
            }
        }
    }
    Ok(values)
}

/// Dispatch every item, then return every outcome in input order.
pub(crate) async fn collect_all<I, T, F, Fut>(verb: Verb, items: Vec<I>, op: F) -> BatchResults<T>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    T: Send + 'static,
{
    let handles = spawn_all(items, op);
    debug!(%verb, items = handles.len(), policy = "collect_all", "dispatched batch");

    let mut outcomes = Vec::with_capacity(handles.len());
    let mut success_count = 0;
    for (index, handle) in handles.into_iter().enumerate() {
        match join(handle).await {
            Ok(value) => {
                success_count += 1;
                outcomes.push(Ok(value));
            }
            Err(err) => {
                warn!(%verb, index, error = %err, "batch item failed");
                outcomes.push(Err(err.at_index(verb.as_str(), index)));
            }
        }
    }
    BatchResults {
        outcomes,
        success_count,
    }
}

/// `(hash_key, sort_key)` pair addressed by single-key batch verbs.
pub type KeyPair = (Vec<u8>, Vec<u8>);

/// `(hash_key, sort_keys)` addressed by batched multi-get and multi-del.
pub type HashKeySortKeys = (Vec<u8>, Vec<Vec<u8>>);

impl Table {
    // ========================================================================
    // get
    // ========================================================================

    pub async fn batch_get(&self, keys: Vec<KeyPair>, timeout: Duration) -> Result<Vec<Option<Vec<u8>>>, ClientError> {
        let table = self.clone();
        fail_fast(Verb::Get, keys, move |(hash_key, sort_key)| {
            let table = table.clone();
            async move { table.get(&hash_key, &sort_key, timeout).await }
        })
        .await
    }

    pub async fn batch_get_collect(&self, keys: Vec<KeyPair>, timeout: Duration) -> BatchResults<Option<Vec<u8>>> {
        let table = self.clone();
        collect_all(Verb::Get, keys, move |(hash_key, sort_key)| {
            let table = table.clone();
            async move { table.get(&hash_key, &sort_key, timeout).await }
        })
        .await
    }

    // ========================================================================
    // set
    // ========================================================================

    pub async fn batch_set(&self, items: Vec<SetItem>, timeout: Duration) -> Result<(), ClientError> {
        let table = self.clone();
        fail_fast(Verb::Put, items, move |item| {
            let table = table.clone();
            async move { table.set_item(item, timeout).await }
        })
        .await
        .map(|_| ())
    }

    pub async fn batch_set_collect(&self, items: Vec<SetItem>, timeout: Duration) -> BatchResults<()> {
        let table = self.clone();
        collect_all(Verb::Put, items, move |item| {
            let table = table.clone();
            async move { table.set_item(item, timeout).await }
        })
        .await
    }

    async fn set_item(&self, item: SetItem, timeout: Duration) -> Result<(), ClientError> {
        self.set_with_ttl(&item.hash_key, &item.sort_key, &item.value, item.ttl_seconds, timeout).await
    }

    // ========================================================================
    // del
    // ========================================================================

    pub async fn batch_del(&self, keys: Vec<KeyPair>, timeout: Duration) -> Result<(), ClientError> {
        let table = self.clone();
        fail_fast(Verb::Remove, keys, move |(hash_key, sort_key)| {
            let table = table.clone();
            async move { table.del(&hash_key, &sort_key, timeout).await }
        })
        .await
        .map(|_| ())
    }

    pub async fn batch_del_collect(&self, keys: Vec<KeyPair>, timeout: Duration) -> BatchResults<()> {
        let table = self.clone();
        collect_all(Verb::Remove, keys, move |(hash_key, sort_key)| {
            let table = table.clone();
            async move { table.del(&hash_key, &sort_key, timeout).await }
        })
        .await
    }

    // ========================================================================
    // multi_get
    // ========================================================================

    /// Multi-get each hash-key; an empty sort-key list fetches the whole hash-key.
    pub async fn batch_multi_get(
        &self,
        keys: Vec<HashKeySortKeys>,
        timeout: Duration,
    ) -> Result<Vec<HashKeyData>, ClientError> {
        let table = self.clone();
        fail_fast(Verb::MultiGet, keys, move |(hash_key, sort_keys)| {
            let table = table.clone();
            async move { table.multi_get_data(hash_key, sort_keys, timeout).await }
        })
        .await
    }

    pub async fn batch_multi_get_collect(
        &self,
        keys: Vec<HashKeySortKeys>,
        timeout: Duration,
    ) -> BatchResults<HashKeyData> {
        let table = self.clone();
        collect_all(Verb::MultiGet, keys, move |(hash_key, sort_keys)| {
            let table = table.clone();
            async move { table.multi_get_data(hash_key, sort_keys, timeout).await }
        })
        .await
    }

    async fn multi_get_data(
        &self,
        hash_key: Vec<u8>,
        sort_keys: Vec<Vec<u8>>,
        timeout: Duration,
    ) -> Result<HashKeyData, ClientError> {
        let result = self.multi_get(&hash_key, &sort_keys, timeout).await?;
        Ok(HashKeyData::new(hash_key, result.entries))
    }

    // ========================================================================
    // multi_set
    // ========================================================================

    pub async fn batch_multi_set(
        &self,
        items: Vec<HashKeyData>,
        ttl_seconds: u32,
        timeout: Duration,
    ) -> Result<(), ClientError> {
        let table = self.clone();
        fail_fast(Verb::MultiPut, items, move |item| {
            let table = table.clone();
            async move { table.multi_set_data(item, ttl_seconds, timeout).await }
        })
        .await
        .map(|_| ())
    }

    pub async fn batch_multi_set_collect(
        &self,
        items: Vec<HashKeyData>,
        ttl_seconds: u32,
        timeout: Duration,
    ) -> BatchResults<()> {
        let table = self.clone();
        collect_all(Verb::MultiPut, items, move |item| {
            let table = table.clone();
            async move { table.multi_set_data(item, ttl_seconds, timeout).await }
        })
        .await
    }

    async fn multi_set_data(&self, item: HashKeyData, ttl_seconds: u32, timeout: Duration) -> Result<(), ClientError> {
        let entries: &[KeyValueEntry] = &item.entries;
        self.multi_set(&item.hash_key, entries, ttl_seconds, timeout).await
    }

    // ========================================================================
    // multi_del
    // ========================================================================

    pub async fn batch_multi_del(&self, keys: Vec<HashKeySortKeys>, timeout: Duration) -> Result<(), ClientError> {
        let table = self.clone();
        fail_fast(Verb::MultiRemove, keys, move |(hash_key, sort_keys)| {
            let table = table.clone();
            async move { table.multi_del(&hash_key, &sort_keys, timeout).await }
        })
        .await
        .map(|_| ())
    }

    pub async fn batch_multi_del_collect(&self, keys: Vec<HashKeySortKeys>, timeout: Duration) -> BatchResults<()> {
        let table = self.clone();
        collect_all(Verb::MultiRemove, keys, move |(hash_key, sort_keys)| {
            let table = table.clone();
            async move { table.multi_del(&hash_key, &sort_keys, timeout).await }
        })
        .await
    }
}
