//! Synchronous wrappers over [`Table`].
//!
//! Each call blocks the calling thread until the async operation finishes.
//! Every remote call carries its effective timeout, so a call blocks for at
//! most that long (batches run their items concurrently, so the same bound
//! holds per batch).
//!
//! Calling from inside a runtime requires a multi-threaded runtime.

use std::future::Future;
use std::time::Duration;

use tessera_core::ClientError;
use tessera_core::HashKeyData;
use tessera_core::KeyValueEntry;
use tessera_core::MultiGetOptions;
use tessera_core::MultiGetResult;
use tessera_core::MultiGetSortKeysResult;
use tessera_core::ScanItem;
use tessera_core::ScanOptions;
use tessera_core::ScanRange;
use tessera_core::SetItem;
use tokio::runtime::Handle;

use crate::batch::BatchResults;
use crate::batch::HashKeySortKeys;
use crate::batch::KeyPair;
use crate::multi::FetchLimits;
use crate::scan::Scanner;
use crate::table::Table;

fn block_on<F, T>(rt: &Handle, f: F) -> T
where
    F: Future<Output = T>,
{
    match Handle::try_current() {
        Ok(_) => tokio::task::block_in_place(|| rt.block_on(f)),
        Err(_) => rt.block_on(f),
    }
}

/// A [`Table`] driven on a runtime handle for synchronous callers.
#[derive(Debug, Clone)]
pub struct BlockingTable {
    inner: Table,
    rt: Handle,
}

impl BlockingTable {
    pub fn new(inner: Table, rt: Handle) -> Self {
        Self { inner, rt }
    }

    /// The wrapped async table.
    pub fn table(&self) -> &Table {
        &self.inner
    }

    pub fn get(&self, hash_key: &[u8], sort_key: &[u8], timeout: Duration) -> Result<Option<Vec<u8>>, ClientError> {
        block_on(&self.rt, self.inner.get(hash_key, sort_key, timeout))
    }

    pub fn set(&self, hash_key: &[u8], sort_key: &[u8], value: &[u8], timeout: Duration) -> Result<(), ClientError> {
        block_on(&self.rt, self.inner.set(hash_key, sort_key, value, timeout))
    }

    pub fn set_with_ttl(
        &self,
        hash_key: &[u8],
        sort_key: &[u8],
        value: &[u8],
        ttl_seconds: u32,
        timeout: Duration,
    ) -> Result<(), ClientError> {
        block_on(&self.rt, self.inner.set_with_ttl(hash_key, sort_key, value, ttl_seconds, timeout))
    }

    pub fn del(&self, hash_key: &[u8], sort_key: &[u8], timeout: Duration) -> Result<(), ClientError> {
        block_on(&self.rt, self.inner.del(hash_key, sort_key, timeout))
    }

    pub fn ttl(&self, hash_key: &[u8], sort_key: &[u8], timeout: Duration) -> Result<i32, ClientError> {
        block_on(&self.rt, self.inner.ttl(hash_key, sort_key, timeout))
    }

    pub fn exist(&self, hash_key: &[u8], sort_key: &[u8], timeout: Duration) -> Result<bool, ClientError> {
        block_on(&self.rt, self.inner.exist(hash_key, sort_key, timeout))
    }

    pub fn sort_key_count(&self, hash_key: &[u8], timeout: Duration) -> Result<i64, ClientError> {
        block_on(&self.rt, self.inner.sort_key_count(hash_key, timeout))
    }

    pub fn multi_get(
        &self,
        hash_key: &[u8],
        sort_keys: &[Vec<u8>],
        timeout: Duration,
    ) -> Result<MultiGetResult, ClientError> {
        block_on(&self.rt, self.inner.multi_get(hash_key, sort_keys, timeout))
    }

    pub fn multi_get_with_limits(
        &self,
        hash_key: &[u8],
        sort_keys: &[Vec<u8>],
        limits: FetchLimits,
        timeout: Duration,
    ) -> Result<MultiGetResult, ClientError> {
        block_on(&self.rt, self.inner.multi_get_with_limits(hash_key, sort_keys, limits, timeout))
    }

    pub fn multi_get_range(
        &self,
        hash_key: &[u8],
        start_sort_key: &[u8],
        stop_sort_key: &[u8],
        options: &MultiGetOptions,
        limits: Option<FetchLimits>,
        timeout: Duration,
    ) -> Result<MultiGetResult, ClientError> {
        block_on(
            &self.rt,
            self.inner.multi_get_range(hash_key, start_sort_key, stop_sort_key, options, limits, timeout),
        )
    }

    pub fn multi_get_sort_keys(
        &self,
        hash_key: &[u8],
        limits: Option<FetchLimits>,
        timeout: Duration,
    ) -> Result<MultiGetSortKeysResult, ClientError> {
        block_on(&self.rt, self.inner.multi_get_sort_keys(hash_key, limits, timeout))
    }

    pub fn multi_set(
        &self,
        hash_key: &[u8],
        entries: &[KeyValueEntry],
        ttl_seconds: u32,
        timeout: Duration,
    ) -> Result<(), ClientError> {
        block_on(&self.rt, self.inner.multi_set(hash_key, entries, ttl_seconds, timeout))
    }

    pub fn multi_del(&self, hash_key: &[u8], sort_keys: &[Vec<u8>], timeout: Duration) -> Result<(), ClientError> {
        block_on(&self.rt, self.inner.multi_del(hash_key, sort_keys, timeout))
    }

    pub fn batch_get(&self, keys: Vec<KeyPair>, timeout: Duration) -> Result<Vec<Option<Vec<u8>>>, ClientError> {
        block_on(&self.rt, self.inner.batch_get(keys, timeout))
    }

    pub fn batch_get_collect(&self, keys: Vec<KeyPair>, timeout: Duration) -> BatchResults<Option<Vec<u8>>> {
        block_on(&self.rt, self.inner.batch_get_collect(keys, timeout))
    }

    pub fn batch_set(&self, items: Vec<SetItem>, timeout: Duration) -> Result<(), ClientError> {
        block_on(&self.rt, self.inner.batch_set(items, timeout))
    }

    pub fn batch_set_collect(&self, items: Vec<SetItem>, timeout: Duration) -> BatchResults<()> {
        block_on(&self.rt, self.inner.batch_set_collect(items, timeout))
    }

    pub fn batch_del(&self, keys: Vec<KeyPair>, timeout: Duration) -> Result<(), ClientError> {
        block_on(&self.rt, self.inner.batch_del(keys, timeout))
    }

    pub fn batch_del_collect(&self, keys: Vec<KeyPair>, timeout: Duration) -> BatchResults<()> {
        block_on(&self.rt, self.inner.batch_del_collect(keys, timeout))
    }

    pub fn batch_multi_get(
        &self,
        keys: Vec<HashKeySortKeys>,
        timeout: Duration,
    ) -> Result<Vec<HashKeyData>, ClientError> {
        block_on(&self.rt, self.inner.batch_multi_get(keys, timeout))
    }

    pub fn batch_multi_get_collect(&self, keys: Vec<HashKeySortKeys>, timeout: Duration) -> BatchResults<HashKeyData> {
        block_on(&self.rt, self.inner.batch_multi_get_collect(keys, timeout))
    }

    pub fn batch_multi_set(
        &self,
        items: Vec<HashKeyData>,
        ttl_seconds: u32,
        timeout: Duration,
    ) -> Result<(), ClientError> {
        block_on(&self.rt, self.inner.batch_multi_set(items, ttl_seconds, timeout))
    }

    pub fn batch_multi_set_collect(
        &self,
        items: Vec<HashKeyData>,
        ttl_seconds: u32,
        timeout: Duration,
    ) -> BatchResults<()> {
        block_on(&self.rt, self.inner.batch_multi_set_collect(items, ttl_seconds, timeout))
    }

    pub fn batch_multi_del(&self, keys: Vec<HashKeySortKeys>, timeout: Duration) -> Result<(), ClientError> {
        block_on(&self.rt, self.inner.batch_multi_del(keys, timeout))
    }

    pub fn batch_multi_del_collect(&self, keys: Vec<HashKeySortKeys>, timeout: Duration) -> BatchResults<()> {
        block_on(&self.rt, self.inner.batch_multi_del_collect(keys, timeout))
    }

    pub fn get_scanner(
        &self,
        hash_key: &[u8],
        start_sort_key: &[u8],
        stop_sort_key: &[u8],
        options: &ScanOptions,
    ) -> Result<BlockingScanner, ClientError> {
        let scanner = self.inner.get_scanner(hash_key, start_sort_key, stop_sort_key, options)?;
        Ok(BlockingScanner::new(scanner, self.rt.clone()))
    }

    pub fn get_unordered_scanners(
        &self,
        max_split_count: usize,
        options: &ScanOptions,
    ) -> Result<Vec<BlockingScanner>, ClientError> {
        let scanners = self.inner.get_unordered_scanners(max_split_count, options)?;
        Ok(scanners.into_iter().map(|scanner| BlockingScanner::new(scanner, self.rt.clone())).collect())
    }
}

/// A [`Scanner`] advanced synchronously.
///
/// Dropping it with a cursor still open releases the cursor in the
/// background on the wrapped runtime.
#[derive(Debug)]
pub struct BlockingScanner {
    inner: Scanner,
    rt: Handle,
}

impl BlockingScanner {
    pub fn new(inner: Scanner, rt: Handle) -> Self {
        Self { inner, rt }
    }

    pub fn range(&self) -> &ScanRange {
        self.inner.range()
    }

    pub fn has_open_cursor(&self) -> bool {
        self.inner.has_open_cursor()
    }

    pub fn next(&mut self) -> Result<Option<ScanItem>, ClientError> {
        block_on(&self.rt, self.inner.next())
    }

    pub fn close(&mut self) -> Result<(), ClientError> {
        block_on(&self.rt, self.inner.close())
    }
}

impl Drop for BlockingScanner {
    fn drop(&mut self) {
        self.inner.spawn_release(&self.rt);
    }
}

#[cfg(test)]
mod tests {
    use tessera_testing::DeterministicTransport;

    use super::*;
    use crate::config::ClientConfig;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread().worker_threads(2).enable_all().build().unwrap()
    }

    #[test]
    fn blocking_calls_outside_a_runtime() {
        let rt = runtime();
        let transport = DeterministicTransport::new("t", 4);
        let table = BlockingTable::new(Table::new(transport.clone(), ClientConfig::default()), rt.handle().clone());

        table.set(b"h", b"s", b"v", Duration::ZERO).unwrap();
        assert_eq!(table.get(b"h", b"s", Duration::ZERO).unwrap(), Some(b"v".to_vec()));
        assert!(table.exist(b"h", b"s", Duration::ZERO).unwrap());
        assert_eq!(table.sort_key_count(b"h", Duration::ZERO).unwrap(), 1);

        let results = table.batch_get_collect(
            vec![(b"h".to_vec(), b"s".to_vec()), (b"h".to_vec(), b"missing".to_vec())],
            Duration::ZERO,
        );
        assert_eq!(results.success_count, 2);
        assert_eq!(transport.call_count(), 6);
    }

    #[test]
    fn blocking_scanner_pages_and_releases() {
        let rt = runtime();
        let transport = DeterministicTransport::new("t", 4);
        let table = BlockingTable::new(Table::new(transport.clone(), ClientConfig::default()), rt.handle().clone());
        for i in 0..5 {
            transport.insert(b"h", format!("k{i}").as_bytes(), b"v").unwrap();
        }
        let options = ScanOptions {
            batch_size: 2,
            ..ScanOptions::default()
        };

        let mut scanner = table.get_scanner(b"h", b"", b"", &options).unwrap();
        let mut sort_keys = Vec::new();
        while let Some(item) = scanner.next().unwrap() {
            sort_keys.push(item.sort_key);
        }
        assert_eq!(sort_keys.len(), 5);
        assert_eq!(sort_keys[0], b"k0".to_vec());

        let mut early = table.get_scanner(b"h", b"", b"", &options).unwrap();
        assert!(early.next().unwrap().is_some());
        assert!(early.has_open_cursor());
        drop(early);
        for _ in 0..50 {
            if transport.open_scanner_count() == 0 {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(transport.open_scanner_count(), 0);
    }

    #[test]
    fn blocking_unordered_scanners_cover_the_table() {
        let rt = runtime();
        let transport = DeterministicTransport::new("t", 5);
        let table = BlockingTable::new(Table::new(transport.clone(), ClientConfig::default()), rt.handle().clone());
        for i in 0..20 {
            transport.insert(format!("h{i}").as_bytes(), b"s", b"v").unwrap();
        }

        let mut total = 0;
        for mut scanner in table.get_unordered_scanners(2, &ScanOptions::default()).unwrap() {
            while scanner.next().unwrap().is_some() {
                total += 1;
            }
            scanner.close().unwrap();
        }
        assert_eq!(total, 20);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn blocking_calls_inside_a_multi_thread_runtime() {
        let transport = DeterministicTransport::new("t", 4);
        let table = BlockingTable::new(Table::new(transport, ClientConfig::default()), Handle::current());
        table.multi_set(b"h", &[KeyValueEntry::new("a", "1")], 0, Duration::ZERO).unwrap();
        let result = table.multi_get(b"h", &[], Duration::ZERO).unwrap();
        assert_eq!(result.entries, vec![KeyValueEntry::new("a", "1")]);
    }
}
