//! Multi-value verbs: many sort-keys under one hash-key, one round-trip.

use std::collections::BTreeSet;
use std::time::Duration;

use tessera_core::ClientError;
use tessera_core::KeyValueEntry;
use tessera_core::MultiGetOptions;
use tessera_core::MultiGetRequest;
use tessera_core::MultiGetResult;
use tessera_core::MultiGetSortKeysResult;
use tessera_core::ResponseBody;
use tessera_core::StoreRequest;
use tessera_core::StoreStatus;
use tessera_core::Verb;
use tessera_core::validation::validate_hash_key;
use tessera_core::validation::validate_non_empty;
use tessera_core::validation::validate_positive;
use tracing::debug;
use tracing::warn;

use crate::table::Table;
use crate::table::check_status;
use crate::table::expire_ts_seconds;
use crate::table::unexpected_body;

/// Fetch limits for one multi-get.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub max_fetch_count: u32,
    pub max_fetch_size: u32,
}

impl Table {
    fn default_limits(&self) -> FetchLimits {
        FetchLimits {
            max_fetch_count: self.config().max_fetch_count,
            max_fetch_size: self.config().max_fetch_size,
        }
    }

    /// Fetch `sort_keys` under `hash_key` with the configured fetch limits.
    ///
    /// Duplicate sort-keys collapse into one query and one result entry. An
    /// empty `sort_keys` fetches every sort-key under the hash-key.
    pub async fn multi_get(
        &self,
        hash_key: &[u8],
        sort_keys: &[Vec<u8>],
        timeout: Duration,
    ) -> Result<MultiGetResult, ClientError> {
        self.multi_get_with_limits(hash_key, sort_keys, self.default_limits(), timeout).await
    }

    pub async fn multi_get_with_limits(
        &self,
        hash_key: &[u8],
        sort_keys: &[Vec<u8>],
        limits: FetchLimits,
        timeout: Duration,
    ) -> Result<MultiGetResult, ClientError> {
        validate_hash_key(hash_key)?;
        validate_positive(limits.max_fetch_count, "max fetch count")?;
        validate_positive(limits.max_fetch_size, "max fetch size")?;

        let requested: BTreeSet<&[u8]> = sort_keys.iter().map(Vec::as_slice).collect();
        if requested.len() < sort_keys.len() {
            debug!(
                requested = sort_keys.len(),
                unique = requested.len(),
                "collapsed duplicate sort keys in multi_get"
            );
        }

        let request = MultiGetRequest {
            sort_keys: requested.iter().map(|sort_key| sort_key.to_vec()).collect(),
            ..range_request(hash_key, &[], &[], &MultiGetOptions::default(), limits)
        };
        let mut result = self.send_multi_get(hash_key, request, timeout).await?;

        if !requested.is_empty() {
            result.entries.retain(|entry| requested.contains(entry.sort_key.as_slice()));
        }
        Ok(result)
    }

    /// Fetch the entries between `start_sort_key` and `stop_sort_key` under
    /// `hash_key`, in store order. An empty stop key runs to the last sort-key.
    pub async fn multi_get_range(
        &self,
        hash_key: &[u8],
        start_sort_key: &[u8],
        stop_sort_key: &[u8],
        options: &MultiGetOptions,
        limits: Option<FetchLimits>,
        timeout: Duration,
    ) -> Result<MultiGetResult, ClientError> {
        validate_hash_key(hash_key)?;
        let limits = limits.unwrap_or_else(|| self.default_limits());
        validate_positive(limits.max_fetch_count, "max fetch count")?;
        validate_positive(limits.max_fetch_size, "max fetch size")?;

        let request = range_request(hash_key, start_sort_key, stop_sort_key, options, limits);
        self.send_multi_get(hash_key, request, timeout).await
    }

    /// Every sort-key under `hash_key`, without values.
    pub async fn multi_get_sort_keys(
        &self,
        hash_key: &[u8],
        limits: Option<FetchLimits>,
        timeout: Duration,
    ) -> Result<MultiGetSortKeysResult, ClientError> {
        let options = MultiGetOptions {
            no_value: true,
            ..MultiGetOptions::default()
        };
        let result = self.multi_get_range(hash_key, &[], &[], &options, limits, timeout).await?;
        Ok(MultiGetSortKeysResult {
            all_fetched: result.all_fetched,
            sort_keys: result.entries.into_iter().map(|entry| entry.sort_key).collect(),
        })
    }

    async fn send_multi_get(
        &self,
        hash_key: &[u8],
        request: MultiGetRequest,
        timeout: Duration,
    ) -> Result<MultiGetResult, ClientError> {
        let partition = self.transport().route(hash_key);
        let response = self.call(partition, StoreRequest::MultiGet(request), timeout).await?;

        let all_fetched = match response.status {
            StoreStatus::OK => true,
            StoreStatus::INCOMPLETE => false,
            status => return Err(ClientError::Store { status: status.code() }),
        };
        match response.body {
            ResponseBody::Entries(entries) => Ok(MultiGetResult { all_fetched, entries }),
            _ => Err(unexpected_body(Verb::MultiGet)),
        }
    }

    /// Write `entries` under `hash_key` in one round-trip. `ttl_seconds == 0`
    /// never expires.
    pub async fn multi_set(
        &self,
        hash_key: &[u8],
        entries: &[KeyValueEntry],
        ttl_seconds: u32,
        timeout: Duration,
    ) -> Result<(), ClientError> {
        validate_hash_key(hash_key)?;
        validate_non_empty(entries, "values")?;

        let partition = self.transport().route(hash_key);
        let request = StoreRequest::MultiPut {
            hash_key: hash_key.to_vec(),
            entries: entries.to_vec(),
            expire_ts_seconds: expire_ts_seconds(ttl_seconds),
        };
        let response = self.call(partition, request, timeout).await?;
        check_status(&response)
    }

    /// Delete `sort_keys` under `hash_key` in one round-trip.
    ///
    /// Fails with an invariant violation if the store reports a removed
    /// count different from the number of sort-keys sent.
    pub async fn multi_del(&self, hash_key: &[u8], sort_keys: &[Vec<u8>], timeout: Duration) -> Result<(), ClientError> {
        validate_hash_key(hash_key)?;
        validate_non_empty(sort_keys, "sort keys")?;

        let partition = self.transport().route(hash_key);
        let request = StoreRequest::MultiRemove {
            hash_key: hash_key.to_vec(),
            sort_keys: sort_keys.to_vec(),
            max_count: self.config().multi_remove_max_count,
        };
        let response = self.call(partition, request, timeout).await?;
        check_status(&response)?;

        let ResponseBody::Removed { count } = response.body else {
            return Err(unexpected_body(Verb::MultiRemove));
        };
        if count != sort_keys.len() as u64 {
            warn!(
                table = self.table_name(),
                requested = sort_keys.len(),
                removed = count,
                "multi_del removed count disagrees with request"
            );
            return Err(ClientError::invariant(format!(
                "multi_del removed {count} sort keys but {} were requested",
                sort_keys.len()
            )));
        }
        Ok(())
    }
}

fn range_request(
    hash_key: &[u8],
    start_sort_key: &[u8],
    stop_sort_key: &[u8],
    options: &MultiGetOptions,
    limits: FetchLimits,
) -> MultiGetRequest {
    MultiGetRequest {
        hash_key: hash_key.to_vec(),
        sort_keys: Vec::new(),
        max_kv_count: limits.max_fetch_count,
        max_kv_size: limits.max_fetch_size,
        no_value: options.no_value,
        start_sort_key: start_sort_key.to_vec(),
        stop_sort_key: stop_sort_key.to_vec(),
        start_inclusive: options.start_inclusive,
        stop_inclusive: options.stop_inclusive,
        sort_key_filter_type: options.sort_key_filter_type,
        sort_key_filter_pattern: options.sort_key_filter_pattern.clone(),
        reverse: options.reverse,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tessera_core::ErrorKind;
    use tessera_core::FilterType;
    use tessera_testing::DeterministicTransport;

    use super::*;
    use crate::config::ClientConfig;

    fn seeded(sort_keys: &[&str]) -> (Arc<DeterministicTransport>, Table) {
        let transport = DeterministicTransport::new("t", 4);
        for sort_key in sort_keys {
            let value = format!("v{sort_key}");
            transport.insert(b"h", sort_key.as_bytes(), value.as_bytes()).unwrap();
        }
        let table = Table::new(transport.clone(), ClientConfig::default());
        (transport, table)
    }

    fn sent_multi_get(transport: &DeterministicTransport) -> MultiGetRequest {
        match transport.calls().last().map(|call| call.request.clone()) {
            Some(StoreRequest::MultiGet(request)) => request,
            other => panic!("expected a multi_get call, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn multi_get_dedups_and_sorts_sort_keys() {
        let (transport, table) = seeded(&["a", "b"]);
        let result = table
            .multi_get(b"h", &[b"b".to_vec(), b"a".to_vec(), b"b".to_vec()], Duration::ZERO)
            .await
            .unwrap();

        assert_eq!(sent_multi_get(&transport).sort_keys, vec![b"a".to_vec(), b"b".to_vec()]);
        assert!(result.all_fetched);
        assert_eq!(result.entries, vec![KeyValueEntry::new("a", "va"), KeyValueEntry::new("b", "vb")]);
    }

    #[tokio::test]
    async fn multi_get_skips_missing_keys() {
        let (_, table) = seeded(&["a"]);
        let result = table.multi_get(b"h", &[b"a".to_vec(), b"z".to_vec()], Duration::ZERO).await.unwrap();
        assert_eq!(result.entries.len(), 1);
    }

    #[tokio::test]
    async fn multi_get_carries_configured_limits() {
        let (transport, table) = seeded(&["a"]);
        table.multi_get(b"h", &[], Duration::ZERO).await.unwrap();
        let request = sent_multi_get(&transport);
        assert_eq!(request.max_kv_count, 100);
        assert_eq!(request.max_kv_size, 1_000_000);
        assert!(request.sort_keys.is_empty());
    }

    #[tokio::test]
    async fn truncated_multi_get_is_not_all_fetched() {
        let (_, table) = seeded(&["a", "b", "c"]);
        let limits = FetchLimits {
            max_fetch_count: 2,
            max_fetch_size: 1_000_000,
        };
        let result = table.multi_get_with_limits(b"h", &[], limits, Duration::ZERO).await.unwrap();
        assert!(!result.all_fetched);
        assert_eq!(result.entries.len(), 2);
    }

    #[tokio::test]
    async fn other_store_status_is_an_error() {
        let (transport, table) = seeded(&["a"]);
        transport.override_status(b"h", StoreStatus(2));
        let err = table.multi_get(b"h", &[], Duration::ZERO).await.unwrap_err();
        assert_eq!(err, ClientError::Store { status: 2 });
    }

    #[tokio::test]
    async fn range_get_respects_bounds_filter_and_reverse() {
        let (_, table) = seeded(&["a1", "a2", "b1", "b2", "c1"]);
        let options = MultiGetOptions {
            stop_inclusive: true,
            sort_key_filter_type: FilterType::MatchPostfix,
            sort_key_filter_pattern: b"1".to_vec(),
            reverse: true,
            ..MultiGetOptions::default()
        };
        let result = table.multi_get_range(b"h", b"a2", b"c1", &options, None, Duration::ZERO).await.unwrap();
        let sort_keys: Vec<Vec<u8>> = result.entries.into_iter().map(|e| e.sort_key).collect();
        assert_eq!(sort_keys, vec![b"c1".to_vec(), b"b1".to_vec()]);
    }

    #[tokio::test]
    async fn sort_keys_only() {
        let (transport, table) = seeded(&["x", "y"]);
        let result = table.multi_get_sort_keys(b"h", None, Duration::ZERO).await.unwrap();
        assert!(result.all_fetched);
        assert_eq!(result.sort_keys, vec![b"x".to_vec(), b"y".to_vec()]);
        assert!(sent_multi_get(&transport).no_value);
    }

    #[tokio::test]
    async fn multi_set_writes_all_entries() {
        let (transport, table) = seeded(&[]);
        let entries = vec![KeyValueEntry::new("a", "1"), KeyValueEntry::new("b", "2")];
        table.multi_set(b"h", &entries, 0, Duration::ZERO).await.unwrap();
        assert_eq!(transport.value(b"h", b"b"), Some(b"2".to_vec()));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn multi_set_rejects_empty_values() {
        let (transport, table) = seeded(&[]);
        let err = table.multi_set(b"h", &[], 0, Duration::ZERO).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn multi_del_removes_and_sends_max_count() {
        let (transport, table) = seeded(&["a", "b"]);
        table.multi_del(b"h", &[b"a".to_vec(), b"b".to_vec()], Duration::ZERO).await.unwrap();
        assert_eq!(transport.value(b"h", b"a"), None);
        match &transport.calls()[0].request {
            StoreRequest::MultiRemove { max_count, .. } => assert_eq!(*max_count, 100),
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[tokio::test]
    async fn multi_del_count_mismatch_is_invariant_violation() {
        let (transport, table) = seeded(&["a", "b", "c"]);
        transport.override_removed_count(Some(2));
        let err = table
            .multi_del(b"h", &[b"a".to_vec(), b"b".to_vec(), b"c".to_vec()], Duration::ZERO)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);
    }

    #[tokio::test]
    async fn every_multi_verb_rejects_bad_hash_keys() {
        let (transport, table) = seeded(&[]);
        let oversized = vec![b'x'; 0xFFFF];
        let sort_keys = vec![b"a".to_vec()];
        let entries = vec![KeyValueEntry::new("a", "1")];
        let limits = FetchLimits {
            max_fetch_count: 10,
            max_fetch_size: 1_000,
        };
        let options = MultiGetOptions::default();

        for hash_key in [&b""[..], oversized.as_slice()] {
            let outcomes = vec![
                table.multi_get(hash_key, &sort_keys, Duration::ZERO).await.map(|_| ()),
                table.multi_get_with_limits(hash_key, &sort_keys, limits, Duration::ZERO).await.map(|_| ()),
                table.multi_get_range(hash_key, b"a", b"z", &options, None, Duration::ZERO).await.map(|_| ()),
                table.multi_get_sort_keys(hash_key, None, Duration::ZERO).await.map(|_| ()),
                table.multi_set(hash_key, &entries, 0, Duration::ZERO).await,
                table.multi_del(hash_key, &sort_keys, Duration::ZERO).await,
            ];
            for outcome in outcomes {
                let err = outcome.unwrap_err();
                assert_eq!(err.kind(), ErrorKind::InvalidArgument, "hash key of {} bytes", hash_key.len());
            }
        }
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn multi_del_rejects_empty_sort_keys() {
        let (transport, table) = seeded(&[]);
        assert!(table.multi_del(b"h", &[], Duration::ZERO).await.is_err());
        assert_eq!(transport.call_count(), 0);
    }
}
