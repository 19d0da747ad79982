//! Single-operation façade.
//!
//! Every verb validates its arguments, composes the wire key, issues exactly
//! one transport call with the effective timeout, and translates the answer:
//!
//! - transport failure: [`ClientError::Remote`] (or [`ClientError::Timeout`])
//! - store status `NOT_FOUND` on get/ttl: a typed "absent" value
//! - any other non-zero store status: [`ClientError::Store`]

use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use tessera_core::ClientError;
use tessera_core::PartitionId;
use tessera_core::ResponseBody;
use tessera_core::StoreRequest;
use tessera_core::StoreResponse;
use tessera_core::StoreStatus;
use tessera_core::TTL_NOT_FOUND;
use tessera_core::Transport;
use tessera_core::Verb;
use tessera_core::compose;
use tessera_core::validation::validate_hash_key;
use tracing::debug;

use crate::config::ClientConfig;

/// Client handle for one table.
///
/// Cheap to clone; clones share the transport and configuration.
#[derive(Clone)]
pub struct Table {
    transport: Arc<dyn Transport>,
    config: Arc<ClientConfig>,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("table_name", &self.transport.table_name())
            .field("config", &self.config)
            .finish()
    }
}

impl Table {
    pub fn new(transport: Arc<dyn Transport>, config: ClientConfig) -> Self {
        Self {
            transport,
            config: Arc::new(config),
        }
    }

    pub fn table_name(&self) -> &str {
        self.transport.table_name()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    // ========================================================================
    // Single-key verbs
    // ========================================================================

    /// Read one value. `Ok(None)` means the key does not exist.
    pub async fn get(&self, hash_key: &[u8], sort_key: &[u8], timeout: Duration) -> Result<Option<Vec<u8>>, ClientError> {
        let key = compose(hash_key, sort_key)?;
        let partition = self.transport.route(hash_key);
        let response = self.call(partition, StoreRequest::Get { key }, timeout).await?;

        if response.status == StoreStatus::NOT_FOUND {
            return Ok(None);
        }
        check_status(&response)?;
        match response.body {
            ResponseBody::Value(value) => Ok(Some(value)),
            _ => Err(unexpected_body(Verb::Get)),
        }
    }

    /// Write one value without expiry.
    pub async fn set(
        &self,
        hash_key: &[u8],
        sort_key: &[u8],
        value: &[u8],
        timeout: Duration,
    ) -> Result<(), ClientError> {
        self.set_with_ttl(hash_key, sort_key, value, 0, timeout).await
    }

    /// Write one value that expires `ttl_seconds` from now; `0` never expires.
    pub async fn set_with_ttl(
        &self,
        hash_key: &[u8],
        sort_key: &[u8],
        value: &[u8],
        ttl_seconds: u32,
        timeout: Duration,
    ) -> Result<(), ClientError> {
        let key = compose(hash_key, sort_key)?;
        let partition = self.transport.route(hash_key);
        let request = StoreRequest::Put {
            key,
            value: value.to_vec(),
            expire_ts_seconds: expire_ts_seconds(ttl_seconds),
        };
        let response = self.call(partition, request, timeout).await?;
        check_status(&response)
    }

    /// Delete one key. Deleting an absent key succeeds.
    pub async fn del(&self, hash_key: &[u8], sort_key: &[u8], timeout: Duration) -> Result<(), ClientError> {
        let key = compose(hash_key, sort_key)?;
        let partition = self.transport.route(hash_key);
        let response = self.call(partition, StoreRequest::Remove { key }, timeout).await?;
        check_status(&response)
    }

    /// Seconds until the key expires, `-1` if it never expires, `-2` if it
    /// does not exist.
    pub async fn ttl(&self, hash_key: &[u8], sort_key: &[u8], timeout: Duration) -> Result<i32, ClientError> {
        let key = compose(hash_key, sort_key)?;
        let partition = self.transport.route(hash_key);
        let response = self.call(partition, StoreRequest::Ttl { key }, timeout).await?;

        if response.status == StoreStatus::NOT_FOUND {
            return Ok(TTL_NOT_FOUND);
        }
        check_status(&response)?;
        match response.body {
            ResponseBody::Ttl { seconds } => Ok(seconds),
            _ => Err(unexpected_body(Verb::Ttl)),
        }
    }

    /// Whether the key exists; a TTL query with the result mapped.
    pub async fn exist(&self, hash_key: &[u8], sort_key: &[u8], timeout: Duration) -> Result<bool, ClientError> {
        self.ttl(hash_key, sort_key, timeout).await.map(|ttl| ttl != TTL_NOT_FOUND)
    }

    /// Number of sort-keys stored under `hash_key`.
    pub async fn sort_key_count(&self, hash_key: &[u8], timeout: Duration) -> Result<i64, ClientError> {
        validate_hash_key(hash_key)?;
        let partition = self.transport.route(hash_key);
        let request = StoreRequest::SortKeyCount {
            hash_key: hash_key.to_vec(),
        };
        let response = self.call(partition, request, timeout).await?;
        check_status(&response)?;
        match response.body {
            ResponseBody::Count { count } => Ok(count),
            _ => Err(unexpected_body(Verb::SortKeyCount)),
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Send one request with the effective timeout and translate transport
    /// failures. The store status is left for the caller to interpret.
    pub(crate) async fn call(
        &self,
        partition: PartitionId,
        request: StoreRequest,
        timeout: Duration,
    ) -> Result<StoreResponse, ClientError> {
        let timeout = self.config.effective_timeout(timeout);
        let verb = request.verb();
        debug!(
            table = self.transport.table_name(),
            %partition,
            %verb,
            timeout_ms = timeout.as_millis() as u64,
            "dispatching store request"
        );

        match tokio::time::timeout(timeout, self.transport.call(partition, request, timeout)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(code)) => {
                debug!(%partition, %verb, %code, "store request failed in transport");
                Err(ClientError::from_remote(code, timeout))
            }
            Err(_) => {
                debug!(%partition, %verb, timeout_ms = timeout.as_millis() as u64, "store request timed out");
                Err(ClientError::timeout(timeout))
            }
        }
    }
}

/// Any non-zero status is a store error.
pub(crate) fn check_status(response: &StoreResponse) -> Result<(), ClientError> {
    if response.status.is_ok() {
        Ok(())
    } else {
        Err(ClientError::Store {
            status: response.status.code(),
        })
    }
}

pub(crate) fn unexpected_body(verb: Verb) -> ClientError {
    ClientError::invariant(format!("{verb} response carried an unexpected body"))
}

/// Absolute expiry for a relative TTL; `0` stays `0` (no expiry).
pub(crate) fn expire_ts_seconds(ttl_seconds: u32) -> u32 {
    if ttl_seconds == 0 {
        return 0;
    }
    let now = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
    now.saturating_add(u64::from(ttl_seconds)).min(u64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use tessera_core::ErrorKind;
    use tessera_core::RemoteErrorCode;
    use tessera_core::TTL_NO_EXPIRE;
    use tessera_testing::DeterministicTransport;

    use super::*;

    fn table_with(transport: &Arc<DeterministicTransport>) -> Table {
        Table::new(transport.clone(), ClientConfig::default())
    }

    #[tokio::test]
    async fn get_missing_is_none() {
        let transport = DeterministicTransport::new("t", 4);
        let table = table_with(&transport);
        assert_eq!(table.get(b"h", b"s", Duration::ZERO).await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_then_get_then_del() {
        let transport = DeterministicTransport::new("t", 4);
        let table = table_with(&transport);

        table.set(b"h", b"s", b"v", Duration::ZERO).await.unwrap();
        assert_eq!(table.get(b"h", b"s", Duration::ZERO).await.unwrap(), Some(b"v".to_vec()));

        table.del(b"h", b"s", Duration::ZERO).await.unwrap();
        assert_eq!(table.get(b"h", b"s", Duration::ZERO).await.unwrap(), None);
        assert_eq!(transport.call_count(), 4);
    }

    #[tokio::test]
    async fn zero_timeout_uses_table_default() {
        let transport = DeterministicTransport::new("t", 4);
        let table = table_with(&transport);
        table.get(b"h", b"s", Duration::ZERO).await.unwrap();
        table.get(b"h", b"s", Duration::from_millis(30)).await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls[0].timeout, Duration::from_millis(1_000));
        assert_eq!(calls[1].timeout, Duration::from_millis(30));
    }

    #[tokio::test]
    async fn ttl_sentinels() {
        let transport = DeterministicTransport::new("t", 4);
        let table = table_with(&transport);

        assert_eq!(table.ttl(b"h", b"s", Duration::ZERO).await.unwrap(), TTL_NOT_FOUND);
        table.set(b"h", b"s", b"v", Duration::ZERO).await.unwrap();
        assert_eq!(table.ttl(b"h", b"s", Duration::ZERO).await.unwrap(), TTL_NO_EXPIRE);

        table.set_with_ttl(b"h", b"t", b"v", 100, Duration::ZERO).await.unwrap();
        let ttl = table.ttl(b"h", b"t", Duration::ZERO).await.unwrap();
        assert!((98..=100).contains(&ttl), "ttl was {ttl}");
    }

    #[tokio::test]
    async fn exist_follows_ttl() {
        let transport = DeterministicTransport::new("t", 4);
        let table = table_with(&transport);
        assert!(!table.exist(b"h", b"s", Duration::ZERO).await.unwrap());
        transport.insert(b"h", b"s", b"v").unwrap();
        assert!(table.exist(b"h", b"s", Duration::ZERO).await.unwrap());
        assert_eq!(transport.calls_with_verb(Verb::Ttl), 2);
    }

    #[tokio::test]
    async fn sort_key_count_counts_one_hash_key() {
        let transport = DeterministicTransport::new("t", 1);
        let table = table_with(&transport);
        for sort_key in [b"a", b"b", b"c"] {
            transport.insert(b"h", sort_key, b"v").unwrap();
        }
        transport.insert(b"other", b"a", b"v").unwrap();
        assert_eq!(table.sort_key_count(b"h", Duration::ZERO).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn store_status_becomes_store_error() {
        let transport = DeterministicTransport::new("t", 4);
        let table = table_with(&transport);
        transport.override_status(b"h", StoreStatus(3));
        let err = table.set(b"h", b"s", b"v", Duration::ZERO).await.unwrap_err();
        assert_eq!(err, ClientError::Store { status: 3 });
    }

    #[tokio::test]
    async fn transport_failure_becomes_remote_error() {
        let transport = DeterministicTransport::new("t", 4);
        let table = table_with(&transport);
        transport.fail_hash_key(b"h", RemoteErrorCode::NetworkFailure);
        let err = table.get(b"h", b"s", Duration::ZERO).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Remote);
    }

    #[tokio::test]
    async fn slow_call_times_out() {
        let transport = DeterministicTransport::new("t", 4);
        let table = table_with(&transport);
        transport.delay_hash_key(b"h", Duration::from_secs(5));
        let err = table.get(b"h", b"s", Duration::from_millis(20)).await.unwrap_err();
        assert_eq!(err, ClientError::Timeout { duration_ms: 20 });
    }

    #[tokio::test]
    async fn invalid_hash_key_never_dispatches() {
        let transport = DeterministicTransport::new("t", 4);
        let table = table_with(&transport);
        let long = vec![b'x'; 0xFFFF];

        for hash_key in [&b""[..], long.as_slice()] {
            assert_eq!(
                table.get(hash_key, b"s", Duration::ZERO).await.unwrap_err().kind(),
                ErrorKind::InvalidArgument
            );
            assert!(table.set(hash_key, b"s", b"v", Duration::ZERO).await.is_err());
            assert!(table.del(hash_key, b"s", Duration::ZERO).await.is_err());
            assert!(table.ttl(hash_key, b"s", Duration::ZERO).await.is_err());
            assert!(table.exist(hash_key, b"s", Duration::ZERO).await.is_err());
            assert!(table.sort_key_count(hash_key, Duration::ZERO).await.is_err());
        }
        assert_eq!(transport.call_count(), 0);
    }

    #[test]
    fn expire_ts_zero_means_forever() {
        assert_eq!(expire_ts_seconds(0), 0);
        assert!(expire_ts_seconds(10) > 10);
    }
}
