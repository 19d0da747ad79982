//! In-memory partitioned transport.
//!
//! Each partition is a `BTreeMap` from composed key to value, so ordering
//! matches the real store. Routing hashes the hash-key with the std
//! `DefaultHasher`, which uses fixed keys and is stable across runs.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::hash::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::Arc;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use parking_lot::Mutex;
use tessera_constants::scan::SCAN_CONTEXT_COMPLETED;
use tessera_constants::scan::SCAN_CONTEXT_NOT_EXIST;
use tessera_core::ClientError;
use tessera_core::GetScannerRequest;
use tessera_core::KeyValueEntry;
use tessera_core::MultiGetRequest;
use tessera_core::PartitionId;
use tessera_core::RawEntry;
use tessera_core::RemoteErrorCode;
use tessera_core::ResponseBody;
use tessera_core::StoreRequest;
use tessera_core::StoreResponse;
use tessera_core::StoreStatus;
use tessera_core::TTL_NO_EXPIRE;
use tessera_core::Transport;
use tessera_core::Verb;
use tessera_core::compose;
use tessera_core::decompose;
use tokio::sync::Barrier;
use tracing::debug;

/// Status the store answers for malformed requests.
const STATUS_INVALID_ARGUMENT: StoreStatus = StoreStatus(4);

/// One call received by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub partition: PartitionId,
    pub request: StoreRequest,
    pub timeout: Duration,
}

impl RecordedCall {
    pub fn verb(&self) -> Verb {
        self.request.verb()
    }
}

#[derive(Clone)]
struct StoredValue {
    value: Vec<u8>,
    /// Absolute expiry in epoch seconds; `0` never expires.
    expire_ts_seconds: u32,
}

impl StoredValue {
    fn is_live(&self, now: u64) -> bool {
        self.expire_ts_seconds == 0 || u64::from(self.expire_ts_seconds) > now
    }
}

struct Cursor {
    partition: PartitionId,
    pending: VecDeque<RawEntry>,
    batch_size: usize,
}

type PartitionData = BTreeMap<Vec<u8>, StoredValue>;

#[derive(Default)]
struct State {
    data: BTreeMap<PartitionId, PartitionData>,
    scanners: HashMap<i64, Cursor>,
    next_context_id: i64,
    calls: Vec<RecordedCall>,
    route_count: usize,
    cleared_contexts: Vec<i64>,
    hash_key_faults: HashMap<Vec<u8>, RemoteErrorCode>,
    partition_faults: HashMap<PartitionId, RemoteErrorCode>,
    verb_faults: HashMap<Verb, RemoteErrorCode>,
    hash_key_delays: HashMap<Vec<u8>, Duration>,
    status_overrides: HashMap<Vec<u8>, StoreStatus>,
    removed_count_override: Option<u64>,
    barrier: Option<Arc<Barrier>>,
}

/// A deterministic in-memory store for testing the client.
///
/// Thread-safe; every operation the client issues is served with the
/// store's semantics: fetch limits and truncation, sort-key filters,
/// expiry, and paged scanner cursors.
pub struct DeterministicTransport {
    table_name: String,
    app_id: u32,
    partition_count: u32,
    state: Mutex<State>,
}

impl DeterministicTransport {
    /// App id of every partition this transport serves.
    pub const APP_ID: u32 = 1;

    /// Create a transport for `table_name` with `partition_count` partitions
    /// (at least one), wrapped in `Arc`.
    pub fn new(table_name: impl Into<String>, partition_count: u32) -> Arc<Self> {
        Arc::new(Self {
            table_name: table_name.into(),
            app_id: Self::APP_ID,
            partition_count: partition_count.max(1),
            state: Mutex::new(State {
                next_context_id: 1,
                ..State::default()
            }),
        })
    }

    // ========================================================================
    // Data seeding and inspection
    // ========================================================================

    /// Write a value directly, bypassing the call log.
    pub fn insert(&self, hash_key: &[u8], sort_key: &[u8], value: &[u8]) -> Result<(), ClientError> {
        let key = compose(hash_key, sort_key)?;
        let partition = self.partition_for(hash_key);
        self.state.lock().data.entry(partition).or_default().insert(key, StoredValue {
            value: value.to_vec(),
            expire_ts_seconds: 0,
        });
        Ok(())
    }

    /// Read a live value directly, bypassing the call log.
    pub fn value(&self, hash_key: &[u8], sort_key: &[u8]) -> Option<Vec<u8>> {
        let key = compose(hash_key, sort_key).ok()?;
        let partition = self.partition_for(hash_key);
        let now = now_epoch_seconds();
        let state = self.state.lock();
        state
            .data
            .get(&partition)
            .and_then(|table| table.get(&key))
            .filter(|stored| stored.is_live(now))
            .map(|stored| stored.value.clone())
    }

    /// Partition owning `hash_key`.
    fn partition_for(&self, hash_key: &[u8]) -> PartitionId {
        let mut hasher = DefaultHasher::new();
        hash_key.hash(&mut hasher);
        let index = (hasher.finish() % u64::from(self.partition_count)) as u32;
        PartitionId::new(self.app_id, index)
    }

    /// Number of live entries across all partitions.
    pub fn entry_count(&self) -> usize {
        let now = now_epoch_seconds();
        let state = self.state.lock();
        state.data.values().flat_map(|table| table.values()).filter(|stored| stored.is_live(now)).count()
    }

    // ========================================================================
    // Fault and latency injection
    // ========================================================================

    /// Delay every call addressed to `hash_key`. A delay at or beyond the
    /// call's timeout fails the call with `ERR_TIMEOUT` once the timeout
    /// elapses.
    pub fn delay_hash_key(&self, hash_key: &[u8], delay: Duration) {
        self.state.lock().hash_key_delays.insert(hash_key.to_vec(), delay);
    }

    /// Fail every call addressed to `hash_key` with `code`.
    pub fn fail_hash_key(&self, hash_key: &[u8], code: RemoteErrorCode) {
        self.state.lock().hash_key_faults.insert(hash_key.to_vec(), code);
    }

    /// Fail every call sent to `partition` with `code`.
    pub fn fail_partition(&self, partition: PartitionId, code: RemoteErrorCode) {
        self.state.lock().partition_faults.insert(partition, code);
    }

    /// Fail every call of `verb` with `code`.
    pub fn fail_verb(&self, verb: Verb, code: RemoteErrorCode) {
        self.state.lock().verb_faults.insert(verb, code);
    }

    /// Replace the store status of every answer for `hash_key`, keeping the body.
    pub fn override_status(&self, hash_key: &[u8], status: StoreStatus) {
        self.state.lock().status_overrides.insert(hash_key.to_vec(), status);
    }

    /// Report `count` as the removed count of every multi-remove.
    pub fn override_removed_count(&self, count: Option<u64>) {
        self.state.lock().removed_count_override = count;
    }

    /// Hold every call until `parties` calls are in flight at once.
    pub fn arm_barrier(&self, parties: usize) {
        self.state.lock().barrier = Some(Arc::new(Barrier::new(parties)));
    }

    /// Remove every injected fault, delay, override and barrier.
    pub fn clear_faults(&self) {
        let mut state = self.state.lock();
        state.hash_key_faults.clear();
        state.partition_faults.clear();
        state.verb_faults.clear();
        state.hash_key_delays.clear();
        state.status_overrides.clear();
        state.removed_count_override = None;
        state.barrier = None;
    }

    // ========================================================================
    // Call log
    // ========================================================================

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    pub fn call_count(&self) -> usize {
        self.state.lock().calls.len()
    }

    pub fn calls_with_verb(&self, verb: Verb) -> usize {
        self.state.lock().calls.iter().filter(|call| call.verb() == verb).count()
    }

    /// Number of hash-keys routed since creation or the last reset.
    pub fn route_count(&self) -> usize {
        self.state.lock().route_count
    }

    pub fn reset_calls(&self) {
        let mut state = self.state.lock();
        state.calls.clear();
        state.route_count = 0;
    }

    /// Cursors the store still holds open.
    pub fn open_scanner_count(&self) -> usize {
        self.state.lock().scanners.len()
    }

    /// Context ids released through clear-scanner, in arrival order.
    pub fn cleared_contexts(&self) -> Vec<i64> {
        self.state.lock().cleared_contexts.clone()
    }
}

#[async_trait]
impl Transport for DeterministicTransport {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn route(&self, hash_key: &[u8]) -> PartitionId {
        self.state.lock().route_count += 1;
        self.partition_for(hash_key)
    }

    fn all_partitions(&self) -> Vec<PartitionId> {
        (0..self.partition_count).map(|index| PartitionId::new(self.app_id, index)).collect()
    }

    async fn call(
        &self,
        partition: PartitionId,
        request: StoreRequest,
        timeout: Duration,
    ) -> Result<StoreResponse, RemoteErrorCode> {
        debug!(table = %self.table_name, %partition, verb = %request.verb(), "deterministic transport call");
        let hash_key = request_hash_key(&request);

        let (fault, delay, barrier) = {
            let mut state = self.state.lock();
            state.calls.push(RecordedCall {
                partition,
                request: request.clone(),
                timeout,
            });
            let fault = state
                .partition_faults
                .get(&partition)
                .or_else(|| state.verb_faults.get(&request.verb()))
                .or_else(|| hash_key.as_ref().and_then(|h| state.hash_key_faults.get(h)))
                .copied();
            let delay = hash_key.as_ref().and_then(|h| state.hash_key_delays.get(h).copied());
            (fault, delay, state.barrier.clone())
        };

        if let Some(barrier) = barrier {
            barrier.wait().await;
        }
        if let Some(delay) = delay {
            if delay >= timeout {
                tokio::time::sleep(timeout).await;
                return Err(RemoteErrorCode::Timeout);
            }
            tokio::time::sleep(delay).await;
        }
        if let Some(code) = fault {
            return Err(code);
        }
        if partition.app_id != self.app_id || partition.partition_index >= self.partition_count {
            return Err(RemoteErrorCode::ObjectNotFound);
        }

        let mut state = self.state.lock();
        let mut response = state.apply(partition, request, now_epoch_seconds());
        if let Some(status) = hash_key.and_then(|h| state.status_overrides.get(&h).copied()) {
            response.status = status;
        }
        Ok(response)
    }
}

impl State {
    fn apply(&mut self, partition: PartitionId, request: StoreRequest, now: u64) -> StoreResponse {
        match request {
            StoreRequest::Get { key } => {
                let table = self.data.entry(partition).or_default();
                match table.get(&key).filter(|stored| stored.is_live(now)) {
                    Some(stored) => StoreResponse::ok(ResponseBody::Value(stored.value.clone())),
                    None => StoreResponse::with_status(StoreStatus::NOT_FOUND, ResponseBody::Empty),
                }
            }
            StoreRequest::Put {
                key,
                value,
                expire_ts_seconds,
            } => {
                self.data.entry(partition).or_default().insert(key, StoredValue {
                    value,
                    expire_ts_seconds,
                });
                StoreResponse::ok(ResponseBody::Empty)
            }
            StoreRequest::Remove { key } => {
                self.data.entry(partition).or_default().remove(&key);
                StoreResponse::ok(ResponseBody::Empty)
            }
            StoreRequest::Ttl { key } => {
                let table = self.data.entry(partition).or_default();
                match table.get(&key).filter(|stored| stored.is_live(now)) {
                    Some(stored) if stored.expire_ts_seconds == 0 => {
                        StoreResponse::ok(ResponseBody::Ttl { seconds: TTL_NO_EXPIRE })
                    }
                    Some(stored) => {
                        let remaining = u64::from(stored.expire_ts_seconds).saturating_sub(now);
                        StoreResponse::ok(ResponseBody::Ttl {
                            seconds: remaining.min(i32::MAX as u64) as i32,
                        })
                    }
                    None => StoreResponse::with_status(StoreStatus::NOT_FOUND, ResponseBody::Empty),
                }
            }
            StoreRequest::SortKeyCount { hash_key } => {
                let Ok(prefix) = compose(&hash_key, &[]) else {
                    return StoreResponse::with_status(STATUS_INVALID_ARGUMENT, ResponseBody::Empty);
                };
                let table = self.data.entry(partition).or_default();
                let count = table
                    .range(prefix.clone()..)
                    .take_while(|(key, _)| key.starts_with(&prefix))
                    .filter(|(_, stored)| stored.is_live(now))
                    .count();
                StoreResponse::ok(ResponseBody::Count { count: count as i64 })
            }
            StoreRequest::MultiPut {
                hash_key,
                entries,
                expire_ts_seconds,
            } => {
                let table = self.data.entry(partition).or_default();
                for entry in entries {
                    let Ok(key) = compose(&hash_key, &entry.sort_key) else {
                        return StoreResponse::with_status(STATUS_INVALID_ARGUMENT, ResponseBody::Empty);
                    };
                    table.insert(key, StoredValue {
                        value: entry.value,
                        expire_ts_seconds,
                    });
                }
                StoreResponse::ok(ResponseBody::Empty)
            }
            StoreRequest::MultiRemove {
                hash_key,
                sort_keys,
                max_count,
            } => {
                if sort_keys.len() > max_count as usize {
                    return StoreResponse::with_status(STATUS_INVALID_ARGUMENT, ResponseBody::Removed { count: 0 });
                }
                let table = self.data.entry(partition).or_default();
                for sort_key in &sort_keys {
                    if let Ok(key) = compose(&hash_key, sort_key) {
                        table.remove(&key);
                    }
                }
                let count = self.removed_count_override.unwrap_or(sort_keys.len() as u64);
                StoreResponse::ok(ResponseBody::Removed { count })
            }
            StoreRequest::MultiGet(request) => {
                let table = self.data.entry(partition).or_default();
                multi_get(table, &request, now)
            }
            StoreRequest::GetScanner(request) => {
                let table = self.data.entry(partition).or_default();
                let pending: VecDeque<RawEntry> = scan_candidates(table, &request, now).into();
                let cursor = Cursor {
                    partition,
                    pending,
                    batch_size: request.batch_size.max(1) as usize,
                };
                self.open_cursor(cursor)
            }
            StoreRequest::Scan { context_id } => self.advance_cursor(partition, context_id),
            StoreRequest::ClearScanner { context_id } => {
                self.scanners.remove(&context_id);
                self.cleared_contexts.push(context_id);
                StoreResponse::ok(ResponseBody::Empty)
            }
        }
    }

    /// Serve the first batch; keep the cursor only if entries remain.
    fn open_cursor(&mut self, mut cursor: Cursor) -> StoreResponse {
        let entries = take_batch(&mut cursor);
        let context_id = if cursor.pending.is_empty() {
            SCAN_CONTEXT_COMPLETED
        } else {
            let id = self.next_context_id;
            self.next_context_id += 1;
            self.scanners.insert(id, cursor);
            id
        };
        StoreResponse::ok(ResponseBody::ScanBatch { entries, context_id })
    }

    fn advance_cursor(&mut self, partition: PartitionId, context_id: i64) -> StoreResponse {
        let Some(cursor) = self.scanners.get_mut(&context_id).filter(|cursor| cursor.partition == partition) else {
            return StoreResponse::with_status(StoreStatus::NOT_FOUND, ResponseBody::ScanBatch {
                entries: Vec::new(),
                context_id: SCAN_CONTEXT_NOT_EXIST,
            });
        };
        let entries = take_batch(cursor);
        let context_id = if cursor.pending.is_empty() {
            self.scanners.remove(&context_id);
            SCAN_CONTEXT_COMPLETED
        } else {
            context_id
        };
        StoreResponse::ok(ResponseBody::ScanBatch { entries, context_id })
    }
}

fn take_batch(cursor: &mut Cursor) -> Vec<RawEntry> {
    let n = cursor.batch_size.min(cursor.pending.len());
    cursor.pending.drain(..n).collect()
}

fn multi_get(table: &PartitionData, request: &MultiGetRequest, now: u64) -> StoreResponse {
    let candidates: Vec<KeyValueEntry> = if request.sort_keys.is_empty() {
        let Ok(prefix) = compose(&request.hash_key, &[]) else {
            return StoreResponse::with_status(STATUS_INVALID_ARGUMENT, ResponseBody::Entries(Vec::new()));
        };
        let mut in_range: Vec<KeyValueEntry> = table
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter(|(_, stored)| stored.is_live(now))
            .map(|(key, stored)| KeyValueEntry::new(&key[prefix.len()..], stored.value.clone()))
            .filter(|entry| sort_key_in_range(&entry.sort_key, request))
            .filter(|entry| request.sort_key_filter_type.matches(&request.sort_key_filter_pattern, &entry.sort_key))
            .collect();
        if request.reverse {
            in_range.reverse();
        }
        in_range
    } else {
        request
            .sort_keys
            .iter()
            .filter_map(|sort_key| {
                let key = compose(&request.hash_key, sort_key).ok()?;
                let stored = table.get(&key).filter(|stored| stored.is_live(now))?;
                Some(KeyValueEntry::new(sort_key.clone(), stored.value.clone()))
            })
            .collect()
    };

    let mut entries = Vec::new();
    let mut size = 0usize;
    let mut truncated = false;
    for mut entry in candidates {
        if entries.len() >= request.max_kv_count as usize || size >= request.max_kv_size as usize {
            truncated = true;
            break;
        }
        if request.no_value {
            entry.value.clear();
        }
        size += entry.sort_key.len() + entry.value.len();
        entries.push(entry);
    }

    let status = if truncated {
        StoreStatus::INCOMPLETE
    } else {
        StoreStatus::OK
    };
    StoreResponse::with_status(status, ResponseBody::Entries(entries))
}

fn sort_key_in_range(sort_key: &[u8], request: &MultiGetRequest) -> bool {
    let after_start = request.start_sort_key.is_empty()
        || sort_key > request.start_sort_key.as_slice()
        || (request.start_inclusive && sort_key == request.start_sort_key.as_slice());
    let before_stop = request.stop_sort_key.is_empty()
        || sort_key < request.stop_sort_key.as_slice()
        || (request.stop_inclusive && sort_key == request.stop_sort_key.as_slice());
    after_start && before_stop
}

fn scan_candidates(table: &PartitionData, request: &GetScannerRequest, now: u64) -> Vec<RawEntry> {
    let mut entries: Vec<RawEntry> = table
        .iter()
        .filter(|(_, stored)| stored.is_live(now))
        .filter(|(key, _)| composed_key_in_range(key, request))
        .filter(|(key, _)| match decompose(key) {
            Ok((_, sort_key)) => request.sort_key_filter_type.matches(&request.sort_key_filter_pattern, sort_key),
            Err(_) => false,
        })
        .map(|(key, stored)| RawEntry {
            key: key.clone(),
            value: if request.no_value {
                Vec::new()
            } else {
                stored.value.clone()
            },
        })
        .collect();
    if request.reverse {
        entries.reverse();
    }
    entries
}

fn composed_key_in_range(key: &[u8], request: &GetScannerRequest) -> bool {
    let after_start = request.start_key.is_empty()
        || key > request.start_key.as_slice()
        || (request.start_inclusive && key == request.start_key.as_slice());
    let before_stop = request.stop_key.is_empty()
        || key < request.stop_key.as_slice()
        || (request.stop_inclusive && key == request.stop_key.as_slice());
    after_start && before_stop
}

/// Hash-key a request is addressed to, when it names one.
fn request_hash_key(request: &StoreRequest) -> Option<Vec<u8>> {
    match request {
        StoreRequest::Get { key }
        | StoreRequest::Put { key, .. }
        | StoreRequest::Remove { key }
        | StoreRequest::Ttl { key } => decompose(key).ok().map(|(hash_key, _)| hash_key.to_vec()),
        StoreRequest::MultiGet(request) => Some(request.hash_key.clone()),
        StoreRequest::MultiPut { hash_key, .. }
        | StoreRequest::MultiRemove { hash_key, .. }
        | StoreRequest::SortKeyCount { hash_key } => Some(hash_key.clone()),
        StoreRequest::GetScanner(request) if !request.start_key.is_empty() => {
            decompose(&request.start_key).ok().map(|(hash_key, _)| hash_key.to_vec())
        }
        StoreRequest::GetScanner(_) | StoreRequest::Scan { .. } | StoreRequest::ClearScanner { .. } => None,
    }
}

fn now_epoch_seconds() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}
