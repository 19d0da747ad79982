//! Cursor-owning scanner.
//!
//! A scanner walks the partitions of one [`ScanRange`] in order. For each
//! partition it opens a server-side cursor on first fetch (the open call
//! returns the first batch), advances it batch by batch, and moves on when
//! the store reports the cursor completed. At most one cursor is open at a
//! time. A cursor left open is released on error, on [`Scanner::close`], and
//! (best effort, on the current runtime) on drop; the store's idle expiry
//! covers anything that still slips through.

use std::collections::VecDeque;
use std::time::Duration;

use tessera_constants::scan::SCAN_CONTEXT_COMPLETED;
use tessera_core::ClientError;
use tessera_core::FilterType;
use tessera_core::GetScannerRequest;
use tessera_core::PartitionId;
use tessera_core::RawEntry;
use tessera_core::ResponseBody;
use tessera_core::ScanItem;
use tessera_core::ScanRange;
use tessera_core::StoreRequest;
use tessera_core::Verb;
use tessera_core::decompose;
use tokio::runtime::Handle;
use tracing::debug;
use tracing::warn;

use crate::table::Table;
use crate::table::check_status;
use crate::table::unexpected_body;

/// Per-round-trip settings resolved when the scanner is built.
#[derive(Debug, Clone)]
pub(crate) struct ScanSettings {
    pub(crate) timeout: Duration,
    pub(crate) batch_size: u32,
    pub(crate) no_value: bool,
    pub(crate) sort_key_filter_type: FilterType,
    pub(crate) sort_key_filter_pattern: Vec<u8>,
    pub(crate) reverse: bool,
}

#[derive(Debug, Clone, Copy)]
struct OpenCursor {
    partition: PartitionId,
    context_id: i64,
}

/// Iterates the entries of one planned range.
///
/// Not safe to advance from several tasks at once; `next` takes `&mut self`.
pub struct Scanner {
    table: Table,
    range: ScanRange,
    settings: ScanSettings,
    /// Index of the next partition to open.
    next_partition: usize,
    cursor: Option<OpenCursor>,
    buffer: VecDeque<RawEntry>,
    finished: bool,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("partitions", &self.range.partitions)
            .field("next_partition", &self.next_partition)
            .field("cursor", &self.cursor)
            .field("buffered", &self.buffer.len())
            .field("finished", &self.finished)
            .finish()
    }
}

impl Scanner {
    pub(crate) fn new(table: Table, range: ScanRange, settings: ScanSettings) -> Self {
        let finished = range.is_empty();
        Self {
            table,
            range,
            settings,
            next_partition: 0,
            cursor: None,
            buffer: VecDeque::new(),
            finished,
        }
    }

    /// The range this scanner walks.
    pub fn range(&self) -> &ScanRange {
        &self.range
    }

    /// Per-call timeout of every open, fetch and release round-trip.
    pub fn timeout(&self) -> Duration {
        self.settings.timeout
    }

    /// Entries requested per round-trip.
    pub fn batch_size(&self) -> u32 {
        self.settings.batch_size
    }

    /// Whether a server-side cursor is currently held.
    pub fn has_open_cursor(&self) -> bool {
        self.cursor.is_some()
    }

    /// Next entry, or `None` once every partition is exhausted.
    ///
    /// An error releases any open cursor and ends the scan.
    pub async fn next(&mut self) -> Result<Option<ScanItem>, ClientError> {
        loop {
            if let Some(raw) = self.buffer.pop_front() {
                return match decode(raw) {
                    Ok(item) => Ok(Some(item)),
                    Err(err) => Err(self.abort(err).await),
                };
            }
            if self.finished {
                return Ok(None);
            }

            let fetched = match self.cursor {
                Some(cursor) => self.fetch(cursor).await,
                None => match self.range.partitions.get(self.next_partition).copied() {
                    Some(partition) => {
                        self.next_partition += 1;
                        self.open(partition).await
                    }
                    None => {
                        self.finished = true;
                        return Ok(None);
                    }
                },
            };
            if let Err(err) = fetched {
                return Err(self.abort(err).await);
            }
        }
    }

    /// Release the open cursor, if any, and end the scan.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        self.finished = true;
        self.buffer.clear();
        match self.cursor.take() {
            Some(cursor) => self.release(cursor).await,
            None => Ok(()),
        }
    }

    async fn open(&mut self, partition: PartitionId) -> Result<(), ClientError> {
        let request = GetScannerRequest {
            start_key: self.range.lower_bound.clone(),
            stop_key: self.range.upper_bound.clone(),
            start_inclusive: self.range.lower_inclusive,
            stop_inclusive: self.range.upper_inclusive,
            batch_size: self.settings.batch_size,
            no_value: self.settings.no_value,
            sort_key_filter_type: self.settings.sort_key_filter_type,
            sort_key_filter_pattern: self.settings.sort_key_filter_pattern.clone(),
            reverse: self.settings.reverse,
        };
        debug!(table = self.table.table_name(), %partition, "opening scan cursor");
        self.exchange(partition, StoreRequest::GetScanner(request), Verb::GetScanner).await
    }

    async fn fetch(&mut self, cursor: OpenCursor) -> Result<(), ClientError> {
        let request = StoreRequest::Scan {
            context_id: cursor.context_id,
        };
        self.exchange(cursor.partition, request, Verb::Scan).await
    }

    /// Send an open or advance request and absorb its batch.
    async fn exchange(&mut self, partition: PartitionId, request: StoreRequest, verb: Verb) -> Result<(), ClientError> {
        let response = self.table.call(partition, request, self.settings.timeout).await?;
        check_status(&response)?;
        let ResponseBody::ScanBatch { entries, context_id } = response.body else {
            return Err(unexpected_body(verb));
        };

        self.buffer.extend(entries);
        if context_id == SCAN_CONTEXT_COMPLETED {
            debug!(%partition, "scan cursor completed");
            self.cursor = None;
        } else {
            self.cursor = Some(OpenCursor { partition, context_id });
        }
        Ok(())
    }

    async fn release(&self, cursor: OpenCursor) -> Result<(), ClientError> {
        debug!(partition = %cursor.partition, context_id = cursor.context_id, "releasing scan cursor");
        let request = StoreRequest::ClearScanner {
            context_id: cursor.context_id,
        };
        let result = self.table.call(cursor.partition, request, self.settings.timeout).await;
        match result.and_then(|response| check_status(&response)) {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(partition = %cursor.partition, context_id = cursor.context_id, error = %err, "scan cursor release failed");
                Err(err)
            }
        }
    }

    /// End the scan after `err`, releasing the open cursor first.
    async fn abort(&mut self, err: ClientError) -> ClientError {
        self.finished = true;
        self.buffer.clear();
        if let Some(cursor) = self.cursor.take() {
            // The scan error wins over a release error.
            let _ = self.release(cursor).await;
        }
        err
    }

    /// Release the open cursor on `handle` without waiting for the answer.
    pub(crate) fn spawn_release(&mut self, handle: &Handle) {
        let Some(cursor) = self.cursor.take() else {
            return;
        };
        let table = self.table.clone();
        let timeout = self.settings.timeout;
        handle.spawn(async move {
            let request = StoreRequest::ClearScanner {
                context_id: cursor.context_id,
            };
            match table.call(cursor.partition, request, timeout).await {
                Ok(_) => debug!(partition = %cursor.partition, context_id = cursor.context_id, "scan cursor released on drop"),
                Err(e) => {
                    debug!(partition = %cursor.partition, error = %e, "scan cursor release on drop failed (will expire)")
                }
            }
        });
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        let Some(cursor) = self.cursor else {
            return;
        };

        // Best-effort release - the store expires idle cursors anyway
        match Handle::try_current() {
            Ok(handle) => self.spawn_release(&handle),
            Err(_) => {
                warn!(partition = %cursor.partition, context_id = cursor.context_id, "scanner dropped outside a runtime; cursor left to expire")
            }
        }
    }
}

fn decode(raw: RawEntry) -> Result<ScanItem, ClientError> {
    let (hash_key, sort_key) = decompose(&raw.key).map_err(|e| ClientError::invariant(format!("store returned a malformed key: {e}")))?;
    Ok(ScanItem {
        hash_key: hash_key.to_vec(),
        sort_key: sort_key.to_vec(),
        value: raw.value,
    })
}
