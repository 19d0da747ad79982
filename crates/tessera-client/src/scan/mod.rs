//! Range scans: planning and the cursor-owning [`Scanner`].

mod planner;
mod scanner;

pub use planner::plan_range;
pub use planner::split_partitions;
pub use scanner::Scanner;
use scanner::ScanSettings;
use tessera_core::ClientError;
use tessera_core::ScanOptions;
use tessera_core::ScanRange;
use tessera_core::ScanSpec;
use tessera_core::validation::validate_hash_key;
use tracing::debug;

use crate::table::Table;

impl Table {
    /// Scanner over the sort-keys of `hash_key` between `start_sort_key` and
    /// `stop_sort_key`; an empty bound is open.
    ///
    /// Only plans the range; the first remote call happens on the first
    /// [`Scanner::next`]. An empty range yields a scanner that is exhausted
    /// without any remote call.
    pub fn get_scanner(
        &self,
        hash_key: &[u8],
        start_sort_key: &[u8],
        stop_sort_key: &[u8],
        options: &ScanOptions,
    ) -> Result<Scanner, ClientError> {
        validate_hash_key(hash_key)?;
        let options = self.resolve_scan_options(options);
        let spec = ScanSpec::new(
            hash_key,
            (!start_sort_key.is_empty()).then(|| start_sort_key.to_vec()),
            (!stop_sort_key.is_empty()).then(|| stop_sort_key.to_vec()),
            &options,
        );
        let range = plan_range(&spec, self.transport().route(hash_key))?;
        debug!(
            table = self.table_name(),
            partitions = range.partitions.len(),
            "built ordered scanner"
        );
        Ok(Scanner::new(self.clone(), range, scan_settings(&options)))
    }

    /// Split every partition of the table into at most `max_split_count`
    /// scanners that together cover the whole table once.
    ///
    /// Order across scanners is unspecified. Only the timeout, batch size,
    /// value suppression and sort-key filter of `options` apply.
    pub fn get_unordered_scanners(
        &self,
        max_split_count: usize,
        options: &ScanOptions,
    ) -> Result<Vec<Scanner>, ClientError> {
        let partitions = self.transport().all_partitions();
        let groups = split_partitions(&partitions, max_split_count)?;
        let settings = scan_settings(&self.resolve_scan_options(&options.for_unordered()));
        debug!(
            table = self.table_name(),
            partitions = partitions.len(),
            scanners = groups.len(),
            "built unordered scanners"
        );
        Ok(groups
            .into_iter()
            .map(|group| Scanner::new(self.clone(), ScanRange::full(group), settings.clone()))
            .collect())
    }

    /// `options` with a zero timeout or batch size replaced by the table
    /// defaults.
    fn resolve_scan_options(&self, options: &ScanOptions) -> ScanOptions {
        let batch_size = if options.batch_size == 0 {
            self.config().scan_batch_size
        } else {
            options.batch_size
        };
        ScanOptions {
            timeout: self.config().effective_timeout(options.timeout),
            batch_size,
            ..options.clone()
        }
    }
}

fn scan_settings(options: &ScanOptions) -> ScanSettings {
    ScanSettings {
        timeout: options.timeout,
        batch_size: options.batch_size,
        no_value: options.no_value,
        sort_key_filter_type: options.sort_key_filter_type,
        sort_key_filter_pattern: options.sort_key_filter_pattern.clone(),
        reverse: options.reverse,
    }
}
