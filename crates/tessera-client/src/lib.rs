//! Client for the tessera partitioned hash-key/sort-key store.
//!
//! A [`Table`] turns logical operations into partition-routed calls on a
//! [`Transport`](tessera_core::Transport):
//!
//! - single-key verbs: `get`, `set`, `set_with_ttl`, `del`, `ttl`, `exist`,
//!   `sort_key_count`
//! - multi-value verbs under one hash-key: `multi_get`, `multi_get_range`,
//!   `multi_get_sort_keys`, `multi_set`, `multi_del`
//! - batches of either, fail-fast (`batch_*`) or collect-all
//!   (`batch_*_collect`), dispatched concurrently
//! - scans: `get_scanner` over one hash-key, `get_unordered_scanners` over
//!   the whole table
//!
//! [`BlockingTable`] wraps a `Table` for synchronous callers.
//!
//! # Example
//!
//! ```ignore
//! let table = Table::new(transport, ClientConfig::load()?);
//! table.set(b"user:1", b"name", b"ada", Duration::ZERO).await?;
//!
//! let mut scanner = table.get_scanner(b"user:1", b"", b"", &ScanOptions::default())?;
//! while let Some(item) = scanner.next().await? {
//!     println!("{:?} = {:?}", item.sort_key, item.value);
//! }
//! ```

mod batch;
mod blocking;
mod config;
mod multi;
mod scan;
mod table;

pub use batch::BatchResults;
pub use batch::HashKeySortKeys;
pub use batch::KeyPair;
pub use blocking::BlockingScanner;
pub use blocking::BlockingTable;
pub use config::ClientConfig;
pub use config::ConfigError;
pub use multi::FetchLimits;
pub use scan::Scanner;
pub use scan::plan_range;
pub use scan::split_partitions;
pub use table::Table;
