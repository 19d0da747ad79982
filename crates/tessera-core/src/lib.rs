//! Core types for the tessera client.
//!
//! This crate holds everything the client shares with transports and test
//! doubles, with no runtime dependency:
//!
//! - [`key`]: compound key codec (compose, decompose, successor)
//! - [`error`]: the client error taxonomy
//! - [`entry`], [`options`], [`scan`], [`partition`]: value types
//! - [`request`]: store verbs and responses
//! - [`traits`]: the [`Transport`] seam
//! - [`validation`]: argument checks run before dispatch

pub mod entry;
pub mod error;
pub mod key;
pub mod options;
pub mod partition;
pub mod request;
pub mod scan;
pub mod traits;
pub mod validation;

pub use entry::HashKeyData;
pub use entry::KeyValueEntry;
pub use entry::MultiGetResult;
pub use entry::MultiGetSortKeysResult;
pub use entry::SetItem;
pub use error::ClientError;
pub use error::ErrorKind;
pub use error::RemoteErrorCode;
pub use key::compare_bytes;
pub use key::compose;
pub use key::decompose;
pub use key::successor;
pub use key::successor_with_prefix;
pub use options::FilterType;
pub use options::MultiGetOptions;
pub use options::ScanOptions;
pub use partition::PartitionId;
pub use request::GetScannerRequest;
pub use request::MultiGetRequest;
pub use request::RawEntry;
pub use request::ResponseBody;
pub use request::StoreRequest;
pub use request::StoreResponse;
pub use request::StoreStatus;
pub use request::TTL_NO_EXPIRE;
pub use request::TTL_NOT_FOUND;
pub use request::Verb;
pub use scan::ScanItem;
pub use scan::ScanRange;
pub use scan::ScanSpec;
pub use traits::Transport;
