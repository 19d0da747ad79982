//! Centralized constants for the tessera client.
//!
//! Constants are fixed and immutable. Each one bounds a value that would
//! otherwise be unbounded on the wire or in memory.
//!
//! # Modules
//!
//! - [`api`]: Key and fetch bounds shared by every verb
//! - [`scan`]: Scanner defaults and server cursor sentinels
//! - [`timeouts`]: Default operation timeout
//!
//! # Usage
//!
//! ```
//! use tessera_constants::api::MAX_HASH_KEY_LEN;
//! use tessera_constants::scan::SCAN_CONTEXT_COMPLETED;
//! ```

pub mod api;
pub mod scan;
pub mod timeouts;

pub use api::DEFAULT_MAX_FETCH_COUNT;
pub use api::DEFAULT_MAX_FETCH_SIZE;
pub use api::DEFAULT_MULTI_REMOVE_MAX_COUNT;
pub use api::HASH_KEY_LEN_PREFIX_BYTES;
pub use api::MAX_HASH_KEY_LEN;
pub use scan::DEFAULT_SCAN_BATCH_SIZE;
pub use scan::SCAN_CONTEXT_COMPLETED;
pub use scan::SCAN_CONTEXT_NOT_EXIST;
pub use timeouts::DEFAULT_OPERATION_TIMEOUT_MS;
