//! Testing infrastructure for the tessera client.
//!
//! - [`DeterministicTransport`]: an in-memory, partitioned store behind the
//!   [`Transport`](tessera_core::Transport) trait, with latency and fault
//!   injection and a log of every call it received.
//!
//! # Usage
//!
//! ```ignore
//! let transport = DeterministicTransport::new("users", 8);
//! transport.delay_hash_key(b"slow", Duration::from_millis(50));
//! transport.fail_hash_key(b"broken", RemoteErrorCode::NetworkFailure);
//!
//! let table = Table::new(transport.clone(), ClientConfig::default());
//! table.set(b"user", b"name", b"ada", Duration::ZERO).await?;
//! assert_eq!(transport.call_count(), 1);
//! ```

mod transport;

pub use transport::DeterministicTransport;
pub use transport::RecordedCall;
