//! Transactional key-value state for the Pact agreement ledger.
//!
//! Contract logic never talks to a backend directly. It receives a
//! transaction-scoped [`StateStore`] handle, reads and writes through it, and
//! leaves commit or discard to whoever opened the transaction.
//!
//! # Concurrency
//!
//! Transactions are optimistic. Each [`Transaction`] records the version of
//! every key it reads and buffers its writes. At commit the backend checks,
//! under its write lock, that none of those versions moved; if one did the
//! commit fails with [`StoreError::Conflict`] and nothing is applied.
//!
//! # Backends
//!
//! - [`InMemoryStateStore`] -- `HashMap`-based store for tests and embedding
//! - [`JournalStateStore`] -- the same table, persisted as an append-only,
//!   CRC-framed journal and replayed on open

pub mod error;
pub mod journal;
pub mod memory;
pub mod table;
pub mod traits;
pub mod transaction;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use journal::{JournalConfig, JournalRecord, JournalStateStore};
pub use memory::InMemoryStateStore;
pub use traits::{StateStore, TransactionalStore};
pub use transaction::Transaction;
pub use types::{ChangeSet, CommitReceipt, Versioned};
