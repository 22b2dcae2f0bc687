use crate::error::StoreResult;
use crate::transaction::Transaction;
use crate::types::{ChangeSet, CommitReceipt, Versioned};

/// Transaction-scoped view of key-value state.
///
/// This is the only capability contract code is given. Reads take `&mut self`
/// because an implementation may need to record what was observed (see
/// [`Transaction`]).
pub trait StateStore {
    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key has never been written.
    fn get_state(&mut self, key: &str) -> StoreResult<Option<String>>;

    /// Write `value` under `key`.
    ///
    /// Whether and when the write becomes visible to others is up to the
    /// enclosing transaction.
    fn put_state(&mut self, key: &str, value: &str) -> StoreResult<()>;
}

/// A backend that can hand out optimistic transactions.
///
/// Implementations must make [`apply`](TransactionalStore::apply) atomic:
/// either every read in the change set still holds and every write is
/// installed, or nothing changes and a [`Conflict`](crate::StoreError::Conflict)
/// is returned.
pub trait TransactionalStore: Send + Sync {
    /// Read the latest committed value for `key`, with its version.
    fn read_committed(&self, key: &str) -> StoreResult<Option<Versioned>>;

    /// Validate the change set's reads and install its writes atomically.
    fn apply(&self, changes: ChangeSet) -> StoreResult<CommitReceipt>;

    /// Number of committed writing transactions.
    fn height(&self) -> StoreResult<u64>;

    /// Open a new transaction against this store.
    fn begin(&self) -> Transaction<'_>
    where
        Self: Sized,
    {
        Transaction::new(self)
    }
}
