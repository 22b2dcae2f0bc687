use std::sync::RwLock;

use chrono::Utc;

use crate::error::{StoreError, StoreResult};
use crate::table::StateTable;
use crate::traits::TransactionalStore;
use crate::types::{ChangeSet, CommitReceipt, Versioned};

/// In-memory, HashMap-based state store.
///
/// Intended for tests and embedding. State lives behind a `RwLock`; commits
/// take the write lock for validation and installation together, so two
/// transactions that read the same key can never both commit a write to it.
pub struct InMemoryStateStore {
    table: RwLock<StateTable>,
}

impl InMemoryStateStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            table: RwLock::new(StateTable::new()),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.table.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no key has been written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionalStore for InMemoryStateStore {
    fn read_committed(&self, key: &str) -> StoreResult<Option<Versioned>> {
        let table = self.table.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(table.get(key).cloned())
    }

    fn apply(&self, changes: ChangeSet) -> StoreResult<CommitReceipt> {
        let mut table = self.table.write().map_err(|_| StoreError::LockPoisoned)?;
        table.validate(&changes.reads)?;

        let height = table.next_height(&changes.writes);
        let keys_written = changes.writes.len();
        table.install(height, changes.writes);

        Ok(CommitReceipt {
            tx_id: changes.tx_id,
            height,
            keys_written,
            committed_at: Utc::now(),
        })
    }

    fn height(&self) -> StoreResult<u64> {
        let table = self.table.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(table.height())
    }
}

impl std::fmt::Debug for InMemoryStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStateStore")
            .field("key_count", &self.len())
            .finish()
    }
}
