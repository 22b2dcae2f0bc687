use std::collections::BTreeMap;

use tracing::debug;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::traits::{StateStore, TransactionalStore};
use crate::types::{ChangeSet, CommitReceipt};

/// An optimistic transaction over a [`TransactionalStore`].
///
/// Reads go to committed state (or to this transaction's own buffered
/// writes) and the observed version is remembered. Writes are buffered and
/// only become visible when [`commit`](Transaction::commit) succeeds.
/// Dropping a transaction without committing discards it.
pub struct Transaction<'a> {
    store: &'a dyn TransactionalStore,
    id: Uuid,
    reads: BTreeMap<String, Option<u64>>,
    writes: BTreeMap<String, String>,
}

impl<'a> Transaction<'a> {
    pub fn new(store: &'a dyn TransactionalStore) -> Self {
        Self {
            store,
            id: Uuid::now_v7(),
            reads: BTreeMap::new(),
            writes: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Keys read from committed state so far.
    pub fn read_keys(&self) -> impl Iterator<Item = &str> {
        self.reads.keys().map(String::as_str)
    }

    /// Buffered writes, in key order.
    pub fn pending_writes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.writes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }

    /// Validate and apply this transaction's writes.
    pub fn commit(self) -> StoreResult<CommitReceipt> {
        let changes = ChangeSet {
            tx_id: self.id,
            reads: self.reads,
            writes: self.writes,
        };
        let receipt = self.store.apply(changes)?;
        debug!(
            tx = %receipt.tx_id,
            height = receipt.height,
            keys = receipt.keys_written,
            "transaction committed"
        );
        Ok(receipt)
    }

    /// Abandon the transaction. Nothing it wrote becomes visible.
    pub fn discard(self) {
        debug!(tx = %self.id, pending = self.writes.len(), "transaction discarded");
    }
}

impl StateStore for Transaction<'_> {
    fn get_state(&mut self, key: &str) -> StoreResult<Option<String>> {
        if let Some(value) = self.writes.get(key) {
            return Ok(Some(value.clone()));
        }
        let committed = self.store.read_committed(key)?;
        self.reads
            .entry(key.to_string())
            .or_insert_with(|| committed.as_ref().map(|v| v.version));
        Ok(committed.map(|v| v.value))
    }

    fn put_state(&mut self, key: &str, value: &str) -> StoreResult<()> {
        self.writes.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("reads", &self.reads.len())
            .field("writes", &self.writes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::memory::InMemoryStateStore;

    #[test]
    fn writes_are_invisible_until_commit() {
        let store = InMemoryStateStore::new();
        let mut tx = store.begin();
        tx.put_state("k", "v").unwrap();

        let mut other = store.begin();
        assert_eq!(other.get_state("k").unwrap(), None);

        tx.commit().unwrap();
        let mut after = store.begin();
        assert_eq!(after.get_state("k").unwrap(), Some("v".into()));
    }

    #[test]
    fn reads_own_writes() {
        let store = InMemoryStateStore::new();
        let mut tx = store.begin();
        tx.put_state("k", "mine").unwrap();
        assert_eq!(tx.get_state("k").unwrap(), Some("mine".into()));
        assert_eq!(tx.read_keys().count(), 0);
    }

    #[test]
    fn discard_leaves_no_trace() {
        let store = InMemoryStateStore::new();
        let mut tx = store.begin();
        tx.put_state("k", "v").unwrap();
        tx.discard();
        assert!(store.is_empty());
        assert_eq!(store.height().unwrap(), 0);
    }

    #[test]
    fn read_then_write_race_conflicts() {
        let store = InMemoryStateStore::new();
        let mut first = store.begin();
        let mut second = store.begin();

        assert_eq!(first.get_state("k").unwrap(), None);
        assert_eq!(second.get_state("k").unwrap(), None);
        first.put_state("k", "a").unwrap();
        second.put_state("k", "b").unwrap();

        first.commit().unwrap();
        let err = second.commit().unwrap_err();
        assert!(matches!(err, StoreError::Conflict { ref key } if key == "k"));

        let mut check = store.begin();
        assert_eq!(check.get_state("k").unwrap(), Some("a".into()));
    }

    #[test]
    fn blind_writes_do_not_conflict() {
        let store = InMemoryStateStore::new();
        let mut first = store.begin();
        let mut second = store.begin();
        first.put_state("k", "a").unwrap();
        second.put_state("k", "b").unwrap();
        first.commit().unwrap();
        second.commit().unwrap();
        assert_eq!(store.height().unwrap(), 2);
    }

    #[test]
    fn disjoint_keys_commit_independently() {
        let store = InMemoryStateStore::new();
        let mut a = store.begin();
        let mut b = store.begin();
        a.get_state("a").unwrap();
        b.get_state("b").unwrap();
        a.put_state("a", "1").unwrap();
        b.put_state("b", "2").unwrap();
        a.commit().unwrap();
        b.commit().unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn read_only_commit_does_not_advance_height() {
        let store = InMemoryStateStore::new();
        let mut tx = store.begin();
        tx.get_state("missing").unwrap();
        assert!(tx.is_read_only());
        let receipt = tx.commit().unwrap();
        assert_eq!(receipt.height, 0);
        assert_eq!(receipt.keys_written, 0);
    }
}
