use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A committed value together with the height of the commit that wrote it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned {
    pub value: String,
    pub version: u64,
}

/// Everything a transaction hands to its backend at commit time.
///
/// `reads` maps each key the transaction observed to the version it saw
/// (`None` when the key was absent). `writes` holds the buffered puts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub tx_id: Uuid,
    pub reads: BTreeMap<String, Option<u64>>,
    pub writes: BTreeMap<String, String>,
}

impl ChangeSet {
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Proof of a successful commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitReceipt {
    pub tx_id: Uuid,
    /// Store height after the commit. Unchanged for read-only transactions.
    pub height: u64,
    pub keys_written: usize,
    pub committed_at: DateTime<Utc>,
}
