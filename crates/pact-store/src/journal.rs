//! Durable state store backed by an append-only journal file.
//!
//! Every committed write set becomes one journal record. On-disk framing:
//!
//! ```text
//! [4 bytes: payload length (little-endian u32)]
//! [4 bytes: CRC32 of payload (little-endian u32)]
//! [N bytes: payload (bincode-serialized JournalRecord)]
//! ```
//!
//! Opening a journal replays it front to back into an in-memory table. Only
//! the last record can be torn by a crash: if it is cut short or fails its
//! checksum, replay stops there and the file is truncated back to the last
//! good record. A bad record with more data behind it is corruption, and
//! opening fails rather than dropping the records that follow.
//!
//! A failed append is rolled back to the previous end of file before the
//! error is returned, so a later commit never lands behind a partial frame.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::table::StateTable;
use crate::traits::TransactionalStore;
use crate::types::{ChangeSet, CommitReceipt, Versioned};

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// One committed write set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    pub height: u64,
    pub tx_id: Uuid,
    /// Commit time in milliseconds since the Unix epoch.
    pub committed_at_ms: i64,
    pub writes: Vec<(String, String)>,
}

/// Journal durability settings.
#[derive(Clone, Debug)]
pub struct JournalConfig {
    /// `fsync` after every commit. When off, records are flushed to the OS
    /// but may be lost on power failure.
    pub sync_on_commit: bool,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            sync_on_commit: true,
        }
    }
}

/// Writer state: the buffered file and the length of its intact prefix.
struct JournalWriter {
    writer: BufWriter<File>,
    offset: u64,
    /// Set when a rollback itself failed; the file end is then unknown.
    broken: bool,
}

impl JournalWriter {
    /// Drop whatever a failed append left behind and cut the file back to
    /// `offset`.
    fn rollback(&mut self) -> io::Result<()> {
        let file = self.writer.get_ref().try_clone()?;
        let stale = std::mem::replace(&mut self.writer, BufWriter::new(file));
        // Discard buffered bytes without the flush a plain drop would do.
        let _ = stale.into_parts();
        self.writer.get_ref().set_len(self.offset)?;
        Ok(())
    }
}

/// A [`TransactionalStore`] whose commits survive restarts.
pub struct JournalStateStore {
    path: PathBuf,
    table: RwLock<StateTable>,
    writer: Mutex<JournalWriter>,
    config: JournalConfig,
    #[cfg(test)]
    fail_next_append: AtomicBool,
}

impl JournalStateStore {
    /// Open (or create) the journal at `path` and replay it.
    pub fn open(path: &Path, config: JournalConfig) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        let mut table = StateTable::new();
        let (records, valid_len) = replay(&bytes)?;
        for record in &records {
            table.install(record.height, record.writes.iter().cloned());
        }

        if valid_len < bytes.len() as u64 {
            warn!(
                path = %path.display(),
                valid_len,
                file_len = bytes.len(),
                "discarding torn journal tail"
            );
            file.set_len(valid_len)?;
        }

        info!(
            path = %path.display(),
            records = records.len(),
            height = table.height(),
            "journal opened"
        );

        Ok(Self {
            path: path.to_path_buf(),
            table: RwLock::new(table),
            writer: Mutex::new(JournalWriter {
                writer: BufWriter::new(file),
                offset: valid_len,
                broken: false,
            }),
            config,
            #[cfg(test)]
            fail_next_append: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.table.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn append(&self, record: &JournalRecord) -> StoreResult<()> {
        let payload =
            bincode::serialize(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        frame.extend_from_slice(&payload);

        let mut w = self.writer.lock().map_err(|_| StoreError::LockPoisoned)?;
        if w.broken {
            return Err(StoreError::Io(io::Error::other(
                "journal end unknown after a failed rollback; reopen the store",
            )));
        }

        if let Err(e) = self.write_frame(&mut w.writer, &frame) {
            warn!(offset = w.offset, error = %e, "journal append failed, rolling back");
            if let Err(rollback) = w.rollback() {
                warn!(error = %rollback, "journal rollback failed");
                w.broken = true;
            }
            return Err(e.into());
        }

        w.offset += frame.len() as u64;
        debug!(height = record.height, len = payload.len(), "journal append");
        Ok(())
    }

    fn write_frame(&self, writer: &mut BufWriter<File>, frame: &[u8]) -> io::Result<()> {
        #[cfg(test)]
        {
            if self.fail_next_append.swap(false, Ordering::SeqCst) {
                writer.write_all(&frame[..frame.len() / 2])?;
                writer.flush()?;
                return Err(io::Error::other("injected append failure"));
            }
        }

        writer.write_all(frame)?;
        writer.flush()?;
        if self.config.sync_on_commit {
            writer.get_ref().sync_all()?;
        }
        Ok(())
    }
}

impl TransactionalStore for JournalStateStore {
    fn read_committed(&self, key: &str) -> StoreResult<Option<Versioned>> {
        let table = self.table.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(table.get(key).cloned())
    }

    fn apply(&self, changes: ChangeSet) -> StoreResult<CommitReceipt> {
        let mut table = self.table.write().map_err(|_| StoreError::LockPoisoned)?;
        table.validate(&changes.reads)?;

        let height = table.next_height(&changes.writes);
        let committed_at = Utc::now();
        let keys_written = changes.writes.len();

        if !changes.is_read_only() {
            let record = JournalRecord {
                height,
                tx_id: changes.tx_id,
                committed_at_ms: committed_at.timestamp_millis(),
                writes: changes.writes.into_iter().collect(),
            };
            // The table only changes once the record is on disk.
            self.append(&record)?;
            table.install(height, record.writes);
        }

        Ok(CommitReceipt {
            tx_id: changes.tx_id,
            height,
            keys_written,
            committed_at,
        })
    }

    fn height(&self) -> StoreResult<u64> {
        let table = self.table.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(table.height())
    }
}

impl std::fmt::Debug for JournalStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalStateStore")
            .field("path", &self.path)
            .field("key_count", &self.len())
            .finish()
    }
}

/// Decode every intact record. Returns the records and the byte length of
/// the intact prefix. A bad final record is a torn write and ends replay; a
/// bad record anywhere else is an error.
fn replay(bytes: &[u8]) -> StoreResult<(Vec<JournalRecord>, u64)> {
    let mut records = Vec::new();
    let mut offset = 0usize;

    while offset < bytes.len() {
        match decode_frame(bytes, offset) {
            Ok((record, next)) => {
                records.push(record);
                offset = next;
            }
            Err(e) if is_tail_frame(bytes, offset) => {
                warn!(offset, error = %e, "journal replay stopped at torn tail");
                break;
            }
            Err(e) => return Err(e),
        }
    }

    debug!(recovered = records.len(), "journal replay complete");
    Ok((records, offset as u64))
}

/// Whether the frame at `offset` reaches (or runs past) the end of the file.
fn is_tail_frame(bytes: &[u8], offset: usize) -> bool {
    match bytes.get(offset..offset + HEADER_SIZE) {
        Some(header) => {
            let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
            offset + HEADER_SIZE + length >= bytes.len()
        }
        None => true,
    }
}

fn decode_frame(bytes: &[u8], offset: usize) -> StoreResult<(JournalRecord, usize)> {
    let truncated = || StoreError::TruncatedRecord {
        offset: offset as u64,
    };

    let header = bytes
        .get(offset..offset + HEADER_SIZE)
        .ok_or_else(truncated)?;
    let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let expected = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

    let start = offset + HEADER_SIZE;
    let payload = bytes.get(start..start + length).ok_or_else(truncated)?;

    let computed = crc32fast::hash(payload);
    if computed != expected {
        return Err(StoreError::CrcMismatch {
            offset: offset as u64,
            expected,
            computed,
        });
    }

    let record: JournalRecord =
        bincode::deserialize(payload).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok((record, start + length))
}

impl JournalRecord {
    pub fn committed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.committed_at_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::StateStore;
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> JournalStateStore {
        JournalStateStore::open(&dir.path().join("state.journal"), JournalConfig::default())
            .unwrap()
    }

    fn put(store: &JournalStateStore, key: &str, value: &str) {
        let mut tx = store.begin();
        tx.put_state(key, value).unwrap();
        tx.commit().unwrap();
    }

    #[test]
    fn fresh_journal_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        assert!(store.is_empty());
        assert_eq!(store.height().unwrap(), 0);
        assert!(store.path().exists());
    }

    #[test]
    fn commits_survive_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = open(&dir);
            put(&store, "contract-1", "terms:a");
            put(&store, "contract-2", "terms:b");
        }
        let store = open(&dir);
        assert_eq!(store.height().unwrap(), 2);
        let v = store.read_committed("contract-2").unwrap().unwrap();
        assert_eq!(v.value, "terms:b");
        assert_eq!(v.version, 2);
    }

    #[test]
    fn read_only_commit_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let mut tx = store.begin();
        tx.get_state("k").unwrap();
        tx.commit().unwrap();
        assert_eq!(fs::metadata(store.path()).unwrap().len(), 0);
    }

    #[test]
    fn conflict_is_not_journaled() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        let mut a = store.begin();
        let mut b = store.begin();
        a.get_state("k").unwrap();
        b.get_state("k").unwrap();
        a.put_state("k", "a").unwrap();
        b.put_state("k", "b").unwrap();
        a.commit().unwrap();
        assert!(b.commit().unwrap_err().is_conflict());
        drop(store);

        let store = open(&dir);
        assert_eq!(store.height().unwrap(), 1);
        assert_eq!(store.read_committed("k").unwrap().unwrap().value, "a");
    }

    #[test]
    fn torn_tail_is_dropped_and_appends_continue() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.journal");
        {
            let store = open(&dir);
            put(&store, "a", "1");
        }
        let good_len = fs::metadata(&path).unwrap().len();
        {
            let mut f = OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(&[42, 0, 0, 0, 1, 2]).unwrap();
        }

        {
            let store = open(&dir);
            assert_eq!(fs::metadata(&path).unwrap().len(), good_len);
            assert_eq!(store.height().unwrap(), 1);
            put(&store, "b", "2");
        }

        let store = open(&dir);
        assert_eq!(store.height().unwrap(), 2);
        assert_eq!(store.read_committed("b").unwrap().unwrap().value, "2");
    }

    #[test]
    fn corrupt_payload_fails_checksum() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.journal");
        {
            let store = open(&dir);
            put(&store, "a", "1");
        }
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;

        let err = decode_frame(&bytes, 0).unwrap_err();
        assert!(matches!(err, StoreError::CrcMismatch { offset: 0, .. }));

        fs::write(&path, &bytes).unwrap();
        let store = open(&dir);
        assert!(store.is_empty());
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn failed_append_is_rolled_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.journal");
        {
            let store = open(&dir);
            put(&store, "a", "1");
            let len_after_a = fs::metadata(&path).unwrap().len();

            store.fail_next_append.store(true, Ordering::SeqCst);
            let mut tx = store.begin();
            tx.put_state("big", &"x".repeat(12 * 1024)).unwrap();
            assert!(matches!(tx.commit().unwrap_err(), StoreError::Io(_)));
            assert_eq!(fs::metadata(&path).unwrap().len(), len_after_a);
            assert_eq!(store.read_committed("big").unwrap(), None);

            put(&store, "small", "acknowledged");
            assert_eq!(store.height().unwrap(), 2);
        }

        let store = open(&dir);
        assert_eq!(store.height().unwrap(), 2);
        assert_eq!(store.read_committed("big").unwrap(), None);
        assert_eq!(
            store.read_committed("small").unwrap().unwrap().value,
            "acknowledged"
        );
    }

    #[test]
    fn corrupt_middle_record_fails_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.journal");
        let first_len;
        {
            let store = open(&dir);
            put(&store, "a", "1");
            first_len = fs::metadata(&path).unwrap().len() as usize;
            put(&store, "b", "2");
        }
        let mut bytes = fs::read(&path).unwrap();
        bytes[first_len - 1] ^= 0xff;
        fs::write(&path, &bytes).unwrap();

        let err = JournalStateStore::open(&path, JournalConfig::default()).unwrap_err();
        assert!(matches!(err, StoreError::CrcMismatch { offset: 0, .. }));
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn short_header_is_truncated_record() {
        let err = decode_frame(&[1, 2, 3], 0).unwrap_err();
        assert!(matches!(err, StoreError::TruncatedRecord { offset: 0 }));
    }

    #[test]
    fn record_timestamp_round_trips() {
        let now = Utc::now();
        let record = JournalRecord {
            height: 1,
            tx_id: Uuid::now_v7(),
            committed_at_ms: now.timestamp_millis(),
            writes: vec![],
        };
        assert_eq!(
            record.committed_at().unwrap().timestamp_millis(),
            now.timestamp_millis()
        );
    }
}
