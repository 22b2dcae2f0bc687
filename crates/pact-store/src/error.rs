/// Errors from state store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A key read by the transaction was changed by a concurrent commit.
    #[error("write conflict on key {key}: state changed since it was read")]
    Conflict { key: String },

    /// I/O error from the journal file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A journal record failed its CRC check.
    #[error("journal checksum mismatch at offset {offset}: expected {expected:#010x}, computed {computed:#010x}")]
    CrcMismatch {
        offset: u64,
        expected: u32,
        computed: u32,
    },

    /// A journal record ends past the end of the file.
    #[error("truncated journal record at offset {offset}")]
    TruncatedRecord { offset: u64 },

    /// The state lock was poisoned by a panicking writer.
    #[error("state lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Whether re-running the whole unit of work may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
