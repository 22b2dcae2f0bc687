use pact_store::StoreError;

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// `mint` found a non-blank agreement already stored under the key.
    #[error("agreement already exists: {key}")]
    AlreadyExists { key: String },

    /// `fetch` found no agreement, or only a blank one, under the key.
    #[error("agreement does not exist: {key}")]
    NotFound { key: String },

    /// The underlying store failed. Passed through unclassified.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// The key a business-rule failure refers to.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::AlreadyExists { key } | Self::NotFound { key } => Some(key),
            Self::Store(_) => None,
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
