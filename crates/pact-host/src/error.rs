use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error(transparent)]
    Contract(#[from] pact_ledger::ContractError),

    #[error("store error: {0}")]
    Store(#[from] pact_store::StoreError),

    #[error("{function} still conflicting after {attempts} attempt(s)")]
    RetriesExhausted { function: String, attempts: u32 },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HostError {
    /// The agreement key a business-rule failure refers to.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Contract(pact_ledger::ContractError::Ledger(e)) => e.key(),
            _ => None,
        }
    }
}

pub type HostResult<T> = Result<T, HostError>;
