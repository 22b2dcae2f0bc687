use pact_ledger::{AgreementContract, Contract};
use pact_store::{CommitReceipt, JournalStateStore, TransactionalStore};
use tracing::{debug, info, info_span, warn};

use crate::config::HostConfig;
use crate::error::{HostError, HostResult};

/// Result of a committed invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationOutcome {
    /// What the contract function returned.
    pub payload: String,
    pub receipt: CommitReceipt,
    /// Executions it took, including the one that committed.
    pub attempts: u32,
}

/// Runs contract invocations, each in its own transaction.
///
/// A contract error discards the transaction and is returned as-is; it is
/// never retried. A commit conflict re-executes the whole invocation in a
/// fresh transaction, up to `max_commit_retries` times, so the loser of a
/// race sees the winner's state on its next run.
pub struct ContractHost<S, C = AgreementContract> {
    store: S,
    contract: C,
    max_commit_retries: u32,
}

impl<S: TransactionalStore> ContractHost<S, AgreementContract> {
    pub fn new(store: S) -> Self {
        Self::with_contract(store, AgreementContract::new())
    }
}

impl ContractHost<JournalStateStore, AgreementContract> {
    /// Open the journal named by `config` and host the agreement contract on it.
    pub fn open(config: &HostConfig) -> HostResult<Self> {
        config.validate()?;
        let store = JournalStateStore::open(&config.journal_path, config.journal_config())?;
        Ok(Self::new(store).with_max_commit_retries(config.max_commit_retries))
    }
}

impl<S: TransactionalStore, C: Contract> ContractHost<S, C> {
    pub fn with_contract(store: S, contract: C) -> Self {
        Self {
            store,
            contract,
            max_commit_retries: HostConfig::default().max_commit_retries,
        }
    }

    /// Set how many times a conflicting invocation is re-executed. With 0 a
    /// commit conflict is reported as `RetriesExhausted` even when a rerun
    /// would have ended in a contract error; configuration files reject 0.
    pub fn with_max_commit_retries(mut self, retries: u32) -> Self {
        self.max_commit_retries = retries;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn contract(&self) -> &C {
        &self.contract
    }

    /// Invoke `function` on the hosted contract and commit its writes.
    pub fn invoke(&self, function: &str, args: &[String]) -> HostResult<InvocationOutcome> {
        let _span = info_span!("invoke", contract = self.contract.name(), function).entered();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let mut tx = self.store.begin();
            let tx_id = tx.id();

            let payload = match self.contract.invoke(&mut tx, function, args) {
                Ok(payload) => payload,
                Err(e) => {
                    tx.discard();
                    debug!(tx = %tx_id, error = %e, "invocation failed");
                    return Err(e.into());
                }
            };

            match tx.commit() {
                Ok(receipt) => {
                    info!(tx = %tx_id, height = receipt.height, attempts, "invocation committed");
                    return Ok(InvocationOutcome {
                        payload,
                        receipt,
                        attempts,
                    });
                }
                Err(e) if e.is_conflict() && attempts <= self.max_commit_retries => {
                    debug!(tx = %tx_id, attempts, error = %e, "commit conflict, re-executing");
                }
                Err(e) if e.is_conflict() => {
                    warn!(tx = %tx_id, attempts, "commit conflict retries exhausted");
                    return Err(HostError::RetriesExhausted {
                        function: function.to_string(),
                        attempts,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn mint(&self, key: &str, value: &str) -> HostResult<InvocationOutcome> {
        self.invoke("mint", &[key.to_string(), value.to_string()])
    }

    pub fn fetch(&self, key: &str) -> HostResult<InvocationOutcome> {
        self.invoke("fetch", &[key.to_string()])
    }
}
