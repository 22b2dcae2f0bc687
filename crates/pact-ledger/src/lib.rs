//! Write-once agreement ledger.
//!
//! [`AgreementLedger`] layers two invariants over a transaction-scoped
//! [`StateStore`](pact_store::StateStore):
//!
//! - `mint` writes a key only if it holds no agreement yet
//! - `fetch` reads a key only if it holds an agreement
//!
//! A stored value that is empty or whitespace-only counts as "no agreement"
//! for both checks. [`AgreementContract`] exposes the two operations by name
//! for hosts that dispatch invocations as strings.

pub mod contract;
pub mod error;
pub mod ledger;

pub use contract::{AgreementContract, Contract, ContractError, FunctionSpec, CONTRACT_NAME};
pub use error::{LedgerError, LedgerResult};
pub use ledger::{is_agreement_whitespace, is_blank, AgreementLedger, MINT_CONFIRMATION};
