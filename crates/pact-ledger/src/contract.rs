//! Named-function dispatch for hosts that invoke contracts by string.

use pact_store::StateStore;
use serde::Serialize;

use crate::error::LedgerError;
use crate::ledger::AgreementLedger;

/// Name under which [`AgreementContract`] is registered.
pub const CONTRACT_NAME: &str = "FounderzContract";

/// Errors from routing an invocation to a contract function.
#[derive(Debug, thiserror::Error)]
pub enum ContractError {
    #[error("unknown function: {function}")]
    UnknownFunction { function: String },

    #[error("{function} expects {expected} argument(s), got {actual}")]
    Arity {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Description of one invocable function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub params: &'static [&'static str],
}

/// A contract a host can invoke by function name.
pub trait Contract: Send + Sync {
    fn name(&self) -> &str;

    fn functions(&self) -> &[FunctionSpec];

    /// Run `function` with `args` against the caller's transaction.
    fn invoke(
        &self,
        state: &mut dyn StateStore,
        function: &str,
        args: &[String],
    ) -> Result<String, ContractError>;
}

const FUNCTIONS: &[FunctionSpec] = &[
    FunctionSpec {
        name: "mint",
        params: &["key", "value"],
    },
    FunctionSpec {
        name: "fetch",
        params: &["key"],
    },
];

/// [`AgreementLedger`] exposed as `mint(key, value)` and `fetch(key)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct AgreementContract {
    ledger: AgreementLedger,
}

impl AgreementContract {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Contract for AgreementContract {
    fn name(&self) -> &str {
        CONTRACT_NAME
    }

    fn functions(&self) -> &[FunctionSpec] {
        FUNCTIONS
    }

    fn invoke(
        &self,
        state: &mut dyn StateStore,
        function: &str,
        args: &[String],
    ) -> Result<String, ContractError> {
        let spec = FUNCTIONS
            .iter()
            .find(|f| f.name == function)
            .ok_or_else(|| ContractError::UnknownFunction {
                function: function.to_string(),
            })?;
        if args.len() != spec.params.len() {
            return Err(ContractError::Arity {
                function: function.to_string(),
                expected: spec.params.len(),
                actual: args.len(),
            });
        }

        match (spec.name, args) {
            ("mint", [key, value]) => Ok(self.ledger.mint(state, key, value)?.to_string()),
            ("fetch", [key]) => Ok(self.ledger.fetch(state, key)?),
            _ => Err(ContractError::UnknownFunction {
                function: function.to_string(),
            }),
        }
    }
}
