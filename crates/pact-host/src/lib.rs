//! Reference host for Pact contracts.
//!
//! The ledger itself never opens, commits or retries anything. This crate
//! plays the host's part: one transaction per invocation, commit on success,
//! discard on failure, and re-execution when a commit loses a race.

pub mod config;
pub mod error;
pub mod host;

pub use config::HostConfig;
pub use error::{HostError, HostResult};
pub use host::{ContractHost, InvocationOutcome};
