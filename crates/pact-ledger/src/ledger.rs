use pact_store::StateStore;
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};

/// Returned by every successful [`AgreementLedger::mint`].
pub const MINT_CONFIRMATION: &str = "저장 완료";

/// Empty, or made only of [`is_agreement_whitespace`] characters.
pub fn is_blank(value: &str) -> bool {
    value.chars().all(is_agreement_whitespace)
}

/// Whitespace as agreement payloads have always been judged: space, line and
/// paragraph separators except the no-break ones (U+00A0, U+2007, U+202F),
/// the ASCII controls U+0009..U+000D, and the information separators
/// U+001C..U+001F. U+0085 is not whitespace here.
pub fn is_agreement_whitespace(c: char) -> bool {
    matches!(
        c,
        '\u{0009}'..='\u{000D}'
            | '\u{001C}'..='\u{001F}'
            | ' '
            | '\u{1680}'
            | '\u{2000}'..='\u{2006}'
            | '\u{2008}'..='\u{200A}'
            | '\u{2028}'
            | '\u{2029}'
            | '\u{205F}'
            | '\u{3000}'
    )
}

/// Mint-once, fetch-must-exist agreement storage.
///
/// The ledger holds no state of its own. Every call takes the caller's
/// transaction handle, performs one read and at most one write through it,
/// and never commits, discards or retries. Making the read-then-write atomic
/// is the transaction's job.
///
/// A stored value that [`is_blank`] is treated as absent: `fetch` rejects it
/// and `mint` overwrites it. This means a blank agreement can be written but
/// never durably held.
#[derive(Clone, Copy, Debug, Default)]
pub struct AgreementLedger;

impl AgreementLedger {
    pub fn new() -> Self {
        Self
    }

    /// Store `value` under `key` unless an agreement is already there.
    ///
    /// No validation is applied to `key` or `value`.
    pub fn mint<S>(&self, state: &mut S, key: &str, value: &str) -> LedgerResult<&'static str>
    where
        S: StateStore + ?Sized,
    {
        if let Some(existing) = state.get_state(key)? {
            if !is_blank(&existing) {
                debug!(key, "mint rejected: agreement exists");
                return Err(LedgerError::AlreadyExists {
                    key: key.to_string(),
                });
            }
        }
        state.put_state(key, value)?;
        debug!(key, len = value.len(), "agreement minted");
        Ok(MINT_CONFIRMATION)
    }

    /// Return the agreement stored under `key`, unchanged.
    pub fn fetch<S>(&self, state: &mut S, key: &str) -> LedgerResult<String>
    where
        S: StateStore + ?Sized,
    {
        match state.get_state(key)? {
            Some(value) if !is_blank(&value) => Ok(value),
            _ => {
                debug!(key, "fetch rejected: no agreement");
                Err(LedgerError::NotFound {
                    key: key.to_string(),
                })
            }
        }
    }
}
