//! The versioned key table shared by every backend.

use std::collections::{BTreeMap, HashMap};

use crate::error::{StoreError, StoreResult};
use crate::types::Versioned;

#[derive(Debug, Default)]
pub struct StateTable {
    entries: HashMap<String, Versioned>,
    height: u64,
}

impl StateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Versioned> {
        self.entries.get(key)
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check that every observed version still matches committed state.
    pub fn validate(&self, reads: &BTreeMap<String, Option<u64>>) -> StoreResult<()> {
        for (key, observed) in reads {
            let current = self.entries.get(key).map(|v| v.version);
            if current != *observed {
                return Err(StoreError::Conflict { key: key.clone() });
            }
        }
        Ok(())
    }

    /// Height the next commit of `writes` would land at.
    pub fn next_height(&self, writes: &BTreeMap<String, String>) -> u64 {
        if writes.is_empty() {
            self.height
        } else {
            self.height + 1
        }
    }

    /// Install writes at `height`. Callers validate first.
    pub fn install<I>(&mut self, height: u64, writes: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in writes {
            self.entries.insert(
                key,
                Versioned {
                    value,
                    version: height,
                },
            );
        }
        self.height = self.height.max(height);
    }
}
