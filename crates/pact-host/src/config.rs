use std::path::{Path, PathBuf};

use pact_store::JournalConfig;
use serde::{Deserialize, Serialize};

use crate::error::{HostError, HostResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Re-executions allowed after a commit conflict. Must be at least 1:
    /// the loser of a same-key `mint` race only learns that the key exists
    /// by re-executing, so with 0 it would get `RetriesExhausted` instead of
    /// `AlreadyExists`.
    pub max_commit_retries: u32,
    pub journal_path: PathBuf,
    pub sync_on_commit: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_commit_retries: 3,
            journal_path: PathBuf::from("pact.journal"),
            sync_on_commit: true,
        }
    }
}

impl HostConfig {
    pub fn from_toml_str(s: &str) -> HostResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| HostError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> HostResult<()> {
        if self.max_commit_retries == 0 {
            return Err(HostError::Config(
                "max_commit_retries must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn load(path: &Path) -> HostResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn journal_config(&self) -> JournalConfig {
        JournalConfig {
            sync_on_commit: self.sync_on_commit,
        }
    }
}
