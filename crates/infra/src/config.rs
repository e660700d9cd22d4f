//! Configuration loading and representation.

use std::path::{Path, PathBuf};

use thiserror::Error;

use charityfund_core::AccountId;

use crate::event_store::{EventStoreError, InMemoryEventStore, JournalStore, JsonFileEventStore};

pub const ADMINISTRATOR_VAR: &str = "CHARITYFUND_ADMINISTRATOR";
pub const JOURNAL_VAR: &str = "CHARITYFUND_JOURNAL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundConfig {
    /// The single privileged identity; fixed for the lifetime of the ledger.
    pub administrator: AccountId,
    /// JSON-lines journal; `None` keeps the journal in memory.
    pub journal_path: Option<PathBuf>,
}

impl FundConfig {
    pub fn new(administrator: AccountId) -> Self {
        Self {
            administrator,
            journal_path: None,
        }
    }

    pub fn with_journal(mut self, path: impl Into<PathBuf>) -> Self {
        self.journal_path = Some(path.into());
        self
    }

    /// Read `CHARITYFUND_ADMINISTRATOR` (required) and `CHARITYFUND_JOURNAL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw = lookup(ADMINISTRATOR_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(ADMINISTRATOR_VAR))?;
        let administrator = raw.trim().parse::<AccountId>().map_err(|e| ConfigError::Invalid {
            var: ADMINISTRATOR_VAR,
            reason: e.to_string(),
        })?;

        let journal_path = lookup(JOURNAL_VAR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            administrator,
            journal_path,
        })
    }

    pub fn journal_path(&self) -> Option<&Path> {
        self.journal_path.as_deref()
    }

    /// Build the journal backend this configuration selects.
    pub fn open_store(&self) -> Result<JournalStore, EventStoreError> {
        match &self.journal_path {
            Some(path) => Ok(JournalStore::File(JsonFileEventStore::open(path)?)),
            None => Ok(JournalStore::InMemory(InMemoryEventStore::new())),
        }
    }
}
