//! Error type shared by the store, catalog and reconciliation layers.

use std::time::Duration;

use planetmans_core::{CoreError, RulesetId};

/// Errors that can occur while loading, reconciling or persisting rulesets.
#[derive(Debug, thiserror::Error)]
pub enum RulesetError {
    /// Requested ruleset id is absent from the store.
    #[error("ruleset {0} not found")]
    NotFound(RulesetId),

    /// Neither a custom-default nor a default-flagged ruleset exists.
    #[error("no custom default or default ruleset configured")]
    NoDefaultConfigured,

    /// Store rejected or failed a read or commit.
    #[error("store error: {0}")]
    Store(String),

    /// A category merge could not be computed; nothing was committed.
    #[error("reconciliation of ruleset {ruleset_id} failed: {reason}")]
    Reconcile { ruleset_id: RulesetId, reason: String },

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl RulesetError {
    /// True for I/O-class failures (everything except lookups that found nothing).
    pub fn is_store_failure(&self) -> bool {
        !matches!(self, RulesetError::NotFound(_) | RulesetError::NoDefaultConfigured)
    }
}

/// Result alias for ruleset operations.
pub type Result<T> = std::result::Result<T, RulesetError>;
