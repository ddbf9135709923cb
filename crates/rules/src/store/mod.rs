//! Persistence interface for rulesets and its two implementations.
//!
//! A store keeps ruleset headers, their rule rows and the "currently active
//! id" marker. Reconciliation results are written through
//! [`RulesetStore::commit_reconciliation`], which applies a whole
//! [`ReconcilePlan`] or nothing.

mod file;
mod memory;
mod watcher;


pub use file::FileRulesetStore;
pub use memory::MemoryRulesetStore;

use async_trait::async_trait;

use planetmans_core::{RuleSet, Ruleset, RulesetId, RulesetInfo};

use crate::error::{Result, RulesetError};
use crate::reconcile::ChangeSet;

/// Header to upsert together with the rule changes of one reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub info: RulesetInfo,
    pub changes: ChangeSet,
}

impl ReconcilePlan {
    pub fn new(info: RulesetInfo, changes: ChangeSet) -> Self {
        Self { info, changes }
    }

    pub fn ruleset_id(&self) -> RulesetId {
        self.info.id
    }

    /// Build the ruleset that results from applying this plan to `existing`.
    ///
    /// A missing ruleset starts out with no rows. Any conflict between the
    /// changes and the existing rows rejects the whole plan.
    pub fn apply(&self, existing: Option<&Ruleset>) -> Result<Ruleset> {
        let empty = RuleSet::default();
        let current = existing.map(|r| &r.rules).unwrap_or(&empty);
        let rules = self.changes.apply_to(current).map_err(|reason| {
            RulesetError::Store(format!(
                "rejected commit for ruleset {}: {reason}",
                self.info.id
            ))
        })?;
        Ok(Ruleset {
            info: self.info.clone(),
            rules,
        })
    }
}

/// Narrow read/write interface the engine needs from persistent storage.
///
/// Flag queries return the lowest-id match when several rulesets carry the
/// same flag.
#[async_trait]
pub trait RulesetStore: Send + Sync {
    /// Stored header and rows of `id`, as persisted (not reconciled).
    async fn fetch_ruleset(&self, id: RulesetId) -> Result<Option<Ruleset>>;

    async fn fetch_default_flagged(&self) -> Result<Option<Ruleset>>;

    async fn fetch_custom_default_flagged(&self) -> Result<Option<Ruleset>>;

    /// Every stored ruleset, ordered by id.
    async fn list_all(&self) -> Result<Vec<Ruleset>>;

    async fn set_active_id(&self, id: RulesetId) -> Result<()>;

    async fn active_id(&self) -> Result<Option<RulesetId>>;

    /// Atomically upsert the plan's header and apply its rule changes.
    async fn commit_reconciliation(&self, plan: &ReconcilePlan) -> Result<()>;
}

/// Lowest-id ruleset matching `flag`.
fn first_flagged<'a>(
    rulesets: impl IntoIterator<Item = &'a Ruleset>,
    flag: impl Fn(&Ruleset) -> bool,
) -> Option<&'a Ruleset> {
    rulesets
        .into_iter()
        .filter(|r| flag(r))
        .min_by_key(|r| r.id())
}
