//! [`MemoryRulesetStore`]: rulesets held in a map behind an async lock.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use planetmans_core::{Ruleset, RulesetId};

use super::{first_flagged, ReconcilePlan, RulesetStore};
use crate::error::{Result, RulesetError};

/// In-memory store. Also carries failure and latency injection for tests.
#[derive(Debug, Default)]
pub struct MemoryRulesetStore {
    rulesets: RwLock<BTreeMap<RulesetId, Ruleset>>,
    active_id: RwLock<Option<RulesetId>>,
    fail_fetches: AtomicBool,
    fail_commits: AtomicBool,
    commits: AtomicUsize,
    active_writes: AtomicUsize,
    latency: Option<Duration>,
}

impl MemoryRulesetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` before it touches the map.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Insert or replace a ruleset directly, bypassing reconciliation.
    pub async fn upsert(&self, ruleset: Ruleset) {
        self.rulesets.write().await.insert(ruleset.id(), ruleset);
    }

    /// Raw stored copy of `id`.
    pub async fn get(&self, id: RulesetId) -> Option<Ruleset> {
        self.rulesets.read().await.get(&id).cloned()
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Number of successful reconciliation commits.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Number of successful active-id writes.
    pub fn set_active_count(&self) -> usize {
        self.active_writes.load(Ordering::SeqCst)
    }

    async fn before_read(&self) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(RulesetError::Store("injected fetch failure".to_string()));
        }
        Ok(())
    }

    async fn before_write(&self) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(RulesetError::Store("injected commit failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RulesetStore for MemoryRulesetStore {
    async fn fetch_ruleset(&self, id: RulesetId) -> Result<Option<Ruleset>> {
        self.before_read().await?;
        Ok(self.rulesets.read().await.get(&id).cloned())
    }

    async fn fetch_default_flagged(&self) -> Result<Option<Ruleset>> {
        self.before_read().await?;
        let rulesets = self.rulesets.read().await;
        Ok(first_flagged(rulesets.values(), Ruleset::is_default).cloned())
    }

    async fn fetch_custom_default_flagged(&self) -> Result<Option<Ruleset>> {
        self.before_read().await?;
        let rulesets = self.rulesets.read().await;
        Ok(first_flagged(rulesets.values(), Ruleset::is_custom_default).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Ruleset>> {
        self.before_read().await?;
        Ok(self.rulesets.read().await.values().cloned().collect())
    }

    async fn set_active_id(&self, id: RulesetId) -> Result<()> {
        self.before_write().await?;
        *self.active_id.write().await = Some(id);
        self.active_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn active_id(&self) -> Result<Option<RulesetId>> {
        self.before_read().await?;
        Ok(*self.active_id.read().await)
    }

    async fn commit_reconciliation(&self, plan: &ReconcilePlan) -> Result<()> {
        self.before_write().await?;
        let mut rulesets = self.rulesets.write().await;
        let updated = plan.apply(rulesets.get(&plan.ruleset_id()))?;
        rulesets.insert(updated.id(), updated);
        self.commits.fetch_add(1, Ordering::SeqCst);
        debug!(ruleset_id = plan.ruleset_id(), "committed reconciliation in memory");
        Ok(())
    }
}
