//! [`RulesetRepository`]: store access with reconciliation on every load.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use planetmans_core::{RuleSet, Ruleset, RulesetId, RulesetInfo, ScrimActionInfo, ScrimActionType};

use crate::catalog::{CatalogSnapshot, RuleCatalogSource};
use crate::defaults::{self, DEFAULT_MATCH_TITLE, DEFAULT_RULESET_NAME};
use crate::error::{Result, RulesetError};
use crate::reconcile::{reconcile_rules, ReconcileOutcome, ReconcileReference};
use crate::store::{ReconcilePlan, RulesetStore};

/// Loads rulesets from a [`RulesetStore`] and reconciles them against the
/// catalog before handing them out.
///
/// The baseline ruleset reconciles against the default definitions; every
/// other ruleset keeps its own stored values.
#[derive(Clone)]
pub struct RulesetRepository {
    store: Arc<dyn RulesetStore>,
    catalog: Arc<dyn RuleCatalogSource>,
    defaults: Arc<RuleSet>,
    baseline_id: RulesetId,
}

impl RulesetRepository {
    pub fn new(
        store: Arc<dyn RulesetStore>,
        catalog: Arc<dyn RuleCatalogSource>,
        baseline_id: RulesetId,
    ) -> Self {
        Self::with_defaults(store, catalog, baseline_id, defaults::default_rules())
    }

    pub fn with_defaults(
        store: Arc<dyn RulesetStore>,
        catalog: Arc<dyn RuleCatalogSource>,
        baseline_id: RulesetId,
        defaults: RuleSet,
    ) -> Self {
        Self {
            store,
            catalog,
            defaults: Arc::new(defaults),
            baseline_id,
        }
    }

    pub fn store(&self) -> &Arc<dyn RulesetStore> {
        &self.store
    }

    pub fn baseline_id(&self) -> RulesetId {
        self.baseline_id
    }

    /// Fetch `id` with fully reconciled rules, committing any changes first.
    ///
    /// Returns `Ok(None)` when the store has no such ruleset.
    pub async fn fetch_ruleset_by_id(&self, id: RulesetId) -> Result<Option<Ruleset>> {
        match self.store.fetch_ruleset(id).await? {
            Some(stored) => self.reconcile_and_commit(stored).await.map(Some),
            None => Ok(None),
        }
    }

    /// Reconcile `stored` rows of `ruleset_id` without touching the store.
    pub async fn reconcile(&self, ruleset_id: RulesetId, stored: &RuleSet) -> Result<ReconcileOutcome> {
        let catalog = CatalogSnapshot::fetch(self.catalog.as_ref()).await?;
        reconcile_rules(ruleset_id, stored, self.reference_for(ruleset_id), &catalog)
    }

    /// Create or refresh the baseline ruleset and reconcile it against the
    /// default definitions, committing header and rules together.
    ///
    /// Commits without any caller-side serialization: finish seeding before
    /// the repository is shared with an activation controller.
    pub async fn seed_default_ruleset(&self) -> Result<Ruleset> {
        let id = self.baseline_id;
        let stored = match self.store.fetch_ruleset(id).await? {
            Some(existing) => existing,
            None => {
                info!(ruleset_id = id, "creating default ruleset");
                Ruleset::new(RulesetInfo::new(id, DEFAULT_RULESET_NAME))
            }
        };

        let mut header = stored.info.clone();
        header.default_match_title = DEFAULT_MATCH_TITLE.to_string();
        header.is_default = true;

        let outcome = self.reconcile(id, &stored.rules).await?;
        let header_changed = header != stored.info;
        let counts = outcome.changes.counts();

        if header_changed || !outcome.changes.is_empty() {
            header.date_last_modified = Some(Utc::now());
            self.store
                .commit_reconciliation(&ReconcilePlan::new(header.clone(), outcome.changes))
                .await?;
            info!(
                ruleset_id = id,
                creates = counts.creates,
                updates = counts.updates,
                deletes = counts.deletes,
                "seeded default ruleset"
            );
        } else {
            debug!(ruleset_id = id, "default ruleset already up to date");
        }

        Ok(Ruleset {
            info: header,
            rules: outcome.rules,
        })
    }

    pub async fn fetch_default_flagged(&self) -> Result<Option<Ruleset>> {
        self.store.fetch_default_flagged().await
    }

    pub async fn fetch_custom_default_flagged(&self) -> Result<Option<Ruleset>> {
        self.store.fetch_custom_default_flagged().await
    }

    /// The default-flagged ruleset with reconciled rules, committing any
    /// changes. Callers sharing a store serialize this with other loads.
    pub async fn default_ruleset(&self) -> Result<Ruleset> {
        let stored = self
            .store
            .fetch_default_flagged()
            .await?
            .ok_or(RulesetError::NoDefaultConfigured)?;
        self.reconcile_and_commit(stored).await
    }

    /// Every stored ruleset as persisted, ordered by id.
    pub async fn list_all(&self) -> Result<Vec<Ruleset>> {
        self.store.list_all().await
    }

    pub async fn set_active_id(&self, id: RulesetId) -> Result<()> {
        self.store.set_active_id(id).await
    }

    pub async fn active_id(&self) -> Result<Option<RulesetId>> {
        self.store.active_id().await
    }

    /// Catalog models for every action type.
    pub fn action_models(&self) -> Vec<ScrimActionInfo> {
        ScrimActionType::ALL.iter().map(|a| a.info()).collect()
    }

    fn reference_for(&self, ruleset_id: RulesetId) -> ReconcileReference<'_> {
        if ruleset_id == self.baseline_id {
            ReconcileReference::Defaults(&self.defaults)
        } else {
            ReconcileReference::PreserveStored
        }
    }

    async fn reconcile_and_commit(&self, stored: Ruleset) -> Result<Ruleset> {
        let id = stored.id();
        let outcome = self.reconcile(id, &stored.rules).await?;
        let mut header = stored.info;

        if !outcome.changes.is_empty() {
            let counts = outcome.changes.counts();
            header.date_last_modified = Some(Utc::now());
            self.store
                .commit_reconciliation(&ReconcilePlan::new(header.clone(), outcome.changes))
                .await?;
            info!(
                ruleset_id = id,
                creates = counts.creates,
                updates = counts.updates,
                deletes = counts.deletes,
                "committed reconciliation"
            );
        }

        Ok(Ruleset {
            info: header,
            rules: outcome.rules,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::store::MemoryRulesetStore;

    fn repository(store: &Arc<MemoryRulesetStore>) -> RulesetRepository {
        RulesetRepository::new(store.clone(), Arc::new(StaticCatalog::builtin()), 1)
    }

    #[tokio::test]
    async fn seeding_creates_baseline() {
        let store = Arc::new(MemoryRulesetStore::new());
        let repo = repository(&store);

        let seeded = repo.seed_default_ruleset().await.unwrap();
        assert_eq!(seeded.name(), DEFAULT_RULESET_NAME);
        assert_eq!(seeded.info.default_match_title, DEFAULT_MATCH_TITLE);
        assert!(seeded.is_default());

        let stored = store.get(1).await.unwrap();
        assert_eq!(stored.rules, seeded.rules);
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn seeding_twice_commits_once() {
        let store = Arc::new(MemoryRulesetStore::new());
        let repo = repository(&store);
        let first = repo.seed_default_ruleset().await.unwrap();
        let second = repo.seed_default_ruleset().await.unwrap();
        assert_eq!(first.rules, second.rules);
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn seeding_existing_empty_ruleset_keeps_its_name() {
        let store = Arc::new(MemoryRulesetStore::new());
        store.upsert(Ruleset::new(RulesetInfo::new(1, "Season 3"))).await;
        let repo = repository(&store);

        let seeded = repo.seed_default_ruleset().await.unwrap();
        assert_eq!(seeded.name(), "Season 3");
        assert!(seeded.is_default());
        let rule = seeded
            .rules
            .action_rule(ScrimActionType::InfantryKillInfantry)
            .unwrap();
        assert!(rule.defer_to_item_category_rules);
        assert_eq!(rule.points, 0);
    }

    #[tokio::test]
    async fn fetch_of_reconciled_ruleset_writes_nothing() {
        let store = Arc::new(MemoryRulesetStore::new());
        let repo = repository(&store);
        repo.seed_default_ruleset().await.unwrap();

        let fetched = repo.fetch_ruleset_by_id(1).await.unwrap().unwrap();
        assert!(fetched.rules.is_loaded());
        assert_eq!(store.commit_count(), 1);
        assert!(repo.fetch_ruleset_by_id(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn default_ruleset_requires_a_flag() {
        let store = Arc::new(MemoryRulesetStore::new());
        let repo = repository(&store);
        assert!(matches!(
            repo.default_ruleset().await,
            Err(RulesetError::NoDefaultConfigured)
        ));
        repo.seed_default_ruleset().await.unwrap();
        assert_eq!(repo.default_ruleset().await.unwrap().id(), 1);
    }

    #[test]
    fn action_models_cover_every_type() {
        let store = Arc::new(MemoryRulesetStore::new());
        let models = repository(&store).action_models();
        assert_eq!(models.len(), ScrimActionType::ALL.len());
        assert!(models.iter().any(|m| m.description == "Infantry Kill Max"));
    }
}
