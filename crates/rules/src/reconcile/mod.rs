//! Pure merge of stored rule rows, default definitions and catalog facts.
//!
//! Each rule category is merged independently and the four results are
//! returned together with the [`ChangeSet`] that turns the stored rows into
//! them. Nothing here performs I/O; committing the changes is the store's job.

mod action;
mod changes;
mod facility;
mod item;
mod item_category;


pub use changes::{CategoryChanges, ChangeCounts, ChangeSet, Keyed};

use tracing::debug;

use planetmans_core::{RuleSet, RulesetId};

use crate::catalog::CatalogSnapshot;
use crate::error::{Result, RulesetError};

/// What stored rows are reconciled against.
#[derive(Debug, Clone, Copy)]
pub enum ReconcileReference<'a> {
    /// Default definitions override stored values; stored rows without a
    /// default are reset to neutral values.
    Defaults(&'a RuleSet),
    /// No default definitions: stored values survive, only catalog-driven
    /// creates and deletes apply.
    PreserveStored,
}

/// Reconciled rules plus the changes needed to reach them from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub rules: RuleSet,
    pub changes: ChangeSet,
}

/// Reconcile `stored` rows of `ruleset_id` against `reference` and `catalog`.
///
/// Fails without producing any changes if the stored rows hold duplicate keys.
pub fn reconcile_rules(
    ruleset_id: RulesetId,
    stored: &RuleSet,
    reference: ReconcileReference<'_>,
    catalog: &CatalogSnapshot,
) -> Result<ReconcileOutcome> {
    stored
        .validate_unique(ruleset_id)
        .map_err(|e| RulesetError::Reconcile {
            ruleset_id,
            reason: e.to_string(),
        })?;

    let empty = RuleSet::default();
    let (defaults, preserve) = match reference {
        ReconcileReference::Defaults(defaults) => {
            defaults
                .validate_unique(ruleset_id)
                .map_err(|e| RulesetError::Reconcile {
                    ruleset_id,
                    reason: format!("default definitions: {e}"),
                })?;
            (defaults, false)
        }
        ReconcileReference::PreserveStored => (&empty, true),
    };

    let (action_rules, action_changes) = action::reconcile(
        ruleset_id,
        &stored.action_rules,
        &defaults.action_rules,
        preserve,
        &catalog.valid_action_types,
    );
    let (item_category_rules, item_category_changes) = item_category::reconcile(
        ruleset_id,
        &stored.item_category_rules,
        &defaults.item_category_rules,
        preserve,
        &catalog.item_category_ids,
        &catalog.weapon_item_category_ids,
    );
    let (item_rules, item_changes) = item::reconcile(
        ruleset_id,
        &stored.item_rules,
        &defaults.item_rules,
        preserve,
        &catalog.weapon_items,
        &item_category_rules,
    );
    let (facility_rules, facility_changes) = facility::reconcile(
        ruleset_id,
        &stored.facility_rules,
        &defaults.facility_rules,
        preserve,
    );

    let changes = ChangeSet {
        action_rules: action_changes,
        item_category_rules: item_category_changes,
        item_rules: item_changes,
        facility_rules: facility_changes,
    };
    let counts = changes.counts();
    debug!(
        ruleset_id,
        creates = counts.creates,
        updates = counts.updates,
        deletes = counts.deletes,
        "reconciled ruleset"
    );

    Ok(ReconcileOutcome {
        rules: RuleSet {
            action_rules,
            item_category_rules,
            item_rules,
            facility_rules,
        },
        changes,
    })
}
