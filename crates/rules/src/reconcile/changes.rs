//! Per-category change tracking and application.

use std::collections::BTreeMap;
use std::fmt;

use planetmans_core::{ActionRule, FacilityRule, ItemCategoryRule, ItemRule, RuleSet, RulesetId, ScrimActionType};

/// A rule row with a unique key inside its ruleset.
pub trait Keyed: Clone + PartialEq {
    type Key: Ord + Copy + fmt::Debug;

    fn rule_key(&self) -> Self::Key;

    /// The same row owned by `ruleset_id`.
    fn with_owner(self, ruleset_id: RulesetId) -> Self;
}

impl Keyed for ActionRule {
    type Key = ScrimActionType;

    fn rule_key(&self) -> ScrimActionType {
        self.action_type
    }

    fn with_owner(self, ruleset_id: RulesetId) -> Self {
        Self { ruleset_id, ..self }
    }
}

impl Keyed for ItemCategoryRule {
    type Key = i32;

    fn rule_key(&self) -> i32 {
        self.item_category_id
    }

    fn with_owner(self, ruleset_id: RulesetId) -> Self {
        Self { ruleset_id, ..self }
    }
}

impl Keyed for ItemRule {
    type Key = i32;

    fn rule_key(&self) -> i32 {
        self.item_id
    }

    fn with_owner(self, ruleset_id: RulesetId) -> Self {
        Self { ruleset_id, ..self }
    }
}

impl Keyed for FacilityRule {
    type Key = i32;

    fn rule_key(&self) -> i32 {
        self.facility_id
    }

    fn with_owner(self, ruleset_id: RulesetId) -> Self {
        Self { ruleset_id, ..self }
    }
}

/// Creates, updates and deletes for one rule category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryChanges<R: Keyed> {
    pub creates: Vec<R>,
    /// Only rows whose values differ from the stored row.
    pub updates: Vec<R>,
    pub deletes: Vec<R::Key>,
}

impl<R: Keyed> Default for CategoryChanges<R> {
    fn default() -> Self {
        Self {
            creates: Vec::new(),
            updates: Vec::new(),
            deletes: Vec::new(),
        }
    }
}

impl<R: Keyed> CategoryChanges<R> {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    /// Apply to a copy of `rows`, failing if any change conflicts with them.
    fn apply(&self, category: &str, rows: &[R]) -> Result<Vec<R>, String> {
        let mut map: BTreeMap<R::Key, R> = rows.iter().map(|r| (r.rule_key(), r.clone())).collect();

        for key in &self.deletes {
            if map.remove(key).is_none() {
                return Err(format!("{category} rule {key:?} to delete does not exist"));
            }
        }
        for row in &self.updates {
            match map.get_mut(&row.rule_key()) {
                Some(slot) => *slot = row.clone(),
                None => {
                    return Err(format!("{category} rule {:?} to update does not exist", row.rule_key()))
                }
            }
        }
        for row in &self.creates {
            if map.insert(row.rule_key(), row.clone()).is_some() {
                return Err(format!("{category} rule {:?} to create already exists", row.rule_key()));
            }
        }

        Ok(map.into_values().collect())
    }
}

/// Every change one reconciliation pass wants to commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub action_rules: CategoryChanges<ActionRule>,
    pub item_category_rules: CategoryChanges<ItemCategoryRule>,
    pub item_rules: CategoryChanges<ItemRule>,
    pub facility_rules: CategoryChanges<FacilityRule>,
}

/// Counts of a change set, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCounts {
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.action_rules.is_empty()
            && self.item_category_rules.is_empty()
            && self.item_rules.is_empty()
            && self.facility_rules.is_empty()
    }

    pub fn counts(&self) -> ChangeCounts {
        ChangeCounts {
            creates: self.action_rules.creates.len()
                + self.item_category_rules.creates.len()
                + self.item_rules.creates.len()
                + self.facility_rules.creates.len(),
            updates: self.action_rules.updates.len()
                + self.item_category_rules.updates.len()
                + self.item_rules.updates.len()
                + self.facility_rules.updates.len(),
            deletes: self.action_rules.deletes.len()
                + self.item_category_rules.deletes.len()
                + self.item_rules.deletes.len()
                + self.facility_rules.deletes.len(),
        }
    }

    /// Produce the rule set that results from applying every change to `rules`.
    ///
    /// Either all four categories apply cleanly or an error describes the
    /// first conflict; `rules` itself is never modified.
    pub fn apply_to(&self, rules: &RuleSet) -> Result<RuleSet, String> {
        Ok(RuleSet {
            action_rules: self.action_rules.apply("action", &rules.action_rules)?,
            item_category_rules: self
                .item_category_rules
                .apply("item category", &rules.item_category_rules)?,
            item_rules: self.item_rules.apply("item", &rules.item_rules)?,
            facility_rules: self.facility_rules.apply("facility", &rules.facility_rules)?,
        })
    }
}

/// Accumulates the outcome of one category merge, keeping rows ordered by key.
///
/// Every row that leaves the merge is owned by the ruleset being reconciled.
pub(super) struct Merge<R: Keyed> {
    ruleset_id: RulesetId,
    rows: BTreeMap<R::Key, R>,
    changes: CategoryChanges<R>,
}

impl<R: Keyed> Merge<R> {
    pub(super) fn new(ruleset_id: RulesetId) -> Self {
        Self {
            ruleset_id,
            rows: BTreeMap::new(),
            changes: CategoryChanges::default(),
        }
    }

    pub(super) fn create(&mut self, row: R) {
        let row = row.with_owner(self.ruleset_id);
        self.changes.creates.push(row.clone());
        self.rows.insert(row.rule_key(), row);
    }

    /// Keep a stored row, recording an update only if `desired` differs from it.
    pub(super) fn retain(&mut self, stored: &R, desired: R) {
        let desired = desired.with_owner(self.ruleset_id);
        if &desired != stored {
            self.changes.updates.push(desired.clone());
        }
        self.rows.insert(desired.rule_key(), desired);
    }

    /// Keep a stored row's values as they are.
    pub(super) fn keep(&mut self, stored: &R) {
        self.retain(stored, stored.clone());
    }

    pub(super) fn delete(&mut self, key: R::Key) {
        self.changes.deletes.push(key);
    }

    pub(super) fn finish(self) -> (Vec<R>, CategoryChanges<R>) {
        (self.rows.into_values().collect(), self.changes)
    }
}

/// Index rows by key. Keys are unique once the rule set has been validated.
pub(super) fn index<R: Keyed>(rows: &[R]) -> BTreeMap<R::Key, &R> {
    rows.iter().map(|r| (r.rule_key(), r)).collect()
}
