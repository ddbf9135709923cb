use std::collections::BTreeSet;

use planetmans_core::{ActionRule, RulesetId, ScrimActionType};

use super::changes::{index, CategoryChanges, Merge};

/// Merge action rules over every catalog-valid non-control action type plus
/// any stored action type that is no longer valid (which gets deleted).
pub(super) fn reconcile(
    ruleset_id: RulesetId,
    stored: &[ActionRule],
    defaults: &[ActionRule],
    preserve_stored: bool,
    valid_types: &[ScrimActionType],
) -> (Vec<ActionRule>, CategoryChanges<ActionRule>) {
    let valid: BTreeSet<ScrimActionType> = valid_types
        .iter()
        .copied()
        .filter(|a| !a.is_control())
        .collect();
    let stored_by_type = index(stored);
    let default_by_type = index(defaults);

    let candidates: BTreeSet<ScrimActionType> =
        valid.iter().copied().chain(stored_by_type.keys().copied()).collect();

    let mut merge = Merge::new(ruleset_id);
    for action in candidates {
        let default = default_by_type.get(&action).copied();

        match stored_by_type.get(&action).copied() {
            None => merge.create(match default {
                Some(d) => ActionRule {
                    ruleset_id,
                    ..d.clone()
                },
                None => ActionRule::new(ruleset_id, action, 0),
            }),
            Some(row) if valid.contains(&action) => {
                let mut desired = row.clone();
                match default {
                    Some(d) => {
                        desired.points = d.points;
                        desired.defer_to_item_category_rules = d.defer_to_item_category_rules;
                        desired.domain = d.domain;
                    }
                    None if preserve_stored => desired.domain = action.domain(),
                    None => {
                        desired.points = 0;
                        desired.domain = action.domain();
                    }
                }
                merge.retain(row, desired);
            }
            Some(_) => merge.delete(action),
        }
    }
    merge.finish()
}
