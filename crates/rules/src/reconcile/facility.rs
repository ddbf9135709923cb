use std::collections::BTreeSet;

use planetmans_core::{FacilityRule, RulesetId};

use super::changes::{index, CategoryChanges, Merge};

/// Merge facility rules by facility id. Stored rows are never point-adjusted.
pub(super) fn reconcile(
    ruleset_id: RulesetId,
    stored: &[FacilityRule],
    defaults: &[FacilityRule],
    preserve_stored: bool,
) -> (Vec<FacilityRule>, CategoryChanges<FacilityRule>) {
    let stored_by_id = index(stored);
    let default_by_id = index(defaults);

    let candidates: BTreeSet<i32> = stored_by_id
        .keys()
        .chain(default_by_id.keys())
        .copied()
        .collect();

    let mut merge = Merge::new(ruleset_id);
    for facility_id in candidates {
        match (stored_by_id.get(&facility_id).copied(), default_by_id.get(&facility_id).copied()) {
            (None, Some(d)) => merge.create(FacilityRule {
                ruleset_id,
                ..d.clone()
            }),
            (Some(row), Some(_)) => merge.keep(row),
            (Some(row), None) if preserve_stored => merge.keep(row),
            (Some(_), None) => merge.delete(facility_id),
            (None, None) => {}
        }
    }
    merge.finish()
}
