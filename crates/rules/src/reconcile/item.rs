use std::collections::{BTreeMap, BTreeSet};

use planetmans_core::{ItemCategoryRule, ItemRule, RulesetId};

use super::changes::{index, CategoryChanges, Merge};
use crate::catalog::WeaponItem;

/// Merge item rules over default, stored and catalog weapon items.
///
/// Items without their own default inherit the points of their owning
/// category's reconciled rule (zero when the category has none). A weapon
/// item with no known category is treated as a non-weapon item.
pub(super) fn reconcile(
    ruleset_id: RulesetId,
    stored: &[ItemRule],
    defaults: &[ItemRule],
    preserve_stored: bool,
    weapon_items: &[WeaponItem],
    category_rules: &[ItemCategoryRule],
) -> (Vec<ItemRule>, CategoryChanges<ItemRule>) {
    let mut weapon_category: BTreeMap<i32, Option<i32>> = BTreeMap::new();
    for item in weapon_items {
        weapon_category.entry(item.id).or_insert(item.item_category_id);
    }
    let category_points: BTreeMap<i32, i32> = category_rules
        .iter()
        .map(|r| (r.item_category_id, r.points))
        .collect();
    let inherited = |category_id: i32| category_points.get(&category_id).copied().unwrap_or(0);

    let stored_by_id = index(stored);
    let default_by_id = index(defaults);

    let mut seen = BTreeSet::new();
    let candidates = default_by_id
        .keys()
        .copied()
        .chain(stored_by_id.keys().copied())
        .chain(weapon_items.iter().map(|i| i.id))
        .filter(|id| seen.insert(*id));

    let mut merge = Merge::new(ruleset_id);
    for item_id in candidates {
        let owning_category = weapon_category.get(&item_id).copied().flatten();
        let default = default_by_id.get(&item_id).copied();

        match (stored_by_id.get(&item_id).copied(), owning_category, default) {
            (None, _, Some(d)) => merge.create(ItemRule {
                ruleset_id,
                ..d.clone()
            }),
            (None, Some(category_id), None) => {
                merge.create(ItemRule::new(ruleset_id, item_id, category_id, inherited(category_id)))
            }
            (None, None, None) => {}
            (Some(row), _, Some(d)) => merge.retain(
                row,
                ItemRule {
                    points: d.points,
                    is_banned: d.is_banned,
                    ..row.clone()
                },
            ),
            (Some(row), Some(_), None) if preserve_stored => merge.keep(row),
            (Some(row), Some(category_id), None) => merge.retain(
                row,
                ItemRule {
                    points: inherited(category_id),
                    is_banned: false,
                    ..row.clone()
                },
            ),
            (Some(_), None, None) => merge.delete(item_id),
        }
    }
    merge.finish()
}
