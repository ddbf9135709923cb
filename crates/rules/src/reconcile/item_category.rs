use std::collections::BTreeSet;

use planetmans_core::{ItemCategoryRule, RulesetId};

use super::changes::{index, CategoryChanges, Merge};

/// Merge item category rules. Only weapon categories get rows of their own;
/// a category with a default definition is kept whether or not the catalog
/// marks it as a weapon category.
pub(super) fn reconcile(
    ruleset_id: RulesetId,
    stored: &[ItemCategoryRule],
    defaults: &[ItemCategoryRule],
    preserve_stored: bool,
    category_ids: &[i32],
    weapon_category_ids: &[i32],
) -> (Vec<ItemCategoryRule>, CategoryChanges<ItemCategoryRule>) {
    let weapon: BTreeSet<i32> = weapon_category_ids.iter().copied().collect();
    let stored_by_id = index(stored);
    let default_by_id = index(defaults);

    let mut seen = BTreeSet::new();
    let candidates = category_ids
        .iter()
        .copied()
        .chain(stored_by_id.keys().copied())
        .filter(|id| seen.insert(*id));

    let mut merge = Merge::new(ruleset_id);
    for category_id in candidates {
        let is_weapon = weapon.contains(&category_id);
        let default = default_by_id.get(&category_id).copied();

        match stored_by_id.get(&category_id).copied() {
            None => {
                if let Some(d) = default {
                    merge.create(ItemCategoryRule {
                        ruleset_id,
                        ..d.clone()
                    });
                } else if is_weapon {
                    merge.create(ItemCategoryRule::new(ruleset_id, category_id, 0));
                }
            }
            Some(row) if is_weapon || default.is_some() => {
                let desired = match default {
                    Some(d) => ItemCategoryRule {
                        points: d.points,
                        is_banned: d.is_banned,
                        defer_to_item_rules: d.defer_to_item_rules,
                        ..row.clone()
                    },
                    None if preserve_stored => row.clone(),
                    None => ItemCategoryRule::new(ruleset_id, category_id, 0),
                };
                merge.retain(row, desired);
            }
            Some(_) => merge.delete(category_id),
        }
    }
    merge.finish()
}
