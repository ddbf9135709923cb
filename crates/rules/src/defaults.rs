//! Built-in baseline rules seeded into the default ruleset.
//!
//! Rows are built with `ruleset_id = 0`; reconciliation re-owns them when it
//! copies a default into a concrete ruleset.

use planetmans_core::{ActionRule, FacilityRule, ItemCategoryRule, ItemRule, RuleSet, ScrimActionType};

/// Name given to the baseline ruleset when the seeding pass creates it.
pub const DEFAULT_RULESET_NAME: &str = "Default";

/// Match title stamped on the baseline ruleset on every seeding pass.
pub const DEFAULT_MATCH_TITLE: &str = "PS2 Scrims";

/// Item category whose points defer to per-item rules.
pub const KNIFE_CATEGORY_ID: i32 = 2;

const ACTION_POINTS: &[(ScrimActionType, i32)] = &[
    (ScrimActionType::FirstBaseCapture, 9),
    (ScrimActionType::SubsequentBaseCapture, 18),
    (ScrimActionType::InfantryKillMax, 6),
    (ScrimActionType::InfantryTeamkillInfantry, -2),
    (ScrimActionType::InfantryTeamkillMax, -8),
    (ScrimActionType::InfantrySuicide, -2),
    (ScrimActionType::MaxTeamkillMax, -8),
    (ScrimActionType::MaxTeamkillInfantry, -2),
    (ScrimActionType::MaxSuicide, -8),
    (ScrimActionType::MaxKillInfantry, 0),
    (ScrimActionType::MaxKillMax, 0),
];

const WEAPON_CATEGORY_IDS: &[i32] = &[2, 3, 5, 6, 7, 8, 11, 12, 19, 24, 100, 102, 157];

const BANNED_KNIFE_IDS: &[i32] = &[271, 285, 286];

// (facility_id, map_region_id)
const FACILITIES: &[(i32, i32)] = &[
    (266000, 4106),
    (272000, 4112),
    (283000, 4123),
    (286000, 4126),
    (287070, 4266),
    (302030, 4173),
    (303030, 4183),
    (305010, 4201),
    (307010, 4221),
    (239000, 18010),
    (244610, 18067),
    (244620, 18068),
    (252020, 18050),
    (254010, 18055),
    (219, 2420),
    (230, 2431),
    (3430, 2456),
    (3620, 2466),
    (210002, 6357),
];

/// Baseline action rules. Infantry-on-infantry kills score through item
/// category rules instead of a flat value.
pub fn default_action_rules() -> Vec<ActionRule> {
    let mut rules: Vec<ActionRule> = ACTION_POINTS
        .iter()
        .map(|&(action, points)| ActionRule::new(0, action, points))
        .collect();
    rules.push(ActionRule::new(0, ScrimActionType::InfantryKillInfantry, 0).deferring());
    rules
}

pub fn default_item_category_rules() -> Vec<ItemCategoryRule> {
    WEAPON_CATEGORY_IDS
        .iter()
        .map(|&id| {
            let rule = ItemCategoryRule::new(0, id, 1);
            if id == KNIFE_CATEGORY_ID {
                rule.deferring()
            } else {
                rule
            }
        })
        .collect()
}

pub fn default_item_rules() -> Vec<ItemRule> {
    BANNED_KNIFE_IDS
        .iter()
        .map(|&id| ItemRule::new(0, id, KNIFE_CATEGORY_ID, 0).banned())
        .collect()
}

pub fn default_facility_rules() -> Vec<FacilityRule> {
    FACILITIES
        .iter()
        .map(|&(facility, region)| FacilityRule::new(0, facility, region))
        .collect()
}

/// All four baseline collections.
pub fn default_rules() -> RuleSet {
    RuleSet {
        action_rules: default_action_rules(),
        item_category_rules: default_item_category_rules(),
        item_rules: default_item_rules(),
        facility_rules: default_facility_rules(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_unique_keys() {
        let rules = default_rules();
        assert!(rules.validate_unique(0).is_ok());
        assert_eq!(rules.action_rules.len(), 12);
        assert_eq!(rules.item_category_rules.len(), 13);
        assert_eq!(rules.item_rules.len(), 3);
        assert_eq!(rules.facility_rules.len(), 19);
    }

    #[test]
    fn infantry_kill_infantry_defers() {
        let rules = default_rules();
        let rule = rules.action_rule(ScrimActionType::InfantryKillInfantry).unwrap();
        assert!(rule.defer_to_item_category_rules);
        assert_eq!(rule.points, 0);
        assert!(!rules.action_rule(ScrimActionType::InfantryKillMax).unwrap().defer_to_item_category_rules);
    }

    #[test]
    fn knives_defer_and_are_banned() {
        let rules = default_rules();
        assert!(rules.item_category_rule(KNIFE_CATEGORY_ID).unwrap().defer_to_item_rules);
        assert!(!rules.item_category_rule(3).unwrap().defer_to_item_rules);
        assert!(rules.item_rules.iter().all(|r| r.is_banned && r.item_category_id == KNIFE_CATEGORY_ID));
    }

    #[test]
    fn no_control_actions_in_defaults() {
        assert!(default_action_rules().iter().all(|r| !r.action_type.is_control()));
    }
}
