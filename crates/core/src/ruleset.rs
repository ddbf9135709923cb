//! Ruleset data model: a named bundle of four rule collections.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::{ActionDomain, ScrimActionType};
use crate::error::CoreError;

pub type RulesetId = i32;

/// Points and defer flag for one action type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRule {
    pub ruleset_id: RulesetId,
    pub action_type: ScrimActionType,
    pub points: i32,
    #[serde(default)]
    pub defer_to_item_category_rules: bool,
    pub domain: ActionDomain,
}

impl ActionRule {
    /// Build a rule with the domain derived from `action_type`.
    pub fn new(ruleset_id: RulesetId, action_type: ScrimActionType, points: i32) -> Self {
        Self {
            ruleset_id,
            action_type,
            points,
            defer_to_item_category_rules: false,
            domain: action_type.domain(),
        }
    }

    pub fn deferring(mut self) -> Self {
        self.defer_to_item_category_rules = true;
        self
    }

    pub fn key(&self) -> ScrimActionType {
        self.action_type
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCategoryRule {
    pub ruleset_id: RulesetId,
    pub item_category_id: i32,
    pub points: i32,
    #[serde(default)]
    pub is_banned: bool,
    #[serde(default)]
    pub defer_to_item_rules: bool,
}

impl ItemCategoryRule {
    pub fn new(ruleset_id: RulesetId, item_category_id: i32, points: i32) -> Self {
        Self {
            ruleset_id,
            item_category_id,
            points,
            is_banned: false,
            defer_to_item_rules: false,
        }
    }

    pub fn banned(mut self) -> Self {
        self.is_banned = true;
        self
    }

    pub fn deferring(mut self) -> Self {
        self.defer_to_item_rules = true;
        self
    }

    pub fn key(&self) -> i32 {
        self.item_category_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRule {
    pub ruleset_id: RulesetId,
    pub item_id: i32,
    pub item_category_id: i32,
    pub points: i32,
    #[serde(default)]
    pub is_banned: bool,
}

impl ItemRule {
    pub fn new(ruleset_id: RulesetId, item_id: i32, item_category_id: i32, points: i32) -> Self {
        Self {
            ruleset_id,
            item_id,
            item_category_id,
            points,
            is_banned: false,
        }
    }

    pub fn banned(mut self) -> Self {
        self.is_banned = true;
        self
    }

    pub fn key(&self) -> i32 {
        self.item_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityRule {
    pub ruleset_id: RulesetId,
    pub facility_id: i32,
    pub map_region_id: i32,
}

impl FacilityRule {
    pub fn new(ruleset_id: RulesetId, facility_id: i32, map_region_id: i32) -> Self {
        Self {
            ruleset_id,
            facility_id,
            map_region_id,
        }
    }

    pub fn key(&self) -> i32 {
        self.facility_id
    }
}

/// The four rule collections owned by a ruleset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub action_rules: Vec<ActionRule>,
    #[serde(default)]
    pub item_category_rules: Vec<ItemCategoryRule>,
    #[serde(default)]
    pub item_rules: Vec<ItemRule>,
    #[serde(default)]
    pub facility_rules: Vec<FacilityRule>,
}

impl RuleSet {
    /// True when both scoring collections the match engine relies on are populated.
    pub fn is_loaded(&self) -> bool {
        !self.action_rules.is_empty() && !self.item_category_rules.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.action_rules.is_empty()
            && self.item_category_rules.is_empty()
            && self.item_rules.is_empty()
            && self.facility_rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.action_rules.len()
            + self.item_category_rules.len()
            + self.item_rules.len()
            + self.facility_rules.len()
    }

    /// Point every row at `ruleset_id`.
    pub fn assign_ruleset(&mut self, ruleset_id: RulesetId) {
        self.action_rules.iter_mut().for_each(|r| r.ruleset_id = ruleset_id);
        self.item_category_rules.iter_mut().for_each(|r| r.ruleset_id = ruleset_id);
        self.item_rules.iter_mut().for_each(|r| r.ruleset_id = ruleset_id);
        self.facility_rules.iter_mut().for_each(|r| r.ruleset_id = ruleset_id);
    }

    /// Check that rule keys are unique within each category.
    pub fn validate_unique(&self, ruleset_id: RulesetId) -> Result<(), CoreError> {
        check_unique("action", ruleset_id, self.action_rules.iter().map(|r| r.key().code()))?;
        check_unique("item category", ruleset_id, self.item_category_rules.iter().map(|r| r.key()))?;
        check_unique("item", ruleset_id, self.item_rules.iter().map(|r| r.key()))?;
        check_unique("facility", ruleset_id, self.facility_rules.iter().map(|r| r.key()))
    }

    pub fn action_rule(&self, action_type: ScrimActionType) -> Option<&ActionRule> {
        self.action_rules.iter().find(|r| r.action_type == action_type)
    }

    pub fn item_category_rule(&self, item_category_id: i32) -> Option<&ItemCategoryRule> {
        self.item_category_rules
            .iter()
            .find(|r| r.item_category_id == item_category_id)
    }

    pub fn item_rule(&self, item_id: i32) -> Option<&ItemRule> {
        self.item_rules.iter().find(|r| r.item_id == item_id)
    }

    pub fn facility_rule(&self, facility_id: i32) -> Option<&FacilityRule> {
        self.facility_rules.iter().find(|r| r.facility_id == facility_id)
    }
}

fn check_unique(
    category: &'static str,
    ruleset_id: RulesetId,
    keys: impl Iterator<Item = i32>,
) -> Result<(), CoreError> {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key) {
            return Err(CoreError::DuplicateRule {
                category,
                key,
                ruleset_id,
            });
        }
    }
    Ok(())
}

/// Identity and flags of a ruleset, without its rule collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesetInfo {
    pub id: RulesetId,
    pub name: String,
    pub date_created: DateTime<Utc>,
    #[serde(default)]
    pub date_last_modified: Option<DateTime<Utc>>,
    #[serde(default)]
    pub default_match_title: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_custom_default: bool,
}

impl RulesetInfo {
    pub fn new(id: RulesetId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            date_created: Utc::now(),
            date_last_modified: None,
            default_match_title: String::new(),
            is_default: false,
            is_custom_default: false,
        }
    }
}

/// A ruleset and the rule rows it exclusively owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ruleset {
    #[serde(flatten)]
    pub info: RulesetInfo,
    #[serde(flatten)]
    pub rules: RuleSet,
}

impl Ruleset {
    pub fn new(info: RulesetInfo) -> Self {
        Self {
            info,
            rules: RuleSet::default(),
        }
    }

    pub fn with_rules(info: RulesetInfo, mut rules: RuleSet) -> Self {
        rules.assign_ruleset(info.id);
        Self { info, rules }
    }

    pub fn id(&self) -> RulesetId {
        self.info.id
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn is_default(&self) -> bool {
        self.info.is_default
    }

    pub fn is_custom_default(&self) -> bool {
        self.info.is_custom_default
    }
}
