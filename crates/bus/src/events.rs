//! Ruleset event payloads.
//!
//! These are the typed payloads carried by [`Message`](crate::Message) envelopes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use planetmans_core::{Ruleset, RulesetId};

use crate::topics;

/// How a ruleset's rules were changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleChangeKind {
    Created,
    Updated,
}

/// Emitted when a ruleset's rule rows were edited by an external editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesetRuleChanged {
    /// Full data of the edited ruleset, as the editor saw it.
    pub ruleset: Arc<Ruleset>,
    pub kind: RuleChangeKind,
}

impl RulesetRuleChanged {
    pub fn updated(ruleset: impl Into<Arc<Ruleset>>) -> Self {
        Self {
            ruleset: ruleset.into(),
            kind: RuleChangeKind::Updated,
        }
    }

    pub fn created(ruleset: impl Into<Arc<Ruleset>>) -> Self {
        Self {
            ruleset: ruleset.into(),
            kind: RuleChangeKind::Created,
        }
    }

    pub fn ruleset_id(&self) -> RulesetId {
        self.ruleset.id()
    }
}

/// Emitted after the engine durably switched the active ruleset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveRulesetChanged {
    pub current: Arc<Ruleset>,
    /// The ruleset that was active before, if any.
    #[serde(default)]
    pub previous: Option<Arc<Ruleset>>,
}

/// Closed set of events the bus carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RulesetEvent {
    RuleChanged(RulesetRuleChanged),
    ActiveChanged(ActiveRulesetChanged),
}

impl RulesetEvent {
    pub fn topic(&self) -> &'static str {
        match self {
            RulesetEvent::RuleChanged(_) => topics::RULESET_RULE_CHANGED,
            RulesetEvent::ActiveChanged(_) => topics::ACTIVE_RULESET_CHANGED,
        }
    }
}

impl From<RulesetRuleChanged> for RulesetEvent {
    fn from(event: RulesetRuleChanged) -> Self {
        RulesetEvent::RuleChanged(event)
    }
}

impl From<ActiveRulesetChanged> for RulesetEvent {
    fn from(event: ActiveRulesetChanged) -> Self {
        RulesetEvent::ActiveChanged(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planetmans_core::RulesetInfo;

    #[test]
    fn topics_follow_variant() {
        let ruleset = Arc::new(Ruleset::new(RulesetInfo::new(4, "Four")));
        let changed: RulesetEvent = RulesetRuleChanged::updated(ruleset.clone()).into();
        assert_eq!(changed.topic(), topics::RULESET_RULE_CHANGED);

        let active: RulesetEvent = ActiveRulesetChanged {
            current: ruleset,
            previous: None,
        }
        .into();
        assert_eq!(active.topic(), topics::ACTIVE_RULESET_CHANGED);
        assert!(active.topic().starts_with(topics::RULESET_PREFIX));
    }

    #[test]
    fn tagged_json_shape() {
        let ruleset = Ruleset::new(RulesetInfo::new(4, "Four"));
        let event: RulesetEvent = RulesetRuleChanged::updated(ruleset).into();
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "rule_changed");
        assert_eq!(json["kind"], "Updated");
        assert_eq!(json["ruleset"]["id"], 4);
    }
}
