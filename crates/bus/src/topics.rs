//! Topic constants for PUB/SUB routing.
//!
//! Topics follow the pattern `planetmans.<domain>.<event>`.

/// Prefix shared by every ruleset topic.
pub const RULESET_PREFIX: &str = "planetmans.ruleset.";

/// Fired when a ruleset's rules were edited outside the engine.
pub const RULESET_RULE_CHANGED: &str = "planetmans.ruleset.rule_changed";

/// Fired after the engine switched the active ruleset.
pub const ACTIVE_RULESET_CHANGED: &str = "planetmans.ruleset.active_changed";
