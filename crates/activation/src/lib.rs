//! Active-ruleset ownership for the scrim scoring engine.
//!
//! [`ActiveRulesetController`] holds the single active ruleset, serializes
//! every activation and refresh behind one gate, and announces switches on
//! the [`RulesetBus`](planetmans_bus::RulesetBus).

pub mod controller;

pub use controller::ActiveRulesetController;
