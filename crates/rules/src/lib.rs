//! Ruleset defaults, reconciliation, persistence and catalog access.
//!
//! - [`defaults`]: code-embedded baseline rules.
//! - [`reconcile`]: pure merge of stored rows, defaults and catalog facts.
//! - [`store`]: the [`RulesetStore`](store::RulesetStore) interface with
//!   in-memory and YAML-file implementations.
//! - [`repository`]: fetch-with-reconciliation and the seeding pass.

pub mod catalog;
pub mod defaults;
pub mod error;
pub mod reconcile;
pub mod repository;
pub mod store;

pub use catalog::{CatalogSnapshot, RuleCatalogSource, StaticCatalog, WeaponItem};
pub use error::{Result, RulesetError};
pub use reconcile::{reconcile_rules, ChangeSet, ReconcileOutcome, ReconcileReference};
pub use repository::RulesetRepository;
pub use store::{FileRulesetStore, MemoryRulesetStore, ReconcilePlan, RulesetStore};
