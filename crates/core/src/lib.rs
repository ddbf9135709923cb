pub mod action;
pub mod config;
pub mod error;
pub mod ruleset;

pub use action::{ActionDomain, ScrimActionInfo, ScrimActionType};
pub use config::Config;
pub use error::*;
pub use ruleset::*;
