//! In-process change-notification bus for ruleset events.
//!
//! Producers publish [`Message`] envelopes carrying a typed [`RulesetEvent`];
//! subscribers register a topic prefix and receive matching messages either
//! through an async channel ([`Subscription`]) or an inline handler.

pub mod bus;
pub mod error;
pub mod events;
pub mod message;
pub mod topics;
pub mod traits;

pub use bus::{RulesetBus, Subscription, SubscriptionId};
pub use error::BusError;
pub use events::{ActiveRulesetChanged, RuleChangeKind, RulesetEvent, RulesetRuleChanged};
pub use message::Message;
pub use traits::{EventPublisher, EventSubscriber};
