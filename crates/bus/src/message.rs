use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::events::{ActiveRulesetChanged, RulesetEvent, RulesetRuleChanged};

/// Envelope for events travelling over the bus.
///
/// The `topic` field drives prefix routing; `correlation_id` lets a consumer
/// tie a follow-up event back to the one that caused it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Routing topic (see [`crate::topics`]).
    pub topic: String,

    pub event: RulesetEvent,

    /// When this message was created.
    pub timestamp: DateTime<Utc>,

    pub correlation_id: Uuid,
}

impl Message {
    pub fn new(event: impl Into<RulesetEvent>) -> Self {
        Self::with_correlation(event, Uuid::new_v4())
    }

    /// Create a message with an explicit correlation ID (for continuations).
    pub fn with_correlation(event: impl Into<RulesetEvent>, correlation_id: Uuid) -> Self {
        let event = event.into();
        Self {
            topic: event.topic().to_string(),
            event,
            timestamp: Utc::now(),
            correlation_id,
        }
    }

    pub fn matches(&self, topic_prefix: &str) -> bool {
        self.topic.starts_with(topic_prefix)
    }

    pub fn as_rule_changed(&self) -> Option<&RulesetRuleChanged> {
        match &self.event {
            RulesetEvent::RuleChanged(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_active_changed(&self) -> Option<&ActiveRulesetChanged> {
        match &self.event {
            RulesetEvent::ActiveChanged(e) => Some(e),
            _ => None,
        }
    }
}
