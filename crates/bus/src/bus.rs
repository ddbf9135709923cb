//! [`RulesetBus`]: in-process publish/subscribe with explicit registration.
//!
//! Each subscriber owns its own unbounded FIFO queue, so a slow subscriber
//! never blocks the publisher or other subscribers. Handler subscribers run
//! inline on the publishing task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::BusError;
use crate::message::Message;
use crate::traits::{EventPublisher, EventSubscriber};

/// Handle identifying one registration on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&Message) + Send + Sync>;

#[derive(Clone)]
enum Sink {
    Queue(mpsc::UnboundedSender<Message>),
    Handler(Handler),
}

struct Entry {
    id: SubscriptionId,
    prefixes: Vec<String>,
    sink: Sink,
}

impl Entry {
    fn wants(&self, message: &Message) -> bool {
        self.prefixes.iter().any(|p| message.matches(p))
    }
}

#[derive(Default)]
struct Registry {
    entries: Mutex<Vec<Entry>>,
    next_id: AtomicU64,
}

impl Registry {
    fn entries(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, prefix: &str, sink: Sink) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries().push(Entry {
            id,
            prefixes: vec![prefix.to_string()],
            sink,
        });
        id
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        entries.len() != before
    }

    fn add_prefix(&self, id: SubscriptionId, prefix: &str) -> bool {
        match self.entries().iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.prefixes.push(prefix.to_string());
                true
            }
            None => false,
        }
    }
}

/// Cloneable handle to a shared in-process bus.
#[derive(Clone, Default)]
pub struct RulesetBus {
    registry: Arc<Registry>,
}

impl RulesetBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a queued subscriber for topics starting with `topic_prefix`.
    ///
    /// The registration is removed when the returned [`Subscription`] is
    /// dropped or passed to [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe(&self, topic_prefix: &str) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.registry.register(topic_prefix, Sink::Queue(tx));
        debug!(subscription = id.0, topic_prefix, "registered subscriber");
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    /// Register a handler invoked synchronously on the publishing task.
    pub fn subscribe_handler<F>(&self, topic_prefix: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let id = self
            .registry
            .register(topic_prefix, Sink::Handler(Arc::new(handler)));
        debug!(subscription = id.0, topic_prefix, "registered handler");
        id
    }

    /// Remove a registration. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.registry.remove(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.entries().len()
    }

    /// Deliver `message` to every matching subscriber; returns how many got it.
    ///
    /// Queued subscribers whose receiving side is gone are pruned.
    pub fn publish_now(&self, message: Message) -> usize {
        let sinks: Vec<(SubscriptionId, Sink)> = self
            .registry
            .entries()
            .iter()
            .filter(|e| e.wants(&message))
            .map(|e| (e.id, e.sink.clone()))
            .collect();

        let mut delivered = 0;
        for (id, sink) in sinks {
            match sink {
                Sink::Queue(tx) => {
                    if tx.send(message.clone()).is_ok() {
                        delivered += 1;
                    } else {
                        self.registry.remove(id);
                    }
                }
                Sink::Handler(handler) => {
                    handler(&message);
                    delivered += 1;
                }
            }
        }

        debug!(topic = %message.topic, delivered, "published message");
        delivered
    }
}

#[async_trait]
impl EventPublisher for RulesetBus {
    async fn publish(&self, message: Message) -> Result<(), BusError> {
        self.publish_now(message);
        Ok(())
    }
}

/// Queued subscriber handle. Dropping it tears the registration down.
pub struct Subscription {
    id: SubscriptionId,
    registry: Weak<Registry>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Message>>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Receive the next message, giving up after `timeout`.
    pub async fn recv_timeout(&self, timeout: Duration) -> Result<Message, BusError> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(result) => result,
            Err(_) => Err(BusError::Timeout(timeout)),
        }
    }

    /// Take a message if one is already queued.
    pub fn try_recv(&self) -> Option<Message> {
        self.rx.try_lock().ok()?.try_recv().ok()
    }
}

#[async_trait]
impl EventSubscriber for Subscription {
    async fn subscribe(&self, topic_prefix: &str) -> Result<(), BusError> {
        let registry = self.registry.upgrade().ok_or(BusError::Closed)?;
        if registry.add_prefix(self.id, topic_prefix) {
            Ok(())
        } else {
            Err(BusError::Closed)
        }
    }

    async fn recv(&self) -> Result<Message, BusError> {
        self.rx.lock().await.recv().await.ok_or(BusError::Closed)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::events::RulesetRuleChanged;
    use crate::topics;
    use planetmans_core::{Ruleset, RulesetInfo};

    fn rule_changed(id: i32) -> Message {
        Message::new(RulesetRuleChanged::updated(Ruleset::new(RulesetInfo::new(id, "r"))))
    }

    #[test]
    fn publish_without_subscribers_delivers_nothing() {
        let bus = RulesetBus::new();
        assert_eq!(bus.publish_now(rule_changed(1)), 0);
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let bus = RulesetBus::new();
        let sub = bus.subscribe(topics::RULESET_PREFIX);
        assert_eq!(bus.subscriber_count(), 1);
        drop(sub);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn handler_runs_inline() {
        let bus = RulesetBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let id = bus.subscribe_handler(topics::RULESET_RULE_CHANGED, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(bus.publish_now(rule_changed(1)), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish_now(rule_changed(1));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn try_recv_takes_queued_message() {
        let bus = RulesetBus::new();
        let sub = bus.subscribe(topics::RULESET_RULE_CHANGED);
        assert!(sub.try_recv().is_none());
        bus.publish_now(rule_changed(5));
        let msg = sub.try_recv().unwrap();
        assert_eq!(msg.as_rule_changed().unwrap().ruleset_id(), 5);
    }
}
