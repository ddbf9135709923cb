//! [`ActiveRulesetController`]: the single active-ruleset slot.
//!
//! `activate`, `refresh_active` and `default_ruleset` run under one
//! non-reentrant gate that is held across their store I/O and released on
//! every exit path. Every path that can commit a reconciliation goes through
//! it, so two passes over the same ruleset never race. The cached
//! ruleset is only written while the gate is held. Failures never leave the
//! controller: they are logged and reported as `None`, and the cache keeps
//! its last good value.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use planetmans_bus::topics;
use planetmans_bus::{ActiveRulesetChanged, EventSubscriber, Message, RulesetBus, Subscription};
use planetmans_core::{Ruleset, RulesetId};
use planetmans_rules::{RulesetError, RulesetRepository, Result};

pub struct ActiveRulesetController {
    repository: RulesetRepository,
    bus: RulesetBus,
    gate: Mutex<()>,
    active: RwLock<Option<Arc<Ruleset>>>,
    cancel: CancellationToken,
    store_timeout: Option<Duration>,
}

impl ActiveRulesetController {
    pub fn new(repository: RulesetRepository, bus: RulesetBus) -> Self {
        Self {
            repository,
            bus,
            gate: Mutex::new(()),
            active: RwLock::new(None),
            cancel: CancellationToken::new(),
            store_timeout: None,
        }
    }

    /// Bound every store and catalog call by `timeout` (`None` = unbounded).
    pub fn with_store_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn repository(&self) -> &RulesetRepository {
        &self.repository
    }

    // ── Reads ─────────────────────────────────────────────────

    /// Cached active ruleset, without loading anything.
    pub async fn cached(&self) -> Option<Arc<Ruleset>> {
        self.active.read().await.clone()
    }

    /// Id of the cached active ruleset.
    pub async fn active_id(&self) -> Option<RulesetId> {
        self.active.read().await.as_ref().map(|r| r.id())
    }

    /// The active ruleset, activating the default one if nothing is active.
    ///
    /// Reloads first when `force_refresh` is set or the cached ruleset is
    /// missing action or item category rules. A failed reload returns the
    /// previously cached value.
    pub async fn get_active(&self, force_refresh: bool) -> Option<Arc<Ruleset>> {
        let current = match self.cached().await {
            Some(current) => current,
            None => self.activate_default().await?,
        };

        if force_refresh || !current.rules.is_loaded() {
            return self.refresh_active().await.or(Some(current));
        }
        Some(current)
    }

    /// Every stored ruleset, ordered by id.
    pub async fn list_all(&self) -> Result<Vec<Ruleset>> {
        self.guarded(self.repository.list_all()).await
    }

    /// The default-flagged ruleset with reconciled rules.
    pub async fn default_ruleset(&self) -> Result<Ruleset> {
        let _gate = self.gate.lock().await;
        self.guarded(self.repository.default_ruleset()).await
    }

    /// Subscribe to active-ruleset-changed notifications.
    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe(topics::ACTIVE_RULESET_CHANGED)
    }

    // ── Activation ────────────────────────────────────────────

    /// Make `id` the active ruleset.
    ///
    /// Requesting the ruleset that is already active returns it without any
    /// store I/O. Otherwise the target is loaded (and reconciled), recorded
    /// as active in the store, cached, and only then announced.
    pub async fn activate(&self, id: RulesetId) -> Option<Arc<Ruleset>> {
        let _gate = self.gate.lock().await;

        if let Some(current) = self.cached().await {
            if current.id() == id {
                debug!(ruleset_id = id, "ruleset already active");
                return Some(current);
            }
        }

        match self.switch_to(id).await {
            Ok(ruleset) => Some(ruleset),
            Err(e) if e.is_store_failure() => {
                error!(ruleset_id = id, error = %e, "failed to activate ruleset");
                None
            }
            Err(e) => {
                warn!(ruleset_id = id, error = %e, "active ruleset unchanged");
                None
            }
        }
    }

    /// Activate the custom-default ruleset, or the default one when no
    /// custom default is flagged.
    pub async fn activate_default(&self) -> Option<Arc<Ruleset>> {
        match self.select_default().await {
            Ok(id) => self.activate(id).await,
            Err(e) if e.is_store_failure() => {
                error!(error = %e, "failed to look up default ruleset");
                None
            }
            Err(e) => {
                warn!(error = %e, "no default ruleset to activate");
                None
            }
        }
    }

    /// Re-activate the ruleset the store last recorded as active, falling
    /// back to [`activate_default`](Self::activate_default).
    pub async fn resume(&self) -> Option<Arc<Ruleset>> {
        match self.guarded(self.repository.active_id()).await {
            Ok(Some(id)) => {
                if let Some(ruleset) = self.activate(id).await {
                    return Some(ruleset);
                }
                warn!(ruleset_id = id, "recorded active ruleset unavailable, using default");
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to read recorded active ruleset"),
        }
        self.activate_default().await
    }

    /// Reload the active ruleset in place, without changing which id is
    /// active and without a notification.
    pub async fn refresh_active(&self) -> Option<Arc<Ruleset>> {
        let _gate = self.gate.lock().await;

        let Some(id) = self.active_id().await else {
            debug!("no active ruleset to refresh");
            return None;
        };

        match self.guarded(self.repository.fetch_ruleset_by_id(id)).await {
            Ok(Some(ruleset)) => {
                let ruleset = Arc::new(ruleset);
                *self.active.write().await = Some(Arc::clone(&ruleset));
                info!(ruleset_id = id, rules = ruleset.rules.len(), "refreshed active ruleset");
                Some(ruleset)
            }
            Ok(None) => {
                warn!(ruleset_id = id, "active ruleset missing from store, keeping cached copy");
                None
            }
            Err(e) => {
                warn!(ruleset_id = id, error = %e, "failed to refresh active ruleset");
                None
            }
        }
    }

    /// React to an external edit of ruleset `changed_id`.
    pub async fn on_external_rule_change(&self, changed_id: RulesetId) {
        match self.active_id().await {
            Some(active) if active == changed_id => {
                debug!(ruleset_id = changed_id, "active ruleset edited, refreshing");
                self.refresh_active().await;
            }
            _ => debug!(ruleset_id = changed_id, "ignoring edit of inactive ruleset"),
        }
    }

    // ── Background ────────────────────────────────────────────

    /// Consume rule-changed events until [`shutdown`](Self::shutdown).
    ///
    /// The subscription is registered before this returns, so every event
    /// published afterwards is seen.
    pub fn spawn_change_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let controller = Arc::clone(self);
        let subscription = self.bus.subscribe(topics::RULESET_RULE_CHANGED);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = controller.cancel.cancelled() => {
                        info!("ruleset change listener shutting down");
                        break;
                    }
                    result = subscription.recv() => match result {
                        Ok(msg) => {
                            if let Some(change) = msg.as_rule_changed() {
                                controller.on_external_rule_change(change.ruleset_id()).await;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "ruleset change subscription closed");
                            break;
                        }
                    },
                }
            }
        })
    }

    /// Cancel in-flight store calls and stop the change listener.
    pub fn shutdown(&self) {
        info!("shutting down active ruleset controller");
        self.cancel.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    // ── Internals ─────────────────────────────────────────────

    /// Caller holds the gate.
    async fn switch_to(&self, id: RulesetId) -> Result<Arc<Ruleset>> {
        let ruleset = self
            .guarded(self.repository.fetch_ruleset_by_id(id))
            .await?
            .ok_or(RulesetError::NotFound(id))?;
        self.guarded(self.repository.set_active_id(id)).await?;

        let ruleset = Arc::new(ruleset);
        let previous = self.active.write().await.replace(Arc::clone(&ruleset));

        info!(
            ruleset_id = id,
            name = %ruleset.name(),
            previous = ?previous.as_ref().map(|r| r.id()),
            "activated ruleset"
        );
        self.bus.publish_now(Message::new(ActiveRulesetChanged {
            current: Arc::clone(&ruleset),
            previous,
        }));
        Ok(ruleset)
    }

    async fn select_default(&self) -> Result<RulesetId> {
        if let Some(custom) = self
            .guarded(self.repository.fetch_custom_default_flagged())
            .await?
        {
            return Ok(custom.id());
        }
        self.guarded(self.repository.fetch_default_flagged())
            .await?
            .map(|r| r.id())
            .ok_or(RulesetError::NoDefaultConfigured)
    }

    /// Race `call` against cancellation and the store timeout.
    async fn guarded<T, F>(&self, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let bounded = async {
            match self.store_timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .unwrap_or(Err(RulesetError::Timeout(limit))),
                None => call.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(RulesetError::Cancelled),
            result = bounded => result,
        }
    }
}
