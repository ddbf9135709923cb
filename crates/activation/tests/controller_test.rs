//! Activation, refresh and notification behaviour of the controller against
//! the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;

use planetmans_activation::ActiveRulesetController;
use planetmans_bus::{BusError, EventPublisher, Message, RulesetBus, RulesetRuleChanged, Subscription};
use planetmans_core::{
    ActionRule, ItemCategoryRule, RuleSet, Ruleset, RulesetInfo, ScrimActionType,
};
use planetmans_rules::{MemoryRulesetStore, RulesetRepository, StaticCatalog};

const TIMEOUT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(100);

fn custom(id: i32, kill_max_points: i32) -> Ruleset {
    let rules = RuleSet {
        action_rules: vec![ActionRule::new(0, ScrimActionType::InfantryKillMax, kill_max_points)],
        item_category_rules: vec![ItemCategoryRule::new(0, 3, 2)],
        ..Default::default()
    };
    Ruleset::with_rules(RulesetInfo::new(id, format!("Custom {id}")), rules)
}

fn kill_max_points(ruleset: &Ruleset) -> i32 {
    ruleset
        .rules
        .action_rule(ScrimActionType::InfantryKillMax)
        .map(|r| r.points)
        .unwrap_or_default()
}

struct Harness {
    store: Arc<MemoryRulesetStore>,
    bus: RulesetBus,
    controller: Arc<ActiveRulesetController>,
}

fn build(store: MemoryRulesetStore, store_timeout: Option<Duration>) -> Harness {
    let store = Arc::new(store);
    let bus = RulesetBus::new();
    let repository = RulesetRepository::new(store.clone(), Arc::new(StaticCatalog::builtin()), 1);
    let controller = Arc::new(
        ActiveRulesetController::new(repository, bus.clone()).with_store_timeout(store_timeout),
    );
    Harness {
        store,
        bus,
        controller,
    }
}

/// Seeded default ruleset 1 plus custom rulesets 2 and 3.
async fn seeded() -> Harness {
    let harness = build(MemoryRulesetStore::new(), None);
    harness
        .controller
        .repository()
        .seed_default_ruleset()
        .await
        .unwrap();
    harness.store.upsert(custom(2, 10)).await;
    harness.store.upsert(custom(3, 4)).await;
    harness
}

async fn next_change(sub: &Subscription) -> (i32, Option<i32>) {
    let msg = sub.recv_timeout(TIMEOUT).await.unwrap();
    let change = msg.as_active_changed().unwrap();
    (change.current.id(), change.previous.as_ref().map(|r| r.id()))
}

async fn no_change(sub: &Subscription) {
    assert!(matches!(sub.recv_timeout(QUIET).await, Err(BusError::Timeout(_))));
}

// ── Activation ────────────────────────────────────────────────

#[tokio::test]
async fn activating_twice_performs_no_second_write() {
    let h = seeded().await;

    let first = h.controller.activate(2).await.unwrap();
    let commits = h.store.commit_count();
    let active_writes = h.store.set_active_count();
    assert_eq!(active_writes, 1);

    let second = h.controller.activate(2).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(h.store.commit_count(), commits);
    assert_eq!(h.store.set_active_count(), active_writes);
}

#[tokio::test]
async fn switch_and_revert_notify_with_previous() {
    let h = seeded().await;
    let sub = h.controller.subscribe();

    h.controller.activate(1).await.unwrap();
    assert_eq!(next_change(&sub).await, (1, None));

    h.controller.activate(2).await.unwrap();
    assert_eq!(next_change(&sub).await, (2, Some(1)));

    h.controller.activate(1).await.unwrap();
    assert_eq!(next_change(&sub).await, (1, Some(2)));

    assert_eq!(h.controller.activate(1).await.unwrap().id(), 1);
    no_change(&sub).await;
}

#[tokio::test]
async fn activation_records_active_id_in_store() {
    let h = seeded().await;
    h.controller.activate(3).await.unwrap();
    assert_eq!(h.controller.repository().active_id().await.unwrap(), Some(3));
    assert_eq!(h.controller.active_id().await, Some(3));
}

#[tokio::test]
async fn activating_unknown_id_keeps_current() {
    let h = seeded().await;
    let sub = h.controller.subscribe();
    h.controller.activate(2).await.unwrap();
    next_change(&sub).await;

    assert!(h.controller.activate(99).await.is_none());
    assert_eq!(h.controller.active_id().await, Some(2));
    no_change(&sub).await;
}

#[tokio::test]
async fn activated_custom_ruleset_is_reconciled_but_keeps_points() {
    let h = seeded().await;
    let ruleset = h.controller.activate(2).await.unwrap();

    assert_eq!(kill_max_points(&ruleset), 10);
    assert!(ruleset.rules.action_rule(ScrimActionType::ReviveInfantry).is_some());
    assert!(ruleset.rules.action_rule(ScrimActionType::Login).is_none());

    let stored = h.store.get(2).await.unwrap();
    assert_eq!(stored.rules, ruleset.rules);
}

// ── Defaults ──────────────────────────────────────────────────

#[tokio::test]
async fn cold_start_without_defaults_stays_unset() {
    let h = build(MemoryRulesetStore::new(), None);
    h.store.upsert(custom(2, 10)).await;
    let sub = h.controller.subscribe();

    assert!(h.controller.activate_default().await.is_none());
    assert!(h.controller.get_active(false).await.is_none());
    assert!(h.controller.cached().await.is_none());
    assert_eq!(h.store.set_active_count(), 0);
    no_change(&sub).await;
}

#[tokio::test]
async fn custom_default_wins_over_default() {
    let h = seeded().await;
    let mut preferred = custom(3, 4);
    preferred.info.is_custom_default = true;
    h.store.upsert(preferred).await;

    assert_eq!(h.controller.activate_default().await.unwrap().id(), 3);
}

#[tokio::test]
async fn get_active_activates_seeded_default() {
    let h = seeded().await;
    let active = h.controller.get_active(false).await.unwrap();
    assert_eq!(active.id(), 1);

    let rule = active
        .rules
        .action_rule(ScrimActionType::InfantryKillInfantry)
        .unwrap();
    assert!(rule.defer_to_item_category_rules);
    assert_eq!(rule.points, 0);
    assert!(active.rules.is_loaded());
}

#[tokio::test]
async fn forced_refresh_reloads_without_notification() {
    let h = seeded().await;
    h.controller.activate(2).await.unwrap();
    let sub = h.controller.subscribe();

    h.store.upsert(custom(2, 33)).await;
    assert_eq!(kill_max_points(&h.controller.get_active(false).await.unwrap()), 10);
    assert_eq!(kill_max_points(&h.controller.get_active(true).await.unwrap()), 33);
    assert_eq!(h.controller.active_id().await, Some(2));
    no_change(&sub).await;
}

#[tokio::test]
async fn resume_prefers_recorded_active_id() {
    let h = seeded().await;
    h.controller.repository().set_active_id(3).await.unwrap();
    assert_eq!(h.controller.resume().await.unwrap().id(), 3);

    let fresh = seeded().await;
    assert_eq!(fresh.controller.resume().await.unwrap().id(), 1);
}

// ── External edits ────────────────────────────────────────────

#[tokio::test]
async fn edit_of_inactive_ruleset_is_ignored() {
    let h = seeded().await;
    let before = h.controller.activate(2).await.unwrap();
    let commits = h.store.commit_count();

    h.store.upsert(custom(2, 25)).await;
    h.controller.on_external_rule_change(3).await;

    let after = h.controller.cached().await.unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(h.store.commit_count(), commits);
}

#[tokio::test]
async fn edit_of_active_ruleset_refreshes_cache() {
    let h = seeded().await;
    h.controller.activate(2).await.unwrap();
    let sub = h.controller.subscribe();

    h.store.upsert(custom(2, 25)).await;
    h.controller.on_external_rule_change(2).await;

    let active = h.controller.cached().await.unwrap();
    assert_eq!(active.id(), 2);
    assert_eq!(kill_max_points(&active), 25);
    no_change(&sub).await;
}

#[tokio::test]
async fn listener_refreshes_on_published_edit() {
    let h = seeded().await;
    h.controller.activate(2).await.unwrap();
    let listener = h.controller.spawn_change_listener();

    let edited = custom(2, 40);
    h.store.upsert(edited.clone()).await;
    h.bus
        .publish(Message::new(RulesetRuleChanged::updated(edited)))
        .await
        .unwrap();

    timeout(TIMEOUT, async {
        loop {
            let active = h.controller.cached().await.unwrap();
            if kill_max_points(&active) == 40 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("listener never refreshed the active ruleset");

    h.controller.shutdown();
    timeout(TIMEOUT, listener).await.unwrap().unwrap();
}

// ── Failures ──────────────────────────────────────────────────

#[tokio::test]
async fn store_failure_keeps_last_good_ruleset() {
    let h = seeded().await;
    let good = h.controller.activate(1).await.unwrap();
    let sub = h.controller.subscribe();

    h.store.fail_fetches(true);
    assert!(h.controller.activate(2).await.is_none());
    assert!(h.controller.refresh_active().await.is_none());
    assert!(Arc::ptr_eq(&good, &h.controller.cached().await.unwrap()));
    no_change(&sub).await;

    // The gate was released on the error paths.
    h.store.fail_fetches(false);
    assert_eq!(h.controller.activate(2).await.unwrap().id(), 2);
    assert_eq!(next_change(&sub).await, (2, Some(1)));
}

#[tokio::test]
async fn failed_active_write_does_not_switch() {
    let h = seeded().await;
    h.controller.activate(1).await.unwrap();

    h.store.fail_commits(true);
    assert!(h.controller.activate(2).await.is_none());
    assert_eq!(h.controller.active_id().await, Some(1));
    assert_eq!(h.controller.repository().active_id().await.unwrap(), Some(1));
}

#[tokio::test]
async fn timeout_is_a_store_failure_and_releases_gate() {
    let store = MemoryRulesetStore::new().with_latency(Duration::from_millis(300));
    let h = build(store, Some(Duration::from_millis(20)));
    h.store.upsert(custom(2, 10)).await;

    for _ in 0..2 {
        let result = timeout(TIMEOUT, h.controller.activate(2)).await.unwrap();
        assert!(result.is_none());
    }
    assert!(h.controller.cached().await.is_none());
}

#[tokio::test]
async fn shutdown_cancels_store_calls() {
    let h = seeded().await;
    h.controller.shutdown();
    assert!(h.controller.is_shut_down());
    assert!(h.controller.activate(1).await.is_none());
    assert!(h.controller.cached().await.is_none());
}

// ── Ordering ──────────────────────────────────────────────────

#[tokio::test]
async fn notification_follows_cache_update() {
    let h = seeded().await;
    let sub = h.controller.subscribe();

    h.controller.activate(3).await.unwrap();
    let (current, _) = next_change(&sub).await;
    assert_eq!(h.controller.get_active(false).await.unwrap().id(), current);
}

#[tokio::test]
async fn concurrent_activations_are_totally_ordered() {
    let h = seeded().await;
    let sub = h.controller.subscribe();

    let mut handles = Vec::new();
    for i in 0..12 {
        let controller = Arc::clone(&h.controller);
        let id = [1, 2, 3][i % 3];
        handles.push(tokio::spawn(async move { controller.activate(id).await }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_some());
    }

    // Every notification's previous is the one before's current.
    let mut last = None;
    while let Some(msg) = sub.try_recv() {
        let change = msg.as_active_changed().unwrap();
        assert_eq!(change.previous.as_ref().map(|r| r.id()), last);
        assert_ne!(Some(change.current.id()), last);
        last = Some(change.current.id());
    }
    assert_eq!(last, h.controller.active_id().await);
}

#[tokio::test]
async fn default_lookup_and_activation_share_one_reconciliation() {
    let store = MemoryRulesetStore::new().with_latency(Duration::from_millis(30));
    let h = build(store, None);
    let mut info = RulesetInfo::new(1, "Unreconciled default");
    info.is_default = true;
    h.store.upsert(Ruleset::new(info)).await;

    let (default, active) = tokio::join!(h.controller.default_ruleset(), h.controller.activate(1));

    let default = default.unwrap();
    let active = active.unwrap();
    assert_eq!(default.id(), 1);
    assert_eq!(default.rules, active.rules);
    assert!(active.rules.is_loaded());
    assert_eq!(h.store.commit_count(), 1);
}

#[tokio::test]
async fn list_all_returns_stored_rulesets() {
    let h = seeded().await;
    let ids: Vec<i32> = h
        .controller
        .list_all()
        .await
        .unwrap()
        .iter()
        .map(Ruleset::id)
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(h.controller.default_ruleset().await.unwrap().id(), 1);
}
