//! End-to-end: YAML file store, directory watcher and change listener.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::time::timeout;

use planetmans_activation::ActiveRulesetController;
use planetmans_bus::RulesetBus;
use planetmans_core::{ActionRule, RuleSet, Ruleset, RulesetInfo, ScrimActionType};
use planetmans_rules::{FileRulesetStore, RulesetRepository, RulesetStore, StaticCatalog};

const TIMEOUT: Duration = Duration::from_secs(5);

fn custom(id: i32, points: i32) -> Ruleset {
    let rules = RuleSet {
        action_rules: vec![ActionRule::new(0, ScrimActionType::MaxKillMax, points)],
        ..Default::default()
    };
    Ruleset::with_rules(RulesetInfo::new(id, "Tournament"), rules)
}

fn controller_over(store: Arc<FileRulesetStore>, bus: &RulesetBus) -> Arc<ActiveRulesetController> {
    let repository = RulesetRepository::new(store, Arc::new(StaticCatalog::builtin()), 1);
    Arc::new(ActiveRulesetController::new(repository, bus.clone()))
}

#[tokio::test]
async fn seeded_store_survives_restart() {
    let dir = TempDir::new().unwrap();
    let bus = RulesetBus::new();

    {
        let store = Arc::new(FileRulesetStore::open(dir.path()).await.unwrap());
        store.write_ruleset(&custom(2, 7)).await.unwrap();
        let controller = controller_over(store, &bus);
        controller.repository().seed_default_ruleset().await.unwrap();
        assert_eq!(controller.activate(2).await.unwrap().id(), 2);
    }

    let store = Arc::new(FileRulesetStore::open(dir.path()).await.unwrap());
    assert_eq!(store.active_id().await.unwrap(), Some(2));
    let controller = controller_over(store.clone(), &bus);

    let resumed = controller.resume().await.unwrap();
    assert_eq!(resumed.id(), 2);
    let points = resumed.rules.action_rule(ScrimActionType::MaxKillMax).unwrap().points;
    assert_eq!(points, 7);

    let default = store.fetch_default_flagged().await.unwrap().unwrap();
    assert_eq!(default.id(), 1);
    assert_eq!(default.info.default_match_title, "PS2 Scrims");
}

#[tokio::test]
async fn file_edit_of_active_ruleset_reaches_cache() {
    let dir = TempDir::new().unwrap();
    let bus = RulesetBus::new();
    let store = Arc::new(FileRulesetStore::open(dir.path()).await.unwrap());
    store.write_ruleset(&custom(2, 7)).await.unwrap();

    let controller = controller_over(store.clone(), &bus);
    controller.activate(2).await.unwrap();
    let listener = controller.spawn_change_listener();
    store.watch(bus.clone()).unwrap();

    // Edit the reconciled file the way an external editor would.
    let mut edited = store.fetch_ruleset(2).await.unwrap().unwrap();
    for rule in &mut edited.rules.action_rules {
        if rule.action_type == ScrimActionType::MaxKillMax {
            rule.points = 50;
        }
    }
    store.write_ruleset(&edited).await.unwrap();

    timeout(TIMEOUT, async {
        loop {
            let active = controller.cached().await.unwrap();
            if active.rules.action_rule(ScrimActionType::MaxKillMax).map(|r| r.points) == Some(50) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("watcher edit never reached the active ruleset");

    controller.shutdown();
    store.unwatch();
    timeout(TIMEOUT, listener).await.unwrap().unwrap();
}

#[tokio::test]
async fn copied_file_with_foreign_id_is_not_activated() {
    let dir = TempDir::new().unwrap();
    let bus = RulesetBus::new();
    let store = Arc::new(FileRulesetStore::open(dir.path()).await.unwrap());
    let original = store.write_ruleset(&custom(2, 7)).await.unwrap();
    std::fs::copy(&original, store.path_for(5)).unwrap();

    let controller = controller_over(store.clone(), &bus);
    assert_eq!(controller.activate(2).await.unwrap().id(), 2);
    assert!(controller.activate(5).await.is_none());

    assert_eq!(controller.active_id().await, Some(2));
    assert_eq!(store.active_id().await.unwrap(), Some(2));
    let copy = std::fs::read_to_string(store.path_for(5)).unwrap();
    assert!(copy.lines().any(|line| line == "id: 2"));
}
