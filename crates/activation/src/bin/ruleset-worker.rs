//! ruleset-worker: keeps the active scrim ruleset loaded and current.
//!
//! Opens the YAML ruleset store, seeds the default ruleset, activates the
//! recorded (or default) ruleset and then follows edits to the store
//! directory until interrupted. Every active-ruleset switch is logged.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use planetmans_activation::ActiveRulesetController;
use planetmans_bus::{EventSubscriber, RulesetBus};
use planetmans_core::config::{self, Config};
use planetmans_rules::{FileRulesetStore, RuleCatalogSource, RulesetRepository, StaticCatalog};

// ── CLI ─────────────────────────────────────────────────────────────

/// Ruleset worker: activation, seeding and hot reload of scrim rulesets.
#[derive(Parser, Debug)]
#[command(name = "ruleset-worker", version, about)]
struct Cli {
    /// Data directory; rulesets live under `<data_dir>/rulesets`.
    #[arg(long, env = "DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// YAML catalog of valid action types, categories and weapon items.
    #[arg(long, env = "CATALOG_PATH")]
    catalog: Option<PathBuf>,

    /// Activate this ruleset instead of the recorded or default one.
    #[arg(long)]
    ruleset: Option<i32>,

    /// Skip the default-ruleset seeding pass.
    #[arg(long)]
    no_seed: bool,

    /// Do not watch the ruleset directory for edits.
    #[arg(long)]
    no_watch: bool,
}

// ── main ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    config::load_dotenv();
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = dir;
    }
    if let Some(path) = cli.catalog {
        config.rulesets.catalog_path = Some(path);
    }
    if cli.no_watch {
        config.rulesets.watch = false;
    }
    config.validate()?;
    config.log_summary();

    let store = Arc::new(FileRulesetStore::open(config.storage.rulesets_dir()).await?);

    let catalog: Arc<dyn RuleCatalogSource> = match &config.rulesets.catalog_path {
        Some(path) => Arc::new(StaticCatalog::from_file(path)?),
        None => {
            info!("no catalog file configured, using built-in catalog");
            Arc::new(StaticCatalog::builtin())
        }
    };

    let bus = RulesetBus::new();
    let repository = RulesetRepository::new(store.clone(), catalog, config.rulesets.default_ruleset_id);

    if !cli.no_seed {
        let seeded = repository.seed_default_ruleset().await?;
        info!(ruleset_id = seeded.id(), rules = seeded.rules.len(), "default ruleset ready");
    }

    let controller = Arc::new(
        ActiveRulesetController::new(repository, bus.clone())
            .with_store_timeout(config.rulesets.store_timeout),
    );

    // Log every switch for as long as the worker runs.
    let changes = controller.subscribe();
    let change_logger = tokio::spawn(async move {
        while let Ok(msg) = changes.recv().await {
            if let Some(change) = msg.as_active_changed() {
                info!(
                    ruleset_id = change.current.id(),
                    name = %change.current.name(),
                    previous = ?change.previous.as_ref().map(|r| r.id()),
                    "active ruleset changed"
                );
            }
        }
    });

    let active = match cli.ruleset {
        Some(id) => controller.activate(id).await,
        None => controller.resume().await,
    };
    match &active {
        Some(ruleset) => info!(ruleset_id = ruleset.id(), name = %ruleset.name(), "worker started"),
        None => warn!("worker started without an active ruleset"),
    }

    let listener = controller.spawn_change_listener();
    if config.rulesets.watch {
        store.watch(bus.clone())?;
    }

    tokio::signal::ctrl_c().await?;
    info!("received Ctrl-C, shutting down");

    controller.shutdown();
    store.unwatch();
    if tokio::time::timeout(Duration::from_secs(10), listener).await.is_err() {
        warn!("change listener did not stop in time");
    }
    change_logger.abort();

    info!("ruleset-worker stopped");
    Ok(())
}
