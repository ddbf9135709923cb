//! [`FileRulesetStore`]: one YAML file per ruleset in a directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::fs;
use tracing::{debug, info, warn};

use planetmans_bus::RulesetBus;
use planetmans_core::{Ruleset, RulesetId};

use super::watcher::{file_ruleset_id, handle_fs_event};
use super::{first_flagged, ReconcilePlan, RulesetStore};
use crate::error::{Result, RulesetError};

const ACTIVE_MARKER: &str = ".active-ruleset";

/// Rulesets stored as `ruleset-<id>.yml` files, with the active id kept in a
/// `.active-ruleset` marker file next to them.
///
/// Every write goes to a dotfile first and is renamed into place, so readers
/// (and the watcher) only ever see complete files.
pub struct FileRulesetStore {
    dir: PathBuf,
    /// Serializes read-modify-write commits.
    commit_lock: tokio::sync::Mutex<()>,
    /// Active filesystem watcher (held to keep it alive).
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl FileRulesetStore {
    /// Open the store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        info!(path = %dir.display(), "opened ruleset store");
        Ok(Self {
            dir,
            commit_lock: tokio::sync::Mutex::new(()),
            watcher: Mutex::new(None),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: RulesetId) -> PathBuf {
        self.dir.join(format!("ruleset-{id}.yml"))
    }

    /// Write `ruleset` to its file, replacing any previous version atomically.
    pub async fn write_ruleset(&self, ruleset: &Ruleset) -> Result<PathBuf> {
        let final_path = self.path_for(ruleset.id());
        let yaml = serde_yaml::to_string(ruleset)?;
        self.write_atomic(&final_path, yaml.as_bytes()).await?;
        debug!(ruleset_id = ruleset.id(), path = %final_path.display(), "wrote ruleset file");
        Ok(final_path)
    }

    /// Start a filesystem watcher that publishes a rule-changed event for
    /// every ruleset file created or modified in the store directory.
    ///
    /// Files that fail to parse are logged and skipped.
    pub fn watch(&self, bus: RulesetBus) -> Result<()> {
        let mut watcher = notify::recommended_watcher(
            move |res: std::result::Result<notify::Event, notify::Error>| match res {
                Ok(event) => handle_fs_event(&event, &bus),
                Err(e) => warn!(error = %e, "filesystem watcher error"),
            },
        )?;

        watcher.watch(&self.dir, RecursiveMode::NonRecursive)?;
        let _ = watcher.configure(notify::Config::default().with_poll_interval(Duration::from_millis(500)));

        info!(path = %self.dir.display(), "watching ruleset directory for changes");
        *self.watcher.lock().unwrap_or_else(PoisonError::into_inner) = Some(watcher);
        Ok(())
    }

    /// Stop the watcher started by [`watch`](Self::watch), if any.
    pub fn unwatch(&self) {
        self.watcher.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    async fn write_atomic(&self, final_path: &Path, contents: &[u8]) -> Result<()> {
        let file_name = final_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("ruleset");
        let tmp_path = self.dir.join(format!(".{file_name}.tmp"));
        fs::write(&tmp_path, contents).await?;
        fs::rename(&tmp_path, final_path).await?;
        Ok(())
    }

    /// Read the file holding ruleset `id`. A file whose contents carry a
    /// different id is an error.
    async fn read_ruleset(&self, path: &Path, id: RulesetId) -> Result<Option<Ruleset>> {
        let contents = match fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let ruleset: Ruleset = serde_yaml::from_str(&contents)?;
        if ruleset.id() != id {
            return Err(RulesetError::Store(format!(
                "{} holds ruleset {}, expected {id}",
                path.display(),
                ruleset.id()
            )));
        }
        Ok(Some(ruleset))
    }

    /// Parse every ruleset file in the directory, ordered by id.
    ///
    /// Only `ruleset-<id>.yml` files are considered. Unparseable files and
    /// files whose id does not match their name are logged and left out.
    async fn load_all(&self) -> Result<Vec<Ruleset>> {
        let mut entries = fs::read_dir(&self.dir).await?;
        let mut rulesets = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(id) = file_ruleset_id(&path) else {
                continue;
            };
            match self.read_ruleset(&path, id).await {
                Ok(Some(ruleset)) => rulesets.push(ruleset),
                Ok(None) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable ruleset file"),
            }
        }

        rulesets.sort_by_key(Ruleset::id);
        Ok(rulesets)
    }
}

#[async_trait]
impl RulesetStore for FileRulesetStore {
    async fn fetch_ruleset(&self, id: RulesetId) -> Result<Option<Ruleset>> {
        self.read_ruleset(&self.path_for(id), id).await
    }

    async fn fetch_default_flagged(&self) -> Result<Option<Ruleset>> {
        let rulesets = self.load_all().await?;
        Ok(first_flagged(&rulesets, Ruleset::is_default).cloned())
    }

    async fn fetch_custom_default_flagged(&self) -> Result<Option<Ruleset>> {
        let rulesets = self.load_all().await?;
        Ok(first_flagged(&rulesets, Ruleset::is_custom_default).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Ruleset>> {
        self.load_all().await
    }

    async fn set_active_id(&self, id: RulesetId) -> Result<()> {
        let marker = self.dir.join(ACTIVE_MARKER);
        self.write_atomic(&marker, id.to_string().as_bytes()).await?;
        debug!(ruleset_id = id, "recorded active ruleset");
        Ok(())
    }

    async fn active_id(&self) -> Result<Option<RulesetId>> {
        let marker = self.dir.join(ACTIVE_MARKER);
        match fs::read_to_string(&marker).await {
            Ok(contents) => contents.trim().parse().map(Some).map_err(|e| {
                RulesetError::Store(format!("invalid active ruleset marker {:?}: {e}", contents.trim()))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn commit_reconciliation(&self, plan: &ReconcilePlan) -> Result<()> {
        let _guard = self.commit_lock.lock().await;
        let id = plan.ruleset_id();
        let existing = self.read_ruleset(&self.path_for(id), id).await?;
        let updated = plan.apply(existing.as_ref())?;
        self.write_ruleset(&updated).await?;
        Ok(())
    }
}
