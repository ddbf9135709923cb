use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ruleset::RulesetId;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_i32(profile: &str, key: &str, default: i32) -> i32 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_bool(profile: &str, key: &str, default: bool) -> bool {
    match profiled_env_opt(profile, key) {
        Some(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        None => default,
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub storage: StorageConfig,
    pub rulesets: RulesetConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `PLANETMANS_PROFILE`. When set (e.g. `PROD`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("PLANETMANS_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            storage: StorageConfig::from_env_profiled(p),
            rulesets: RulesetConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.rulesets.default_ruleset_id <= 0 {
            return Err(CoreError::Config(format!(
                "DEFAULT_RULESET_ID must be positive, got {}",
                self.rulesets.default_ruleset_id
            )));
        }
        if self.storage.data_dir.as_os_str().is_empty() {
            return Err(CoreError::Config("DATA_DIR must not be empty".to_string()));
        }
        Ok(())
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  storage:     data_dir={}", self.storage.data_dir.display());
        tracing::info!(
            "  rulesets:    default_id={}, catalog={}, timeout={:?}, watch={}",
            self.rulesets.default_ruleset_id,
            self.rulesets
                .catalog_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(builtin)".to_string()),
            self.rulesets.store_timeout,
            self.rulesets.watch,
        );
    }
}

// ── Storage ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            data_dir: PathBuf::from(profiled_env_or(p, "DATA_DIR", "data")),
        }
    }

    /// Directory holding one YAML file per ruleset.
    pub fn rulesets_dir(&self) -> PathBuf {
        self.data_dir.join("rulesets")
    }
}

// ── Rulesets ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesetConfig {
    /// Id of the baseline ruleset seeded from the built-in defaults.
    pub default_ruleset_id: RulesetId,
    /// Optional YAML catalog file; the built-in catalog is used when unset.
    pub catalog_path: Option<PathBuf>,
    /// Upper bound for a single store or catalog call (`None` = unbounded).
    pub store_timeout: Option<Duration>,
    /// Watch the rulesets directory for external edits.
    pub watch: bool,
}

impl Default for RulesetConfig {
    fn default() -> Self {
        Self {
            default_ruleset_id: 1,
            catalog_path: None,
            store_timeout: None,
            watch: true,
        }
    }
}

impl RulesetConfig {
    fn from_env_profiled(p: &str) -> Self {
        let timeout_ms = profiled_env_u64(p, "STORE_TIMEOUT_MS", 0);
        Self {
            default_ruleset_id: profiled_env_i32(p, "DEFAULT_RULESET_ID", 1),
            catalog_path: profiled_env_opt(p, "CATALOG_PATH").map(PathBuf::from),
            store_timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
            watch: profiled_env_bool(p, "WATCH_RULESETS", true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_env() {
        let config = Config::for_profile("PLANETMANS_TEST_UNSET_PROFILE");
        assert_eq!(config.profile, "PLANETMANS_TEST_UNSET_PROFILE");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn profiled_key_wins_over_plain_key() {
        env::set_var("CFGTEST_DEFAULT_RULESET_ID", "7");
        env::set_var("CFGTEST_STORE_TIMEOUT_MS", "250");
        env::set_var("CFGTEST_WATCH_RULESETS", "false");
        let config = Config::for_profile("cfgtest");
        assert_eq!(config.rulesets.default_ruleset_id, 7);
        assert_eq!(config.rulesets.store_timeout, Some(Duration::from_millis(250)));
        assert!(!config.rulesets.watch);
        env::remove_var("CFGTEST_DEFAULT_RULESET_ID");
        env::remove_var("CFGTEST_STORE_TIMEOUT_MS");
        env::remove_var("CFGTEST_WATCH_RULESETS");
    }

    #[test]
    fn non_positive_default_id_is_invalid() {
        let mut config = Config::for_profile("");
        config.rulesets.default_ruleset_id = 0;
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn rulesets_dir_is_under_data_dir() {
        let storage = StorageConfig {
            data_dir: PathBuf::from("/tmp/pm"),
        };
        assert_eq!(storage.rulesets_dir(), PathBuf::from("/tmp/pm/rulesets"));
    }
}
