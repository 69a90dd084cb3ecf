//! Bot configuration loaded from TOML.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config directory name under the platform config dir.
pub const CONFIG_DIR: &str = "tyria";
/// Default database filename inside the data directory.
pub const DB_FILE: &str = "tyria.db";

/// Resolve the global configuration directory (`~/.config/tyria/` on unix).
pub fn global_config_dir() -> PathBuf {
    dirs::config_dir()
        .expect("no platform config directory")
        .join(CONFIG_DIR)
}

/// Top-level bot configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// GW2 API client settings.
    pub api: ApiConfig,
    /// Session tracker settings.
    pub tracker: TrackerConfig,
    /// Storage settings.
    pub storage: StorageConfig,
}

/// GW2 API client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Attempts for 502/503/504 and transport errors.
    pub retries: u32,
    /// Delay between those attempts, in seconds.
    pub retry_delay_secs: u64,
    /// User-Agent header sent on every request.
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_delay_secs: 1,
            user_agent: "tyria-bot/0.1 (+https://github.com/tyria-bot/tyria)".into(),
        }
    }
}

/// Session tracker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Delay before a background snapshot retry, in seconds.
    pub background_retry_delay_secs: u64,
    /// Background attempts before giving up and notifying the user.
    pub background_max_attempts: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            background_retry_delay_secs: 300,
            background_max_attempts: 3,
        }
    }
}

/// Storage settings.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database path. When `None`, defaults to
    /// `<config_dir>/tyria.db`.
    pub db_path: Option<PathBuf>,
}

impl BotConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    /// The database path, defaulting under the global config dir.
    pub fn db_path(&self) -> PathBuf {
        self.storage
            .db_path
            .clone()
            .unwrap_or_else(|| global_config_dir().join(DB_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = BotConfig::default();
        assert_eq!(config.api.retries, 3);
        assert_eq!(config.tracker.background_max_attempts, 3);
        assert!(config.storage.db_path.is_none());
    }

    #[test]
    fn load_partial_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tyria.toml");
        std::fs::write(
            &path,
            "[tracker]\nbackground_retry_delay_secs = 60\n\n[storage]\ndb_path = \"/tmp/t.db\"\n",
        )
        .unwrap();
        let config = BotConfig::load(&path).unwrap();
        assert_eq!(config.tracker.background_retry_delay_secs, 60);
        // Untouched sections fall back to defaults.
        assert_eq!(config.api.retries, 3);
        assert_eq!(config.db_path(), PathBuf::from("/tmp/t.db"));
    }

    #[test]
    fn load_missing_file_errors() {
        assert!(BotConfig::load("/nonexistent/tyria.toml").is_err());
    }
}
