//! Configuration management
//!
//! Reads the optional settings.json in the data directory:
//! ```json
//! {
//!   "database": "subscriptions.duckdb",
//!   "logLevel": "info",
//!   "eventLog": true
//! }
//! ```
//! Keys this crate does not manage are kept when saving.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::result::Error;
use crate::ports::LogLevel;

/// Default database file name inside the data directory
pub const DEFAULT_DATABASE: &str = "subscriptions.duckdb";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    log_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    event_log: Option<bool>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

impl SettingsFile {
    fn read(settings_path: &Path) -> Result<Self> {
        if !settings_path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(settings_path)?;
        Ok(serde_json::from_str(&content).unwrap_or_default())
    }
}

/// Subtrack configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Database file, relative to the data directory unless absolute
    pub database: String,
    pub log_level: LogLevel,
    /// Record store events in logs.duckdb
    pub event_log: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            log_level: LogLevel::Info,
            event_log: true,
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// A malformed settings.json yields the defaults. `SUBTRACK_DATABASE` and
    /// `SUBTRACK_LOG_LEVEL` override the file.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = SettingsFile::read(&data_dir.join("settings.json"))?;
        let mut config = Self::from_settings(&raw);
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn from_settings(raw: &SettingsFile) -> Self {
        let defaults = Self::default();
        Self {
            database: raw
                .database
                .clone()
                .filter(|db| !db.is_empty())
                .unwrap_or(defaults.database),
            log_level: raw
                .log_level
                .as_deref()
                .and_then(|level| level.parse().ok())
                .unwrap_or(defaults.log_level),
            event_log: raw.event_log.unwrap_or(defaults.event_log),
        }
    }

    /// Apply environment overrides through `lookup`
    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(database) = lookup("SUBTRACK_DATABASE").filter(|db| !db.is_empty()) {
            self.database = database;
        }
        if let Some(level) = lookup("SUBTRACK_LOG_LEVEL").filter(|l| !l.is_empty()) {
            self.log_level = level
                .parse()
                .map_err(|e: String| Error::Config(format!("SUBTRACK_LOG_LEVEL: {}", e)))?;
        }
        Ok(())
    }

    /// Full path of the subscriptions database
    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        let path = Path::new(&self.database);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            data_dir.join(path)
        }
    }

    /// Save config to the data directory
    /// Preserves other settings that subtrack doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join("settings.json");
        let mut settings = SettingsFile::read(&settings_path)?;

        settings.database = Some(self.database.clone());
        settings.log_level = Some(self.log_level.to_string());
        settings.event_log = Some(self.event_log);

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn load_with(dir: &Path, env: &[(&str, &str)]) -> Result<Config> {
        let raw = SettingsFile::read(&dir.join("settings.json"))?;
        let mut config = Config::from_settings(&raw);
        config.apply_overrides(|key| {
            env.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })?;
        Ok(config)
    }

    #[test]
    fn test_defaults_without_settings_file() {
        let dir = tempdir().unwrap();
        let config = load_with(dir.path(), &[]).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(
            config.database_path(dir.path()),
            dir.path().join("subscriptions.duckdb")
        );
    }

    #[test]
    fn test_reads_settings_file() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"database": "other.duckdb", "logLevel": "warning", "eventLog": false}"#,
        )
        .unwrap();

        let config = load_with(dir.path(), &[]).unwrap();
        assert_eq!(config.database, "other.duckdb");
        assert_eq!(config.log_level, LogLevel::Warn);
        assert!(!config.event_log);
    }

    #[test]
    fn test_malformed_settings_fall_back_to_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("settings.json"), "{ not json").unwrap();

        assert_eq!(load_with(dir.path(), &[]).unwrap(), Config::default());
    }

    #[test]
    fn test_env_overrides_settings() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"database": "other.duckdb", "logLevel": "error"}"#,
        )
        .unwrap();

        let config = load_with(
            dir.path(),
            &[
                ("SUBTRACK_DATABASE", "/tmp/env.duckdb"),
                ("SUBTRACK_LOG_LEVEL", "debug"),
            ],
        )
        .unwrap();
        assert_eq!(config.database, "/tmp/env.duckdb");
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(
            config.database_path(dir.path()),
            PathBuf::from("/tmp/env.duckdb")
        );
    }

    #[test]
    fn test_invalid_env_log_level_is_config_error() {
        let dir = tempdir().unwrap();
        let err = load_with(dir.path(), &[("SUBTRACK_LOG_LEVEL", "loud")]).unwrap_err();

        let core = err.downcast_ref::<Error>().unwrap();
        assert_eq!(core.kind(), crate::domain::result::ErrorKind::Config);
    }

    #[test]
    fn test_save_preserves_unknown_keys() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("settings.json"),
            r#"{"theme": "dark", "database": "old.duckdb"}"#,
        )
        .unwrap();

        let config = Config {
            database: "new.duckdb".to_string(),
            ..Config::default()
        };
        config.save(dir.path()).unwrap();

        let content = std::fs::read_to_string(dir.path().join("settings.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["theme"], "dark");
        assert_eq!(value["database"], "new.duckdb");
        assert_eq!(value["logLevel"], "info");

        assert_eq!(load_with(dir.path(), &[]).unwrap(), config);
    }
}
