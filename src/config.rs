// ⚙️ Configuration
// JSON file + environment overrides, defaults when nothing is set.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "mile-tracker.json";

/// Points at an alternate config file
pub const CONFIG_ENV: &str = "MILE_TRACKER_CONFIG";

/// Overrides `database_path`
pub const DATABASE_ENV: &str = "MILE_TRACKER_DB";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLite file holding the key-value store
    pub database_path: PathBuf,

    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_filter: String,

    /// Default target for `export` when no path is given
    pub export_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_path: PathBuf::from("mile-tracker.db"),
            log_filter: "info".to_string(),
            export_file: PathBuf::from("mileage-logs.csv"),
        }
    }
}

impl AppConfig {
    /// Load from a JSON file; missing keys fall back to defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config JSON: {:?}", path.as_ref()))
    }

    /// Resolve config the way the CLI does
    ///
    /// `MILE_TRACKER_CONFIG` (must exist) → `mile-tracker.json` (if present)
    /// → defaults, then `MILE_TRACKER_DB` on top.
    pub fn load() -> Result<Self> {
        let mut config = match env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE)?,
            None => Self::default(),
        };

        if let Some(db) = env::var_os(DATABASE_ENV) {
            config.database_path = PathBuf::from(db);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"database_path": "/tmp/car.db"}"#).unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/car.db"));
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.export_file, PathBuf::from("mileage-logs.csv"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = AppConfig::from_file("/nonexistent/mile-tracker.json");

        assert!(result.is_err());
        assert!(format!("{:#}", result.unwrap_err()).contains("Failed to read config file"));
    }

    #[test]
    fn test_from_file() {
        let path = env::temp_dir().join(format!("mile-tracker-config-{}.json", uuid::Uuid::new_v4()));
        fs::write(&path, r#"{"log_filter": "mile_tracker=debug"}"#).unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(config.log_filter, "mile_tracker=debug");
        assert_eq!(config.database_path, AppConfig::default().database_path);
    }
}
