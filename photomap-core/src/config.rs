//! Configuration management
//!
//! Settings live in `settings.json` inside the application directory:
//! ```json
//! {
//!   "datastore": { "username": "app", "password": "secret", "path": "photomap.duckdb" },
//!   "logging": { "cadence": "long-lived" },
//!   ...
//! }
//! ```
//! A missing or unreadable file is not fatal: the loader records the problem
//! and hands out empty credentials, so the failure surfaces on first connect.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{Credentials, Result};
use crate::services::logging::LogCadence;

/// File name of the settings file inside the application directory
pub const SETTINGS_FILE: &str = "settings.json";

/// Default database file name, relative to the application directory
pub const DEFAULT_DATABASE_FILE: &str = "photomap.duckdb";

/// Path value that selects a private in-memory store
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    datastore: DatastoreSettings,
    #[serde(default)]
    logging: LoggingSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DatastoreSettings {
    #[serde(flatten)]
    credentials: Credentials,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingSettings {
    #[serde(default)]
    cadence: LogCadence,
}

/// Application configuration (resolved view of the settings file)
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    /// Database file, or `None` for an in-memory store
    pub database_path: Option<PathBuf>,
    pub log_cadence: LogCadence,
    /// Why the settings file could not be used, if it could not
    pub load_error: Option<String>,
    // Keep the raw settings for preservation when saving
    raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            database_path: None,
            log_cadence: LogCadence::default(),
            load_error: None,
            raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from the application directory
    ///
    /// Credentials and the database path can be overridden through
    /// `PHOTOMAP_DB_USER`, `PHOTOMAP_DB_PASSWORD` and `PHOTOMAP_DB_PATH`.
    pub fn load(app_dir: &Path) -> Self {
        let mut config = Self::load_file(app_dir);
        config.apply_overrides(app_dir, |key| std::env::var(key).ok());
        config
    }

    /// Load config from the settings file only, ignoring the environment
    pub fn load_file(app_dir: &Path) -> Self {
        let settings_path = app_dir.join(SETTINGS_FILE);

        let (raw, load_error) = match std::fs::read_to_string(&settings_path) {
            Ok(content) => match serde_json::from_str::<SettingsFile>(&content) {
                Ok(raw) => (raw, None),
                Err(e) => (
                    SettingsFile::default(),
                    Some(format!("{} is malformed: {}", settings_path.display(), e)),
                ),
            },
            Err(e) => (
                SettingsFile::default(),
                Some(format!("cannot read {}: {}", settings_path.display(), e)),
            ),
        };

        if let Some(reason) = &load_error {
            tracing::warn!(%reason, "settings unavailable, using empty datastore credentials");
        }

        let database_path = resolve_database_path(app_dir, raw.datastore.path.as_deref());

        Self {
            credentials: raw.datastore.credentials.clone(),
            database_path,
            log_cadence: raw.logging.cadence,
            load_error,
            raw_settings: raw,
        }
    }

    fn apply_overrides(&mut self, app_dir: &Path, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(username) = lookup("PHOTOMAP_DB_USER") {
            self.credentials.username = username;
        }
        if let Some(password) = lookup("PHOTOMAP_DB_PASSWORD") {
            self.credentials.password = password;
        }
        if let Some(path) = lookup("PHOTOMAP_DB_PATH") {
            self.database_path = resolve_database_path(app_dir, Some(&path));
        }
    }

    /// Save config to the application directory
    /// Preserves other settings that the core doesn't manage
    pub fn save(&self, app_dir: &Path) -> Result<()> {
        let settings_path = app_dir.join(SETTINGS_FILE);

        let mut settings = self.raw_settings.clone();
        settings.datastore.credentials = self.credentials.clone();
        settings.datastore.path = Some(match &self.database_path {
            Some(path) => path.display().to_string(),
            None => IN_MEMORY_PATH.to_string(),
        });
        settings.logging.cadence = self.log_cadence;

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }
}

fn resolve_database_path(app_dir: &Path, configured: Option<&str>) -> Option<PathBuf> {
    match configured {
        Some(IN_MEMORY_PATH) => None,
        Some(path) => {
            let path = PathBuf::from(path);
            Some(if path.is_absolute() { path } else { app_dir.join(path) })
        }
        None => Some(app_dir.join(DEFAULT_DATABASE_FILE)),
    }
}
