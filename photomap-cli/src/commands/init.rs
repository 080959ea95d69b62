//! Init command - write datastore credentials to settings.json

use anyhow::{Context, Result};
use colored::Colorize;
use photomap_core::config::{Config, IN_MEMORY_PATH, SETTINGS_FILE};
use photomap_core::{Credentials, LogCadence};

use super::{get_app_dir, password_or_prompt};
use crate::output;

pub fn run(username: &str, password: Option<String>, path: Option<String>, per_event_logging: bool) -> Result<()> {
    let app_dir = get_app_dir()?;
    std::fs::create_dir_all(&app_dir)
        .with_context(|| format!("Failed to create photomap directory: {:?}", app_dir))?;

    let password = password_or_prompt(password, "Datastore password", true)?;

    // Start from the file alone so environment overrides are not persisted
    let mut config = Config::load_file(&app_dir);
    config.credentials = Credentials::new(username, password);
    if let Some(path) = path {
        config.database_path = if path == IN_MEMORY_PATH {
            None
        } else {
            Some(app_dir.join(path))
        };
    }
    if per_event_logging {
        config.log_cadence = LogCadence::PerEvent;
    }

    config.save(&app_dir)?;

    output::success(&format!("✓ Wrote {}", app_dir.join(SETTINGS_FILE).display()));
    match &config.database_path {
        Some(path) => println!("  {} {}", "Database:".dimmed(), path.display()),
        None => output::warning("  Database is in memory; nothing will be kept between runs"),
    }
    Ok(())
}
