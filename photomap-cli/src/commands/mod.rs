//! CLI command implementations

pub mod delete;
pub mod init;
pub mod login;
pub mod logs;
pub mod photo;
pub mod register;
pub mod show;

use std::path::PathBuf;

use anyhow::{Context, Result};
use dialoguer::Password;
use photomap_core::{EntryPoint, PhotomapContext};

/// Get the photomap directory from environment or default
pub fn get_app_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("PHOTOMAP_DIR") {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("Could not find home directory")?;
    Ok(home.join(".photomap"))
}

/// Open the photomap context for the CLI
pub fn get_context() -> Result<PhotomapContext> {
    let app_dir = get_app_dir()?;
    tracing::debug!(app_dir = %app_dir.display(), "opening photomap context");
    PhotomapContext::open(&app_dir, EntryPoint::Cli)
        .with_context(|| format!("Failed to open photomap directory: {:?}", app_dir))
}

/// Use the given password or prompt for one
pub fn password_or_prompt(password: Option<String>, prompt: &str, confirm: bool) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    let mut input = Password::new().with_prompt(prompt);
    if confirm {
        input = input.with_confirmation("Repeat password", "Passwords do not match");
    }
    Ok(input.interact()?)
}
