//! Show command - display a user and their photos

use anyhow::{bail, Result};
use colored::Colorize;

use super::get_context;
use crate::output;

pub fn run(username: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;

    let Some(user) = ctx.gateway.get_user(username) else {
        bail!("User '{}' not found", username);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
        ctx.close()?;
        return Ok(());
    }

    println!();
    println!("{}", user.username.bold());
    println!("  {} {}", "Id:".dimmed(), user.id.unwrap_or(-1));
    println!("  {} {}", "Email:".dimmed(), user.email);
    println!("  {} {}", "Photos:".dimmed(), user.photos.len());

    if !user.photos.is_empty() {
        println!();
        println!("{}", output::photo_table(&user.photos));
    }

    ctx.close()?;
    Ok(())
}
