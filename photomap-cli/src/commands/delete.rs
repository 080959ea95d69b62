//! Delete command - remove a user and their photos

use anyhow::{bail, Result};
use colored::Colorize;
use dialoguer::Confirm;

use super::get_context;
use crate::output;

pub fn run(username: &str, force: bool) -> Result<()> {
    let ctx = get_context()?;

    let Some(user) = ctx.gateway.get_user(username) else {
        bail!("User '{}' not found", username);
    };

    // Confirm removal unless --force
    if !force {
        println!(
            "\n{}",
            format!("This will delete '{}' and {} photos.", user.username, user.photos.len()).yellow()
        );

        if !Confirm::new()
            .with_prompt("Are you sure?")
            .default(false)
            .interact()?
        {
            println!("{}\n", "Cancelled".dimmed());
            return Ok(());
        }
    }

    ctx.users.delete(username)?;
    output::success(&format!("✓ Deleted '{}'", username));

    ctx.close()?;
    Ok(())
}
