//! Login command - check a user's password

use anyhow::{bail, Result};

use super::{get_context, password_or_prompt};
use crate::output;

pub fn run(username: &str, password: Option<String>) -> Result<()> {
    let ctx = get_context()?;
    let password = password_or_prompt(password, "Password", false)?;

    match ctx.login(username, &password) {
        Ok(user) => {
            output::success(&format!("✓ Logged in as '{}'", user.username));
            output::info(&format!(
                "  {} photos, {} on the map",
                user.photos.len(),
                user.located_photos().count()
            ));
        }
        Err(e) if e.is_not_found() => bail!("Invalid username or password"),
        Err(e) => return Err(e.into()),
    }

    ctx.close()?;
    Ok(())
}
