//! Register command - create a user account

use anyhow::{bail, Result};
use photomap_core::ErrorKind;

use super::{get_context, password_or_prompt};
use crate::output;

pub fn run(username: &str, email: &str, password: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let password = password_or_prompt(password, "Password", true)?;

    let user = match ctx.register_with_password(username, email, &password) {
        Ok(user) => user,
        Err(e) if e.kind() == ErrorKind::ConstraintViolation => {
            bail!("Username '{}' is already taken", username)
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&user)?);
    } else {
        output::success(&format!("✓ Registered '{}' (id {})", user.username, user.id.unwrap_or(-1)));
    }

    ctx.close()?;
    Ok(())
}
