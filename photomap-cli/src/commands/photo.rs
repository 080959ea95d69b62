//! Photo commands - add and list a user's photos

use anyhow::{bail, Result};
use clap::Subcommand;
use photomap_core::Photo;

use super::{get_context, password_or_prompt};
use crate::output;

#[derive(Subcommand)]
pub enum PhotoCommands {
    /// Add an uploaded photo to a user's collection
    Add {
        username: String,
        /// Photo title
        #[arg(long)]
        title: String,
        /// Public URL of the uploaded image
        #[arg(long)]
        url: String,
        /// Width in pixels
        #[arg(long)]
        width: u32,
        /// Height in pixels
        #[arg(long)]
        height: u32,
        /// Latitude where the photo was taken
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,
        /// Longitude where the photo was taken
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
        /// Account password (prompted if omitted)
        #[arg(long)]
        password: Option<String>,
    },
    /// List a user's photos
    List {
        username: String,
        /// Only photos that can be placed on the map
        #[arg(long)]
        located: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: PhotoCommands) -> Result<()> {
    match command {
        PhotoCommands::Add { username, title, url, width, height, lat, lng, password } => {
            let ctx = get_context()?;
            let password = password_or_prompt(password, "Password", false)?;

            let mut user = match ctx.login(&username, &password) {
                Ok(user) => user,
                Err(e) if e.is_not_found() => bail!("Invalid username or password"),
                Err(e) => return Err(e.into()),
            };

            let mut photo = Photo::new(title, url, width, height);
            if let (Some(lat), Some(lng)) = (lat, lng) {
                photo = photo.with_location(lat, lng);
            }
            user.photos.push(photo);

            let stored = ctx.users.update(&user)?;
            output::success(&format!(
                "✓ Added photo to '{}' ({} total)",
                stored.username,
                stored.photos.len()
            ));

            ctx.close()?;
            Ok(())
        }
        PhotoCommands::List { username, located, json } => {
            let ctx = get_context()?;

            let Some(user) = ctx.gateway.get_user(&username) else {
                bail!("User '{}' not found", username);
            };

            let photos: Vec<&Photo> = if located {
                user.located_photos().collect()
            } else {
                user.photos.iter().collect()
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&photos)?);
            } else if photos.is_empty() {
                println!("No photos found.");
            } else {
                println!("{}", output::photo_table(photos));
            }

            ctx.close()?;
            Ok(())
        }
    }
}
