//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use photomap_core::Photo;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Table of photos in collection order
pub fn photo_table<'a>(photos: impl IntoIterator<Item = &'a Photo>) -> Table {
    let mut table = create_table();
    table.set_header(vec!["#", "Title", "Size", "Location", "Uploaded", "URL"]);

    for (position, photo) in photos.into_iter().enumerate() {
        let location = match photo.location() {
            Some((lat, lng)) => format!("{:.5}, {:.5}", lat, lng),
            None => "-".to_string(),
        };
        table.add_row(vec![
            (position + 1).to_string(),
            photo.title.clone(),
            format!("{}x{}", photo.width, photo.height),
            location,
            photo.uploaded_at.format("%Y-%m-%d %H:%M").to_string(),
            photo.url.clone(),
        ]);
    }

    table
}
