//! Logs command - view and manage the failure log

use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;
use photomap_core::services::LoggingService;

use super::get_context;
use crate::output;

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent log entries
    List {
        /// Number of entries to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Show only failures (warning and above)
        #[arg(long)]
        failures: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear old log entries
    Clear {
        /// Delete logs older than N days
        #[arg(long, default_value = "30")]
        older_than_days: u64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },
    /// Show log statistics and database path
    Stats {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn format_timestamp(timestamp_ms: i64) -> String {
    use chrono::{TimeZone, Utc};
    Utc.timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

fn logger(ctx: &photomap_core::PhotomapContext) -> Result<Arc<LoggingService>> {
    ctx.logger
        .clone()
        .ok_or_else(|| anyhow!("The log database could not be opened"))
}

pub fn run(command: LogsCommands) -> Result<()> {
    let ctx = get_context()?;
    let service = logger(&ctx)?;

    match command {
        LogsCommands::List { limit, failures, json } => {
            let entries = if failures {
                service.get_failures(limit)?
            } else {
                service.get_recent(limit)?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No log entries found.");
            } else {
                let mut table = output::create_table();
                table.set_header(vec!["Time", "Severity", "Operation", "Message"]);

                for entry in entries {
                    let severity = match entry.severity.as_str() {
                        s @ ("warning" | "error") => s.red().to_string(),
                        s => s.to_string(),
                    };
                    table.add_row(vec![
                        format_timestamp(entry.timestamp),
                        severity,
                        entry.operation.unwrap_or(entry.event),
                        entry.message.unwrap_or_default(),
                    ]);
                }

                println!("{}", table);
            }
        }
        LogsCommands::Clear { older_than_days, force } => {
            let cutoff = chrono::Utc::now() - chrono::Duration::days(older_than_days as i64);

            if !force
                && !Confirm::new()
                    .with_prompt(format!("Delete log entries older than {} days?", older_than_days))
                    .default(false)
                    .interact()?
            {
                println!("{}", "Cancelled".dimmed());
                return Ok(());
            }

            let deleted = service.delete_before(cutoff.timestamp_millis())?;
            output::success(&format!("✓ Deleted {} log entries", deleted));
        }
        LogsCommands::Stats { json } => {
            let count = service.count()?;
            let failures = service.count_failures()?;

            if json {
                let stats = serde_json::json!({
                    "total_entries": count,
                    "failures": failures,
                    "cadence": service.cadence(),
                    "db_path": service.db_path().display().to_string(),
                });
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("{} {}", "Total entries:".dimmed(), count);
                println!("{} {}", "Failures:".dimmed(), failures);
                println!("{} {:?}", "Cadence:".dimmed(), service.cadence());
                println!("{} {}", "Database:".dimmed(), service.db_path().display());
            }
        }
    }

    ctx.close()?;
    Ok(())
}
