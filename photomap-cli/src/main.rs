//! Photomap CLI - manage photomap users and photos from the terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{delete, init, login, logs, photo, register, show};

/// Photomap - users and their photos on a map
#[derive(Parser)]
#[command(name = "photomap", version, about, long_about = None)]
struct Cli {
    /// Show debug diagnostics on stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write datastore credentials to settings.json
    Init {
        /// Datastore username
        #[arg(long)]
        username: String,
        /// Datastore password (prompted if omitted)
        #[arg(long, env = "PHOTOMAP_DB_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Database file, relative to the app directory, or ":memory:"
        #[arg(long)]
        path: Option<String>,
        /// Close the log database after every entry
        #[arg(long)]
        per_event_logging: bool,
    },

    /// Register a new user
    Register {
        username: String,
        /// Email address
        #[arg(long)]
        email: String,
        /// Account password (prompted if omitted)
        #[arg(long)]
        password: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a user's password
    Login {
        username: String,
        /// Account password (prompted if omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Show a user and their photos
    Show {
        username: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage a user's photos
    Photo {
        #[command(subcommand)]
        command: photo::PhotoCommands,
    },

    /// Delete a user and their photos
    Delete {
        username: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// View and manage the failure log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Init { username, password, path, per_event_logging } => {
            init::run(&username, password, path, per_event_logging)
        }
        Commands::Register { username, email, password, json } => {
            register::run(&username, &email, password, json)
        }
        Commands::Login { username, password } => login::run(&username, password),
        Commands::Show { username, json } => show::run(&username, json),
        Commands::Photo { command } => photo::run(command),
        Commands::Delete { username, force } => delete::run(&username, force),
        Commands::Logs { command } => logs::run(command),
    }
}
