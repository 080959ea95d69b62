//! Photomap Core - persistence and authentication for the photomap app
//!
//! This crate implements the core following hexagonal architecture:
//!
//! - **domain**: Core entities (User, Photo, Credentials) and error types
//! - **ports**: Trait definitions for external collaborators (LogSink)
//! - **services**: Business logic orchestration
//! - **adapters**: Concrete implementations (DuckDB sessions, user SQL)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use adapters::duckdb::{ConnectionFactory, SessionManager};
use config::Config;
use ports::{LogSink, Severity, TracingSink};
use services::*;

// Re-export commonly used types at crate root
pub use adapters::duckdb::{Session, SessionGuard, SessionStats, TransactionState};
pub use domain::{Credentials, Error, ErrorKind, OperationResult, Photo, Result, User};
pub use services::{EntryPoint, LogCadence};

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Main context for photomap operations
///
/// Holds the configuration, the failure log, the session manager and the
/// account services. Built once per process and shut down with `close()`.
pub struct PhotomapContext {
    pub config: Config,
    /// Persistent failure log; `None` when logs.duckdb could not be opened
    pub logger: Option<Arc<LoggingService>>,
    pub sessions: Arc<SessionManager>,
    pub users: Arc<UserService>,
    pub gateway: AccountGateway,
    pub hasher: CredentialHasher,
}

impl PhotomapContext {
    /// Open a context for an application directory
    ///
    /// Never fails because of missing or bad datastore credentials; those
    /// surface on the first operation that needs the store.
    pub fn open(app_dir: &Path, entry_point: EntryPoint) -> Result<Self> {
        std::fs::create_dir_all(app_dir)?;
        let config = Config::load(app_dir);
        Self::with_config(app_dir, entry_point, config)
    }

    /// Open a context with an already loaded configuration
    pub fn with_config(app_dir: &Path, entry_point: EntryPoint, config: Config) -> Result<Self> {
        let logger = match LoggingService::new(app_dir, entry_point, VERSION, config.log_cadence) {
            Ok(logger) => Some(Arc::new(logger)),
            Err(e) => {
                tracing::warn!(error = %e, "failure log unavailable, reporting to tracing only");
                None
            }
        };

        let sink: Arc<dyn LogSink> = match &logger {
            Some(logger) => Arc::clone(logger) as Arc<dyn LogSink>,
            None => Arc::new(TracingSink),
        };

        if let Some(reason) = &config.load_error {
            sink.record(Severity::Warning, "load_config", reason);
        }

        let factory = ConnectionFactory::new(config.database_path.clone(), config.credentials.clone());
        let sessions = Arc::new(SessionManager::new(factory));
        let users = Arc::new(UserService::new(Arc::clone(&sessions), sink));
        let gateway = AccountGateway::new(Arc::clone(&users));

        Ok(Self {
            config,
            logger,
            sessions,
            users,
            gateway,
            hasher: CredentialHasher::new(),
        })
    }

    /// Register a user from a plain password, generating a fresh salt
    pub fn register_with_password(&self, username: &str, email: &str, password: &str) -> Result<User> {
        let salt = self.hasher.generate_salt();
        let hash = self.hasher.hash(password, &salt)?;
        self.users.register(username, email, &hash, &salt)
    }

    /// Log in with a plain password: fetch the salt, hash, authenticate
    pub fn login(&self, username: &str, password: &str) -> Result<User> {
        let salt = self.users.get_salt(username)?;
        let hash = self.hasher.hash(password, &salt)?;
        self.users.authenticate(username, &hash)
    }

    /// Close the session, the datastore and the failure log
    pub fn close(self) -> Result<()> {
        self.sessions.shutdown();
        if let Some(logger) = &self.logger {
            logger.close().map_err(|e| Error::Other(e.to_string()))?;
        }
        Ok(())
    }
}
