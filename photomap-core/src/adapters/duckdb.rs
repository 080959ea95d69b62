//! DuckDB connection lifecycle
//!
//! One `ConnectionFactory` per process owns the database instance. Sessions
//! are clones of its root connection and are handed out one at a time by
//! the `SessionManager`, which replaces a session as soon as it stops
//! answering.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use duckdb::Connection;

use crate::domain::{Credentials, Error, Result};
use crate::migrations::MIGRATIONS;
use crate::services::{CredentialHasher, MigrationService};

impl From<duckdb::Error> for Error {
    fn from(err: duckdb::Error) -> Self {
        let msg = err.to_string();
        if is_constraint_error(&msg) {
            Error::Constraint(msg)
        } else {
            Error::Database(msg)
        }
    }
}

/// Check if a DuckDB error message reports a violated constraint
fn is_constraint_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("constraint error")
        || lower.contains("duplicate key")
        || lower.contains("violates unique constraint")
}

/// Builds connections to the datastore
///
/// Construction never fails. Incomplete credentials, an unreachable file or
/// a login mismatch are reported by the first `connect()`.
pub struct ConnectionFactory {
    db_path: Option<PathBuf>,
    credentials: Credentials,
    hasher: CredentialHasher,
    root: Mutex<Option<Connection>>,
}

impl ConnectionFactory {
    /// Factory for a file-backed store, or an in-memory one when `db_path` is `None`
    pub fn new(db_path: Option<PathBuf>, credentials: Credentials) -> Self {
        Self {
            db_path,
            credentials,
            hasher: CredentialHasher::new(),
            root: Mutex::new(None),
        }
    }

    /// Factory for a private in-memory store
    pub fn in_memory(credentials: Credentials) -> Self {
        Self::new(None, credentials)
    }

    /// Replace the hasher used for the datastore login
    pub fn with_hasher(mut self, hasher: CredentialHasher) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Whether the database instance has been opened
    pub fn is_initialized(&self) -> bool {
        self.root.lock().map(|root| root.is_some()).unwrap_or(false)
    }

    /// Open a new connection
    ///
    /// The database instance is opened and migrated on the first successful
    /// call; later calls clone its connection. There is no retry.
    pub fn connect(&self) -> Result<Connection> {
        if !self.credentials.is_complete() {
            return Err(Error::config("datastore credentials are missing"));
        }

        let mut root = self
            .root
            .lock()
            .map_err(|e| Error::connection(format!("Lock poisoned: {}", e)))?;

        if root.is_none() {
            *root = Some(self.open_root()?);
        }

        match root.as_ref() {
            Some(conn) => conn
                .try_clone()
                .map_err(|e| Error::connection(format!("cannot open session: {}", e))),
            None => Err(Error::connection("datastore is not open")),
        }
    }

    /// Drop the database instance; the next `connect()` opens it again
    pub fn shutdown(&self) {
        if let Ok(mut root) = self.root.lock() {
            if root.take().is_some() {
                tracing::debug!("datastore closed");
            }
        }
    }

    fn open_root(&self) -> Result<Connection> {
        // Disable extension autoloading; nothing here needs extensions
        let config = duckdb::Config::default()
            .enable_autoload_extension(false)
            .map_err(|e| Error::connection(e.to_string()))?;

        let conn = match &self.db_path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                Connection::open_with_flags(path, config)
            }
            None => Connection::open_in_memory_with_flags(config),
        }
        .map_err(|e| Error::connection(format!("cannot open datastore: {}", e)))?;

        MigrationService::new(&conn, MIGRATIONS)
            .run_pending()
            .map_err(|e| Error::Database(format!("migration failed: {}", e)))?;

        // An in-memory store is private to this factory, so it has no owner to check
        if self.db_path.is_some() {
            self.verify_owner(&conn)?;
        }

        tracing::info!(path = ?self.db_path, "datastore opened");
        Ok(conn)
    }

    /// Record the store's owner on first open, check it on every later one
    fn verify_owner(&self, conn: &Connection) -> Result<()> {
        let mut stmt =
            conn.prepare("SELECT username, password_hash, salt FROM sys_datastore_owner")?;
        let owners = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let rejected = || Error::config("datastore credentials rejected");

        match owners.as_slice() {
            [] => {
                let salt = self.hasher.generate_salt();
                let hash = self.hasher.hash(&self.credentials.password, &salt)?;
                conn.execute(
                    "INSERT INTO sys_datastore_owner (username, password_hash, salt) VALUES (?, ?, ?)",
                    [&self.credentials.username, &hash, &salt],
                )?;
                tracing::info!(username = %self.credentials.username, "datastore owner recorded");
                Ok(())
            }
            [(username, hash, salt)] => {
                if username != &self.credentials.username
                    || !self.hasher.verify(&self.credentials.password, salt, hash)?
                {
                    return Err(rejected());
                }
                Ok(())
            }
            _ => Err(rejected()),
        }
    }
}

/// Where the most recent transaction on a session ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    #[default]
    NotStarted,
    Active,
    Committed,
    RolledBack,
}

/// Per-session transaction counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub committed: u64,
    pub rolled_back: u64,
}

/// A connection plus the state of its last transaction
pub struct Session {
    id: u64,
    conn: Option<Connection>,
    last_state: TransactionState,
    stats: SessionStats,
}

impl Session {
    fn new(id: u64, conn: Connection) -> Self {
        Self {
            id,
            conn: Some(conn),
            last_state: TransactionState::NotStarted,
            stats: SessionStats::default(),
        }
    }

    fn closed() -> Self {
        Self {
            id: 0,
            conn: None,
            last_state: TransactionState::NotStarted,
            stats: SessionStats::default(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    /// Open and answering queries
    pub fn is_usable(&self) -> bool {
        match &self.conn {
            Some(conn) => conn
                .query_row("SELECT 1", [], |row| row.get::<_, i32>(0))
                .is_ok(),
            None => false,
        }
    }

    pub fn last_state(&self) -> TransactionState {
        self.last_state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Close the connection; the manager replaces the session on next acquire
    pub fn close(&mut self) {
        if self.conn.take().is_some() {
            tracing::debug!(session = self.id, "session closed");
        }
    }

    /// Run `body` inside a transaction
    ///
    /// Commits when `body` succeeds and rolls back on any failure, including
    /// a failed commit. If the rollback itself fails the session is closed.
    pub fn transaction<T>(&mut self, body: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| Error::connection("session is closed"))?;

        self.last_state = TransactionState::NotStarted;
        if let Err(e) = conn.execute_batch("BEGIN TRANSACTION") {
            tracing::warn!(session = self.id, error = %e, "cannot begin transaction, closing session");
            self.conn = None;
            return Err(Error::connection(format!("cannot begin transaction: {}", e)));
        }
        self.last_state = TransactionState::Active;

        let outcome = body(conn)
            .and_then(|value| conn.execute_batch("COMMIT").map(|_| value).map_err(Error::from));

        match outcome {
            Ok(value) => {
                self.last_state = TransactionState::Committed;
                self.stats.committed += 1;
                Ok(value)
            }
            Err(err) => {
                let rollback = conn.execute_batch("ROLLBACK");
                self.last_state = TransactionState::RolledBack;
                self.stats.rolled_back += 1;
                if let Err(e) = rollback {
                    tracing::warn!(session = self.id, error = %e, "rollback failed, closing session");
                    self.conn = None;
                }
                Err(err)
            }
        }
    }
}

/// Scoped checkout of the current session, released on drop
pub type SessionGuard<'a> = MutexGuard<'a, Session>;

/// Holds the one current session and replaces it when it goes bad
pub struct SessionManager {
    factory: ConnectionFactory,
    current: Mutex<Session>,
    opened: AtomicU64,
}

impl SessionManager {
    pub fn new(factory: ConnectionFactory) -> Self {
        Self {
            factory,
            current: Mutex::new(Session::closed()),
            opened: AtomicU64::new(0),
        }
    }

    pub fn factory(&self) -> &ConnectionFactory {
        &self.factory
    }

    /// Check out a usable session
    ///
    /// A closed or unresponsive session is discarded and a new one is opened
    /// from the factory before the guard is returned.
    pub fn acquire_session(&self) -> Result<SessionGuard<'_>> {
        let mut session = self.lock_current();

        if !session.is_usable() {
            session.close();
            let conn = self.factory.connect()?;
            let id = self.opened.fetch_add(1, Ordering::Relaxed) + 1;
            *session = Session::new(id, conn);
            tracing::debug!(session = id, "session opened");
        }

        Ok(session)
    }

    /// Close the current session; the next acquire opens a fresh one
    pub fn invalidate(&self) {
        self.lock_current().close();
    }

    /// Close the session and the database instance
    pub fn shutdown(&self) {
        self.invalidate();
        self.factory.shutdown();
    }

    /// Number of sessions opened so far
    pub fn sessions_opened(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }

    fn lock_current(&self) -> SessionGuard<'_> {
        match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                // A caller panicked mid-transaction; its session cannot be trusted
                let mut guard = poisoned.into_inner();
                guard.close();
                self.current.clear_poison();
                guard
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Argon2Params, ErrorKind};
    use tempfile::tempdir;

    fn creds() -> Credentials {
        Credentials::new("app", "secret")
    }

    fn fast_hasher() -> CredentialHasher {
        CredentialHasher::with_params(Argon2Params {
            time_cost: 1,
            memory_cost: 1024,
            parallelism: 1,
            hash_len: 32,
        })
    }

    fn count_users(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_missing_credentials_fail_on_connect() {
        let factory = ConnectionFactory::in_memory(Credentials::new("app", ""));
        let err = factory.connect().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(!factory.is_initialized());
    }

    #[test]
    fn test_sessions_share_one_instance() {
        let factory = ConnectionFactory::in_memory(creds());
        let a = factory.connect().unwrap();
        let b = factory.connect().unwrap();

        a.execute(
            "INSERT INTO users (username, email, password_hash, salt) VALUES ('u', 'e', 'h', 's')",
            [],
        )
        .unwrap();
        assert_eq!(count_users(&b), 1);
    }

    #[test]
    fn test_transaction_commit_and_rollback() {
        let manager = SessionManager::new(ConnectionFactory::in_memory(creds()));
        let mut session = manager.acquire_session().unwrap();

        session
            .transaction(|conn| {
                conn.execute(
                    "INSERT INTO users (username, email, password_hash, salt) VALUES ('a', 'e', 'h', 's')",
                    [],
                )?;
                Ok(())
            })
            .unwrap();
        assert_eq!(session.last_state(), TransactionState::Committed);

        let result: Result<()> = session.transaction(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, password_hash, salt) VALUES ('b', 'e', 'h', 's')",
                [],
            )?;
            Err(Error::Other("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(session.last_state(), TransactionState::RolledBack);
        assert_eq!(
            session.stats(),
            SessionStats {
                committed: 1,
                rolled_back: 1
            }
        );

        let count = session.transaction(|conn| Ok(count_users(conn))).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_duplicate_username_is_constraint_error() {
        let manager = SessionManager::new(ConnectionFactory::in_memory(creds()));
        let mut session = manager.acquire_session().unwrap();

        let insert = |conn: &Connection| -> Result<()> {
            conn.execute(
                "INSERT INTO users (username, email, password_hash, salt) VALUES ('dup', 'e', 'h', 's')",
                [],
            )?;
            Ok(())
        };

        session.transaction(insert).unwrap();
        let err = session.transaction(insert).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConstraintViolation);
    }

    #[test]
    fn test_failed_rollback_closes_session() {
        let manager = SessionManager::new(ConnectionFactory::in_memory(creds()));
        {
            let mut session = manager.acquire_session().unwrap();
            // Ending the transaction inside the body makes the ROLLBACK fail
            let result: Result<()> = session.transaction(|conn| {
                conn.execute_batch("COMMIT")?;
                Err(Error::Other("boom".into()))
            });
            assert!(result.is_err());
            assert!(!session.is_open());
        }

        let session = manager.acquire_session().unwrap();
        assert!(session.is_usable());
        assert_eq!(manager.sessions_opened(), 2);
    }

    #[test]
    fn test_invalidated_session_is_replaced() {
        let manager = SessionManager::new(ConnectionFactory::in_memory(creds()));
        let first = manager.acquire_session().unwrap().id();

        // Usable sessions are reused
        assert_eq!(manager.acquire_session().unwrap().id(), first);

        manager.invalidate();
        let second = manager.acquire_session().unwrap();
        assert_ne!(second.id(), first);
        assert!(second.is_usable());
    }

    #[test]
    fn test_file_store_records_and_checks_owner() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("photomap.duckdb");

        {
            let factory =
                ConnectionFactory::new(Some(path.clone()), creds()).with_hasher(fast_hasher());
            factory.connect().unwrap();
            assert!(path.exists());
        }

        {
            let factory = ConnectionFactory::new(Some(path.clone()), Credentials::new("app", "wrong"))
                .with_hasher(fast_hasher());
            let err = factory.connect().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Configuration);
            assert!(!factory.is_initialized());
        }

        let factory = ConnectionFactory::new(Some(path), creds()).with_hasher(fast_hasher());
        assert!(factory.connect().is_ok());
    }
}
