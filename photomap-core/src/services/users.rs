//! User service - transactional account operations
//!
//! Every operation checks out the current session, runs in its own
//! transaction and reports failures to the log sink before returning them.

use std::sync::Arc;

use duckdb::Connection;

use crate::adapters::duckdb::SessionManager;
use crate::adapters::user_store;
use crate::domain::{Result, User};
use crate::ports::{LogSink, Severity};

/// Account operations over a shared session
pub struct UserService {
    sessions: Arc<SessionManager>,
    log: Arc<dyn LogSink>,
}

impl UserService {
    pub fn new(sessions: Arc<SessionManager>, log: Arc<dyn LogSink>) -> Self {
        Self { sessions, log }
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Run `body` in a transaction on the current session, logging failure
    fn run<T>(&self, operation: &str, body: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let result = self
            .sessions
            .acquire_session()
            .and_then(|mut session| session.transaction(body));

        if let Err(e) = &result {
            self.log.record(Severity::Warning, operation, &e.to_string());
        }
        result
    }

    /// Register a new user
    ///
    /// Empty fields are rejected before any transaction is opened and are
    /// not logged. The user is returned with its id only after commit.
    pub fn register(&self, username: &str, email: &str, password_hash: &str, salt: &str) -> Result<User> {
        let user = User::new(username, email, password_hash, salt)?;
        let stored = self.run("register", |conn| user_store::insert_user(conn, &user))?;
        tracing::debug!(username = %stored.username, "user registered");
        Ok(stored)
    }

    /// Merge a stored user's username, email and photos
    pub fn update(&self, user: &User) -> Result<User> {
        self.run("update", |conn| user_store::merge_user(conn, user))
    }

    /// Salt stored for a username
    pub fn get_salt(&self, username: &str) -> Result<String> {
        self.run("get_salt", |conn| user_store::find_salt(conn, username))
    }

    /// User and photos for a username
    pub fn get_user(&self, username: &str) -> Result<User> {
        self.run("get_user", |conn| user_store::find_user(conn, username))
    }

    /// User whose username and password hash both match
    pub fn authenticate(&self, username: &str, password_hash: &str) -> Result<User> {
        self.run("authenticate", |conn| {
            user_store::find_by_credentials(conn, username, password_hash)
        })
    }

    /// Id of a username
    pub fn get_user_id(&self, username: &str) -> Result<i64> {
        self.run("get_user_id", |conn| user_store::find_user_id(conn, username))
    }

    /// Delete a user and its photos
    ///
    /// The user is fetched first; removing it runs in a second transaction
    /// and fails with not-found when the fetch found nothing.
    pub fn delete(&self, username: &str) -> Result<()> {
        let user = self.get_user(username).ok();
        self.run("delete", |conn| user_store::remove_user(conn, user.as_ref()))?;
        tracing::debug!(username = %username, "user deleted");
        Ok(())
    }
}
