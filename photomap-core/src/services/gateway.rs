//! Account gateway - sentinel-valued surface for UI callers
//!
//! Wraps `UserService` with the return conventions the desktop scenes use:
//! `bool` for success, `None` for a missing user, `-1` for a missing id.
//! Failures have already been logged by the service when they get here.

use std::sync::Arc;

use crate::domain::{Error, Result, User};
use crate::services::users::UserService;

pub struct AccountGateway {
    users: Arc<UserService>,
}

impl AccountGateway {
    pub fn new(users: Arc<UserService>) -> Self {
        Self { users }
    }

    /// `Ok(true)` once the user is committed, `Ok(false)` on any store failure
    ///
    /// Empty fields are a caller error and come back as `Err`.
    pub fn register_user(&self, username: &str, email: &str, password_hash: &str, salt: &str) -> Result<bool> {
        match self.users.register(username, email, password_hash, salt) {
            Ok(_) => Ok(true),
            Err(e @ Error::InvalidArgument(_)) => Err(e),
            Err(_) => Ok(false),
        }
    }

    pub fn update_user(&self, user: &User) {
        let _ = self.users.update(user);
    }

    /// The only lookup that propagates failure, including not-found
    pub fn get_salt(&self, username: &str) -> Result<String> {
        self.users.get_salt(username)
    }

    pub fn get_user(&self, username: &str) -> Option<User> {
        self.users.get_user(username).ok()
    }

    pub fn login(&self, username: &str, password_hash: &str) -> bool {
        self.users.authenticate(username, password_hash).is_ok()
    }

    pub fn get_user_id(&self, username: &str) -> i64 {
        self.users.get_user_id(username).unwrap_or(-1)
    }

    pub fn delete_user(&self, username: &str) {
        let _ = self.users.delete(username);
    }
}
