//! User domain model

use serde::{Deserialize, Serialize};

use super::photo::Photo;
use super::result::{Error, Result};

/// A registered user and the photos they own
///
/// `id` is assigned by the datastore and is `None` until the row has been
/// committed once. `password_hash` and `salt` are written at registration
/// and never touched by updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub salt: String,
    #[serde(default)]
    pub photos: Vec<Photo>,
}

impl User {
    /// Build an unpersisted user from registration input
    ///
    /// Every field must be non-empty; an empty field is a caller error.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        salt: impl Into<String>,
    ) -> Result<Self> {
        let user = Self {
            id: None,
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            salt: salt.into(),
            photos: Vec::new(),
        };

        for (field, value) in [
            ("username", &user.username),
            ("email", &user.email),
            ("password hash", &user.password_hash),
            ("salt", &user.salt),
        ] {
            if value.is_empty() {
                return Err(Error::invalid_argument(format!("{} must not be empty", field)));
            }
        }

        Ok(user)
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Photos that carry a location and can be placed on the map
    pub fn located_photos(&self) -> impl Iterator<Item = &Photo> {
        self.photos.iter().filter(|p| p.location().is_some())
    }
}
