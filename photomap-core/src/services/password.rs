//! Password hashing for user accounts
//!
//! Login compares a stored `(password_hash, salt)` pair, so callers hash
//! the password themselves: fetch the salt, hash, then authenticate.

use base64::Engine;
use rand::Rng;

use crate::domain::{Argon2Params, Error, Result};

/// Salt length in bytes before base64 encoding
pub const SALT_LEN: usize = 16;

/// Argon2 rejects shorter salts
const MIN_SALT_LEN: usize = 8;

/// Argon2id password hasher
#[derive(Debug, Clone, Default)]
pub struct CredentialHasher {
    params: Argon2Params,
}

impl CredentialHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: Argon2Params) -> Self {
        Self { params }
    }

    /// Generate a random base64 salt
    pub fn generate_salt(&self) -> String {
        let salt: [u8; SALT_LEN] = rand::thread_rng().gen();
        base64::engine::general_purpose::STANDARD.encode(salt)
    }

    /// Hash a password with the given salt, hex-encoded
    ///
    /// The salt string is used as-is, so the same pair always produces the
    /// same hash.
    pub fn hash(&self, password: &str, salt: &str) -> Result<String> {
        if salt.len() < MIN_SALT_LEN {
            return Err(Error::invalid_argument(format!(
                "salt must be at least {} bytes",
                MIN_SALT_LEN
            )));
        }

        let argon2_params = argon2::Params::new(
            self.params.memory_cost,
            self.params.time_cost,
            self.params.parallelism,
            Some(self.params.hash_len as usize),
        )
        .map_err(|e| Error::invalid_argument(format!("argon2 params: {:?}", e)))?;

        let argon2 = argon2::Argon2::new(
            argon2::Algorithm::Argon2id,
            argon2::Version::V0x13,
            argon2_params,
        );

        let mut key = vec![0u8; self.params.hash_len as usize];
        argon2
            .hash_password_into(password.as_bytes(), salt.as_bytes(), &mut key)
            .map_err(|e| Error::Other(format!("Failed to hash password: {:?}", e)))?;

        Ok(hex::encode(&key))
    }

    /// Check a password against a stored hash
    pub fn verify(&self, password: &str, salt: &str, expected_hash: &str) -> Result<bool> {
        Ok(self.hash(password, salt)? == expected_hash)
    }
}
