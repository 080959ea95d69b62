//! Core domain entities
//!
//! Pure data structures with validation logic - no I/O or external dependencies.

mod credentials;
mod photo;
pub mod result;
mod user;

pub use credentials::{Argon2Params, Credentials};
pub use photo::Photo;
pub use result::{Error, ErrorKind, OperationResult, Result};
pub use user::User;
