//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod gateway;
pub mod logging;
pub mod migration;
pub mod password;
pub mod users;

pub use gateway::AccountGateway;
pub use logging::{EntryPoint, LogCadence, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use password::CredentialHasher;
pub use users::UserService;
