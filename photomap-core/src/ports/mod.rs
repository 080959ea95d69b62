//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external collaborators. The core depends
//! only on these traits, not on concrete implementations.

mod log_sink;

pub(crate) use log_sink::emit_tracing;
pub use log_sink::{LogSink, Severity, TracingSink};
