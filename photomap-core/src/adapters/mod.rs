//! Adapter implementations
//!
//! Adapters bind the core to concrete technologies:
//! - DuckDB connection factory and session management
//! - SQL for the users and photos tables

pub mod duckdb;
pub mod user_store;
