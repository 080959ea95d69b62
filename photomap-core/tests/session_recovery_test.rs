//! Session lifecycle and configuration failure tests
//!
//! Covers the paths where the store is unavailable or the session went bad:
//! lazy credential failures, transparent session replacement, and failure
//! reporting into the persistent log.
//!
//! Run with: cargo test --test session_recovery_test -- --nocapture

use std::sync::Arc;

use tempfile::TempDir;

use photomap_core::adapters::duckdb::{ConnectionFactory, SessionManager};
use photomap_core::config::{Config, SETTINGS_FILE};
use photomap_core::domain::Argon2Params;
use photomap_core::ports::{LogSink, TracingSink};
use photomap_core::services::{AccountGateway, CredentialHasher, UserService};
use photomap_core::{Credentials, EntryPoint, ErrorKind, LogCadence, PhotomapContext};

fn fast_hasher() -> CredentialHasher {
    CredentialHasher::with_params(Argon2Params {
        time_cost: 1,
        memory_cost: 1024,
        parallelism: 1,
        hash_len: 32,
    })
}

fn gateway_for(factory: ConnectionFactory) -> (Arc<SessionManager>, Arc<UserService>, AccountGateway) {
    let sessions = Arc::new(SessionManager::new(factory));
    let users = Arc::new(UserService::new(
        Arc::clone(&sessions),
        Arc::new(TracingSink) as Arc<dyn LogSink>,
    ));
    let gateway = AccountGateway::new(Arc::clone(&users));
    (sessions, users, gateway)
}

fn write_settings(dir: &TempDir, json: &str) {
    std::fs::write(dir.path().join(SETTINGS_FILE), json).unwrap();
}

// ============================================================================
// Session recovery
// ============================================================================

#[test]
fn test_operation_after_external_invalidation_succeeds() {
    let (sessions, _users, gateway) =
        gateway_for(ConnectionFactory::in_memory(Credentials::new("app", "secret")));

    assert!(gateway.register_user("alice", "a@x.com", "H", "S").unwrap());
    let first = sessions.acquire_session().unwrap().id();

    sessions.invalidate();

    // Data lives in the database instance, not the session
    assert_eq!(gateway.get_salt("alice").unwrap(), "S");
    assert_ne!(sessions.acquire_session().unwrap().id(), first);
    assert_eq!(sessions.sessions_opened(), 2);
}

#[test]
fn test_repeated_invalidation_never_sticks() {
    let (sessions, _users, gateway) =
        gateway_for(ConnectionFactory::in_memory(Credentials::new("app", "secret")));
    assert!(gateway.register_user("alice", "a@x.com", "H", "S").unwrap());

    for _ in 0..3 {
        sessions.invalidate();
        assert!(gateway.login("alice", "H"));
    }
}

#[test]
fn test_concurrent_callers_are_serialized() {
    let (_sessions, users, _gateway) =
        gateway_for(ConnectionFactory::in_memory(Credentials::new("app", "secret")));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let users = Arc::clone(&users);
            std::thread::spawn(move || {
                users
                    .register(&format!("user{}", i), "u@x.com", "H", "S")
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap().id.is_some());
    }
    for i in 0..4 {
        assert!(users.get_user_id(&format!("user{}", i)).unwrap() > 0);
    }
}

// ============================================================================
// Lazy configuration failures
// ============================================================================

#[test]
fn test_missing_credentials_surface_on_first_use() {
    let (sessions, users, gateway) = gateway_for(ConnectionFactory::in_memory(Credentials::default()));

    assert!(!gateway.register_user("alice", "a@x.com", "H", "S").unwrap());
    assert!(gateway.get_user("alice").is_none());
    assert_eq!(gateway.get_user_id("alice"), -1);

    let err = gateway.get_salt("alice").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(users.get_user("alice").unwrap_err().kind(), ErrorKind::Configuration);
    assert_eq!(sessions.sessions_opened(), 0);
}

#[test]
fn test_wrong_datastore_password_is_rejected_lazily() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("photomap.duckdb");

    {
        let factory = ConnectionFactory::new(Some(path.clone()), Credentials::new("app", "secret"))
            .with_hasher(fast_hasher());
        let (_sessions, _users, gateway) = gateway_for(factory);
        assert!(gateway.register_user("alice", "a@x.com", "H", "S").unwrap());
    }

    {
        let factory = ConnectionFactory::new(Some(path.clone()), Credentials::new("app", "guess"))
            .with_hasher(fast_hasher());
        let (_sessions, users, gateway) = gateway_for(factory);
        assert!(!gateway.login("alice", "H"));
        assert_eq!(users.get_salt("alice").unwrap_err().kind(), ErrorKind::Configuration);
    }

    let factory = ConnectionFactory::new(Some(path), Credentials::new("app", "secret"))
        .with_hasher(fast_hasher());
    let (_sessions, _users, gateway) = gateway_for(factory);
    assert!(gateway.login("alice", "H"));
}

// ============================================================================
// Application context
// ============================================================================

#[test]
fn test_context_without_settings_opens_and_logs() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_file(dir.path());
    let ctx = PhotomapContext::with_config(dir.path(), EntryPoint::Cli, config).unwrap();

    // No credentials: the failure is reported, not fatal
    assert!(ctx.gateway.get_user("alice").is_none());

    let logger = ctx.logger.as_ref().unwrap();
    let operations: Vec<_> = logger
        .get_failures(10)
        .unwrap()
        .into_iter()
        .filter_map(|e| e.operation)
        .collect();
    assert!(operations.contains(&"load_config".to_string()));
    assert!(operations.contains(&"get_user".to_string()));

    ctx.close().unwrap();
}

#[test]
fn test_context_register_and_login_with_password() {
    let dir = TempDir::new().unwrap();
    write_settings(
        &dir,
        r#"{ "datastore": { "username": "app", "password": "secret", "path": ":memory:" } }"#,
    );
    let config = Config::load_file(dir.path());
    let ctx = PhotomapContext::with_config(dir.path(), EntryPoint::Desktop, config).unwrap();

    let user = ctx.register_with_password("alice", "a@x.com", "hunter2").unwrap();
    assert!(user.id.is_some());

    assert_eq!(ctx.login("alice", "hunter2").unwrap().id, user.id);
    assert_eq!(
        ctx.login("alice", "wrong").unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert!(ctx.login("bob", "hunter2").unwrap_err().is_not_found());

    ctx.close().unwrap();
}

#[test]
fn test_per_event_cadence_releases_log_channel() {
    let dir = TempDir::new().unwrap();
    write_settings(
        &dir,
        r#"{
            "datastore": { "username": "app", "password": "secret", "path": ":memory:" },
            "logging": { "cadence": "per-event" }
        }"#,
    );
    let config = Config::load_file(dir.path());
    assert_eq!(config.log_cadence, LogCadence::PerEvent);
    let ctx = PhotomapContext::with_config(dir.path(), EntryPoint::Cli, config).unwrap();
    let logger = Arc::clone(ctx.logger.as_ref().unwrap());

    assert_eq!(ctx.gateway.get_user_id("ghost"), -1);
    assert!(!logger.is_connected());
    assert_eq!(ctx.gateway.get_user_id("ghost"), -1);
    assert!(!logger.is_connected());

    assert_eq!(logger.get_failures(10).unwrap().len(), 2);
    ctx.close().unwrap();
}
