//! Logging service - failure log stored in DuckDB
//!
//! Records operation failures in logs.duckdb next to the settings file.
//! Only operation names and error messages are stored, never credentials
//! or photo data.
//!
//! The channel to logs.duckdb has an explicit lifecycle: it is opened
//! lazily, stays open for the life of the service by default, and is
//! released on `close()`. With the per-event cadence the channel is
//! dropped after every write and reopened on the next one.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};
use duckdb::Connection;
use serde::{Deserialize, Serialize};

use crate::log_migrations::LOG_MIGRATIONS;
use crate::ports::{emit_tracing, LogSink, Severity};
use crate::services::migration::MigrationService;

/// File name of the log database inside the application directory
pub const LOG_DATABASE_FILE: &str = "logs.duckdb";

/// Counter for generating unique IDs within the same millisecond
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique ID based on timestamp + counter
fn generate_id() -> u64 {
    let timestamp = now_ms() as u64;

    // Use lower 48 bits for timestamp (good for ~8900 years)
    // Use upper 16 bits for counter (65536 unique IDs per millisecond)
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    (timestamp << 16) | counter
}

/// Get current unix timestamp in milliseconds
pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Detect the current platform
fn detect_platform() -> &'static str {
    if cfg!(target_os = "macos") {
        "macos"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "linux") {
        "linux"
    } else {
        "unknown"
    }
}

/// Entry point for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPoint {
    Cli,
    Desktop,
}

impl EntryPoint {
    fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::Cli => "cli",
            EntryPoint::Desktop => "desktop",
        }
    }
}

/// How long the channel to the log database is kept open
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogCadence {
    /// Open on first use, close on `close()`
    #[default]
    LongLived,
    /// Close after every write, reopen on the next one
    PerEvent,
}

/// A log event to be recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LogEvent {
    /// Create a new log event with just an event name
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            operation: None,
            message: None,
        }
    }

    /// Set the operation that produced the event
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Set the human readable message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// A log entry as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub entry_point: String,
    pub app_version: String,
    pub platform: String,
    pub severity: Severity,
    pub event: String,
    pub operation: Option<String>,
    pub message: Option<String>,
}

enum LogChannel {
    Open(Connection),
    Idle,
    Closed,
}

const SELECT_ENTRIES: &str = r#"
    SELECT id, timestamp, entry_point, app_version, platform,
           severity, event, operation, message
    FROM sys_logs
"#;

fn read_entry(row: &duckdb::Row<'_>) -> duckdb::Result<LogEntry> {
    let severity: String = row.get(5)?;
    Ok(LogEntry {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        entry_point: row.get(2)?,
        app_version: row.get(3)?,
        platform: row.get(4)?,
        severity: Severity::parse(&severity).unwrap_or(Severity::Info),
        event: row.get(6)?,
        operation: row.get(7)?,
        message: row.get(8)?,
    })
}

/// Service for the persistent failure log
pub struct LoggingService {
    channel: Mutex<LogChannel>,
    db_path: PathBuf,
    cadence: LogCadence,
    entry_point: EntryPoint,
    app_version: String,
    platform: &'static str,
}

impl LoggingService {
    /// Create a new logging service
    ///
    /// Opens or creates logs.duckdb in the application directory and runs
    /// any pending migrations, so a broken log database is reported here
    /// rather than on the first failure.
    pub fn new(
        app_dir: &Path,
        entry_point: EntryPoint,
        app_version: impl Into<String>,
        cadence: LogCadence,
    ) -> Result<Self> {
        let db_path = app_dir.join(LOG_DATABASE_FILE);
        let conn = Self::open_database(&db_path)?;

        let channel = match cadence {
            LogCadence::LongLived => LogChannel::Open(conn),
            LogCadence::PerEvent => LogChannel::Idle,
        };

        Ok(Self {
            channel: Mutex::new(channel),
            db_path,
            cadence,
            entry_point,
            app_version: app_version.into(),
            platform: detect_platform(),
        })
    }

    /// Open the logs database, creating it if it doesn't exist
    fn open_database(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path)?;
        MigrationService::new(&conn, LOG_MIGRATIONS).run_pending()?;
        Ok(conn)
    }

    /// Run `f` on the channel, opening it if needed
    fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut channel = self.channel.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;

        let conn = match std::mem::replace(&mut *channel, LogChannel::Idle) {
            LogChannel::Closed => {
                *channel = LogChannel::Closed;
                return Err(anyhow!("log channel is closed"));
            }
            LogChannel::Open(conn) => conn,
            LogChannel::Idle => Self::open_database(&self.db_path)?,
        };

        let result = f(&conn);

        if self.cadence == LogCadence::LongLived {
            *channel = LogChannel::Open(conn);
        }

        result
    }

    /// Log an event
    ///
    /// The entry_point, app_version, and platform are added from the service
    /// configuration. The event is also forwarded to `tracing`.
    pub fn log(&self, severity: Severity, event: LogEvent) -> Result<()> {
        emit_tracing(
            severity,
            event.operation.as_deref().unwrap_or(&event.event),
            event.message.as_deref().unwrap_or(&event.event),
        );

        self.with_connection(|conn| {
            conn.execute(
                r#"
                INSERT INTO sys_logs (
                    id, timestamp, entry_point, app_version, platform,
                    severity, event, operation, message
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
                duckdb::params![
                    generate_id(),
                    now_ms(),
                    self.entry_point.as_str(),
                    &self.app_version,
                    self.platform,
                    severity.as_str(),
                    &event.event,
                    &event.operation,
                    &event.message,
                ],
            )?;
            Ok(())
        })
    }

    /// Log a failed operation at warning severity
    pub fn log_failure(&self, operation: &str, message: &str) -> Result<()> {
        self.log(
            Severity::Warning,
            LogEvent::new("operation_failed")
                .with_operation(operation)
                .with_message(message),
        )
    }

    /// Query recent log entries, newest first
    pub fn get_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.with_connection(|conn| {
            let sql = format!("{} ORDER BY id DESC LIMIT ?", SELECT_ENTRIES);
            let mut stmt = conn.prepare(&sql)?;
            let entries = stmt
                .query_map([limit as i64], read_entry)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    /// Query entries at warning severity or above, newest first
    pub fn get_failures(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.with_connection(|conn| {
            let sql = format!(
                "{} WHERE severity IN ('warning', 'error') ORDER BY id DESC LIMIT ?",
                SELECT_ENTRIES
            );
            let mut stmt = conn.prepare(&sql)?;
            let entries = stmt
                .query_map([limit as i64], read_entry)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    /// Get the total number of log entries
    pub fn count(&self) -> Result<u64> {
        self.with_connection(|conn| {
            let count: u64 =
                conn.query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))?;
            Ok(count)
        })
    }

    /// Get the number of entries at warning severity or above
    pub fn count_failures(&self) -> Result<u64> {
        self.with_connection(|conn| {
            let count: u64 = conn.query_row(
                "SELECT COUNT(*) FROM sys_logs WHERE severity IN ('warning', 'error')",
                [],
                |row| row.get(0),
            )?;
            Ok(count)
        })
    }

    /// Delete logs older than the specified timestamp (unix ms)
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        self.with_connection(|conn| {
            let deleted = conn.execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
            Ok(deleted as u64)
        })
    }

    /// Whether a connection to logs.duckdb is currently held
    pub fn is_connected(&self) -> bool {
        self.channel
            .lock()
            .map(|channel| matches!(*channel, LogChannel::Open(_)))
            .unwrap_or(false)
    }

    /// Release the channel; later writes fail until `reopen()`
    pub fn close(&self) -> Result<()> {
        let mut channel = self.channel.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        *channel = LogChannel::Closed;
        Ok(())
    }

    /// Reopen a closed channel
    pub fn reopen(&self) -> Result<()> {
        let mut channel = self.channel.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        if let LogChannel::Closed = *channel {
            *channel = match self.cadence {
                LogCadence::LongLived => LogChannel::Open(Self::open_database(&self.db_path)?),
                LogCadence::PerEvent => LogChannel::Idle,
            };
        }
        Ok(())
    }

    pub fn cadence(&self) -> LogCadence {
        self.cadence
    }

    /// Get the path to the logs database
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl LogSink for LoggingService {
    fn record(&self, severity: Severity, operation: &str, message: &str) {
        let event = LogEvent::new("operation_failed")
            .with_operation(operation)
            .with_message(message);

        if let Err(e) = self.log(severity, event) {
            tracing::warn!(error = %e, "failed to write log entry");
        }
    }
}
