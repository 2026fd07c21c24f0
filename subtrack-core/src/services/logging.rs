//! Logging service - structured event logging to DuckDB
//!
//! Stores store events in logs.duckdb next to the subscriptions database.
//! Events carry ids and operation names only; prices and service names are
//! kept out of the log unless a caller puts them in `details`.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};
use duckdb::Connection;
use serde::{Deserialize, Serialize};

use crate::log_migrations::LOG_MIGRATIONS;
use crate::ports::{EventLog, LogEvent, LogLevel};
use crate::services::MigrationService;

/// Counter for generating unique IDs within the same millisecond
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique ID based on timestamp + counter
fn generate_id() -> u64 {
    // Lower 16 bits hold the counter, the rest the millisecond timestamp
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    ((now_ms() as u64) << 16) | counter
}

/// Current unix timestamp in milliseconds
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// A log entry as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: i64,
    pub level: String,
    pub app_version: String,
    pub event: String,
    pub operation: Option<String>,
    pub subscription_id: Option<String>,
    pub error_message: Option<String>,
    pub details: Option<String>,
}

const SELECT_ENTRIES: &str = "SELECT id, timestamp, level, app_version, event, operation,
                                     subscription_id, error_message, details
                              FROM sys_logs";

/// Service for structured event logging
///
/// Manages the logs.duckdb database and provides methods for logging events
/// and querying the log history.
pub struct LoggingService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    app_version: String,
    min_level: LogLevel,
}

impl LoggingService {
    /// Create a new logging service
    ///
    /// Opens or creates logs.duckdb in the data directory and runs any
    /// pending log migrations. Events below `min_level` are dropped.
    pub fn new(
        data_dir: &Path,
        app_version: impl Into<String>,
        min_level: LogLevel,
    ) -> Result<Self> {
        let db_path = data_dir.join("logs.duckdb");
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        let conn = Connection::open_with_flags(&db_path, config)?;

        MigrationService::with_migrations(&conn, LOG_MIGRATIONS).run_pending()?;

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
            app_version: app_version.into(),
            min_level,
        })
    }

    /// Minimum level this service records
    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// Write an event regardless of the minimum level
    pub fn log(&self, event: &LogEvent) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let details = event.details.as_ref().map(|d| d.to_string());

        conn.execute(
            r#"
            INSERT INTO sys_logs (
                id, timestamp, level, app_version, event,
                operation, subscription_id, error_message, details
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            duckdb::params![
                generate_id(),
                now_ms(),
                event.level.as_str(),
                &self.app_version,
                &event.event,
                &event.operation,
                &event.subscription_id,
                &event.error_message,
                details,
            ],
        )?;

        Ok(())
    }

    /// Most recent entries, newest first
    pub fn get_recent(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query(&format!("{} ORDER BY id DESC LIMIT ?", SELECT_ENTRIES), limit)
    }

    /// Most recent entries that carry an error message
    pub fn get_errors(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.query(
            &format!(
                "{} WHERE error_message IS NOT NULL ORDER BY id DESC LIMIT ?",
                SELECT_ENTRIES
            ),
            limit,
        )
    }

    fn query(&self, sql: &str, limit: usize) -> Result<Vec<LogEntry>> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let mut stmt = conn.prepare(sql)?;

        let entries = stmt
            .query_map([limit as i64], |row| {
                Ok(LogEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    level: row.get(2)?,
                    app_version: row.get(3)?,
                    event: row.get(4)?,
                    operation: row.get(5)?,
                    subscription_id: row.get(6)?,
                    error_message: row.get(7)?,
                    details: row.get(8)?,
                })
            })?
            .collect::<duckdb::Result<Vec<_>>>()?;

        Ok(entries)
    }

    /// Get the total number of log entries
    pub fn count(&self) -> Result<u64> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM sys_logs", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete logs older than the specified timestamp (unix ms)
    pub fn delete_before(&self, timestamp_ms: i64) -> Result<u64> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let deleted = conn.execute("DELETE FROM sys_logs WHERE timestamp < ?", [timestamp_ms])?;
        Ok(deleted as u64)
    }

    /// Get the path to the logs database
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl EventLog for LoggingService {
    fn record(&self, event: LogEvent) {
        if event.level < self.min_level {
            return;
        }
        // A broken log must not fail the operation being logged
        let _ = self.log(&event);
    }
}
