//! DuckDB repository implementation

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use duckdb::{params, Connection};
use uuid::Uuid;

use crate::domain::result::{Error, Result, StorageContext};
use crate::domain::{CostFilter, MonthYear, Subscription};
use crate::ports::SubscriptionRepository;
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const SELECT_COLUMNS: &str = "SELECT sub_id, user_id, service_name, price,
                                     start_date::VARCHAR, end_date::VARCHAR
                              FROM subscriptions";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock on file")
}

/// Raw column values of one subscriptions row
type RawRow = (String, String, String, i64, String, Option<String>);

/// DuckDB repository implementation
///
/// Holds one root connection; every operation runs on a clone of it so
/// callers on different threads do not share a statement.
pub struct DuckDbRepository {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl DuckDbRepository {
    /// Open (or create) a database file
    ///
    /// Retries with exponential backoff on file locking errors, which occur
    /// when another process still holds the database open.
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: Some(db_path.to_path_buf()),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[subtrack] Database busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(Error::storage(
                        format!("open database {}", db_path.display()),
                        e,
                    ));
                }
            }
        }

        Err(match last_error {
            Some(e) => Error::storage(format!("open database {}", db_path.display()), e),
            None => Error::storage_msg(
                format!("open database {}", db_path.display()),
                format!("failed after {} retries", MAX_RETRIES),
            ),
        })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let config = duckdb::Config::default()
            .enable_autoload_extension(false)
            .storage_context(|| "configure in-memory database")?;
        let conn = Connection::open_in_memory_with_flags(config)
            .storage_context(|| "open in-memory database")?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    fn try_open_connection(db_path: &Path) -> std::result::Result<Connection, duckdb::Error> {
        // Autoloaded extensions from ~/.duckdb can fail code signing checks
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    /// Path of the database file, `None` for in-memory databases
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Run database migrations using the MigrationService
    pub fn run_migrations(&self) -> Result<MigrationResult> {
        let conn = self.connection("run migrations")?;
        MigrationService::new(&conn).run_pending()
    }

    /// Ensure database schema exists (runs pending migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        self.run_migrations()?;
        Ok(())
    }

    /// Number of stored subscriptions
    pub fn count(&self) -> Result<i64> {
        let conn = self.connection("count subscriptions")?;
        conn.query_row("SELECT COUNT(*) FROM subscriptions", [], |row| row.get(0))
            .storage_context(|| "count subscriptions")
    }

    fn connection(&self, operation: &str) -> Result<Connection> {
        let root = self
            .conn
            .lock()
            .map_err(|e| Error::storage_msg(operation, format!("lock poisoned: {}", e)))?;
        root.try_clone()
            .storage_context(|| format!("{}: acquire connection", operation))
    }

    fn read_row(row: &duckdb::Row) -> duckdb::Result<RawRow> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        ))
    }

    fn row_to_subscription(raw: RawRow) -> Result<Subscription> {
        let (sub_id, user_id, service_name, price, start_date, end_date) = raw;
        let context = || format!("decode subscription {}", sub_id);

        let id = Uuid::parse_str(&sub_id)
            .map_err(|e| Error::storage_msg(context(), format!("bad sub_id: {}", e)))?;
        let user_id = Uuid::parse_str(&user_id)
            .map_err(|e| Error::storage_msg(context(), format!("bad user_id: {}", e)))?;
        let price = u32::try_from(price)
            .map_err(|_| Error::storage_msg(context(), format!("price out of range: {}", price)))?;
        let start_date = parse_stored_date(&start_date).ok_or_else(|| {
            Error::storage_msg(context(), format!("bad start_date: {}", start_date))
        })?;
        let end_date = match end_date {
            Some(s) => Some(
                parse_stored_date(&s)
                    .ok_or_else(|| Error::storage_msg(context(), format!("bad end_date: {}", s)))?,
            ),
            None => None,
        };

        Ok(Subscription {
            id,
            user_id,
            service_name,
            price,
            start_date,
            end_date,
        })
    }
}

impl SubscriptionRepository for DuckDbRepository {
    fn insert(&self, sub: &Subscription) -> Result<()> {
        let context = || format!("insert subscription {}", sub.id);
        let conn = self.connection(&context())?;

        conn.execute(
            "INSERT INTO subscriptions (sub_id, user_id, service_name, price, start_date, end_date)
             VALUES (?, ?, ?, ?, CAST(? AS DATE), CAST(? AS DATE))",
            params![
                sub.id.to_string(),
                sub.user_id.to_string(),
                sub.service_name,
                i64::from(sub.price),
                format_stored_date(sub.start_date),
                sub.end_date.map(format_stored_date),
            ],
        )
        .storage_context(context)?;

        Ok(())
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<Subscription>> {
        let context = || format!("get subscription {}", id);
        let conn = self.connection(&context())?;

        let mut stmt = conn
            .prepare(&format!("{} WHERE sub_id = ?", SELECT_COLUMNS))
            .storage_context(context)?;
        let mut rows = stmt
            .query_map([id.to_string()], Self::read_row)
            .storage_context(context)?;

        match rows.next() {
            Some(raw) => Ok(Some(Self::row_to_subscription(
                raw.storage_context(context)?,
            )?)),
            None => Ok(None),
        }
    }

    fn update(&self, sub: &Subscription) -> Result<u64> {
        let context = || format!("update subscription {}", sub.id);
        let conn = self.connection(&context())?;

        let affected = conn
            .execute(
                "UPDATE subscriptions
                 SET service_name = ?,
                     price = ?,
                     start_date = CAST(? AS DATE),
                     end_date = CAST(? AS DATE)
                 WHERE sub_id = ?",
                params![
                    sub.service_name,
                    i64::from(sub.price),
                    format_stored_date(sub.start_date),
                    sub.end_date.map(format_stored_date),
                    sub.id.to_string(),
                ],
            )
            .storage_context(context)?;

        Ok(affected as u64)
    }

    fn delete(&self, id: Uuid) -> Result<u64> {
        let context = || format!("delete subscription {}", id);
        let conn = self.connection(&context())?;

        let affected = conn
            .execute(
                "DELETE FROM subscriptions WHERE sub_id = ?",
                params![id.to_string()],
            )
            .storage_context(context)?;

        Ok(affected as u64)
    }

    fn list(&self) -> Result<Vec<Subscription>> {
        let context = || "list subscriptions";
        let conn = self.connection(context())?;

        let mut stmt = conn
            .prepare(&format!("{} ORDER BY start_date DESC", SELECT_COLUMNS))
            .storage_context(context)?;
        let rows = stmt
            .query_map([], Self::read_row)
            .storage_context(context)?;

        let mut subscriptions = Vec::new();
        for raw in rows {
            subscriptions.push(Self::row_to_subscription(raw.storage_context(context)?)?);
        }
        Ok(subscriptions)
    }

    fn total_cost(&self, filter: &CostFilter) -> Result<i64> {
        let context = || "calculate total cost";
        let conn = self.connection(context())?;

        // Absent filters bind NULL, which disables their predicate
        let user_id = filter.user_id.map(|id| id.to_string());
        let service_name = filter.service_name.clone();

        conn.query_row(
            "SELECT CAST(COALESCE(SUM(price), 0) AS BIGINT)
             FROM subscriptions
             WHERE start_date <= CAST(? AS DATE)
               AND (end_date >= CAST(? AS DATE) OR end_date IS NULL)
               AND (CAST(? AS VARCHAR) IS NULL OR user_id = CAST(? AS VARCHAR))
               AND (CAST(? AS VARCHAR) IS NULL OR service_name = CAST(? AS VARCHAR))",
            params![
                format_stored_date(filter.period.end),
                format_stored_date(filter.period.start),
                user_id,
                user_id,
                service_name,
                service_name,
            ],
            |row| row.get(0),
        )
        .storage_context(context)
    }
}

/// Format a month as the ISO date of its first day
fn format_stored_date(month: MonthYear) -> String {
    month.first_day().format("%Y-%m-%d").to_string()
}

fn parse_stored_date(s: &str) -> Option<MonthYear> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(MonthYear::from_date)
}
