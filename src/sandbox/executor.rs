//! Ephemeral SQLite execution.
//!
//! Each call builds a private in-memory store, seeds it, runs one statement
//! under a deadline and row cap, and tears the store down on every exit path.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use futures::{FutureExt, TryStreamExt};
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{
    Column, ConnectOptions, Connection, Row as SqlxRow, SqliteConnection, TypeInfo, ValueRef,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::seed;
use super::types::{ExecutionResult, ResultSet, Row, Value};
use crate::error::{Result, TutorError};

/// SQLite VM instructions between progress handler checks.
const PROGRESS_INTERVAL_OPS: i32 = 1_000;

/// Message returned when the deadline fires.
pub const TIMEOUT_MESSAGE: &str = "query execution timeout";

/// Message returned when the caller cancels.
pub const CANCELLED_MESSAGE: &str = "query execution cancelled";

/// Prefix applied to engine error messages.
pub const SQL_ERROR_PREFIX: &str = "SQL Error: ";

/// Limits applied to every sandbox run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxLimits {
    /// Maximum rows kept from a result; extra rows are dropped.
    pub max_rows: usize,
    /// Wall-clock budget for the statement.
    pub query_timeout: Duration,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            max_rows: 100,
            query_timeout: Duration::from_millis(5_000),
        }
    }
}

/// Runs statements in fresh, isolated sandboxes.
///
/// Holds no store between calls; every `execute` starts from the seed data.
#[derive(Debug, Clone, Default)]
pub struct SandboxExecutor {
    limits: SandboxLimits,
}

impl SandboxExecutor {
    /// Creates an executor with the given limits.
    pub fn new(limits: SandboxLimits) -> Self {
        Self { limits }
    }

    /// Returns the configured limits.
    pub fn limits(&self) -> SandboxLimits {
        self.limits
    }

    /// Executes `sql` with the configured limits.
    pub async fn execute(&self, sql: &str) -> ExecutionResult {
        self.execute_cancellable(sql, &CancellationToken::new()).await
    }

    /// Executes `sql`, aborting early if `cancel` fires.
    pub async fn execute_cancellable(
        &self,
        sql: &str,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        execute_with(sql, self.limits.query_timeout, self.limits.max_rows, cancel).await
    }
}

/// Executes `sql` against a fresh sandbox with explicit limits.
///
/// Never fails: every problem is folded into `ExecutionResult::Error`.
pub async fn execute_with(
    sql: &str,
    timeout: Duration,
    max_rows: usize,
    cancel: &CancellationToken,
) -> ExecutionResult {
    let start = Instant::now();

    let mut sandbox = match Sandbox::open().await {
        Ok(sandbox) => sandbox,
        Err(e) => {
            error!(error = %e, "Sandbox store unavailable");
            return ExecutionResult::error("sandbox unavailable");
        }
    };

    let result = sandbox.run(sql, timeout, max_rows, cancel).await;
    sandbox.close().await;

    debug!(
        duration_ms = start.elapsed().as_millis() as u64,
        success = result.is_success(),
        "Sandbox run finished"
    );
    result
}

/// An ephemeral seeded store owned by a single call.
///
/// Dropping it raises the interrupt flag so a still-running statement is
/// aborted by the progress handler, then releases the connection.
struct Sandbox {
    conn: Option<SqliteConnection>,
    interrupt: Arc<AtomicBool>,
}

enum Outcome {
    Rows(Vec<SqliteRow>, bool),
    Failed(sqlx::Error),
    TimedOut,
    Cancelled,
}

impl Sandbox {
    /// Connects to a private in-memory database and seeds it.
    async fn open() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| setup_error("invalid store options", &e))?
            .disable_statement_logging();
        let mut conn = SqliteConnection::connect_with(&options)
            .await
            .map_err(|e| setup_error("connect failed", &e))?;

        if let Err(e) = seed::seed(&mut conn).await {
            let _ = conn.close().await;
            return Err(setup_error("seeding failed", &e));
        }

        Ok(Self {
            conn: Some(conn),
            interrupt: Arc::new(AtomicBool::new(false)),
        })
    }

    async fn run(
        &mut self,
        sql: &str,
        timeout: Duration,
        max_rows: usize,
        cancel: &CancellationToken,
    ) -> ExecutionResult {
        let Some(conn) = self.conn.as_mut() else {
            return ExecutionResult::error("sandbox unavailable");
        };

        let deadline = Instant::now() + timeout;
        let interrupt = Arc::clone(&self.interrupt);
        match conn.lock_handle().await {
            Ok(mut handle) => handle.set_progress_handler(PROGRESS_INTERVAL_OPS, move || {
                !interrupt.load(Ordering::Relaxed) && Instant::now() < deadline
            }),
            Err(e) => {
                error!(error = %e, "Failed to install sandbox progress handler");
                return ExecutionResult::error("sandbox unavailable");
            }
        }

        let outcome = tokio::select! {
            biased;

            _ = cancel.cancelled() => Outcome::Cancelled,
            _ = tokio::time::sleep(timeout) => Outcome::TimedOut,
            fetched = fetch_capped(conn, sql, max_rows) => match fetched {
                Ok((rows, truncated)) => Outcome::Rows(rows, truncated),
                Err(e) if Instant::now() >= deadline => {
                    debug!(error = %e, "Statement interrupted at deadline");
                    Outcome::TimedOut
                }
                Err(e) => Outcome::Failed(e),
            },
        };

        match outcome {
            Outcome::Rows(rows, truncated) => {
                if truncated {
                    warn!(max_rows, "Sandbox result truncated");
                }
                ExecutionResult::Success(shape_rows(&rows, truncated))
            }
            Outcome::Failed(e) => ExecutionResult::error(format!(
                "{SQL_ERROR_PREFIX}{}",
                engine_message(&e)
            )),
            Outcome::TimedOut => {
                self.interrupt.store(true, Ordering::Relaxed);
                warn!(timeout_ms = timeout.as_millis() as u64, "Sandbox query timed out");
                ExecutionResult::error(TIMEOUT_MESSAGE)
            }
            Outcome::Cancelled => {
                self.interrupt.store(true, Ordering::Relaxed);
                debug!("Sandbox query cancelled by caller");
                ExecutionResult::error(CANCELLED_MESSAGE)
            }
        }
    }

    /// Closes the connection, waiting for the engine to release it.
    async fn close(mut self) {
        self.interrupt.store(true, Ordering::Relaxed);
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.close().await {
                debug!(error = %e, "Sandbox close reported an error");
            }
        }
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        self.interrupt.store(true, Ordering::Relaxed);
    }
}

/// Streams rows, keeping at most `max_rows` and reporting whether more existed.
///
/// Returns a boxed future tied to the connection's lifetime, which keeps
/// `execute_with` `Send` for any caller lifetime.
fn fetch_capped<'c>(
    conn: &'c mut SqliteConnection,
    sql: &'c str,
    max_rows: usize,
) -> BoxFuture<'c, std::result::Result<(Vec<SqliteRow>, bool), sqlx::Error>> {
    async move {
        let mut stream = sqlx::query(sql).fetch(&mut *conn);
        let mut rows = Vec::new();

        while let Some(row) = stream.try_next().await? {
            if rows.len() == max_rows {
                return Ok((rows, true));
            }
            rows.push(row);
        }

        Ok((rows, false))
    }
    .boxed()
}

fn setup_error(stage: &str, error: &sqlx::Error) -> TutorError {
    TutorError::execution(format!("sandbox {stage}: {}", engine_message(error)))
}

/// Shapes raw rows into columns and positional cells.
///
/// Column names come from the first row; zero rows means zero columns.
fn shape_rows(rows: &[SqliteRow], truncated: bool) -> ResultSet {
    let columns: Vec<String> = rows
        .first()
        .map(|first| first.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();

    let rows = rows
        .iter()
        .map(|row| convert_row(row, columns.len()))
        .collect();

    ResultSet {
        columns,
        rows,
        truncated,
    }
}

/// Projects a row into a cell vector of exactly `width` values.
fn convert_row(row: &SqliteRow, width: usize) -> Row {
    (0..width).map(|i| convert_value(row, i)).collect()
}

/// Converts one cell according to its runtime storage class.
fn convert_value(row: &SqliteRow, index: usize) -> Value {
    let storage_class = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_uppercase(),
        Err(_) => return Value::Null,
    };

    match storage_class.as_str() {
        "INTEGER" | "INT8" | "BOOLEAN" => row
            .try_get_unchecked::<i64, _>(index)
            .map(Value::Int)
            .unwrap_or(Value::Null),

        "REAL" => row
            .try_get_unchecked::<f64, _>(index)
            .map(Value::Float)
            .unwrap_or(Value::Null),

        "BLOB" => row
            .try_get_unchecked::<Vec<u8>, _>(index)
            .map(Value::Bytes)
            .unwrap_or(Value::Null),

        _ => row
            .try_get_unchecked::<String, _>(index)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Extracts the engine's own message, without connection details.
fn engine_message(error: &sqlx::Error) -> String {
    match error.as_database_error() {
        Some(db_error) => db_error.message().to_string(),
        None => error.to_string(),
    }
}
