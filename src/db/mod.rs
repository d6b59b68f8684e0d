pub mod schema;

use anyhow::{Context, Result};
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;

use crate::config::StorageConfig;
use crate::knowledge::similarity;

/// Register the lore SQL functions on a connection:
///
/// - `similarity(a, b)`: trigram similarity in `[0, 1]`
/// - `fold_case(text)`: Unicode lowercase, unlike the built-in ASCII-only `lower()`
pub fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;
    conn.create_scalar_function("similarity", 2, flags, |ctx| {
        let a = ctx.get::<Option<String>>(0)?.unwrap_or_default();
        let b = ctx.get::<Option<String>>(1)?.unwrap_or_default();
        Ok(similarity::similarity(&a, &b))
    })?;
    conn.create_scalar_function("fold_case", 1, flags, |ctx| {
        Ok(ctx.get::<Option<String>>(0)?.map(|s| s.to_lowercase()))
    })
}

/// Open (or create) the lore database at the given path with schema initialized.
pub fn open_database(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Connection> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    // Lock contention surfaces as SQLITE_BUSY after this long instead of hanging
    conn.busy_timeout(busy_timeout)?;
    // Enable WAL mode for better concurrent read performance
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    register_functions(&conn).context("failed to register SQL functions")?;
    schema::init_schema(&conn).context("failed to initialize schema")?;

    tracing::info!(path = %path.display(), "database initialized");
    Ok(conn)
}

/// Open the database, retrying connection establishment with exponential backoff.
///
/// Only opening is retried; statements that mutate data never are.
pub fn open_with_retry(path: impl AsRef<Path>, storage: &StorageConfig) -> Result<Connection> {
    let path = path.as_ref();
    let busy_timeout = storage.busy_timeout();
    let mut backoff = Duration::from_millis(storage.connect_backoff_ms);
    let mut attempt = 0;

    loop {
        match open_database(path, busy_timeout) {
            Ok(conn) => return Ok(conn),
            Err(e) if attempt < storage.connect_retries => {
                attempt += 1;
                tracing::warn!(
                    attempt,
                    max = storage.connect_retries,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %format!("{e:#}"),
                    "database open failed, retrying"
                );
                std::thread::sleep(backoff);
                backoff *= 2;
            }
            Err(e) => {
                return Err(e.context(format!("giving up after {} attempt(s)", attempt + 1)))
            }
        }
    }
}

/// Open an in-memory database with functions and schema, for tests and tooling.
pub fn open_memory_database() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    register_functions(&conn)?;
    schema::init_schema(&conn).context("failed to initialize schema")?;
    Ok(conn)
}

/// Result of the `doctor` diagnostics.
#[derive(Debug, Serialize)]
pub struct DatabaseReport {
    pub integrity_ok: bool,
    pub integrity_details: String,
    pub schema_version: u32,
    pub sqlite_version: String,
    pub entry_count: u64,
    pub log_count: u64,
}

/// Run integrity and bookkeeping checks.
pub fn check_database_health(conn: &Connection) -> Result<DatabaseReport> {
    let integrity: String = conn.query_row("PRAGMA integrity_check", [], |r| r.get(0))?;
    let schema_version = schema::get_schema_version(conn)?;
    let sqlite_version: String = conn.query_row("SELECT sqlite_version()", [], |r| r.get(0))?;
    let entry_count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |r| r.get(0))?;
    let log_count: i64 = conn.query_row("SELECT COUNT(*) FROM entry_log", [], |r| r.get(0))?;

    Ok(DatabaseReport {
        integrity_ok: integrity == "ok",
        integrity_details: integrity,
        schema_version,
        sqlite_version,
        entry_count: entry_count as u64,
        log_count: log_count as u64,
    })
}
