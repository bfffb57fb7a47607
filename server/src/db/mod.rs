pub mod migrations;
pub mod models;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Type alias for the shared database connection.
/// rusqlite is synchronous, so we wrap in Arc<Mutex> for thread safety
/// with tokio::task::spawn_blocking for DB operations.
pub type DbPool = Arc<Mutex<Connection>>;

/// Errors at the data-access boundary. Missing rows and uniqueness
/// violations get their own variants so handlers never have to inspect
/// driver errors.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("migration error: {0}")]
    Migration(#[from] rusqlite_migration::Error),

    #[error("database lock poisoned")]
    LockPoisoned,

    #[error("database task failed: {0}")]
    Task(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// Map a UNIQUE constraint violation to `Conflict`, anything else to `Sqlite`.
    pub fn from_insert(err: rusqlite::Error, what: &'static str) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                DataError::Conflict(what)
            }
            _ => DataError::Sqlite(err),
        }
    }
}

/// Initialize the SQLite database: create data directory if needed,
/// open (or create) the database file, enable WAL mode, and run migrations.
pub fn init_db(data_dir: &str) -> Result<DbPool, DataError> {
    // Ensure data directory exists
    std::fs::create_dir_all(data_dir)?;

    let db_path = Path::new(data_dir).join("riley.db");
    let mut conn = Connection::open(&db_path)?;

    // Enable WAL mode for better concurrent read performance
    conn.pragma_update(None, "journal_mode", "WAL")?;
    prepare(&mut conn)?;

    tracing::info!("Database initialized at {}", db_path.display());

    Ok(Arc::new(Mutex::new(conn)))
}

/// In-memory database with the full schema, for tests.
pub fn init_memory_db() -> Result<DbPool, DataError> {
    let mut conn = Connection::open_in_memory()?;
    prepare(&mut conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

fn prepare(conn: &mut Connection) -> Result<(), DataError> {
    // Enable foreign key enforcement
    conn.pragma_update(None, "foreign_keys", "ON")?;
    migrations::migrations().to_latest(conn)?;
    Ok(())
}

/// Run `f` against the connection on the blocking pool.
///
/// Once spawned the closure runs to completion even if the caller is
/// dropped, so a statement is never left half-applied.
pub async fn run_blocking<T, F>(db: &DbPool, f: F) -> Result<T, DataError>
where
    T: Send + 'static,
    F: FnOnce(&mut Connection) -> Result<T, DataError> + Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = db.lock().map_err(|_| DataError::LockPoisoned)?;
        f(&mut conn)
    })
    .await
    .map_err(|e| DataError::Task(e.to_string()))?
}

/// Fixed-width RFC 3339 (UTC, microseconds) so stored timestamps compare
/// correctly as text.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_db_creates_file_and_schema() {
        let tmp = tempfile::tempdir().unwrap();
        let data_dir = tmp.path().join("data");
        let db = init_db(data_dir.to_str().unwrap()).unwrap();
        assert!(data_dir.join("riley.db").exists());

        let conn = db.lock().unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'files', 'texts')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }

    #[test]
    fn test_timestamps_sort_as_text() {
        let earlier = Utc::now();
        let later = earlier + chrono::Duration::milliseconds(1);
        assert!(timestamp(earlier) < timestamp(later));
        assert_eq!(parse_timestamp(&timestamp(earlier)).unwrap().timestamp_micros(), earlier.timestamp_micros());
    }

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let db = init_memory_db().unwrap();
        let conn = db.lock().unwrap();
        let insert = "INSERT INTO users (email, password_hash, created_at, updated_at) VALUES ('a@b.co', 'x', '', '')";
        conn.execute(insert, []).unwrap();
        let err = conn.execute(insert, []).unwrap_err();
        assert!(matches!(DataError::from_insert(err, "user"), DataError::Conflict("user")));
    }
}
