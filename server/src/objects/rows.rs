//! Metadata queries shared by files and texts.
//!
//! Both tables have the same shape (texts add a `data` column), so these
//! take the [`ObjectKind`] and pick the table from it.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::{ObjectKind, StoredObject};
use crate::db::{timestamp, DataError};

/// Look up a live (not soft-deleted) object by identity. Expired objects
/// are returned as-is; callers decide how to treat them.
pub fn find_by_hash(conn: &Connection, kind: ObjectKind, hash: &str) -> Result<StoredObject, DataError> {
    conn.query_row(
        &format!(
            "SELECT {} FROM {} WHERE hash = ?1 AND deleted_at IS NULL",
            StoredObject::COLUMNS,
            kind.table()
        ),
        params![hash],
        |row| StoredObject::from_row(kind, row),
    )
    .optional()?
    .ok_or(DataError::NotFound(kind.label()))
}

/// Unexpired objects owned by `owner`, newest first.
pub fn list_by_owner(
    conn: &Connection,
    kind: ObjectKind,
    owner: u64,
    now: DateTime<Utc>,
) -> Result<Vec<StoredObject>, DataError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM {}
         WHERE user_id = ?1 AND deleted_at IS NULL AND (expires_at IS NULL OR expires_at > ?2)
         ORDER BY created_at DESC, id DESC",
        StoredObject::COLUMNS,
        kind.table()
    ))?;
    let objects = stmt
        .query_map(params![owner as i64, timestamp(now)], |row| {
            StoredObject::from_row(kind, row)
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(objects)
}

/// Remove the row for `hash`. Missing rows are `NotFound`.
pub fn remove(conn: &Connection, kind: ObjectKind, hash: &str) -> Result<(), DataError> {
    let deleted = conn.execute(
        &format!("DELETE FROM {} WHERE hash = ?1", kind.table()),
        params![hash],
    )?;
    if deleted == 0 {
        return Err(DataError::NotFound(kind.label()));
    }
    Ok(())
}

/// Delete every row expired at `now` and return their identities.
pub fn take_expired(
    conn: &mut Connection,
    kind: ObjectKind,
    now: DateTime<Utc>,
) -> Result<Vec<String>, DataError> {
    let now = timestamp(now);
    let tx = conn.transaction()?;
    let hashes = {
        let mut stmt = tx.prepare(&format!(
            "SELECT hash FROM {} WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            kind.table()
        ))?;
        let rows = stmt
            .query_map(params![now], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };
    tx.execute(
        &format!(
            "DELETE FROM {} WHERE expires_at IS NOT NULL AND expires_at <= ?1",
            kind.table()
        ),
        params![now],
    )?;
    tx.commit()?;
    Ok(hashes)
}
