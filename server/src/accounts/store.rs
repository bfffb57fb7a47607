//! User rows.
//!
//! All functions take a borrowed connection and run synchronously; callers
//! on the async side go through [`crate::db::run_blocking`].

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::models::User;
use crate::db::{parse_timestamp, timestamp, DataError};

const USER_COLUMNS: &str =
    "id, email, password_hash, active, created_at, updated_at, deleted_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    let deleted_at: Option<String> = row.get(6)?;
    Ok(User {
        id: row.get::<_, i64>(0)? as u64,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        active: row.get(3)?,
        created_at: parse_timestamp(&row.get::<_, String>(4)?)?,
        updated_at: parse_timestamp(&row.get::<_, String>(5)?)?,
        deleted_at: deleted_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

/// Insert a new active user. A taken email is `DataError::Conflict("user")`.
pub fn create_user(conn: &Connection, email: &str, password_hash: &str) -> Result<User, DataError> {
    let now = timestamp(Utc::now());
    conn.execute(
        "INSERT INTO users (email, password_hash, active, created_at, updated_at)
         VALUES (?1, ?2, 1, ?3, ?3)",
        params![email, password_hash, now],
    )
    .map_err(|e| DataError::from_insert(e, "user"))?;

    let id = conn.last_insert_rowid() as u64;
    find_by_id(conn, id)?.ok_or(DataError::NotFound("user"))
}

pub fn find_by_id(conn: &Connection, id: u64) -> Result<Option<User>, DataError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id as i64],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<User>, DataError> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![email],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

/// True if the account exists, is active and has not been deleted.
pub fn is_active(conn: &Connection, id: u64) -> Result<bool, DataError> {
    let active = conn
        .query_row(
            "SELECT active FROM users WHERE id = ?1 AND deleted_at IS NULL",
            params![id as i64],
            |row| row.get::<_, bool>(0),
        )
        .optional()?;
    Ok(active.unwrap_or(false))
}

/// Soft delete: the row stays (objects still reference it) but the account
/// can no longer pass authorization or log in.
pub fn deactivate(conn: &Connection, id: u64) -> Result<(), DataError> {
    let now = timestamp(Utc::now());
    let changed = conn.execute(
        "UPDATE users SET active = 0, deleted_at = ?1, updated_at = ?1
         WHERE id = ?2 AND deleted_at IS NULL",
        params![now, id as i64],
    )?;
    if changed == 0 {
        return Err(DataError::NotFound("user"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_db;

    #[test]
    fn test_create_and_find() {
        let db = init_memory_db().unwrap();
        let conn = db.lock().unwrap();

        let user = create_user(&conn, "alice@example.com", "phc").unwrap();
        assert!(user.active);
        assert!(user.deleted_at.is_none());

        let found = find_by_email(&conn, "alice@example.com").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.password_hash, "phc");
        assert!(find_by_email(&conn, "bob@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let db = init_memory_db().unwrap();
        let conn = db.lock().unwrap();

        create_user(&conn, "alice@example.com", "phc").unwrap();
        let err = create_user(&conn, "alice@example.com", "other").unwrap_err();
        assert!(matches!(err, DataError::Conflict("user")));
    }

    #[test]
    fn test_deactivate() {
        let db = init_memory_db().unwrap();
        let conn = db.lock().unwrap();

        let user = create_user(&conn, "alice@example.com", "phc").unwrap();
        assert!(is_active(&conn, user.id).unwrap());

        deactivate(&conn, user.id).unwrap();
        assert!(!is_active(&conn, user.id).unwrap());
        assert!(find_by_id(&conn, user.id).unwrap().unwrap().deleted_at.is_some());

        assert!(matches!(deactivate(&conn, user.id), Err(DataError::NotFound("user"))));
    }

    #[test]
    fn test_unknown_user_is_not_active() {
        let db = init_memory_db().unwrap();
        let conn = db.lock().unwrap();
        assert!(!is_active(&conn, 42).unwrap());
    }
}
