//! Text objects. Content is stored inline in the `texts` row, so there is
//! no storage backend involved.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::db::models::{ObjectKind, StoredObject, TextObject};
use crate::db::{self, timestamp, DataError, DbPool};
use crate::objects::{address, rows, ObjectError};

pub async fn create_text(
    db: &DbPool,
    owner: u64,
    name: &str,
    data: &str,
    expires_at: Option<DateTime<Utc>>,
) -> Result<StoredObject, ObjectError> {
    if name.trim().is_empty() {
        return Err(ObjectError::Invalid("Text name must not be empty"));
    }
    if data.is_empty() {
        return Err(ObjectError::Invalid("Text data must not be empty"));
    }

    let identity = address::new_identity(data.as_bytes())?;
    let name = name.to_string();
    let data = data.to_string();

    let object = db::run_blocking(db, move |conn| {
        let now = timestamp(Utc::now());
        conn.execute(
            "INSERT INTO texts (created_at, updated_at, expires_at, data, name, size, hash, user_id)
             VALUES (?1, ?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                now,
                expires_at.map(timestamp),
                data,
                name,
                data.len() as i64,
                identity,
                owner as i64
            ],
        )
        .map_err(|e| DataError::from_insert(e, "text"))?;
        rows::find_by_hash(conn, ObjectKind::Text, &identity)
    })
    .await?;

    tracing::info!(identity = %object.hash, size = object.size, owner, "Text stored");
    Ok(object)
}

fn text_with_data(conn: &Connection, hash: &str) -> Result<TextObject, DataError> {
    let meta = rows::find_by_hash(conn, ObjectKind::Text, hash)?;
    let data = conn.query_row(
        "SELECT data FROM texts WHERE id = ?1",
        params![meta.id],
        |row| row.get::<_, String>(0),
    )?;
    Ok(TextObject { meta, data })
}

pub async fn get_text_by_hash(db: &DbPool, hash: &str) -> Result<TextObject, ObjectError> {
    let hash = hash.to_string();
    Ok(db::run_blocking(db, move |conn| text_with_data(conn, &hash)).await?)
}

pub async fn delete_text(db: &DbPool, hash: &str) -> Result<(), ObjectError> {
    let hash = hash.to_string();
    Ok(db::run_blocking(db, move |conn| rows::remove(conn, ObjectKind::Text, &hash)).await?)
}

pub async fn list_texts_by_owner(db: &DbPool, owner: u64) -> Result<Vec<StoredObject>, ObjectError> {
    Ok(db::run_blocking(db, move |conn| {
        rows::list_by_owner(conn, ObjectKind::Text, owner, Utc::now())
    })
    .await?)
}

pub async fn delete_expired_texts(db: &DbPool) -> Result<usize, ObjectError> {
    let expired = db::run_blocking(db, |conn| {
        rows::take_expired(conn, ObjectKind::Text, Utc::now())
    })
    .await?;
    Ok(expired.len())
}
