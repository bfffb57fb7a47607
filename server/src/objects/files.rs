//! File objects: bytes in the storage backend, metadata in `files`.

use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::db::models::{ObjectKind, StoredObject};
use crate::db::{self, timestamp, DataError, DbPool};
use crate::objects::{address, rows, ObjectError};
use crate::storage::{ObjectStore, StorageRouter};

/// Store `content` under a fresh identity and record its metadata.
///
/// Bytes are written first. If the metadata insert then fails, the bytes
/// are deleted again and the insert error is returned.
pub async fn create_file(
    db: &DbPool,
    storage: &StorageRouter,
    owner: u64,
    name: &str,
    content: &[u8],
    expires_at: Option<DateTime<Utc>>,
) -> Result<StoredObject, ObjectError> {
    if name.is_empty() {
        return Err(ObjectError::Invalid("File name must not be empty"));
    }

    let identity = address::new_identity(content)?;
    let size = content.len() as u64;

    storage.upload(&identity, name, size, content).await?;

    let row_identity = identity.clone();
    let name = name.to_string();
    let inserted = db::run_blocking(db, move |conn| {
        let now = timestamp(Utc::now());
        conn.execute(
            "INSERT INTO files (created_at, updated_at, expires_at, name, hash, size, user_id)
             VALUES (?1, ?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                now,
                expires_at.map(timestamp),
                name,
                row_identity,
                size as i64,
                owner as i64
            ],
        )
        .map_err(|e| DataError::from_insert(e, "file"))?;
        rows::find_by_hash(conn, ObjectKind::File, &row_identity)
    })
    .await;

    match inserted {
        Ok(object) => {
            tracing::info!(identity = %object.hash, size, owner, "File stored");
            Ok(object)
        }
        Err(err) => {
            if let Err(cleanup) = storage.delete(&identity).await {
                tracing::warn!(
                    %identity,
                    op = "create_file",
                    error = %cleanup,
                    "Orphan bytes: metadata insert failed and bytes could not be removed"
                );
            }
            Err(err.into())
        }
    }
}

pub async fn get_file_by_hash(db: &DbPool, hash: &str) -> Result<StoredObject, ObjectError> {
    let hash = hash.to_string();
    Ok(db::run_blocking(db, move |conn| rows::find_by_hash(conn, ObjectKind::File, &hash)).await?)
}

/// Read back the bytes of a file whose metadata the caller already holds.
pub async fn read_file(storage: &StorageRouter, object: &StoredObject) -> Result<Vec<u8>, ObjectError> {
    Ok(storage.download(&object.hash, object.size).await?)
}

/// Delete the metadata row, then the bytes.
///
/// A backend failure after the row is gone leaves orphan bytes. It is
/// logged and returned to the caller.
pub async fn delete_file(db: &DbPool, storage: &StorageRouter, hash: &str) -> Result<(), ObjectError> {
    let row_hash = hash.to_string();
    db::run_blocking(db, move |conn| rows::remove(conn, ObjectKind::File, &row_hash)).await?;
    if let Err(e) = storage.delete(hash).await {
        tracing::warn!(identity = hash, op = "delete_file", error = %e, "Orphan bytes: row removed but bytes remain");
        return Err(e.into());
    }
    Ok(())
}

pub async fn list_files_by_owner(db: &DbPool, owner: u64) -> Result<Vec<StoredObject>, ObjectError> {
    Ok(db::run_blocking(db, move |conn| {
        rows::list_by_owner(conn, ObjectKind::File, owner, Utc::now())
    })
    .await?)
}

/// Purge every expired file. Returns how many rows were removed.
pub async fn delete_expired_files(db: &DbPool, storage: &StorageRouter) -> Result<usize, ObjectError> {
    let expired = db::run_blocking(db, |conn| {
        rows::take_expired(conn, ObjectKind::File, Utc::now())
    })
    .await?;

    // The sweep keeps going past a stuck object; the next run won't see its row.
    for hash in &expired {
        if let Err(e) = storage.delete(hash).await {
            tracing::warn!(
                identity = %hash,
                op = "delete_expired_files",
                error = %e,
                "Orphan bytes: row removed but bytes remain"
            );
        }
    }
    Ok(expired.len())
}
