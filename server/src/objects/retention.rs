//! Background retention cleanup for expired objects.
//!
//! Expired objects already read as 404; this task reclaims their rows and
//! bytes.

use std::sync::Arc;
use std::time::Duration;

use crate::db::DbPool;
use crate::objects::{files, texts};
use crate::storage::StorageRouter;

/// Run one purge over files and texts. Returns (files, texts) removed.
pub async fn purge_expired(db: &DbPool, storage: &StorageRouter) -> (usize, usize) {
    let files = match files::delete_expired_files(db, storage).await {
        Ok(count) => count,
        Err(e) => {
            tracing::error!("File retention cleanup error: {}", e);
            0
        }
    };
    let texts = match texts::delete_expired_texts(db).await {
        Ok(count) => count,
        Err(e) => {
            tracing::error!("Text retention cleanup error: {}", e);
            0
        }
    };

    if files + texts > 0 {
        tracing::info!(files, texts, "Retention cleanup: purged expired objects");
    } else {
        tracing::debug!("Retention cleanup: nothing expired");
    }
    (files, texts)
}

/// Spawn a background task that purges expired objects every `interval_secs`.
pub fn spawn_retention_cleanup(db: DbPool, storage: Arc<StorageRouter>, interval_secs: u64) {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            purge_expired(&db, &storage).await;
        }
    });
}
