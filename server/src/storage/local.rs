//! Local filesystem storage backend

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::objects::address::is_valid_identity;
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::ObjectStore;

/// Stores each object as a single file named by its identity.
/// Structure: `{root}/{identity}`, no sharding.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Identity is validated before it becomes a path component.
    fn object_path(&self, identity: &str) -> StorageResult<PathBuf> {
        if !is_valid_identity(identity) {
            return Err(StorageError::InvalidIdentity(identity.to_string()));
        }
        Ok(self.root.join(identity))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn upload(
        &self,
        identity: &str,
        _name: &str,
        _size: u64,
        content: &[u8],
    ) -> StorageResult<String> {
        let path = self.object_path(identity)?;
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::io("create storage root", identity, e))?;

        // create_new: an identity collision must never overwrite existing bytes
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| StorageError::io("create object file", identity, e))?;
        file.write_all(content)
            .await
            .map_err(|e| StorageError::io("write object file", identity, e))?;
        file.flush()
            .await
            .map_err(|e| StorageError::io("flush object file", identity, e))?;

        tracing::debug!(identity, bytes = content.len(), "Stored object locally");
        Ok(String::new())
    }

    async fn delete(&self, identity: &str) -> StorageResult<()> {
        let path = self.object_path(identity)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io("remove object file", identity, e)),
        }
    }

    async fn exists(&self, identity: &str) -> StorageResult<()> {
        let path = self.object_path(identity)?;
        fs::metadata(&path)
            .await
            .map(|_| ())
            .map_err(|e| StorageError::io("stat object file", identity, e))
    }

    async fn download(&self, identity: &str, size: u64) -> StorageResult<Vec<u8>> {
        let path = self.object_path(identity)?;
        let mut file = fs::File::open(&path)
            .await
            .map_err(|e| StorageError::io("open object file", identity, e))?;

        // Recorded size is trusted; a shorter file surfaces as UnexpectedEof.
        let mut content = vec![0u8; size as usize];
        file.read_exact(&mut content)
            .await
            .map_err(|e| StorageError::io("read object file", identity, e))?;
        Ok(content)
    }
}
