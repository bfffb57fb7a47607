//! Physical object storage, keyed by object identity.
//!
//! Metadata lives in SQLite; the bytes live in one of a closed set of
//! backends. The active backend is chosen once from configuration and
//! wrapped in a [`StorageRouter`], which every handler shares.
//!
//! | Backend            | Layout                         |
//! |--------------------|--------------------------------|
//! | `LocalStore`       | `{root}/{identity}` (flat dir) |
//! | `RemoteBlobStore`  | `{container}/{identity}`       |
//!
//! No retries happen here. Errors surface unchanged to the caller.

mod error;
mod local;
mod remote;

use async_trait::async_trait;

use crate::config::StorageConfig;

pub use error::{StorageError, StorageResult};
pub use local::LocalStore;
pub use remote::RemoteBlobStore;

/// Capability set every storage backend exposes.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write `content` under `identity`.
    ///
    /// Returns a backend-specific locator, empty when the identity alone
    /// is enough to find the object again.
    async fn upload(
        &self,
        identity: &str,
        name: &str,
        size: u64,
        content: &[u8],
    ) -> StorageResult<String>;

    /// Remove the object. Backends that can tell "absent" apart treat a
    /// missing object as already deleted.
    async fn delete(&self, identity: &str) -> StorageResult<()>;

    /// `Ok(())` if present, `StorageError::NotFound` otherwise.
    async fn exists(&self, identity: &str) -> StorageResult<()>;

    /// Read exactly `size` bytes addressed by `identity`.
    async fn download(&self, identity: &str, size: u64) -> StorageResult<Vec<u8>>;
}

/// The backend selected for this deployment.
pub enum StorageRouter {
    Local(LocalStore),
    RemoteBlob(RemoteBlobStore),
}

impl StorageRouter {
    pub fn from_config(config: &StorageConfig) -> Self {
        match config {
            StorageConfig::Local { root } => StorageRouter::Local(LocalStore::new(root)),
            StorageConfig::RemoteBlob {
                account,
                container,
                access_key,
            } => StorageRouter::RemoteBlob(RemoteBlobStore::new(account, container, access_key)),
        }
    }

    /// Short name of the active backend, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StorageRouter::Local(_) => "local",
            StorageRouter::RemoteBlob(_) => "remote_blob",
        }
    }

    fn backend(&self) -> &dyn ObjectStore {
        match self {
            StorageRouter::Local(store) => store,
            StorageRouter::RemoteBlob(store) => store,
        }
    }
}

#[async_trait]
impl ObjectStore for StorageRouter {
    async fn upload(
        &self,
        identity: &str,
        name: &str,
        size: u64,
        content: &[u8],
    ) -> StorageResult<String> {
        self.backend().upload(identity, name, size, content).await
    }

    async fn delete(&self, identity: &str) -> StorageResult<()> {
        self.backend().delete(identity).await
    }

    async fn exists(&self, identity: &str) -> StorageResult<()> {
        self.backend().exists(identity).await
    }

    async fn download(&self, identity: &str, size: u64) -> StorageResult<Vec<u8>> {
        self.backend().download(identity, size).await
    }
}
