//! Remote blob store backend.
//!
//! Objects live in `{container}/{identity}` under the configured account.
//! The wire client for the blob service is not part of this crate, so every
//! operation reports `StorageError::NotImplemented` and callers can detect
//! the gap instead of silently succeeding.

use async_trait::async_trait;

use crate::storage::error::{StorageError, StorageResult};
use crate::storage::ObjectStore;

pub struct RemoteBlobStore {
    account: String,
    container: String,
    access_key: String,
}

impl RemoteBlobStore {
    pub fn new(account: &str, container: &str, access_key: &str) -> Self {
        Self {
            account: account.to_string(),
            container: container.to_string(),
            access_key: access_key.to_string(),
        }
    }

    /// All three settings are required before the store can be used.
    pub fn has_credentials(&self) -> bool {
        !self.account.is_empty() && !self.container.is_empty() && !self.access_key.is_empty()
    }
}

// Redact the access key from debug output.
impl std::fmt::Debug for RemoteBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteBlobStore")
            .field("account", &self.account)
            .field("container", &self.container)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ObjectStore for RemoteBlobStore {
    async fn upload(
        &self,
        identity: &str,
        _name: &str,
        _size: u64,
        _content: &[u8],
    ) -> StorageResult<String> {
        tracing::warn!(
            identity,
            container = %self.container,
            "Remote blob upload requested but no blob client is configured"
        );
        Err(StorageError::NotImplemented("remote blob upload"))
    }

    async fn delete(&self, _identity: &str) -> StorageResult<()> {
        Err(StorageError::NotImplemented("remote blob delete"))
    }

    async fn exists(&self, _identity: &str) -> StorageResult<()> {
        Err(StorageError::NotImplemented("remote blob exists"))
    }

    async fn download(&self, _identity: &str, _size: u64) -> StorageResult<Vec<u8>> {
        Err(StorageError::NotImplemented("remote blob download"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_operation_reports_not_implemented() {
        let store = RemoteBlobStore::new("acct", "uploads", "secret");
        let id = "f".repeat(64);

        assert!(matches!(
            store.upload(&id, "a", 1, b"a").await,
            Err(StorageError::NotImplemented(_))
        ));
        assert!(matches!(store.delete(&id).await, Err(StorageError::NotImplemented(_))));
        assert!(matches!(store.exists(&id).await, Err(StorageError::NotImplemented(_))));
        assert!(matches!(
            store.download(&id, 1).await,
            Err(StorageError::NotImplemented(_))
        ));
    }

    #[test]
    fn test_debug_hides_access_key() {
        let store = RemoteBlobStore::new("acct", "uploads", "super-secret");
        let rendered = format!("{:?}", store);
        assert!(rendered.contains("uploads"));
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn test_has_credentials_requires_every_setting() {
        assert!(RemoteBlobStore::new("acct", "uploads", "key").has_credentials());
        assert!(!RemoteBlobStore::new("", "uploads", "key").has_credentials());
        assert!(!RemoteBlobStore::new("acct", "", "key").has_credentials());
        assert!(!RemoteBlobStore::new("acct", "uploads", "").has_credentials());
    }
}
