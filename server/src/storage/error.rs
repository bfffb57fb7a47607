//! Storage error types

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid object identity: {0:?}")]
    InvalidIdentity(String),

    #[error("{op} failed for {identity}: {source}")]
    Io {
        op: &'static str,
        identity: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} is not implemented for this backend")]
    NotImplemented(&'static str),
}

impl StorageError {
    pub(crate) fn io(op: &'static str, identity: &str, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => return StorageError::NotFound(identity.to_string()),
            std::io::ErrorKind::AlreadyExists => return StorageError::AlreadyExists(identity.to_string()),
            _ => {}
        }
        StorageError::Io {
            op,
            identity: identity.to_string(),
            source,
        }
    }
}
