//! Stored objects: uploaded files and inline texts.
//!
//! Every object is addressed by an opaque identity from [`address`]. File
//! bytes go to the configured storage backend; text content lives inline in
//! its metadata row. Both kinds carry an owner and an optional expiry.
//!
//! Write order is bytes first, then the row. If the row insert fails the
//! bytes are removed again. Delete order is row first, then bytes, so an
//! object never resolves to missing bytes.

pub mod address;
pub mod files;
pub mod retention;
pub mod routes;
pub mod rows;
pub mod texts;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::db::DataError;
use crate::error::AppError;
use crate::storage::StorageError;
use address::AddressError;

/// Lifetime of an object uploaded without an explicit `expires_at`.
pub const DEFAULT_TTL_HOURS: i64 = 24;

pub fn default_expiry() -> DateTime<Utc> {
    Utc::now() + Duration::hours(DEFAULT_TTL_HOURS)
}

#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("invalid object: {0}")]
    Invalid(&'static str),

    #[error(transparent)]
    Address(#[from] AddressError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Data(#[from] DataError),
}

impl From<ObjectError> for AppError {
    fn from(err: ObjectError) -> Self {
        match err {
            ObjectError::Invalid(what) => AppError::BadRequest(what.to_string()),
            ObjectError::Address(e) => e.into(),
            ObjectError::Storage(e) => e.into(),
            ObjectError::Data(e) => e.into(),
        }
    }
}
