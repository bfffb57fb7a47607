//! Handler-level error type.
//!
//! Every lower layer (storage, token, data access) has its own error enum.
//! They all convert into [`AppError`], and its `IntoResponse` impl is the
//! one place that decides status codes and response bodies.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::auth::jwt::TokenError;
use crate::auth::password::PasswordError;
use crate::db::DataError;
use crate::objects::address::AddressError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("payload too large (max {max_bytes} bytes)")]
    PayloadTooLarge { max_bytes: usize },

    #[error("rate limited")]
    RateLimited,

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short, non-leaking body text.
    fn public_message(&self) -> String {
        match self {
            AppError::BadRequest(msg) => msg.clone(),
            AppError::Unauthorized => "Unauthorized".to_string(),
            AppError::Forbidden => "Forbidden".to_string(),
            AppError::NotFound(what) => format!("{} not found", capitalize(what)),
            AppError::Conflict(what) => format!("{} already exists", capitalize(what)),
            AppError::PayloadTooLarge { max_bytes } => {
                format!("Payload exceeds maximum size of {} bytes", max_bytes)
            }
            AppError::RateLimited => "Too many requests".to_string(),
            AppError::NotImplemented(_) => "Not implemented".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::Internal(detail) => tracing::error!(%detail, "Request failed"),
            AppError::NotImplemented(what) => tracing::warn!(what, "Unimplemented path hit"),
            _ => tracing::debug!(%status, error = %self, "Request rejected"),
        }
        (status, self.public_message()).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(_) => AppError::NotFound("object"),
            StorageError::AlreadyExists(_) => AppError::Conflict("object"),
            StorageError::InvalidIdentity(_) => AppError::BadRequest("Invalid hash".to_string()),
            StorageError::NotImplemented(what) => AppError::NotImplemented(what),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<DataError> for AppError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::NotFound(what) => AppError::NotFound(what),
            DataError::Conflict(what) => AppError::Conflict(what),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Signing(e) => AppError::Internal(format!("token signing: {}", e)),
            _ => AppError::Unauthorized,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("task join error: {}", err))
    }
}

impl From<AddressError> for AppError {
    fn from(err: AddressError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Internal(err.to_string())
    }
}
