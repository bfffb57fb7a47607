use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use crate::error::AppError;

/// Authenticated subject id, placed in request extensions by the
/// authentication gate. Implements axum's FromRequestParts for use as an
/// extractor in protected handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subject(pub u64);

impl Subject {
    pub fn id(self) -> u64 {
        self.0
    }
}

impl<S> FromRequestParts<S> for Subject
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Subject>()
            .copied()
            .ok_or(AppError::Unauthorized)
    }
}

/// Raw token from the Authorization header. The token is sent bare; a
/// `Bearer ` prefix is tolerated.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}
