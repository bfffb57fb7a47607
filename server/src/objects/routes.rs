//! Object endpoints. All of them sit behind the admission chain, so a
//! [`Subject`] is always present.
//!
//! POST /upload       : multipart `file` (+ optional `expires_at`), 201 with identity
//! POST /download     : JSON `{hash}`, raw bytes
//! POST /delete       : JSON `{hash}`
//! GET  /list         : caller's files and texts
//! POST /texts        : JSON `{name, data, expires_at?}`, 201 with identity
//! GET  /texts/{hash} : text with content
//! DELETE /texts/{hash}

use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection, Multipart, Path, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderValue, StatusCode,
    },
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::middleware::Subject;
use crate::db::models::{StoredObject, TextObject};
use crate::error::AppError;
use crate::objects::{address, default_expiry, files, texts};
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct HashRequest {
    pub hash: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateTextRequest {
    pub name: String,
    pub data: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub files: Vec<StoredObject>,
    pub texts: Vec<StoredObject>,
}

/// Expired objects read as missing; someone else's object is forbidden.
fn check_access(object: &StoredObject, subject: Subject) -> Result<(), AppError> {
    if object.is_expired(Utc::now()) {
        return Err(AppError::NotFound(object.kind.label()));
    }
    if object.user_id != subject.id() {
        tracing::debug!(identity = %object.hash, subject = subject.id(), "Access to foreign object denied");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

fn checked_hash(hash: &str) -> Result<&str, AppError> {
    if address::is_valid_identity(hash) {
        Ok(hash)
    } else {
        Err(AppError::BadRequest("Invalid hash".to_string()))
    }
}

fn multipart_error(err: MultipartError, max_bytes: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge { max_bytes }
    } else {
        AppError::BadRequest(err.body_text())
    }
}

/// `attachment; filename="..."` with anything outside printable ASCII
/// (and quotes) replaced.
fn content_disposition(name: &str) -> HeaderValue {
    let safe: String = name
        .chars()
        .map(|c| {
            if c == ' ' || (c.is_ascii_graphic() && c != '"' && c != '\\') {
                c
            } else {
                '_'
            }
        })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", safe))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// POST /upload
pub async fn upload(
    State(state): State<AppState>,
    subject: Subject,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let max_bytes = state.config.max_upload_bytes();
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut expires_at: Option<DateTime<Utc>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, max_bytes))?
    {
        let field_name = field.name().map(str::to_owned);
        match field_name.as_deref() {
            Some("file") => {
                let name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(|e| multipart_error(e, max_bytes))?;
                if bytes.len() > max_bytes {
                    return Err(AppError::PayloadTooLarge { max_bytes });
                }
                file = Some((name, bytes.to_vec()));
            }
            Some("expires_at") => {
                let raw = field.text().await.map_err(|e| multipart_error(e, max_bytes))?;
                let raw = raw.trim();
                if !raw.is_empty() {
                    let parsed = DateTime::parse_from_rfc3339(raw)
                        .map_err(|_| AppError::BadRequest("Invalid expires_at time".to_string()))?;
                    expires_at = Some(parsed.with_timezone(&Utc));
                }
            }
            _ => {}
        }
    }

    let (name, content) =
        file.ok_or_else(|| AppError::BadRequest("Missing file field".to_string()))?;
    let expires_at = expires_at.unwrap_or_else(default_expiry);

    let object = files::create_file(
        &state.db,
        &state.storage,
        subject.id(),
        &name,
        &content,
        Some(expires_at),
    )
    .await?;

    Ok((StatusCode::CREATED, object.hash))
}

/// POST /download
pub async fn download(
    State(state): State<AppState>,
    subject: Subject,
    payload: Result<Json<HashRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let hash = checked_hash(&req.hash)?;

    let object = files::get_file_by_hash(&state.db, hash).await?;
    check_access(&object, subject)?;
    let content = files::read_file(&state.storage, &object).await?;

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
            (CONTENT_DISPOSITION, content_disposition(&object.name)),
        ],
        content,
    ))
}

/// POST /delete
pub async fn delete(
    State(state): State<AppState>,
    subject: Subject,
    payload: Result<Json<HashRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let hash = checked_hash(&req.hash)?;

    let object = files::get_file_by_hash(&state.db, hash).await?;
    check_access(&object, subject)?;
    files::delete_file(&state.db, &state.storage, hash).await?;

    tracing::info!(identity = hash, subject = subject.id(), "File deleted");
    Ok((StatusCode::OK, "File deleted"))
}

/// GET /list
pub async fn list(
    State(state): State<AppState>,
    subject: Subject,
) -> Result<Json<ListResponse>, AppError> {
    let files = files::list_files_by_owner(&state.db, subject.id()).await?;
    let texts = texts::list_texts_by_owner(&state.db, subject.id()).await?;
    Ok(Json(ListResponse { files, texts }))
}

/// POST /texts
pub async fn create_text(
    State(state): State<AppState>,
    subject: Subject,
    payload: Result<Json<CreateTextRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let expires_at = req.expires_at.unwrap_or_else(default_expiry);

    let object = texts::create_text(&state.db, subject.id(), &req.name, &req.data, Some(expires_at)).await?;
    Ok((StatusCode::CREATED, object.hash))
}

/// GET /texts/{hash}
pub async fn get_text(
    State(state): State<AppState>,
    subject: Subject,
    Path(hash): Path<String>,
) -> Result<Json<TextObject>, AppError> {
    let hash = checked_hash(&hash)?;
    let text = texts::get_text_by_hash(&state.db, hash).await?;
    check_access(&text.meta, subject)?;
    Ok(Json(text))
}

/// DELETE /texts/{hash}
pub async fn delete_text(
    State(state): State<AppState>,
    subject: Subject,
    Path(hash): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let hash = checked_hash(&hash)?;
    let text = texts::get_text_by_hash(&state.db, hash).await?;
    check_access(&text.meta, subject)?;
    texts::delete_text(&state.db, hash).await?;
    Ok((StatusCode::OK, "Text deleted"))
}
