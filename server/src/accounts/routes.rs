//! POST /signup and POST /login.
//!
//! Both answer with a fresh token in the JSON body and echo it in the
//! `Authorization` response header.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::AUTHORIZATION, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::accounts::{store, validation};
use crate::auth::{jwt, password};
use crate::db;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub user_id: u64,
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// POST /signup
/// Create an account and log it in. 400 on invalid email or weak password,
/// 409 if the email is taken.
pub async fn signup(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let (email, password) = validation::normalize(&req.email, &req.password);

    if !validation::email_is_valid(email) {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    if !validation::password_is_valid(password) {
        return Err(AppError::BadRequest(format!(
            "Password must be {}-{} characters and contain an uppercase letter, a lowercase letter, a number and a special character",
            validation::PASSWORD_MIN_LEN,
            validation::PASSWORD_MAX_LEN
        )));
    }

    let email = email.to_string();
    let password = password.to_string();
    let password_hash =
        tokio::task::spawn_blocking(move || password::hash_password(&password)).await??;

    let user = db::run_blocking(&state.db, move |conn| {
        store::create_user(conn, &email, &password_hash)
    })
    .await?;

    let token = jwt::issue_token(user.id, jwt::expiry_after(state.config.token_ttl()), &state.token_secret)?;

    tracing::info!(user_id = user.id, "User signed up");

    Ok((
        StatusCode::CREATED,
        [(AUTHORIZATION, token.clone())],
        Json(SignupResponse {
            user_id: user.id,
            token,
        }),
    ))
}

/// POST /login
/// Exchange email and password for a token. Any mismatch, unknown email or
/// deactivated account is a plain 401.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let (email, password) = validation::normalize(&req.email, &req.password);

    let email_owned = email.to_string();
    let user = db::run_blocking(&state.db, move |conn| store::find_by_email(conn, &email_owned))
        .await?
        .filter(|user| user.active && user.deleted_at.is_none())
        .ok_or(AppError::Unauthorized)?;

    let password = password.to_string();
    let stored_hash = user.password_hash.clone();
    let matches =
        tokio::task::spawn_blocking(move || password::verify_password(&password, &stored_hash))
            .await??;
    if !matches {
        tracing::debug!(user_id = user.id, "Login rejected: bad password");
        return Err(AppError::Unauthorized);
    }

    let expires_at = jwt::expiry_after(state.config.token_ttl());
    let token = jwt::issue_token(user.id, expires_at, &state.token_secret)?;

    tracing::info!(user_id = user.id, "User logged in");

    Ok((
        [(AUTHORIZATION, token.clone())],
        Json(LoginResponse { token, expires_at }),
    ))
}
