//! Admission chain in front of every protected handler.
//!
//! The chain is an explicit, ordered list of gates built once at startup.
//! Each gate either passes (continue with the next one) or fails with a
//! terminal response; the handler only runs when every gate passed. Gates
//! never retry.
//!
//! Standard order: Authenticate → Authorize → RateLimit, so entitlement is
//! only ever checked against a verified subject.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::accounts::store as account_store;
use crate::auth::jwt;
use crate::auth::middleware::{bearer_token, Subject};
use crate::db;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Verify token signature and validity window; records the [`Subject`].
    Authenticate,
    /// Subject must be an active account.
    Authorize,
    /// Consult the shared rate limiter for this subject (or peer IP).
    RateLimit,
}

#[derive(Debug, Clone)]
pub struct AdmissionChain {
    gates: Vec<Gate>,
}

impl AdmissionChain {
    pub fn new(gates: Vec<Gate>) -> Self {
        Self { gates }
    }

    pub fn standard() -> Self {
        Self::new(vec![Gate::Authenticate, Gate::Authorize, Gate::RateLimit])
    }

    pub fn gates(&self) -> &[Gate] {
        &self.gates
    }

    /// Run every gate in order, stopping at the first failure.
    pub async fn check(&self, state: &AppState, req: &mut Request) -> Result<(), AppError> {
        for gate in &self.gates {
            gate.check(state, req).await?;
        }
        Ok(())
    }
}

impl Gate {
    async fn check(self, state: &AppState, req: &mut Request) -> Result<(), AppError> {
        match self {
            Gate::Authenticate => {
                let token = bearer_token(req.headers()).ok_or(AppError::Unauthorized)?;
                let subject = jwt::extract_subject(token, &state.token_secret).map_err(|e| {
                    tracing::debug!(reason = %e, "Token rejected");
                    AppError::from(e)
                })?;
                req.extensions_mut().insert(Subject(subject));
                Ok(())
            }
            Gate::Authorize => {
                let subject = match req.extensions().get::<Subject>() {
                    Some(subject) => *subject,
                    // Running ahead of authentication: verify the token here
                    // rather than trust an unverified claim.
                    None => {
                        let token = bearer_token(req.headers()).ok_or(AppError::Forbidden)?;
                        let id = jwt::extract_subject(token, &state.token_secret)
                            .map_err(|_| AppError::Forbidden)?;
                        Subject(id)
                    }
                };

                let active = db::run_blocking(&state.db, move |conn| {
                    account_store::is_active(conn, subject.id())
                })
                .await?;

                if active {
                    Ok(())
                } else {
                    tracing::debug!(subject = subject.id(), "Subject not entitled");
                    Err(AppError::Forbidden)
                }
            }
            Gate::RateLimit => {
                let key = rate_limit_key(req);
                if state.rate_limiter.allow(&key) {
                    Ok(())
                } else {
                    tracing::debug!(key, "Rate limit exceeded");
                    Err(AppError::RateLimited)
                }
            }
        }
    }
}

fn rate_limit_key(req: &Request) -> String {
    if let Some(subject) = req.extensions().get::<Subject>() {
        return format!("user:{}", subject.id());
    }
    match req.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => format!("ip:{}", addr.ip()),
        None => "anonymous".to_string(),
    }
}

/// axum middleware running the state's admission chain.
pub async fn admit(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    match state.admission.check(&state, &mut req).await {
        Ok(()) => next.run(req).await,
        Err(err) => err.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ratelimit::RateLimiter;
    use crate::config::{Config, StorageConfig};
    use axum::body::Body;
    use axum::http::header::AUTHORIZATION;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    const SECRET: &[u8] = b"admission-secret";

    struct DenyAll;

    impl RateLimiter for DenyAll {
        fn allow(&self, _key: &str) -> bool {
            false
        }
    }

    struct AllowAll;

    impl RateLimiter for AllowAll {
        fn allow(&self, _key: &str) -> bool {
            true
        }
    }

    fn state(limiter: Arc<dyn RateLimiter>) -> AppState {
        let db = db::init_memory_db().unwrap();
        let config = Config {
            storage: StorageConfig::Local {
                root: std::env::temp_dir().join("riley-admission"),
            },
            ..Config::default()
        };
        AppState::new(db, config, SECRET.to_vec(), limiter)
    }

    fn request(token: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/list");
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, token);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn user(state: &AppState, active: bool) -> u64 {
        let conn = state.db.lock().unwrap();
        let user = account_store::create_user(&conn, "gate@example.com", "hash").unwrap();
        if !active {
            account_store::deactivate(&conn, user.id).unwrap();
        }
        user.id
    }

    fn token_for(id: u64) -> String {
        jwt::issue_token(id, Utc::now() + Duration::hours(1), SECRET).unwrap()
    }

    #[test]
    fn test_standard_order() {
        assert_eq!(
            AdmissionChain::standard().gates(),
            &[Gate::Authenticate, Gate::Authorize, Gate::RateLimit]
        );
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let state = state(Arc::new(AllowAll));
        let mut req = request(None);
        let err = state.admission.check(&state, &mut req).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn test_valid_token_passes_and_records_subject() {
        let state = state(Arc::new(AllowAll));
        let id = user(&state, true);
        let token = token_for(id);
        let mut req = request(Some(&token));

        state.admission.check(&state, &mut req).await.unwrap();
        assert_eq!(req.extensions().get::<Subject>(), Some(&Subject(id)));
    }

    #[tokio::test]
    async fn test_inactive_subject_is_forbidden() {
        let state = state(Arc::new(AllowAll));
        let id = user(&state, false);
        let token = token_for(id);
        let mut req = request(Some(&token));

        let err = state.admission.check(&state, &mut req).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[tokio::test]
    async fn test_rate_limit_runs_after_auth() {
        let state = state(Arc::new(DenyAll));

        // Unauthenticated requests fail at the first gate, not the limiter
        let mut anonymous = request(None);
        let err = state.admission.check(&state, &mut anonymous).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized));

        let id = user(&state, true);
        let token = token_for(id);
        let mut req = request(Some(&token));
        let err = state.admission.check(&state, &mut req).await.unwrap_err();
        assert!(matches!(err, AppError::RateLimited));
    }

    #[tokio::test]
    async fn test_authorize_first_still_verifies_token() {
        let mut state = state(Arc::new(AllowAll));
        state.admission = Arc::new(AdmissionChain::new(vec![
            Gate::Authorize,
            Gate::Authenticate,
        ]));
        let id = user(&state, true);

        let forged = jwt::issue_token(id, Utc::now() + Duration::hours(1), b"other").unwrap();
        let mut req = request(Some(&forged));
        let err = state.admission.check(&state, &mut req).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let token = token_for(id);
        let mut req = request(Some(&token));
        state.admission.check(&state, &mut req).await.unwrap();
    }
}
