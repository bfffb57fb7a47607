use axum::{extract::DefaultBodyLimit, middleware, Router};
use std::sync::Arc;
use tower_governor::key_extractor::PeerIpKeyExtractor;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};

use crate::accounts::routes as accounts;
use crate::auth::admission::admit;
use crate::objects::routes as objects;
use crate::state::AppState;

/// Room for multipart boundaries and the `expires_at` field on top of the
/// file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the full axum Router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    // Per-IP limit on signup/login. PeerIpKeyExtractor reads
    // ConnectInfo<SocketAddr>, so serve with connect info.
    let limits = &state.config.rate_limit;
    let replenish_ms = (60_000 / u64::from(limits.auth_requests_per_minute.max(1))).max(1);
    let governor_config = Arc::new(
        GovernorConfigBuilder::default()
            .key_extractor(PeerIpKeyExtractor)
            .per_millisecond(replenish_ms)
            .burst_size(limits.auth_burst.max(1))
            .finish()
            .expect("Failed to build governor config"),
    );

    // Spawn background task to clean up rate limiter state
    let limiter_for_cleanup = governor_config.limiter().clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            limiter_for_cleanup.retain_recent();
        }
    });

    let auth_routes = Router::new()
        .route("/signup", axum::routing::post(accounts::signup))
        .route("/login", axum::routing::post(accounts::login))
        .layer(GovernorLayer {
            config: governor_config,
        });

    // Every route here runs the admission chain before its handler, so an
    // unauthenticated upload is refused before the body is read.
    let upload_limit = state.config.max_upload_bytes() + MULTIPART_OVERHEAD;
    let protected_routes = Router::new()
        .route(
            "/upload",
            axum::routing::post(objects::upload).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/download", axum::routing::post(objects::download))
        .route("/delete", axum::routing::post(objects::delete))
        .route("/list", axum::routing::get(objects::list))
        .route("/texts", axum::routing::post(objects::create_text))
        .route(
            "/texts/{hash}",
            axum::routing::get(objects::get_text).delete(objects::delete_text),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), admit));

    let health = Router::new().route("/health", axum::routing::get(health_check));

    Router::new()
        .merge(auth_routes)
        .merge(protected_routes)
        .merge(health)
        .with_state(state)
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
