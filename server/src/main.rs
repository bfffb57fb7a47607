use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use riley_server::auth::jwt;
use riley_server::auth::ratelimit::{spawn_limiter_cleanup, GovernorRateLimiter};
use riley_server::config::{generate_config_template, Cli, Config};
use riley_server::objects::retention;
use riley_server::{db, routes, state};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Handle --generate-config: print template and exit
    if cli.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load(&cli)?;

    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("riley_server=info"));
    if config.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().pretty().with_env_filter(filter).init();
    }

    tracing::info!("Riley server v{} starting", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite database
    let db = db::init_db(&config.data_dir)?;

    // Configured secret, or a 256-bit key persisted in data_dir
    let token_secret = jwt::resolve_token_secret(&config.token_secret, &config.data_dir)?;

    // Per-subject limiter used by the admission chain
    let rate_limiter = Arc::new(GovernorRateLimiter::from_config(&config.rate_limit));
    spawn_limiter_cleanup(rate_limiter.clone());

    let cleanup_interval = config.retention.cleanup_interval_secs;
    let app_state = state::AppState::new(db, config, token_secret, rate_limiter);
    tracing::info!(backend = app_state.storage.kind(), "Storage backend selected");

    retention::spawn_retention_cleanup(
        app_state.db.clone(),
        app_state.storage.clone(),
        cleanup_interval,
    );
    tracing::info!("Retention cleanup every {}s", cleanup_interval);

    // Bind and serve
    let addr = format!("{}:{}", app_state.config.bind_address, app_state.config.port);
    let app = routes::build_router(app_state);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
