//! Shared harness: boots the real router on a random port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use riley_server::auth::ratelimit::{GovernorRateLimiter, RateLimiter};
use riley_server::config::{Config, RateLimitConfig, StorageConfig};
use riley_server::state::AppState;
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const PASSWORD: &str = "Str0ng!pass";

pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    pub storage_root: PathBuf,
    _tmp: tempfile::TempDir,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Limits high enough that tests never trip them unless they mean to.
pub fn generous_limits() -> RateLimitConfig {
    RateLimitConfig {
        requests_per_minute: 10_000,
        burst: 10_000,
        auth_requests_per_minute: 10_000,
        auth_burst: 10_000,
    }
}

pub async fn start_test_server() -> TestServer {
    start_with(|_| {}).await
}

/// Start a server after letting the caller adjust the config.
pub async fn start_with(adjust: impl FnOnce(&mut Config)) -> TestServer {
    start_with_limiter(adjust, |config| {
        Arc::new(GovernorRateLimiter::from_config(&config.rate_limit))
    })
    .await
}

pub async fn start_with_limiter(
    adjust: impl FnOnce(&mut Config),
    limiter: impl FnOnce(&Config) -> Arc<dyn RateLimiter>,
) -> TestServer {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp.path().to_str().unwrap().to_string();
    let storage_root = tmp.path().join("objects");

    let mut config = Config {
        data_dir: data_dir.clone(),
        storage: StorageConfig::Local {
            root: storage_root.clone(),
        },
        rate_limit: generous_limits(),
        ..Config::default()
    };
    adjust(&mut config);

    let db = riley_server::db::init_db(&data_dir).expect("Failed to init DB");
    let token_secret = riley_server::auth::jwt::load_or_generate_token_secret(&data_dir)
        .expect("Failed to generate token secret");
    let rate_limiter = limiter(&config);

    let state = AppState::new(db, config, token_secret, rate_limiter);
    let app = riley_server::routes::build_router(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestServer {
        base_url: format!("http://{}", addr),
        state,
        storage_root,
        _tmp: tmp,
    }
}

/// Sign up `email` with the default password; returns (user_id, token).
pub async fn signup(client: &reqwest::Client, server: &TestServer, email: &str) -> (u64, String) {
    let resp = client
        .post(server.url("/signup"))
        .json(&json!({ "email": email, "password": PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201, "signup failed for {}", email);

    let body: Value = resp.json().await.unwrap();
    (
        body["user_id"].as_u64().unwrap(),
        body["token"].as_str().unwrap().to_string(),
    )
}

pub async fn upload(
    client: &reqwest::Client,
    server: &TestServer,
    token: &str,
    name: &str,
    content: Vec<u8>,
    expires_at: Option<&str>,
) -> reqwest::Response {
    let mut form = reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(content).file_name(name.to_string()),
    );
    if let Some(expires_at) = expires_at {
        form = form.text("expires_at", expires_at.to_string());
    }

    client
        .post(server.url("/upload"))
        .header("Authorization", token)
        .multipart(form)
        .send()
        .await
        .unwrap()
}

pub async fn download(
    client: &reqwest::Client,
    server: &TestServer,
    token: &str,
    hash: &str,
) -> reqwest::Response {
    client
        .post(server.url("/download"))
        .header("Authorization", token)
        .json(&json!({ "hash": hash }))
        .send()
        .await
        .unwrap()
}
