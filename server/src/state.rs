use std::sync::Arc;

use crate::auth::admission::AdmissionChain;
use crate::auth::ratelimit::RateLimiter;
use crate::config::Config;
use crate::db::DbPool;
use crate::storage::StorageRouter;

/// Shared application state passed to all handlers via axum State extractor.
/// Built once at startup; nothing in here is reloaded per request.
#[derive(Clone)]
pub struct AppState {
    /// SQLite connection wrapped in Arc<Mutex>
    pub db: DbPool,
    /// Configuration snapshot
    pub config: Arc<Config>,
    /// HMAC secret for bearer tokens
    pub token_secret: Arc<Vec<u8>>,
    /// Backend selected from `config.storage`
    pub storage: Arc<StorageRouter>,
    /// Ordered gates in front of every protected handler
    pub admission: Arc<AdmissionChain>,
    /// Per-subject limiter consulted by the rate-limit gate
    pub rate_limiter: Arc<dyn RateLimiter>,
}

impl AppState {
    /// Assemble state with the standard admission chain.
    pub fn new(
        db: DbPool,
        config: Config,
        token_secret: Vec<u8>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        let storage = StorageRouter::from_config(&config.storage);
        Self {
            db,
            config: Arc::new(config),
            token_secret: Arc::new(token_secret),
            storage: Arc::new(storage),
            admission: Arc::new(AdmissionChain::standard()),
            rate_limiter,
        }
    }
}
