//! Cache-aside layer in front of the catalogue repositories.
//!
//! Services read through [`Cache::get_json`] and hand writes to a background [`CacheWorker`].
//! The backing store is picked from configuration:
//!
//! ```toml
//! [cache]
//! backend = "memory"   # memory | redis | disabled
//! ttl_seconds = 3600
//! ```
//!
//! Cached values are derived data; losing or failing the cache never fails a request.

mod config;
mod keys;
mod lock;
mod redis_store;
mod store;
mod worker;

use std::sync::Arc;

use tracing::info;

pub use config::CacheConfig;
pub use keys::CacheKey;
pub use redis_store::RedisStore;
pub use store::{CacheError, CacheStore, MemoryStore, NoopStore};
pub use worker::{
    Cache, CacheWorker, Lookup, METRIC_CACHE_DROPPED, METRIC_CACHE_ERROR, METRIC_CACHE_HIT,
    METRIC_CACHE_MISS, MissTicket,
};

use crate::config::CacheBackend;

/// Build the store selected by `config`.
pub async fn build_store(config: &CacheConfig) -> Result<Arc<dyn CacheStore>, CacheError> {
    let store: Arc<dyn CacheStore> = match &config.backend {
        CacheBackend::Memory => Arc::new(MemoryStore::new(config)),
        CacheBackend::Redis { url } => Arc::new(RedisStore::connect(url).await?),
        CacheBackend::Disabled => Arc::new(NoopStore),
    };
    info!(
        backend = store.backend_name(),
        ttl_seconds = config.ttl.as_secs(),
        "Cache store ready"
    );
    Ok(store)
}
