//! Cache configuration.

use std::num::NonZeroUsize;
use std::time::Duration;

use crate::config::{CacheBackend, CacheSettings};

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Expiry applied to every entry written by the background worker.
    pub ttl: Duration,
    /// Maximum entries held by the in-process store before LRU eviction.
    pub memory_capacity: NonZeroUsize,
    /// Pending populate/invalidate commands before new ones are dropped.
    pub queue_capacity: NonZeroUsize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::from(&CacheSettings::default())
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            backend: settings.backend.clone(),
            ttl: settings.ttl,
            memory_capacity: settings.memory_capacity,
            queue_capacity: settings.queue_capacity,
        }
    }
}
