//! Service-facing cache handle and the background worker that applies writes.
//!
//! Reads go straight to the store on the caller's task. Populate and invalidate requests are
//! queued on a bounded channel and applied in FIFO order by a single worker task, so the request
//! path never waits on a cache write.
//!
//! Every key carries a generation that [`Cache::invalidate`] bumps synchronously. A miss records
//! the generation it saw, and the worker discards a populate whose generation is older than the
//! key's current one. A reader that loaded a row before a concurrent write therefore cannot put
//! the old row back after that write's invalidation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::CacheConfig;
use super::keys::CacheKey;
use super::lock::{rw_read, rw_write};
use super::store::CacheStore;

const SOURCE: &str = "cache::worker";

pub const METRIC_CACHE_HIT: &str = "bookshelf_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "bookshelf_cache_miss_total";
pub const METRIC_CACHE_ERROR: &str = "bookshelf_cache_error_total";
pub const METRIC_CACHE_DROPPED: &str = "bookshelf_cache_dropped_total";

#[derive(Debug)]
enum CacheCommand {
    Set {
        key: CacheKey,
        generation: u64,
        value: String,
    },
    Delete { key: String },
    Flush(oneshot::Sender<()>),
}

impl CacheCommand {
    fn op(&self) -> &'static str {
        match self {
            CacheCommand::Set { .. } => "set",
            CacheCommand::Delete { .. } => "delete",
            CacheCommand::Flush(_) => "flush",
        }
    }
}

type Generations = Arc<RwLock<HashMap<CacheKey, u64>>>;

fn current_generation(generations: &Generations, key: CacheKey) -> u64 {
    rw_read(generations, SOURCE, "generation")
        .get(&key)
        .copied()
        .unwrap_or_default()
}

/// Outcome of [`Cache::get_json`].
#[derive(Debug)]
pub enum Lookup<T> {
    Hit(T),
    /// The key was absent or unreadable. Hand the ticket back to [`Cache::populate`] once the
    /// value has been loaded from the source of truth.
    Miss(MissTicket),
}

impl<T> Lookup<T> {
    pub fn hit(self) -> Option<T> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss(_) => None,
        }
    }
}

/// Key and generation observed by a cache miss.
#[derive(Debug)]
#[must_use]
pub struct MissTicket {
    key: CacheKey,
    generation: u64,
}

impl MissTicket {
    pub fn key(&self) -> CacheKey {
        self.key
    }
}

/// Cloneable handle injected into every entity service.
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
    sender: mpsc::Sender<CacheCommand>,
    generations: Generations,
}

/// Drains queued cache commands against the store until every [`Cache`] handle is dropped.
pub struct CacheWorker {
    store: Arc<dyn CacheStore>,
    receiver: mpsc::Receiver<CacheCommand>,
    generations: Generations,
    ttl: Duration,
}

impl Cache {
    /// Build a handle and its worker without starting the worker.
    pub fn new(store: Arc<dyn CacheStore>, config: &CacheConfig) -> (Self, CacheWorker) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.get());
        let generations = Generations::default();
        let handle = Self {
            store: store.clone(),
            sender,
            generations: generations.clone(),
        };
        let worker = CacheWorker {
            store,
            receiver,
            generations,
            ttl: config.ttl,
        };
        (handle, worker)
    }

    /// Build a handle and run its worker on the current tokio runtime.
    pub fn spawn(store: Arc<dyn CacheStore>, config: &CacheConfig) -> (Self, JoinHandle<()>) {
        let (handle, worker) = Self::new(store, config);
        let join = tokio::spawn(worker.run());
        (handle, join)
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Look up `key` and decode it as JSON.
    ///
    /// Store failures and undecodable payloads are logged and reported as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: CacheKey) -> Lookup<T> {
        let ticket = MissTicket {
            key,
            generation: current_generation(&self.generations, key),
        };
        let raw = match self.store.get(&key.to_string()).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                counter!(METRIC_CACHE_MISS).increment(1);
                debug!(cache_key = %key, "Cache miss");
                return Lookup::Miss(ticket);
            }
            Err(err) => {
                counter!(METRIC_CACHE_ERROR).increment(1);
                counter!(METRIC_CACHE_MISS).increment(1);
                warn!(cache_key = %key, op = "get", error = %err, "Cache read failed");
                return Lookup::Miss(ticket);
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                counter!(METRIC_CACHE_HIT).increment(1);
                debug!(cache_key = %key, "Cache hit");
                Lookup::Hit(value)
            }
            Err(err) => {
                counter!(METRIC_CACHE_ERROR).increment(1);
                counter!(METRIC_CACHE_MISS).increment(1);
                warn!(cache_key = %key, op = "decode", error = %err, "Cached payload could not be decoded");
                Lookup::Miss(ticket)
            }
        }
    }

    /// Queue a write of `value` under the key that missed. Never blocks.
    ///
    /// The write is discarded if the key is invalidated after the miss was observed.
    pub fn populate<T: Serialize + ?Sized>(&self, ticket: MissTicket, value: &T) {
        let MissTicket { key, generation } = ticket;
        match serde_json::to_string(value) {
            Ok(value) => self.enqueue(CacheCommand::Set {
                key,
                generation,
                value,
            }),
            Err(err) => {
                counter!(METRIC_CACHE_ERROR).increment(1);
                warn!(cache_key = %key, op = "encode", error = %err, "Value could not be cached");
            }
        }
    }

    /// Queue removal of `key`. Never blocks.
    ///
    /// Populates carrying a ticket issued before this call will not be applied.
    pub fn invalidate(&self, key: CacheKey) {
        *rw_write(&self.generations, SOURCE, "invalidate")
            .entry(key)
            .or_default() += 1;
        self.enqueue(CacheCommand::Delete {
            key: key.to_string(),
        });
    }

    /// Wait until every command queued before this call has been applied.
    ///
    /// Returns immediately when the worker is gone.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.sender.send(CacheCommand::Flush(ack)).await.is_err() {
            return;
        }
        let _ = done.await;
    }

    fn enqueue(&self, command: CacheCommand) {
        let op = command.op();
        if let Err(err) = self.sender.try_send(command) {
            counter!(METRIC_CACHE_DROPPED).increment(1);
            let reason = match err {
                mpsc::error::TrySendError::Full(_) => "queue_full",
                mpsc::error::TrySendError::Closed(_) => "worker_stopped",
            };
            warn!(op, reason, "Cache command dropped");
        }
    }
}

impl CacheWorker {
    pub async fn run(mut self) {
        info!(backend = self.store.backend_name(), "Cache worker started");
        while let Some(command) = self.receiver.recv().await {
            self.apply(command).await;
        }
        info!("Cache worker stopped");
    }

    async fn apply(&self, command: CacheCommand) {
        let result = match command {
            CacheCommand::Set {
                key,
                generation,
                value,
            } => {
                if generation < current_generation(&self.generations, key) {
                    debug!(cache_key = %key, "Skipping populate invalidated after its read");
                    return;
                }
                let key = key.to_string();
                self.store
                    .set(&key, value, self.ttl)
                    .await
                    .map_err(|err| ("set", key, err))
            }
            CacheCommand::Delete { key } => self
                .store
                .delete(&key)
                .await
                .map_err(|err| ("delete", key, err)),
            CacheCommand::Flush(ack) => {
                let _ = ack.send(());
                Ok(())
            }
        };

        if let Err((op, key, err)) = result {
            counter!(METRIC_CACHE_ERROR).increment(1);
            warn!(cache_key = %key, op, error = %err, "Background cache command failed");
        }
    }
}
