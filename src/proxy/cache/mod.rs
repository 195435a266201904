use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::{debug, trace};

mod index;

use index::CacheIndex;

/// Process-wide response cache, bounded by total payload bytes with LRU
/// eviction. Lookups run concurrently under the shared side of the lock;
/// inserts, evictions, and recency promotion take the exclusive side, so
/// two structural mutations can never interleave.
#[derive(Clone)]
pub struct ProxyCache {
    state: Arc<CacheState>,
}

struct CacheState {
    index: RwLock<CacheIndex>,
    max_object_size: u64,
}

impl ProxyCache {
    pub fn new(max_cache_size: u64, max_object_size: u64) -> Self {
        Self {
            state: Arc::new(CacheState {
                index: RwLock::new(CacheIndex::new(max_cache_size)),
                max_object_size,
            }),
        }
    }

    /// Look up a cached payload and mark it most recently used.
    ///
    /// The returned bytes are an immutable snapshot: a racing eviction of
    /// the underlying entry cannot affect an in-flight write to a client.
    pub fn lookup(&self, key: &str) -> Option<Bytes> {
        let payload = {
            let index = self.state.index.read();
            index.peek(key)?
        };
        // Promotion mutates list structure, so it runs as its own short
        // exclusive step immediately after the shared read.
        self.state.index.write().promote(key);
        trace!(key, size = payload.len(), "cache hit");
        Some(payload)
    }

    /// Store a payload, evicting from the least-recently-used tail until it
    /// fits. Payloads over the per-object limit are never admitted, and an
    /// existing entry under the same key is replaced.
    pub fn insert(&self, key: &str, payload: Bytes) {
        let size = payload.len() as u64;
        if size > self.state.max_object_size {
            trace!(
                key,
                size,
                limit = self.state.max_object_size,
                "response too large to cache"
            );
            return;
        }

        let outcome = self.state.index.write().insert(key.to_string(), payload);
        for (evicted_key, evicted_size) in &outcome.evicted {
            debug!(key = %evicted_key, size = evicted_size, "evicted cache entry");
        }
        if outcome.stored {
            trace!(key, size, "stored cache entry");
        } else {
            debug!(key, size, "payload exceeds total cache capacity, not stored");
        }
    }
}
