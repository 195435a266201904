use bytes::Bytes;
use lru::LruCache;

/// Recency-ordered cache index with byte accounting. Callers hold the
/// surrounding lock; nothing in here synchronizes.
#[derive(Debug)]
pub(super) struct CacheIndex {
    entries: LruCache<String, CacheEntry>,
    bytes_in_use: u64,
    max_bytes: u64,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Bytes,
}

impl CacheEntry {
    fn size(&self) -> u64 {
        self.payload.len() as u64
    }
}

pub(super) struct InsertOutcome {
    pub stored: bool,
    /// (key, size) pairs removed to make room, least recently used first.
    pub evicted: Vec<(String, u64)>,
}

impl CacheIndex {
    pub(super) fn new(max_bytes: u64) -> Self {
        Self {
            // Eviction is driven purely by the byte budget below, so the
            // underlying list carries no entry-count bound of its own.
            entries: LruCache::unbounded(),
            bytes_in_use: 0,
            max_bytes,
        }
    }

    /// Fetch a payload without touching recency order.
    pub(super) fn peek(&self, key: &str) -> Option<Bytes> {
        self.entries.peek(key).map(|entry| entry.payload.clone())
    }

    /// Move an entry to the most-recently-used position. A key evicted
    /// between a peek and this call is silently ignored.
    pub(super) fn promote(&mut self, key: &str) {
        self.entries.promote(key);
    }

    pub(super) fn insert(&mut self, key: String, payload: Bytes) -> InsertOutcome {
        let size = payload.len() as u64;
        let mut evicted = Vec::new();

        // Replace-on-insert: a same-key survivor never coexists with the
        // new entry.
        if let Some(previous) = self.entries.pop(&key) {
            self.bytes_in_use = self.bytes_in_use.saturating_sub(previous.size());
        }

        while self.bytes_in_use.saturating_add(size) > self.max_bytes {
            match self.entries.pop_lru() {
                Some((lru_key, entry)) => {
                    self.bytes_in_use = self.bytes_in_use.saturating_sub(entry.size());
                    evicted.push((lru_key, entry.size()));
                }
                None => break,
            }
        }

        // Even an empty index cannot admit a payload larger than the total
        // budget.
        if self.bytes_in_use.saturating_add(size) > self.max_bytes {
            return InsertOutcome {
                stored: false,
                evicted,
            };
        }

        self.entries.push(key, CacheEntry { payload });
        self.bytes_in_use += size;
        InsertOutcome {
            stored: true,
            evicted,
        }
    }

    #[cfg(test)]
    pub(super) fn bytes_in_use(&self) -> u64 {
        self.bytes_in_use
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }
}
