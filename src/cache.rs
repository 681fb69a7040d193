use crate::model::{SearchQuery, SearchResult};
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60); // 1 hour
pub const DEFAULT_CAPACITY: usize = 64;

/// Hit/miss counters exposed through the diagnostics surface.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

struct CacheEntry {
    namespace: String,
    inserted: Instant,
    payload: SearchResult,
}

/// In-memory store mapping (query, page) to a normalized result set.
/// Owned by the coordinator; there is no module-level cache state. When
/// `no_cache` is set, reads are skipped but writes still happen.
pub struct ResponseCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
    capacity: usize,
    read_enabled: bool,
    stats: CacheStats,
}

impl ResponseCache {
    pub fn new(ttl: Duration, capacity: usize, no_cache: bool) -> Self {
        ResponseCache {
            entries: HashMap::new(),
            ttl,
            capacity: capacity.max(1),
            read_enabled: !no_cache,
            stats: CacheStats::default(),
        }
    }

    fn key(query: &SearchQuery, page: u32) -> String {
        format!("{}:{}", query.namespace(), page)
    }

    pub fn get(&mut self, query: &SearchQuery, page: u32) -> Option<SearchResult> {
        if !self.read_enabled {
            return None;
        }
        let key = Self::key(query, page);
        let expired = match self.entries.get(&key) {
            Some(entry) => entry.inserted.elapsed() > self.ttl,
            None => {
                self.stats.misses += 1;
                return None;
            }
        };
        if expired {
            tracing::debug!("Cache expired for {}", key);
            self.entries.remove(&key);
            self.stats.misses += 1;
            return None;
        }
        self.stats.hits += 1;
        tracing::debug!("Cache hit for {}", key);
        self.entries.get(&key).map(|e| e.payload.clone())
    }

    /// A write for the same key always replaces the entry, never merges.
    pub fn put(&mut self, query: &SearchQuery, page: u32, payload: SearchResult) {
        let key = Self::key(query, page);
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_oldest();
        }
        self.entries.insert(
            key,
            CacheEntry {
                namespace: query.namespace(),
                inserted: Instant::now(),
                payload,
            },
        );
    }

    /// Drop every page cached under the given query.
    pub fn invalidate_namespace(&mut self, query: &SearchQuery) {
        let ns = query.namespace();
        let before = self.entries.len();
        self.entries.retain(|_, e| e.namespace != ns);
        let dropped = before - self.entries.len();
        if dropped > 0 {
            tracing::debug!("Invalidated {} cache entries for namespace {}", dropped, ns);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, e)| e.inserted)
            .map(|(k, _)| k.clone());
        if let Some(key) = oldest {
            tracing::debug!("Cache full, evicting {}", key);
            self.entries.remove(&key);
        }
    }
}
