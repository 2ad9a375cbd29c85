//! Query-result cache for the ranker.
//!
//! Entries are keyed by the normalized-signal cache key and expire after a
//! TTL (30 minutes by default). The cache is unbounded unless a capacity is
//! given, in which case least-recently-used entries are evicted first.
//!
//! One cache belongs to one ranker instance. It is `Sync`: reads and writes
//! take a short lock, and concurrent writers for the same key simply
//! overwrite each other with identical data.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::ranking::RankedPattern;

/// Default time-to-live for cached rankings.
pub const DEFAULT_QUERY_TTL: Duration = Duration::from_secs(30 * 60);

/// Cached ranking with metadata for expiry.
#[derive(Debug, Clone)]
pub struct CachedQueryResult {
    pub results: Vec<RankedPattern>,
    pub cached_at: Instant,
    pub hit_count: u64,
}

/// Cache statistics for monitoring and tuning.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Entries found but older than the TTL.
    pub expired: u64,
}

impl CacheStats {
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let rate = self.hits as f64 / total as f64;
            rate
        }
    }
}

#[derive(Debug)]
pub struct QueryCache {
    entries: Mutex<LruCache<u64, CachedQueryResult>>,
    stats: Mutex<CacheStats>,
    ttl: Duration,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_QUERY_TTL)
    }
}

impl QueryCache {
    /// Unbounded cache with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(LruCache::unbounded()),
            stats: Mutex::new(CacheStats::default()),
            ttl,
        }
    }

    /// Bounded cache. A capacity of zero means unbounded.
    #[must_use]
    pub fn with_capacity(ttl: Duration, capacity: usize) -> Self {
        let entries = NonZeroUsize::new(capacity).map_or_else(LruCache::unbounded, LruCache::new);
        Self {
            entries: Mutex::new(entries),
            stats: Mutex::new(CacheStats::default()),
            ttl,
        }
    }

    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh cached results for `key`. Stale entries are dropped on sight.
    pub fn get(&self, key: u64) -> Option<Vec<RankedPattern>> {
        self.get_at(key, self.ttl, Instant::now())
    }

    /// Like [`get`](Self::get) but with a per-call freshness window.
    pub fn get_within(&self, key: u64, ttl: Duration) -> Option<Vec<RankedPattern>> {
        self.get_at(key, ttl, Instant::now())
    }

    fn get_at(&self, key: u64, ttl: Duration, now: Instant) -> Option<Vec<RankedPattern>> {
        let mut entries = self.entries.lock();
        let mut stats = self.stats.lock();

        let fresh = match entries.get_mut(&key) {
            Some(entry) if now.saturating_duration_since(entry.cached_at) < ttl => {
                entry.hit_count += 1;
                Some(entry.results.clone())
            }
            Some(_) => {
                entries.pop(&key);
                stats.expired += 1;
                None
            }
            None => None,
        };

        if fresh.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        fresh
    }

    pub fn put(&self, key: u64, results: Vec<RankedPattern>) {
        self.entries.lock().put(
            key,
            CachedQueryResult {
                results,
                cached_at: Instant::now(),
                hit_count: 0,
            },
        );
    }

    /// Remove every entry older than the TTL. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let stale: Vec<u64> = entries
            .iter()
            .filter(|(_, e)| now.saturating_duration_since(e.cached_at) >= self.ttl)
            .map(|(k, _)| *k)
            .collect();
        for key in &stale {
            entries.pop(key);
        }
        stale.len()
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        *self.stats.lock()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
        *self.stats.lock() = CacheStats::default();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
