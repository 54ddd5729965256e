//! TTL response cache with single-flight population.
//!
//! Successful payloads and application-level failures are both remembered
//! for the configured TTL, so a request that answered 404 yesterday keeps
//! answering from cache instead of re-hitting the API. Concurrent misses
//! for the same key collapse into one fetch via per-key locks; the lock is
//! async because population awaits the HTTP call.

use crate::error::Result;
use crate::source::FetchFailure;
use ahash::RandomState;
use blake3::Hasher;
use dashmap::DashMap;
use sonic_rs::Value;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// What a completed fetch left behind.
#[derive(Debug, Clone)]
pub enum CachedPayload {
    /// Decoded JSON payload of a successful fetch.
    Json(Value),
    /// Application-level failure recorded for the TTL.
    Failed(FetchFailure),
}

#[derive(Debug)]
struct StoredEntry {
    payload: CachedPayload,
    stored_at: Instant,
}

/// Cache statistics.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Lookups answered from a live entry.
    pub hits: AtomicU64,
    /// Lookups that found nothing usable.
    pub misses: AtomicU64,
    /// Entries written.
    pub stores: AtomicU64,
}

impl CacheStats {
    /// Cache hit rate as a percentage.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }

    /// Summary string.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Cache: {} hits, {} misses ({:.1}% hit rate), {} stores",
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            self.hit_rate(),
            self.stores.load(Ordering::Relaxed),
        )
    }
}

/// In-memory TTL cache for fetched responses.
pub struct ResponseCache {
    /// Stored payloads by hashed key.
    entries: DashMap<String, StoredEntry, RandomState>,
    /// In-flight fetches for deduplication.
    in_flight: DashMap<String, Arc<Mutex<()>>, RandomState>,
    /// How long entries stay valid.
    ttl: Duration,
    /// Key namespace prefix.
    prefix: String,
    /// Statistics.
    stats: CacheStats,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.entries.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl ResponseCache {
    /// Create a cache with the given TTL and key prefix.
    #[must_use]
    pub fn new(ttl: Duration, prefix: impl Into<String>) -> Self {
        Self {
            entries: DashMap::with_hasher(RandomState::new()),
            in_flight: DashMap::with_hasher(RandomState::new()),
            ttl,
            prefix: prefix.into(),
            stats: CacheStats::default(),
        }
    }

    /// Cache key for a resolved request path plus optional path suffix.
    ///
    /// Keys carry the namespace prefix so several sources can share a
    /// store, and hash the inputs so arbitrary paths stay fixed-width.
    #[must_use]
    pub fn key(&self, path: &str, suffix: Option<&str>) -> String {
        let mut hasher = Hasher::new();
        hasher.update(path.as_bytes());
        hasher.update(b"\0");
        hasher.update(suffix.unwrap_or_default().as_bytes());
        let hash = hasher.finalize();
        format!("{}_{}", self.prefix, hex::encode(&hash.as_bytes()[..16]))
    }

    /// Look up a live entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<CachedPayload> {
        if let Some(payload) = self.lookup(key) {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "response cache hit");
            return Some(payload);
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn lookup(&self, key: &str) -> Option<CachedPayload> {
        if let Some(entry) = self.entries.get(key) {
            if entry.stored_at.elapsed() < self.ttl {
                return Some(entry.payload.clone());
            }
            // TTL expired, drop the stale entry
            drop(entry);
            self.entries.remove(key);
        }
        None
    }

    /// Store a payload under a key.
    pub fn insert(&self, key: impl Into<String>, payload: CachedPayload) {
        self.stats.stores.fetch_add(1, Ordering::Relaxed);
        self.entries.insert(
            key.into(),
            StoredEntry {
                payload,
                stored_at: Instant::now(),
            },
        );
    }

    /// Get the payload for a key, fetching it at most once per TTL window.
    ///
    /// Concurrent callers for the same key wait on a per-key lock while
    /// the first caller populates the entry; the rest read the stored
    /// result. Failures from `fetch` are not cached.
    ///
    /// # Errors
    /// Propagates fetch errors.
    pub async fn remember<F>(&self, key: &str, fetch: F) -> Result<CachedPayload>
    where
        F: Future<Output = Result<CachedPayload>>,
    {
        if let Some(payload) = self.get(key) {
            return Ok(payload);
        }

        // Deduplicate in-flight fetches per key
        let lock = self
            .in_flight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let _guard = lock.lock().await;

        // Double-check after acquiring the lock
        if let Some(payload) = self.lookup(key) {
            self.in_flight.remove(key);
            return Ok(payload);
        }

        debug!(key = %key, "populating response cache");
        let payload = match fetch.await {
            Ok(payload) => payload,
            Err(err) => {
                self.in_flight.remove(key);
                return Err(err);
            }
        };

        self.insert(key, payload.clone());
        self.in_flight.remove(key);
        Ok(payload)
    }

    /// Number of stored entries, live or expired.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Statistics.
    #[must_use]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}
