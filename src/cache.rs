//! Shared TTL cache in front of the sections table.
//!
//! Entries expire lazily: a read past the deadline removes the entry, and a
//! write that finds the map at or above the eviction threshold first sweeps
//! every expired entry. There is no background timer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

pub const DEFAULT_EVICTION_THRESHOLD: usize = 500;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub name: &'static str,
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Thread-safe key/value store with per-entry expiry.
///
/// The lock only guards the in-memory map; callers must not hold it across a
/// store round trip, which the API makes impossible since values are cloned
/// out on `get`.
pub struct TtlCache<V> {
    name: &'static str,
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    default_ttl: Duration,
    eviction_threshold: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(name: &'static str, default_ttl: Duration, eviction_threshold: usize) -> Self {
        Self {
            name,
            entries: Mutex::new(HashMap::new()),
            default_ttl,
            eviction_threshold,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(cache = self.name, key, "cache hit");
                return Some(entry.value.clone());
            }
            Some(_) => {
                entries.remove(key);
                debug!(cache = self.name, key, "cache entry expired");
            }
            None => debug!(cache = self.name, key, "cache miss"),
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Stores `value` under `key` with the cache's default TTL.
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        if entries.len() >= self.eviction_threshold {
            let before = entries.len();
            entries.retain(|_, entry| entry.expires_at > now);
            debug!(
                cache = self.name,
                removed = before - entries.len(),
                remaining = entries.len(),
                "swept expired cache entries"
            );
        }

        entries.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        );
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.lock().remove(key);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Entry count, including expired entries not yet removed.
    pub fn size(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            name: self.name,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.size(),
        }
    }
}
