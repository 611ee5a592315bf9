//! Process-wide cache of extracted URL content
//!
//! Bounded LRU with an optional time-to-live. Concurrent writes for the same
//! URL are harmless: extracted content for a URL is treated as stable, so a
//! duplicate fetch race only costs an extra request.

use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use lru::LruCache;
use tracing::debug;

use crate::routes::metrics::record_cache_operation;

/// Cached extraction with its expiry
struct CacheEntry {
    text: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.map(|exp| Instant::now() > exp).unwrap_or(false)
    }
}

/// Bounded URL → extracted text cache
///
/// # Thread Safety
///
/// A single mutex guards the LRU list; every critical section is a map
/// operation with no I/O inside it.
pub struct ContentCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Option<Duration>,
}

impl ContentCache {
    /// Create a cache holding at most `capacity` entries (minimum one)
    pub fn new(capacity: usize, ttl: Option<Duration>) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Cached text for a URL; expired entries are evicted and count as misses
    pub fn get(&self, url: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        let expired = match entries.get(url) {
            Some(entry) if !entry.is_expired() => {
                record_cache_operation("get", "hit");
                return Some(entry.text.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(url);
            debug!(url = %url, "Evicted expired cache entry");
        }
        record_cache_operation("get", "miss");
        None
    }

    /// Whether a live entry exists, without touching recency or metrics
    pub fn contains(&self, url: &str) -> bool {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .peek(url)
            .map(|entry| !entry.is_expired())
            .unwrap_or(false)
    }

    /// Store extracted text for a URL, evicting the least recently used entry when full
    pub fn insert(&self, url: &str, text: String) {
        let expires_at = self.ttl.map(|ttl| Instant::now() + ttl);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.put(url.to_string(), CacheEntry { text, expires_at });
        record_cache_operation("set", "success");
    }

    /// Number of entries currently held, including ones not yet found expired
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cap()
            .get()
    }
}
