//! Query result cache
//!
//! Bounded in-memory cache keyed by query-kind + filter fingerprint.
//! Entries expire after a fixed TTL, checked lazily on read; on overflow
//! the oldest entries are evicted in bulk. Keys keep player puuids in
//! plaintext so the incremental updater can invalidate by pattern.

use crate::engine::CacheInvalidator;
use crate::store::Match;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Cache sizing and expiry settings
#[derive(Debug, Clone)]
pub struct QueryCacheConfig {
    /// Time-to-live for entries, checked on read
    pub ttl: Duration,
    /// Soft cap on entry count
    pub max_entries: usize,
    /// How many oldest entries to drop when the cap is exceeded
    pub evict_batch: usize,
}

impl Default for QueryCacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_entries: 1000,
            evict_batch: 100,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    matches: Vec<Match>,
    inserted_at: Instant,
}

/// Bounded TTL cache for query results
#[derive(Debug, Default)]
pub struct QueryCache {
    config: QueryCacheConfig,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl QueryCache {
    /// Create a cache with default settings (300s TTL, 1000 entries)
    pub fn new() -> Self {
        Self::with_config(QueryCacheConfig::default())
    }

    /// Create a cache with custom settings
    pub fn with_config(config: QueryCacheConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a cached result, expiring it if the TTL has passed
    pub fn get(&self, key: &str) -> Option<Vec<Match>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() < self.config.ttl => {
                Some(entry.matches.clone())
            }
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a result, evicting the oldest entries if over the cap
    pub fn insert(&self, key: String, matches: Vec<Match>) {
        let mut entries = self.entries.lock();
        entries.insert(
            key,
            CacheEntry {
                matches,
                inserted_at: Instant::now(),
            },
        );

        if entries.len() > self.config.max_entries {
            let mut by_age: Vec<(String, Instant)> = entries
                .iter()
                .map(|(k, e)| (k.clone(), e.inserted_at))
                .collect();
            by_age.sort_by_key(|(_, inserted_at)| *inserted_at);

            for (key, _) in by_age.into_iter().take(self.config.evict_batch) {
                entries.remove(&key);
            }
        }
    }

    /// Remove all entries whose key matches a glob-lite pattern
    ///
    /// Supported forms: `*needle*` (contains), `needle*` (prefix),
    /// `*needle` (suffix), `needle` (exact). Returns how many entries
    /// were removed.
    pub fn invalidate_pattern(&self, pattern: &str) -> usize {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| !pattern_matches(pattern, key));
        before - entries.len()
    }

    /// Current entry count (expired entries linger until read or evicted)
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop everything
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl CacheInvalidator for QueryCache {
    fn invalidate(&self, pattern: &str) -> usize {
        self.invalidate_pattern(pattern)
    }
}

fn pattern_matches(pattern: &str, key: &str) -> bool {
    let starts_wild = pattern.starts_with('*');
    let ends_wild = pattern.ends_with('*') && pattern.len() > 1;
    let needle = pattern.trim_matches('*');

    match (starts_wild, ends_wild) {
        (true, true) => key.contains(needle),
        (true, false) => key.ends_with(needle),
        (false, true) => key.starts_with(needle),
        (false, false) => key == pattern,
    }
}
