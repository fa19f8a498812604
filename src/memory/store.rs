//! Memory Cache Module
//!
//! The bounded in-memory map behind the cache-aside decorator. Each entry
//! records the outcome of a probe against the engine (an existence answer,
//! a full item, or a confirmed absence) with an optional absolute expiry
//! synchronized to the underlying item's TTL.
//!
//! Memory operations are infallible; this layer never introduces errors of
//! its own.

use std::collections::HashMap;

use crate::cache::{now_millis, CacheItem};
use crate::memory::lru::LruTracker;
use crate::memory::stats::CacheStats;

// == Memory Key ==
/// Identity of a cached probe: `has` answers and `get` answers for the same
/// engine key are cached independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemoryKey {
    /// Outcome of an existence probe (`has`)
    Exists(String),
    /// Outcome of a value probe (`get`)
    Value(String),
}

// == Cached Outcome ==
/// A cached probe outcome.
#[derive(Debug, Clone)]
pub enum Cached {
    /// The key exists (or not), as answered by `has`
    Exists(bool),
    /// The full item, as answered by `get`
    Item(CacheItem),
    /// Confirmed absent: a negative `get` result, cached until invalidated
    Absent,
}

/// A memory entry: the cached outcome plus its own expiry.
#[derive(Debug, Clone)]
struct MemoryEntry {
    value: Cached,
    /// Absolute expiry (unix ms), None = valid until invalidated
    expires_at: Option<i64>,
}

impl MemoryEntry {
    fn is_expired(&self, now: i64) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }
}

// == Memory Cache ==
/// Bounded in-memory probe cache with LRU eviction and TTL-synchronized
/// entry expiry.
#[derive(Debug)]
pub struct MemoryCache {
    entries: HashMap<MemoryKey, MemoryEntry>,
    lru: LruTracker,
    stats: CacheStats,
    max_entries: usize,
}

impl MemoryCache {
    // == Constructor ==
    /// Creates a cache holding at most `max_entries` probe outcomes.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_entries,
        }
    }

    // == Get ==
    /// Returns the cached outcome for `key`, or None when unknown.
    ///
    /// Expired entries are dropped on access and count as misses, so the
    /// memory layer never outlives the durable item it mirrors.
    pub fn get(&mut self, key: &MemoryKey) -> Option<Cached> {
        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired(now_millis()) {
                self.entries.remove(key);
                self.lru.remove(key);
                self.stats.set_total_entries(self.entries.len());
                self.stats.record_miss();
                return None;
            }

            let value = entry.value.clone();
            self.stats.record_hit();
            self.lru.touch(key);
            Some(value)
        } else {
            self.stats.record_miss();
            None
        }
    }

    // == Set ==
    /// Caches an outcome with an optional absolute expiry. Evicts the least
    /// recently used entry when at capacity.
    pub fn set(&mut self, key: MemoryKey, value: Cached, expires_at: Option<i64>) {
        if self.max_entries == 0 {
            return;
        }

        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            if let Some(evicted) = self.lru.evict_oldest() {
                self.entries.remove(&evicted);
                self.stats.record_eviction();
            }
        }

        self.entries.insert(key.clone(), MemoryEntry { value, expires_at });
        self.lru.touch(&key);
        self.stats.set_total_entries(self.entries.len());
    }

    // == Delete ==
    /// Removes a single cached outcome.
    pub fn delete(&mut self, key: &MemoryKey) {
        if self.entries.remove(key).is_some() {
            self.lru.remove(key);
            self.stats.set_total_entries(self.entries.len());
        }
    }

    // == Invalidate ==
    /// Removes both probe outcomes for an engine key. Used after every
    /// write-through so a read after a write never sees pre-write state.
    pub fn invalidate(&mut self, key: &str) {
        self.delete(&MemoryKey::Exists(key.to_string()));
        self.delete(&MemoryKey::Value(key.to_string()));
    }

    // == Clear ==
    /// Removes all cached outcomes.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.stats.set_total_entries(0);
    }

    // == Stats ==
    /// Returns current statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ItemMetadata;

    fn item(value: &[u8]) -> CacheItem {
        CacheItem {
            value: value.to_vec(),
            metadata: ItemMetadata {
                updated_at: now_millis(),
                time_to_live: None,
                time_before_deletion: None,
            },
        }
    }

    #[test]
    fn test_set_and_get() {
        let mut cache = MemoryCache::new(10);

        cache.set(MemoryKey::Value("k".into()), Cached::Item(item(b"v")), None);

        match cache.get(&MemoryKey::Value("k".into())) {
            Some(Cached::Item(item)) => assert_eq!(item.value, b"v"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_get_unknown_returns_none() {
        let mut cache = MemoryCache::new(10);
        assert!(cache.get(&MemoryKey::Value("k".into())).is_none());
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_negative_outcome_is_cached() {
        let mut cache = MemoryCache::new(10);

        cache.set(MemoryKey::Value("k".into()), Cached::Absent, None);

        assert!(matches!(
            cache.get(&MemoryKey::Value("k".into())),
            Some(Cached::Absent)
        ));
    }

    #[test]
    fn test_expired_entry_reads_as_unknown() {
        let mut cache = MemoryCache::new(10);

        cache.set(
            MemoryKey::Exists("k".into()),
            Cached::Exists(true),
            Some(now_millis() - 1),
        );

        assert!(cache.get(&MemoryKey::Exists("k".into())).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let mut cache = MemoryCache::new(2);

        cache.set(MemoryKey::Value("a".into()), Cached::Absent, None);
        cache.set(MemoryKey::Value("b".into()), Cached::Absent, None);
        // Touch "a" so "b" becomes the eviction candidate
        cache.get(&MemoryKey::Value("a".into()));
        cache.set(MemoryKey::Value("c".into()), Cached::Absent, None);

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&MemoryKey::Value("b".into())).is_none());
        assert!(cache.get(&MemoryKey::Value("a".into())).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_zero_capacity_caches_nothing() {
        let mut cache = MemoryCache::new(0);

        cache.set(MemoryKey::Value("a".into()), Cached::Absent, None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_removes_both_probes() {
        let mut cache = MemoryCache::new(10);

        cache.set(MemoryKey::Exists("k".into()), Cached::Exists(true), None);
        cache.set(MemoryKey::Value("k".into()), Cached::Item(item(b"v")), None);

        cache.invalidate("k");

        assert!(cache.get(&MemoryKey::Exists("k".into())).is_none());
        assert!(cache.get(&MemoryKey::Value("k".into())).is_none());
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let mut cache = MemoryCache::new(2);

        cache.set(MemoryKey::Value("a".into()), Cached::Absent, None);
        cache.set(MemoryKey::Value("b".into()), Cached::Absent, None);
        cache.set(MemoryKey::Value("a".into()), Cached::Item(item(b"v")), None);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_clear() {
        let mut cache = MemoryCache::new(10);

        cache.set(MemoryKey::Value("a".into()), Cached::Absent, None);
        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.stats().total_entries, 0);
    }
}
