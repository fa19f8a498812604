//! Cache-Aside Decorator Module
//!
//! Wraps a [`DiskCache`] with the in-memory probe cache: reads consult
//! memory first and fall back to the engine, writes go through to the engine
//! and then invalidate (never refresh) the memory entries for that key.

use std::sync::Mutex;

use crate::cache::{CacheItem, DiskCache, ItemMetadata};
use crate::error::Result;
use crate::memory::stats::CacheStats;
use crate::memory::store::{Cached, MemoryCache, MemoryKey};

// == Cached Disk Cache ==
/// A [`DiskCache`] shielded from redundant re-reads by a bounded in-memory
/// layer with negative caching.
///
/// Positive outcomes expire together with the underlying item; negative
/// outcomes live until the next mutation of their key. Errors always come
/// from the engine: the memory layer is infallible.
pub struct CachedDiskCache {
    cache: DiskCache,
    memory: Mutex<MemoryCache>,
}

impl CachedDiskCache {
    // == Constructor ==
    /// Wraps `cache` with `memory` as its cache-aside layer.
    pub fn new(cache: DiskCache, memory: MemoryCache) -> Self {
        Self {
            cache,
            memory: Mutex::new(memory),
        }
    }

    /// Wraps `cache` with a memory layer sized from `config`.
    pub fn with_config(cache: DiskCache, config: &crate::config::Config) -> Self {
        Self::new(cache, MemoryCache::new(config.memory_max_entries))
    }

    // == Has ==
    /// Checks whether a non-expired item exists, consulting memory first.
    pub fn has(&self, key: &str) -> Result<bool> {
        let memory_key = MemoryKey::Exists(key.to_string());

        if let Some(Cached::Exists(exists)) = self.memory(|memory| memory.get(&memory_key)) {
            return Ok(exists);
        }

        match self.cache.get_metadata(key)? {
            Some(metadata) => {
                let expires_at = metadata.expiration_time();
                self.memory(|memory| memory.set(memory_key, Cached::Exists(true), expires_at));
                Ok(true)
            }
            None => {
                self.memory(|memory| memory.set(memory_key, Cached::Exists(false), None));
                Ok(false)
            }
        }
    }

    // == Get ==
    /// Retrieves the item for `key`, consulting memory first. Absent keys
    /// are negatively cached so repeat lookups skip the engine too.
    pub async fn get(&self, key: &str) -> Result<Option<CacheItem>> {
        let memory_key = MemoryKey::Value(key.to_string());

        match self.memory(|memory| memory.get(&memory_key)) {
            Some(Cached::Item(item)) => return Ok(Some(item)),
            Some(Cached::Absent) => return Ok(None),
            _ => {}
        }

        match self.cache.get(key).await? {
            Some(item) => {
                let expires_at = item.metadata.expiration_time();
                self.memory(|memory| {
                    memory.set(memory_key, Cached::Item(item.clone()), expires_at)
                });
                Ok(Some(item))
            }
            None => {
                self.memory(|memory| memory.set(memory_key, Cached::Absent, None));
                Ok(None)
            }
        }
    }

    // == Get Metadata ==
    /// Read-through metadata lookup. Served from a cached full item when one
    /// is in memory; falls back to the engine otherwise.
    pub async fn get_metadata(&self, key: &str) -> Result<Option<ItemMetadata>> {
        Ok(self.get(key).await?.map(|item| item.metadata))
    }

    // == Set ==
    /// Writes through to the engine, then drops both memory entries for the
    /// key. Read-after-write must never serve pre-write memory state.
    pub async fn set(
        &self,
        key: &str,
        value: &[u8],
        time_to_live: Option<i64>,
        time_before_deletion: Option<i64>,
    ) -> Result<()> {
        self.cache
            .set(key, value, time_to_live, time_before_deletion)
            .await?;

        self.memory(|memory| memory.invalidate(key));
        Ok(())
    }

    // == Delete ==
    /// Writes through to the engine, then drops both memory entries.
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.cache.delete(key).await?;

        self.memory(|memory| memory.invalidate(key));
        Ok(())
    }

    // == Clear ==
    /// Clears the engine and the entire memory layer.
    pub async fn clear(&self) -> Result<()> {
        self.cache.clear().await?;

        self.memory(|memory| memory.clear());
        Ok(())
    }

    // == Keys ==
    /// Delegates to the engine; the memory layer holds no authoritative key
    /// list.
    pub fn keys(&self) -> Result<Vec<String>> {
        self.cache.keys()
    }

    // == Close ==
    /// Closes the underlying engine.
    pub async fn close(self) -> Result<()> {
        self.cache.close().await
    }

    // == Stats ==
    /// Statistics of the memory layer.
    pub fn stats(&self) -> CacheStats {
        self.memory(|memory| memory.stats())
    }

    // == Engine Accessor ==
    /// The wrapped engine. Intended for tests and diagnostics; mutations
    /// through it bypass memory invalidation.
    pub fn engine(&self) -> &DiskCache {
        &self.cache
    }

    fn memory<R>(&self, f: impl FnOnce(&mut MemoryCache) -> R) -> R {
        let mut memory = self.memory.lock().expect("memory cache lock poisoned");
        f(&mut memory)
    }
}
