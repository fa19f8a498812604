//! Cache Engine Module
//!
//! The public cache surface: CRUD with TTL semantics over the two durable
//! stores, wired to the purge scheduler and the consistency reconciler.
//!
//! Payload and metadata are committed independently, so writes are two-phase
//! best-effort with a pinned order chosen to keep partial failures invisible
//! to readers (readers consult metadata first):
//! - `set` writes the payload, then the metadata row;
//! - `delete` removes the metadata row, then the payload.
//! Either way a crash in between leaves an orphan payload, which reads as
//! absent and is swept by the reconciler at the next open or close.

use std::path::Path;
use std::sync::{Arc, Mutex};

use tokio::fs;
use tracing::{debug, info};

use crate::cache::item::{now_millis, CacheItem, ItemMetadata};
use crate::cache::scheduler::PurgeScheduler;
use crate::error::{CacheError, Result};
use crate::store::{BlobStore, MetadataStore};

/// State shared between the engine handle and its timer tasks. Timer tasks
/// hold only weak references, so dropping the last engine handle stops them.
pub(crate) struct Inner {
    pub(crate) data: BlobStore,
    pub(crate) metadata: Mutex<MetadataStore>,
    pub(crate) scheduler: PurgeScheduler,
}

impl Inner {
    /// Removes every item whose deletion deadline has passed: the metadata
    /// rows transactionally, then the matching payloads.
    pub(crate) async fn purge_deletable_items(&self, now: i64) -> Result<()> {
        let keys = self
            .metadata
            .lock()
            .expect("metadata store lock poisoned")
            .take_deletable_keys(now)?;

        if !keys.is_empty() {
            debug!(count = keys.len(), "purging deletable items");
        }

        self.delete_purged_payloads(&keys).await
    }

    /// Removes the payloads of keys whose metadata rows were just purged.
    /// A set racing the purge can re-create a key's row after the purge
    /// transaction commits but before its payload delete runs; such a key
    /// has a fresh payload that must survive, so each delete re-probes the
    /// metadata store and skips keys that are live again.
    async fn delete_purged_payloads(&self, keys: &[String]) -> Result<()> {
        for key in keys {
            let rewritten = self
                .metadata
                .lock()
                .expect("metadata store lock poisoned")
                .exists(key)?;
            if rewritten {
                debug!(key, "skipping payload delete, key was rewritten");
                continue;
            }
            self.data.delete(key).await?;
        }

        Ok(())
    }
}

// == Disk Cache ==
/// A persistent key-value cache with per-item TTL expiration.
///
/// Payloads live in a file-per-key blob store, lifecycle metadata in SQLite.
/// A background timer physically purges items once their deletion deadline
/// passes; logically expired items read as absent before that.
///
/// The mutation API is synchronous in effect: each call completes its writes
/// before returning, and no internal per-key locking is provided. The only
/// concurrently-triggered logic is the purge timer, which re-reads the
/// minimum deadline fresh when it fires.
pub struct DiskCache {
    inner: Arc<Inner>,
}

impl DiskCache {
    // == Create ==
    /// Opens the cache rooted at `dir`, creating it if needed.
    ///
    /// Before returning, this applies schema migrations, runs a catch-up
    /// purge sweep for deadlines that passed while the process was down,
    /// reconciles orphans between the two stores, and arms the purge timer.
    pub async fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).await?;

        let data = BlobStore::open(dir.join("data")).await?;
        let metadata = MetadataStore::open(dir.join("metadata.db"))?;

        let cache = Self {
            inner: Arc::new(Inner {
                data,
                metadata: Mutex::new(metadata),
                scheduler: PurgeScheduler::new(),
            }),
        };

        cache.inner.purge_deletable_items(now_millis()).await?;
        cache.inner.reconcile().await?;
        PurgeScheduler::reschedule(&cache.inner);

        info!(dir = %dir.display(), "disk cache opened");
        Ok(cache)
    }

    // == Has ==
    /// Checks whether a non-expired item exists for `key`.
    pub fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get_metadata(key)?.is_some())
    }

    // == Get ==
    /// Retrieves the item for `key`, or None if missing or expired.
    ///
    /// A logically expired item reads as absent even while it is still on
    /// disk awaiting its deletion deadline.
    pub async fn get(&self, key: &str) -> Result<Option<CacheItem>> {
        let Some(metadata) = self.get_metadata(key)? else {
            return Ok(None);
        };

        // An orphaned metadata row (payload missing) also reads as absent
        let Some(value) = self.inner.data.get(key).await? else {
            return Ok(None);
        };

        Ok(Some(CacheItem { value, metadata }))
    }

    // == Get Metadata ==
    /// Retrieves the metadata for `key` without touching the payload, or
    /// None if missing or expired.
    pub fn get_metadata(&self, key: &str) -> Result<Option<ItemMetadata>> {
        let metadata = self
            .inner
            .metadata
            .lock()
            .expect("metadata store lock poisoned")
            .get(key)?;

        Ok(metadata.filter(|metadata| !metadata.is_expired(now_millis())))
    }

    // == Set ==
    /// Upserts an item. `updated_at` is the current time; both durations are
    /// milliseconds where `None` means unbounded.
    ///
    /// Negative durations are rejected before anything is written. The purge
    /// timer is re-evaluated only when the new deadline could be the new
    /// global minimum.
    pub async fn set(
        &self,
        key: &str,
        value: &[u8],
        time_to_live: Option<i64>,
        time_before_deletion: Option<i64>,
    ) -> Result<()> {
        if let Some(ttl) = time_to_live {
            if ttl < 0 {
                return Err(CacheError::InvalidTimeToLive(ttl));
            }
        }
        if let Some(grace) = time_before_deletion {
            if grace < 0 {
                return Err(CacheError::InvalidTimeBeforeDeletion(grace));
            }
        }

        let metadata = ItemMetadata {
            updated_at: now_millis(),
            time_to_live,
            time_before_deletion,
        };
        let new_deadline = metadata.deletion_time();

        // Payload first: readers consult metadata, so a failure after this
        // write leaves an invisible orphan payload
        self.inner.data.put(key, value).await?;
        self.inner
            .metadata
            .lock()
            .expect("metadata store lock poisoned")
            .set(key, &metadata)?;

        PurgeScheduler::reschedule_if_sooner(&self.inner, new_deadline);
        Ok(())
    }

    // == Delete ==
    /// Removes the item for `key` unconditionally. Not an error if absent.
    pub async fn delete(&self, key: &str) -> Result<()> {
        // Metadata first: a failure after this leaves an orphan payload,
        // which reads as absent
        self.inner
            .metadata
            .lock()
            .expect("metadata store lock poisoned")
            .delete(key)?;
        self.inner.data.delete(key).await?;

        PurgeScheduler::mark_dirty(&self.inner);
        Ok(())
    }

    // == Clear ==
    /// Removes all items and cancels the pending purge timer.
    pub async fn clear(&self) -> Result<()> {
        self.inner
            .metadata
            .lock()
            .expect("metadata store lock poisoned")
            .clear()?;
        self.inner.scheduler.cancel();
        self.inner.data.clear().await?;
        Ok(())
    }

    // == Keys ==
    /// Returns all currently stored keys in ascending order.
    ///
    /// Snapshot-at-start semantics: the returned keys reflect the committed
    /// state at call time, and mutations made afterwards are not visible to
    /// an iteration already handed out. Expired-but-unpurged keys are
    /// included, matching the stored state rather than the logical view.
    pub fn keys(&self) -> Result<Vec<String>> {
        self.inner
            .metadata
            .lock()
            .expect("metadata store lock poisoned")
            .keys()
    }

    // == Purge Deletable Items ==
    /// Removes every item whose deletion deadline is `<= now`, from both
    /// stores. Driven by the background timer and the startup catch-up sweep;
    /// callable directly for tests and manual maintenance.
    pub async fn purge_deletable_items(&self, now: i64) -> Result<()> {
        self.inner.purge_deletable_items(now).await
    }

    // == Close ==
    /// Cancels the pending timer, reconciles the stores once more, and
    /// optimizes the metadata database before releasing both handles.
    pub async fn close(self) -> Result<()> {
        self.inner.scheduler.cancel();
        self.inner.reconcile().await?;
        self.inner
            .metadata
            .lock()
            .expect("metadata store lock poisoned")
            .optimize()?;

        info!("disk cache closed");
        Ok(())
    }

    // == Raw Store Accessors ==
    /// The underlying blob store. Intended for tests and diagnostics.
    pub fn data(&self) -> &BlobStore {
        &self.inner.data
    }

    /// The underlying metadata store. Intended for tests and diagnostics.
    pub fn metadata(&self) -> &Mutex<MetadataStore> {
        &self.inner.metadata
    }

    #[cfg(test)]
    pub(crate) fn armed_deadline(&self) -> Option<i64> {
        self.inner.scheduler.armed_deadline()
    }
}
