//! Cache Item Module
//!
//! Defines the on-disk item model: payload plus lifecycle metadata.

use std::time::{SystemTime, UNIX_EPOCH};

// == Item Metadata ==
/// Lifecycle metadata of a stored item.
///
/// All times are unix milliseconds. Durations are milliseconds where `None`
/// means unbounded: an item with `time_to_live: None` never expires, and an
/// item with `time_before_deletion: None` is never physically purged after
/// expiring (it stays on disk but reads as absent).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemMetadata {
    /// Last update timestamp (unix milliseconds)
    pub updated_at: i64,
    /// Milliseconds until logical expiration, None = never expires
    pub time_to_live: Option<i64>,
    /// Grace period between expiration and physical deletion, None = never deleted
    pub time_before_deletion: Option<i64>,
}

impl ItemMetadata {
    // == Expiration Time ==
    /// The moment the item becomes logically absent to `has`/`get`.
    ///
    /// Returns `None` when the item never expires.
    pub fn expiration_time(&self) -> Option<i64> {
        self.time_to_live.map(|ttl| self.updated_at + ttl)
    }

    // == Deletion Time ==
    /// The moment the item becomes eligible for physical deletion.
    ///
    /// Always `>= expiration_time()`. Returns `None` when either duration is
    /// unbounded, in which case the item is never purged by the scheduler.
    pub fn deletion_time(&self) -> Option<i64> {
        match (self.time_to_live, self.time_before_deletion) {
            (Some(ttl), Some(grace)) => Some(self.updated_at + ttl + grace),
            _ => None,
        }
    }

    // == Is Expired ==
    /// Checks whether the item is logically expired at `now`.
    ///
    /// Boundary condition: an item is expired when `now >= expiration_time`,
    /// so a zero TTL expires the item immediately on the next read.
    pub fn is_expired(&self, now: i64) -> bool {
        match self.expiration_time() {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    // == Is Deletable ==
    /// Checks whether the item may be physically purged at `now`.
    pub fn is_deletable(&self, now: i64) -> bool {
        match self.deletion_time() {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }
}

// == Cache Item ==
/// A stored item: raw payload bytes plus its lifecycle metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheItem {
    /// The stored payload
    pub value: Vec<u8>,
    /// Lifecycle metadata
    pub metadata: ItemMetadata,
}

// == Utility Functions ==
/// Returns current unix timestamp in milliseconds.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as i64
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(updated_at: i64, ttl: Option<i64>, grace: Option<i64>) -> ItemMetadata {
        ItemMetadata {
            updated_at,
            time_to_live: ttl,
            time_before_deletion: grace,
        }
    }

    #[test]
    fn test_expiration_time_bounded() {
        let meta = metadata(1000, Some(500), Some(0));
        assert_eq!(meta.expiration_time(), Some(1500));
    }

    #[test]
    fn test_expiration_time_unbounded() {
        let meta = metadata(1000, None, Some(0));
        assert_eq!(meta.expiration_time(), None);
        assert!(!meta.is_expired(i64::MAX));
    }

    #[test]
    fn test_deletion_time_includes_grace_period() {
        let meta = metadata(1000, Some(500), Some(250));
        assert_eq!(meta.deletion_time(), Some(1750));
    }

    #[test]
    fn test_deletion_time_unbounded_grace() {
        let meta = metadata(1000, Some(500), None);
        assert_eq!(meta.deletion_time(), None);
        assert!(meta.is_expired(2000));
        assert!(!meta.is_deletable(2000));
    }

    #[test]
    fn test_deletion_never_precedes_expiration() {
        let meta = metadata(1000, Some(500), Some(250));
        assert!(meta.deletion_time().unwrap() >= meta.expiration_time().unwrap());
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let now = now_millis();
        let meta = metadata(now, Some(0), Some(0));
        assert!(meta.is_expired(now));
        assert!(meta.is_deletable(now));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let meta = metadata(1000, Some(500), Some(0));

        assert!(!meta.is_expired(1499));
        // Expired when now >= expiration_time
        assert!(meta.is_expired(1500));
    }

    #[test]
    fn test_expired_but_not_yet_deletable() {
        let meta = metadata(1000, Some(100), Some(1000));

        assert!(meta.is_expired(1200));
        assert!(!meta.is_deletable(1200));
        assert!(meta.is_deletable(2100));
    }

    #[test]
    fn test_now_millis_is_monotonic_enough() {
        let a = now_millis();
        let b = now_millis();
        assert!(b >= a);
    }
}
