//! LRU Tracker Module
//!
//! Tracks access order for eviction when the in-memory layer is at capacity.

use std::collections::VecDeque;

use crate::memory::store::MemoryKey;

// == LRU Tracker ==
/// Tracks access order for LRU eviction.
///
/// Keys are stored in a VecDeque where:
/// - Front = Most recently used
/// - Back = Least recently used
#[derive(Debug, Default)]
pub(crate) struct LruTracker {
    /// Order of keys by access time
    order: VecDeque<MemoryKey>,
}

impl LruTracker {
    pub(crate) fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Touch ==
    /// Marks a key as recently used (moves to front).
    pub(crate) fn touch(&mut self, key: &MemoryKey) {
        self.remove(key);
        self.order.push_front(key.clone());
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub(crate) fn remove(&mut self, key: &MemoryKey) {
        self.order.retain(|k| k != key);
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key, or None if empty.
    pub(crate) fn evict_oldest(&mut self) -> Option<MemoryKey> {
        self.order.pop_back()
    }

    // == Clear ==
    pub(crate) fn clear(&mut self) {
        self.order.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}
