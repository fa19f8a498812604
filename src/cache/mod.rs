//! Cache Module
//!
//! The cache engine: item model, CRUD surface, purge scheduling and
//! store reconciliation.

mod engine;
mod item;
mod reconcile;
mod scheduler;

// Re-export public types
pub use engine::DiskCache;
pub use item::{now_millis, CacheItem, ItemMetadata};
