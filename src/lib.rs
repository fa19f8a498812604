//! Disk Cache - An embeddable, persistent key-value cache
//!
//! Items carry a time-to-live and an optional post-expiry grace period;
//! a single background timer physically purges items once their deletion
//! deadline passes. Payloads and lifecycle metadata live in two independent
//! on-disk stores, reconciled at open and close. An optional cache-aside
//! layer serves repeat reads (including negative lookups) from memory.

pub mod cache;
pub mod config;
pub mod convert;
pub mod error;
pub mod memory;
pub mod store;

pub use cache::{now_millis, CacheItem, DiskCache, ItemMetadata};
pub use config::Config;
pub use error::{CacheError, Result};
pub use memory::{CachedDiskCache, MemoryCache};
