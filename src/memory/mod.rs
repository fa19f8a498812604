//! Memory Module
//!
//! The cache-aside layer: a bounded in-memory probe cache with negative
//! caching, and the decorator that composes it with the disk engine.

mod decorator;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use decorator::CachedDiskCache;
pub use stats::CacheStats;
pub use store::{Cached, MemoryCache, MemoryKey};
