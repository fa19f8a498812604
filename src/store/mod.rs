//! Store Module
//!
//! The two physically independent durable stores: payload bytes in a
//! file-per-key blob store, lifecycle metadata in SQLite. Neither knows about
//! the other; the engine keeps them consistent.

mod blob;
mod metadata;

pub use blob::BlobStore;
pub use metadata::MetadataStore;
