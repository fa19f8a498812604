//! Convert Module
//!
//! Typed key/value adapters over the raw byte engine, and the view facade
//! composing them.

mod converters;
mod view;

// Re-export public types
pub use converters::{
    IndexKeyConverter, JsonValueConverter, KeyConverter, PassthroughKeyConverter,
    PassthroughValueConverter, ValueConverter,
};
pub use view::{CacheView, TypedItem};
