//! Error types for the disk cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the disk cache.
///
/// Store failures carry the underlying error unmodified so callers can
/// inspect the original `rusqlite` / `std::io` error through `source()`.
/// A missing key is never an error: lookups return `Option` instead.
#[derive(Error, Debug)]
pub enum CacheError {
    /// A negative time-to-live was passed to `set`
    #[error("invalid time to live: {0} (must be >= 0 milliseconds)")]
    InvalidTimeToLive(i64),

    /// A negative time-before-deletion was passed to `set`
    #[error("invalid time before deletion: {0} (must be >= 0 milliseconds)")]
    InvalidTimeBeforeDeletion(i64),

    /// Metadata store failure, propagated verbatim
    #[error("metadata store error: {0}")]
    Metadata(#[from] rusqlite::Error),

    /// Blob store failure, propagated verbatim
    #[error("blob store error: {0}")]
    Io(#[from] std::io::Error),

    /// Typed value conversion failure (JSON value converter)
    #[error("value conversion error: {0}")]
    Encoding(#[from] serde_json::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the disk cache.
pub type Result<T> = std::result::Result<T, CacheError>;

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_validation_errors_display() {
        let err = CacheError::InvalidTimeToLive(-1);
        assert!(err.to_string().contains("-1"));

        let err = CacheError::InvalidTimeBeforeDeletion(-42);
        assert!(err.to_string().contains("-42"));
    }

    #[test]
    fn test_io_error_source_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = CacheError::from(io);

        let source = err.source().expect("source should be preserved");
        let io = source.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::PermissionDenied);
    }
}
