//! Consistency Reconciler Module
//!
//! Payload and metadata are committed to two independent stores, so either
//! side can be left with orphans after a crash or a partial write. This pass
//! restores agreement by deleting records with no counterpart in the other
//! store. It runs at open (before the engine serves requests) and at close
//! (after the timer is cancelled), so it assumes no concurrent writers.
//!
//! A key that cannot be checked or deleted is logged and skipped; one bad key
//! must not prevent the store from opening or closing.

use tracing::{debug, warn};

use crate::cache::engine::Inner;
use crate::error::Result;

impl Inner {
    /// Deletes orphan payloads (no metadata row) and orphan metadata rows
    /// (no payload). One existence probe against the other store per key.
    pub(crate) async fn reconcile(&self) -> Result<()> {
        // Pass 1: payloads without metadata
        for key in self.data.keys().await? {
            let has_metadata = {
                let metadata = self.metadata.lock().expect("metadata store lock poisoned");
                match metadata.exists(&key) {
                    Ok(exists) => exists,
                    Err(err) => {
                        warn!(key = %key, error = %err, "skipping unverifiable payload");
                        continue;
                    }
                }
            };

            if !has_metadata {
                match self.data.delete(&key).await {
                    Ok(()) => debug!(key = %key, "removed orphan payload"),
                    Err(err) => warn!(key = %key, error = %err, "failed to remove orphan payload"),
                }
            }
        }

        // Pass 2: metadata rows without payloads
        let keys = self
            .metadata
            .lock()
            .expect("metadata store lock poisoned")
            .keys()?;
        for key in keys {
            match self.data.exists(&key).await {
                Ok(true) => {}
                Ok(false) => {
                    let metadata = self.metadata.lock().expect("metadata store lock poisoned");
                    match metadata.delete(&key) {
                        Ok(()) => debug!(key = %key, "removed orphan metadata"),
                        Err(err) => {
                            warn!(key = %key, error = %err, "failed to remove orphan metadata")
                        }
                    }
                }
                Err(err) => warn!(key = %key, error = %err, "skipping unverifiable metadata"),
            }
        }

        Ok(())
    }
}
