//! Purge Scheduler Module
//!
//! Keeps exactly one pending timer armed for the earliest finite deletion
//! deadline across all items, and re-derives that timer whenever metadata
//! changes.
//!
//! Rescheduling is coalesced: mutations set a dirty flag, and only the
//! transition from clean to dirty spawns a deferred re-evaluation task, so a
//! burst of `set`/`delete` calls produces a single fresh query of the minimum
//! deadline. The fire handler likewise re-reads the minimum instead of
//! trusting anything captured when the timer was armed, which resolves races
//! with foreground mutations without locking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::engine::Inner;
use crate::cache::item::now_millis;

/// Upper bound for a single timer sleep. Deadlines further out than this are
/// slept toward in hops: the timer fires early, purges nothing and re-arms.
const MAX_SLEEP_MS: u64 = 1 << 35;

/// An armed timer: the deadline it was armed for and the handle that cancels
/// it. Replaced wholesale on every reschedule, never mutated in place.
struct ArmedTimer {
    deadline: i64,
    handle: JoinHandle<()>,
}

// == Purge Scheduler ==
/// Scheduling state owned by the engine: a dirty flag for coalescing and the
/// single currently-armed timer.
pub(crate) struct PurgeScheduler {
    dirty: AtomicBool,
    timer: Mutex<Option<ArmedTimer>>,
}

impl PurgeScheduler {
    pub(crate) fn new() -> Self {
        Self {
            dirty: AtomicBool::new(false),
            timer: Mutex::new(None),
        }
    }

    // == Mark Dirty ==
    /// Requests a deferred re-evaluation of the timer.
    ///
    /// Only the clean-to-dirty transition spawns a task; further calls before
    /// that task runs are absorbed by the flag.
    pub(crate) fn mark_dirty(inner: &Arc<Inner>) {
        if inner.scheduler.dirty.swap(true, Ordering::AcqRel) {
            return;
        }

        let weak = Arc::downgrade(inner);
        tokio::spawn(async move {
            if let Some(inner) = weak.upgrade() {
                inner.scheduler.dirty.store(false, Ordering::Release);
                Self::reschedule(&inner);
            }
        });
    }

    // == Reschedule If Sooner ==
    /// Re-evaluates the timer only when `new_deadline` could beat the armed
    /// one, or when no timer is armed at all.
    ///
    /// A deadline that moved later is left alone: the armed timer fires, its
    /// sweep finds nothing due, and the fresh re-arm picks up the new minimum.
    pub(crate) fn reschedule_if_sooner(inner: &Arc<Inner>, new_deadline: Option<i64>) {
        let Some(new_deadline) = new_deadline else {
            return;
        };

        let armed = inner
            .scheduler
            .timer
            .lock()
            .expect("scheduler timer lock poisoned")
            .as_ref()
            .map(|timer| timer.deadline);

        match armed {
            Some(deadline) if new_deadline >= deadline => {}
            _ => Self::mark_dirty(inner),
        }
    }

    // == Reschedule ==
    /// Queries the minimum deletion deadline fresh and re-arms the timer,
    /// cancelling any previously armed one.
    pub(crate) fn reschedule(inner: &Arc<Inner>) {
        let deadline = {
            let metadata = inner.metadata.lock().expect("metadata store lock poisoned");
            match metadata.next_deletion_time() {
                Ok(deadline) => deadline,
                Err(err) => {
                    warn!(error = %err, "failed to query next deletion time; timer disarmed");
                    None
                }
            }
        };

        let mut slot = inner
            .scheduler
            .timer
            .lock()
            .expect("scheduler timer lock poisoned");

        if let Some(old) = slot.take() {
            old.handle.abort();
        }

        let Some(deadline) = deadline else {
            return;
        };

        debug!(deadline, "arming purge timer");
        let weak = Arc::downgrade(inner);
        let handle = tokio::spawn(async move {
            let delta = (deadline - now_millis()).max(0) as u64;
            tokio::time::sleep(Duration::from_millis(delta.min(MAX_SLEEP_MS))).await;

            let Some(inner) = weak.upgrade() else {
                return;
            };

            if let Err(err) = inner.purge_deletable_items(now_millis()).await {
                warn!(error = %err, "purge sweep failed");
            }

            // Re-arm from a fresh minimum-deadline query
            Self::mark_dirty(&inner);
        });

        *slot = Some(ArmedTimer { deadline, handle });
    }

    // == Cancel ==
    /// Cancels the pending timer, if any. The scheduler returns to idle until
    /// the next mutation marks it dirty.
    pub(crate) fn cancel(&self) {
        let mut slot = self.timer.lock().expect("scheduler timer lock poisoned");
        if let Some(timer) = slot.take() {
            timer.handle.abort();
        }
    }

    /// Deadline of the currently armed timer, if any. Test accessor.
    #[cfg(test)]
    pub(crate) fn armed_deadline(&self) -> Option<i64> {
        self.timer
            .lock()
            .expect("scheduler timer lock poisoned")
            .as_ref()
            .map(|timer| timer.deadline)
    }
}
