//! Process-wide count of admitted connections with a capacity gate.
//!
//! Every connection that passes admission holds one slot on the counter
//! until its worker finishes. The counter is an ordinary value shared via
//! `Arc`, so servers (and tests) each get their own instead of a hidden
//! global.
//!
//! ```text
//! try_admit() ──→ ConnectionSlot ──(drop)──→ subtract()
//!      │
//!      └── None when a nonzero maximum is reached
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts admitted connections and refuses new ones at capacity.
///
/// A maximum of `0` means unlimited.
#[derive(Debug)]
pub struct ConnectionCounter {
    count: AtomicUsize,
    max: usize,
}

impl ConnectionCounter {
    /// Creates a counter starting at zero with the given maximum.
    pub fn new(max: usize) -> Self {
        Self {
            count: AtomicUsize::new(0),
            max,
        }
    }

    /// Tests and increments in one atomic step.
    ///
    /// Returns `false` without touching the count when a nonzero maximum
    /// is set and the count has reached it.
    pub fn add(&self) -> bool {
        self.count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                if self.max != 0 && n >= self.max {
                    None
                } else {
                    Some(n + 1)
                }
            })
            .is_ok()
    }

    /// Decrements the count. Never goes below zero.
    pub fn subtract(&self) {
        let released = self
            .count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        if released.is_err() {
            tracing::warn!("connection counter release without a matching admit");
        }
    }

    /// Returns the number of currently admitted connections.
    pub fn current(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    /// Returns the configured maximum (`0` = unlimited).
    pub fn max(&self) -> usize {
        self.max
    }

    /// Reserves a slot, returning a guard that releases it on drop.
    pub fn try_admit(self: &Arc<Self>) -> Option<ConnectionSlot> {
        if self.add() {
            Some(ConnectionSlot {
                counter: Arc::clone(self),
            })
        } else {
            None
        }
    }
}

/// One admitted connection's hold on the [`ConnectionCounter`].
///
/// Dropping the slot releases it, so whichever path ends the connection
/// (rejection after reservation, protocol violation, transport failure)
/// gives the slot back exactly once.
#[derive(Debug)]
#[must_use = "dropping the slot releases it immediately"]
pub struct ConnectionSlot {
    counter: Arc<ConnectionCounter>,
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.counter.subtract();
    }
}
