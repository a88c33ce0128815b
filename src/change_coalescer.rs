// Chunk: docs/chunks/explorer_sync - Change coalescing
//!
//! Debounce scheduler for tree-refresh reactions.
//!
//! Bursts of filesystem events (a `git checkout`, a bulk export) would
//! otherwise trigger one refresh per batch and thrash the tree. The
//! coalescer accumulates scheduled pieces into a single pending aggregate
//! and only releases it once a quiet window has elapsed with no further
//! arrivals — last write wins, not a fixed-interval cadence.
//!
//! This is a pure data structure with no I/O or timers of its own. The
//! caller injects `Instant`s, making it easy to test with a fake clock,
//! and drives release timing via `deadline()`.

use std::time::{Duration, Instant};

use crate::change_set::ChangeBatch;

/// Default quiet window in milliseconds.
pub const DEFAULT_QUIET_WINDOW_MS: u64 = 100;

struct Pending {
    aggregate: ChangeBatch,
    deadline: Instant,
}

/// Accumulates change batches and releases one aggregate per quiet period.
///
/// States: idle (nothing pending) and pending (aggregate + deadline). Every
/// `schedule` call pushes the deadline out to `now + quiet_window`; the
/// aggregate becomes ready only when the deadline passes with no further
/// scheduling.
pub struct ChangeCoalescer {
    pending: Option<Pending>,
    quiet_window: Duration,
}

impl ChangeCoalescer {
    /// Creates a coalescer with the given quiet window.
    pub fn new(quiet_window_ms: u64) -> Self {
        Self {
            pending: None,
            quiet_window: Duration::from_millis(quiet_window_ms),
        }
    }

    /// Creates a coalescer with the default quiet window (100ms).
    pub fn with_default() -> Self {
        Self::new(DEFAULT_QUIET_WINDOW_MS)
    }

    /// Merges `piece` into the pending aggregate and resets the quiet-window
    /// timer.
    ///
    /// Always succeeds and never blocks. Record arrival order is preserved
    /// across pieces.
    pub fn schedule(&mut self, piece: ChangeBatch, now: Instant) {
        let deadline = now + self.quiet_window;
        match &mut self.pending {
            Some(pending) => {
                pending.aggregate.merge(piece);
                pending.deadline = deadline;
            }
            None => {
                self.pending = Some(Pending {
                    aggregate: piece,
                    deadline,
                });
            }
        }
    }

    /// Releases the pending aggregate if its quiet window has elapsed.
    ///
    /// Returns the union of everything scheduled since the last release, at
    /// most once per quiet period; the pending state is cleared on release.
    pub fn take_ready(&mut self, now: Instant) -> Option<ChangeBatch> {
        let ready = matches!(&self.pending, Some(pending) if now >= pending.deadline);
        if ready {
            self.pending.take().map(|pending| pending.aggregate)
        } else {
            None
        }
    }

    /// The instant the pending aggregate becomes ready, if one is pending.
    ///
    /// Drive loops use this to compute their receive timeout instead of
    /// polling at a fixed interval.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.deadline)
    }

    /// Returns true while an aggregate is waiting for its quiet window.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Discards any pending un-released aggregate.
    ///
    /// Disposal path: after this, nothing fires until `schedule` is called
    /// again.
    pub fn clear(&mut self) {
        self.pending = None;
    }
}
