// Chunk: docs/chunks/explorer_sync - Self-write suppression
//!
//! Self-write suppression for watcher change records.
//!
//! When the application itself writes inside the watched root (saving a
//! file, persisting metadata), the filesystem watcher echoes that write back
//! and would trigger a pointless tree refresh. Callers mark a path with
//! `suppress()` immediately before writing; the next record for that path is
//! dropped from the incoming batch.
//!
//! Suppression is time-limited: if no record arrives within the TTL
//! (default: 1 second), the entry expires so stale suppressions never mask
//! legitimate external edits. Entries are one-shot — a single suppression
//! absorbs a single record.
//!
//! Entries are keyed by the shared casing policy, so on a case-insensitive
//! filesystem a record reported with different casing than the write still
//! hits the suppression.

use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::change_set::ChangeBatch;
use crate::path_matcher::CasingPolicy;

/// Default suppression TTL in milliseconds.
pub const DEFAULT_SUPPRESSION_TTL_MS: u64 = 1000;

/// Registry of paths whose next change record should be dropped.
pub struct WriteSuppression {
    /// Map from normalized path key to suppression expiry time.
    suppressions: HashMap<String, Instant>,
    /// TTL for suppression entries.
    ttl: Duration,
    /// Casing policy used to build lookup keys.
    policy: CasingPolicy,
}

impl WriteSuppression {
    /// Creates a registry with the default TTL (1 second).
    pub fn new(policy: CasingPolicy) -> Self {
        Self::with_ttl(policy, DEFAULT_SUPPRESSION_TTL_MS)
    }

    /// Creates a registry with a custom TTL.
    pub fn with_ttl(policy: CasingPolicy, ttl_ms: u64) -> Self {
        Self {
            suppressions: HashMap::new(),
            ttl: Duration::from_millis(ttl_ms),
            policy,
        }
    }

    /// Marks a path for suppression. Call immediately before writing.
    pub fn suppress(&mut self, path: &Path, now: Instant) {
        self.suppressions
            .insert(self.policy.normalized_key(path), now + self.ttl);
    }

    /// Checks whether a record for `path` should be dropped.
    ///
    /// One-shot: a hit consumes the suppression entry. Expired entries are
    /// cleaned up opportunistically.
    pub fn check(&mut self, path: &Path, now: Instant) -> bool {
        self.suppressions.retain(|_, expiry| now < *expiry);

        match self.suppressions.remove(&self.policy.normalized_key(path)) {
            Some(expiry) => now < expiry,
            None => false,
        }
    }

    /// Drops suppressed records from `batch` in place.
    pub fn filter_batch(&mut self, batch: &mut ChangeBatch, now: Instant) {
        if self.suppressions.is_empty() {
            return;
        }
        batch.retain(|record| !self.check(&record.path, now));
    }

    /// Number of active (non-expired) suppression entries.
    pub fn active_count(&self, now: Instant) -> usize {
        self.suppressions
            .values()
            .filter(|&&expiry| now < expiry)
            .count()
    }
}
