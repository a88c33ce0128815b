// Chunk: docs/chunks/explorer_sync - Change batches and affect queries
//!
//! Raw filesystem change records, batches, and the queries the tree runs
//! against them.
//!
//! The watcher delivers noisy, possibly-redundant records. This module does
//! not try to clean them up — it wraps a batch together with the casing
//! policy that was in effect when the batch arrived and answers two
//! questions:
//!
//! - `matches`: did this exact path change?
//! - `affects`: did anything change that the subtree rooted at this path
//!   cares about? (the path itself, anything under it, or any ancestor)
//!
//! Both queries are order- and duplicate-insensitive, so batches are kept as
//! plain record sequences in arrival order.

use std::path::{Path, PathBuf};

use crate::path_matcher::CasingPolicy;

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Added,
    Deleted,
    Updated,
}

impl ChangeKind {
    /// All three kinds, for "did anything at all happen" queries.
    pub const ALL: [ChangeKind; 3] = [ChangeKind::Added, ChangeKind::Deleted, ChangeKind::Updated];
}

/// A single immutable change record as reported by the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChange {
    /// Absolute path the change was reported for.
    pub path: PathBuf,
    /// The kind of change.
    pub kind: ChangeKind,
}

impl RawChange {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// An ordered batch of change records with derived per-kind flags.
///
/// The flags are maintained exclusively by the mutating methods here, so
/// each is true iff at least one record of that kind is present. Arrival
/// order of records is preserved (useful for diagnostics; the queries above
/// don't depend on it).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    records: Vec<RawChange>,
    any_added: bool,
    any_deleted: bool,
    any_updated: bool,
}

impl ChangeBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a batch from a record sequence, deriving the kind flags.
    pub fn from_records(records: Vec<RawChange>) -> Self {
        let mut batch = Self::new();
        for record in records {
            batch.push(record);
        }
        batch
    }

    /// Appends one record, updating the derived flags.
    pub fn push(&mut self, record: RawChange) {
        match record.kind {
            ChangeKind::Added => self.any_added = true,
            ChangeKind::Deleted => self.any_deleted = true,
            ChangeKind::Updated => self.any_updated = true,
        }
        self.records.push(record);
    }

    /// Appends all of `other`'s records after this batch's, preserving both
    /// arrival orders.
    pub fn merge(&mut self, other: ChangeBatch) {
        self.any_added |= other.any_added;
        self.any_deleted |= other.any_deleted;
        self.any_updated |= other.any_updated;
        self.records.extend(other.records);
    }

    /// Keeps only the records for which `keep` returns true, re-deriving the
    /// kind flags from the survivors.
    pub fn retain(&mut self, keep: impl FnMut(&RawChange) -> bool) {
        self.records.retain(keep);
        self.any_added = self.records.iter().any(|r| r.kind == ChangeKind::Added);
        self.any_deleted = self.records.iter().any(|r| r.kind == ChangeKind::Deleted);
        self.any_updated = self.records.iter().any(|r| r.kind == ChangeKind::Updated);
    }

    pub fn records(&self) -> &[RawChange] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn any_added(&self) -> bool {
        self.any_added
    }

    pub fn any_deleted(&self) -> bool {
        self.any_deleted
    }

    pub fn any_updated(&self) -> bool {
        self.any_updated
    }
}

impl FromIterator<RawChange> for ChangeBatch {
    fn from_iter<I: IntoIterator<Item = RawChange>>(iter: I) -> Self {
        Self::from_records(iter.into_iter().collect())
    }
}

/// A change batch frozen together with the casing policy in effect when it
/// arrived.
///
/// The policy is captured once at construction and never re-derived per
/// query; a policy change mid-batch (e.g. reopening a root on a different
/// volume) cannot retroactively reinterpret records.
#[derive(Debug)]
pub struct ChangeEventSet {
    batch: ChangeBatch,
    policy: CasingPolicy,
}

impl ChangeEventSet {
    pub fn new(batch: ChangeBatch, policy: CasingPolicy) -> Self {
        Self { batch, policy }
    }

    /// Returns true iff some record's path is exactly equal to `path` (under
    /// the frozen casing policy) and its kind is in `kinds`.
    ///
    /// An empty batch or an empty `kinds` set matches nothing.
    pub fn matches(&self, path: &Path, kinds: &[ChangeKind]) -> bool {
        self.batch
            .records
            .iter()
            .any(|record| kinds.contains(&record.kind) && self.policy.paths_equal(&record.path, path))
    }

    /// Returns true iff some record with a kind in `kinds` touches `path`:
    /// the record path equals the query, or either is an ancestor of the
    /// other.
    ///
    /// This is a superset of `matches` — a change to `/a/b.txt` affects both
    /// the parent `/a` (its listing changed) and any queried descendant
    /// `/a/b.txt/sub` (its subtree root changed).
    pub fn affects(&self, path: &Path, kinds: &[ChangeKind]) -> bool {
        self.batch.records.iter().any(|record| {
            kinds.contains(&record.kind)
                && (self.policy.is_ancestor_or_self(path, &record.path)
                    || self.policy.is_ancestor_or_self(&record.path, path))
        })
    }

    pub fn batch(&self) -> &ChangeBatch {
        &self.batch
    }

    pub fn policy(&self) -> CasingPolicy {
        self.policy
    }
}
