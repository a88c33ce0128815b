// Chunk: docs/chunks/explorer_sync - Casing-aware path comparison
//!
//! Casing-aware path comparison primitives.
//!
//! Every other part of the explorer subsystem compares paths through this
//! module so that a single casing policy, chosen once for the active
//! filesystem, governs equality, prefix containment, and lookup keys.
//!
//! Comparison is segment-wise over normalized `std::path::Component`s rather
//! than byte-wise over strings. Byte-wise prefix checks would claim that
//! `/a/bc` lives under `/a/b`; segment-wise comparison does not.

use std::borrow::Cow;
use std::path::{Component, Path};

/// Whether path comparisons on the active filesystem ignore letter case.
///
/// Chosen once (typically at service construction) and shared by the change
/// set, the custom-order store, and self-write suppression so they all agree
/// on which paths are "the same".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasingPolicy {
    /// Segment comparison is exact (e.g. ext4).
    Sensitive,
    /// Segments are lower-cased with the locale-invariant Unicode mapping
    /// before comparing (e.g. APFS, NTFS defaults).
    Insensitive,
}

impl CasingPolicy {
    /// Maps the conventional `ignore_casing` flag onto a policy.
    pub fn for_ignore_casing(ignore_casing: bool) -> Self {
        if ignore_casing {
            CasingPolicy::Insensitive
        } else {
            CasingPolicy::Sensitive
        }
    }

    /// Returns true when the two paths have identical normalized segment
    /// sequences under this policy.
    pub fn paths_equal(self, a: &Path, b: &Path) -> bool {
        let mut left = segments(a);
        let mut right = segments(b);

        loop {
            match (left.next(), right.next()) {
                (Some(l), Some(r)) => {
                    if !self.segment_eq(&l, &r) {
                        return false;
                    }
                }
                (None, None) => return true,
                _ => return false,
            }
        }
    }

    /// Returns true when `ancestor`'s segment sequence is a prefix of
    /// `target`'s, or the two are equal.
    ///
    /// Case folding applies uniformly to every segment of both paths — never
    /// selectively per segment.
    pub fn is_ancestor_or_self(self, ancestor: &Path, target: &Path) -> bool {
        let mut target_segments = segments(target);

        for ancestor_segment in segments(ancestor) {
            match target_segments.next() {
                Some(target_segment) => {
                    if !self.segment_eq(&ancestor_segment, &target_segment) {
                        return false;
                    }
                }
                // Ancestor is longer than target
                None => return false,
            }
        }

        true
    }

    /// Builds the canonical lookup key for `path` under this policy.
    ///
    /// Directories that differ only in case on a case-insensitive filesystem
    /// produce the same key, so keyed stores (custom orders, suppression
    /// entries) resolve them to one record.
    pub fn normalized_key(self, path: &Path) -> String {
        let mut key = String::new();
        for segment in segments(path) {
            // The root segment is "/" itself; joining it with a separator
            // would double the slash.
            if segment != "/" && !key.is_empty() && !key.ends_with('/') {
                key.push('/');
            }
            key.push_str(&segment);
        }

        match self {
            CasingPolicy::Sensitive => key,
            CasingPolicy::Insensitive => key.to_lowercase(),
        }
    }

    /// Compares two bare names (single segments) under this policy.
    ///
    /// Used wherever child names rather than full paths are compared, e.g.
    /// matching a sibling against a stored custom order.
    pub fn names_equal(self, a: &str, b: &str) -> bool {
        self.segment_eq(a, b)
    }

    fn segment_eq(self, a: &str, b: &str) -> bool {
        match self {
            CasingPolicy::Sensitive => a == b,
            CasingPolicy::Insensitive => {
                a == b || a.to_lowercase() == b.to_lowercase()
            }
        }
    }
}

/// Iterates the normalized segments of a path.
///
/// `CurDir` components are dropped (they never change identity); the root
/// and prefix components are kept as segments so an absolute path can never
/// equal a relative one with the same names.
fn segments(path: &Path) -> impl Iterator<Item = Cow<'_, str>> {
    path.components().filter_map(|component| match component {
        Component::CurDir => None,
        Component::RootDir => Some(Cow::Borrowed("/")),
        Component::ParentDir => Some(Cow::Borrowed("..")),
        Component::Prefix(prefix) => Some(prefix.as_os_str().to_string_lossy()),
        Component::Normal(segment) => Some(segment.to_string_lossy()),
    })
}
