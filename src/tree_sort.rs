// Chunk: docs/chunks/explorer_sync - Sibling sort strategies
//!
//! Sibling ordering for the explorer tree.
//!
//! The tree hands every pair of siblings to [`TreeSorter::compare`]; which
//! comparison actually runs is selected by the current [`SortState`]. The
//! strategies:
//!
//! - `Default`: directories before files, then by name. This is the tree's
//!   baseline and defines its own direction: the reversal flag does not
//!   apply to it.
//! - `Alphabetic`, `CreationTime`, `ModificationTime`: compare the named
//!   attribute with name tie-breaks; the direction flag flips the result.
//! - `Custom`: ranks siblings by their index in the persisted order for
//!   their parent directory (see [`CustomOrderStore`]); names missing from
//!   the stored order rank after all known names, alphabetically among
//!   themselves.
//!
//! For any fixed state, `compare` is a strict weak ordering, so it is safe
//! to feed to a stable sort. State changes replace the whole `SortState` at
//! once; a comparison never observes half of a switch.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use crate::custom_order::CustomOrderStore;

/// The comparison strategy in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortType {
    Default,
    Alphabetic,
    CreationTime,
    ModificationTime,
    Custom,
}

impl SortType {
    /// Parses the settings-file value for the sort type.
    pub fn from_config_value(value: &str) -> Option<Self> {
        match value {
            "default" => Some(SortType::Default),
            "alphabetic" => Some(SortType::Alphabetic),
            "creationTime" => Some(SortType::CreationTime),
            "modificationTime" => Some(SortType::ModificationTime),
            "custom" => Some(SortType::Custom),
            _ => None,
        }
    }
}

/// Whether the selected strategy runs forward or reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// The full sorter configuration: strategy plus direction.
///
/// `Copy`, so switches replace the whole value — type and direction are
/// never visible half-updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub sort_type: SortType,
    pub direction: SortDirection,
}

impl Default for SortState {
    fn default() -> Self {
        Self {
            sort_type: SortType::Default,
            direction: SortDirection::Ascending,
        }
    }
}

/// Snapshot of one tree entry, as much as a comparison needs.
#[derive(Debug, Clone)]
pub struct TreeItem {
    /// Absolute path of the entry.
    pub path: PathBuf,
    /// The entry's own name (last path segment).
    pub name: String,
    /// Whether this is a directory.
    pub is_dir: bool,
    /// Creation time, if the filesystem reports one.
    pub created: Option<SystemTime>,
    /// Last modification time, if readable.
    pub modified: Option<SystemTime>,
}

impl TreeItem {
    /// Builds an item with no timestamp metadata.
    pub fn new(path: impl Into<PathBuf>, is_dir: bool) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            name,
            is_dir,
            created: None,
            modified: None,
        }
    }

    /// Builds an item by reading metadata from disk.
    ///
    /// Unreadable metadata degrades to `None` timestamps and a non-directory
    /// entry rather than failing; such items simply rank after entries with
    /// known attributes under the time-based strategies.
    pub fn from_path(path: &Path) -> Self {
        let metadata = fs::metadata(path).ok();
        let mut item = Self::new(
            path,
            metadata.as_ref().map(|m| m.is_dir()).unwrap_or(false),
        );
        item.created = metadata.as_ref().and_then(|m| m.created().ok());
        item.modified = metadata.and_then(|m| m.modified().ok());
        item
    }
}

/// Selects and applies the sibling comparison strategy.
pub struct TreeSorter {
    state: SortState,
    orders: Arc<CustomOrderStore>,
}

impl TreeSorter {
    pub fn new(state: SortState, orders: Arc<CustomOrderStore>) -> Self {
        Self { state, orders }
    }

    pub fn state(&self) -> SortState {
        self.state
    }

    /// Switches the strategy, keeping the direction.
    pub fn set_type(&mut self, sort_type: SortType) {
        self.state = SortState {
            sort_type,
            direction: self.state.direction,
        };
    }

    /// Switches the direction, keeping the strategy.
    pub fn set_direction(&mut self, direction: SortDirection) {
        self.state = SortState {
            sort_type: self.state.sort_type,
            direction,
        };
    }

    /// Switches both at once.
    pub fn switch_to(&mut self, sort_type: SortType, direction: SortDirection) {
        self.state = SortState {
            sort_type,
            direction,
        };
    }

    /// Three-way sibling comparison under the current state.
    pub fn compare(&self, a: &TreeItem, b: &TreeItem) -> Ordering {
        let forward = match self.state.sort_type {
            SortType::Default => return default_compare(a, b),
            SortType::Alphabetic => name_compare(a, b),
            SortType::CreationTime => {
                timestamp_compare(a.created, b.created).then_with(|| name_compare(a, b))
            }
            SortType::ModificationTime => {
                timestamp_compare(a.modified, b.modified).then_with(|| name_compare(a, b))
            }
            SortType::Custom => self.custom_compare(a, b),
        };

        match self.state.direction {
            SortDirection::Ascending => forward,
            SortDirection::Descending => forward.reverse(),
        }
    }

    /// Ranks by stored index; names absent from the stored order rank after
    /// all known names, alphabetically among themselves.
    fn custom_compare(&self, a: &TreeItem, b: &TreeItem) -> Ordering {
        // Siblings share a parent; fall back to b's in case a sits at the
        // filesystem root.
        let parent = a.path.parent().or_else(|| b.path.parent());
        let order = parent.and_then(|dir| self.orders.get_order(dir));

        let rank = |item: &TreeItem| -> Option<usize> {
            let policy = self.orders.policy();
            order
                .as_deref()?
                .iter()
                .position(|name| policy.names_equal(name, &item.name))
        };

        match (rank(a), rank(b)) {
            (Some(left), Some(right)) => left.cmp(&right).then_with(|| name_compare(a, b)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => name_compare(a, b),
        }
    }
}

/// Baseline comparison: directories first, then name ascending.
fn default_compare(a: &TreeItem, b: &TreeItem) -> Ordering {
    match (a.is_dir, b.is_dir) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => name_compare(a, b),
    }
}

/// Case-insensitive name comparison with an exact tie-break, so equal-
/// ignoring-case names still order deterministically.
fn name_compare(a: &TreeItem, b: &TreeItem) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.name.cmp(&b.name))
}

/// Unknown timestamps rank after known ones (before any direction flip).
fn timestamp_compare(a: Option<SystemTime>, b: Option<SystemTime>) -> Ordering {
    match (a, b) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custom_order::OrderStorage;
    use crate::path_matcher::CasingPolicy;
    use std::collections::HashMap;
    use std::io;
    use std::sync::Mutex;
    use std::time::Duration;

    struct MemoryStorage {
        records: Mutex<HashMap<String, Vec<String>>>,
    }

    impl MemoryStorage {
        fn empty() -> Arc<Self> {
            Arc::new(Self {
                records: Mutex::new(HashMap::new()),
            })
        }
    }

    impl OrderStorage for MemoryStorage {
        fn load(&self, key: &str) -> io::Result<Option<Vec<String>>> {
            Ok(self.records.lock().unwrap().get(key).cloned())
        }

        fn store(&self, key: &str, order: &[String]) -> io::Result<()> {
            self.records
                .lock()
                .unwrap()
                .insert(key.to_string(), order.to_vec());
            Ok(())
        }

        fn remove(&self, key: &str) -> io::Result<()> {
            self.records.lock().unwrap().remove(key);
            Ok(())
        }
    }

    fn sorter(state: SortState) -> TreeSorter {
        let orders = Arc::new(CustomOrderStore::new(
            MemoryStorage::empty(),
            CasingPolicy::Sensitive,
        ));
        TreeSorter::new(state, orders)
    }

    fn file(path: &str) -> TreeItem {
        TreeItem::new(path, false)
    }

    fn dir(path: &str) -> TreeItem {
        TreeItem::new(path, true)
    }

    fn state(sort_type: SortType, direction: SortDirection) -> SortState {
        SortState {
            sort_type,
            direction,
        }
    }

    #[test]
    fn test_default_puts_directories_before_files() {
        let sorter = sorter(SortState::default());
        assert_eq!(
            sorter.compare(&dir("/d/sub"), &file("/d/aaa.txt")),
            Ordering::Less
        );
        assert_eq!(
            sorter.compare(&file("/d/aaa.txt"), &dir("/d/sub")),
            Ordering::Greater
        );
    }

    #[test]
    fn test_default_ignores_direction_flag() {
        let descending = sorter(state(SortType::Default, SortDirection::Descending));
        assert_eq!(
            descending.compare(&dir("/d/sub"), &file("/d/aaa.txt")),
            Ordering::Less
        );
        assert_eq!(
            descending.compare(&file("/d/a.txt"), &file("/d/b.txt")),
            Ordering::Less
        );
    }

    #[test]
    fn test_alphabetic_is_case_insensitive_with_deterministic_ties() {
        let sorter = sorter(state(SortType::Alphabetic, SortDirection::Ascending));
        assert_eq!(
            sorter.compare(&file("/d/Apple"), &file("/d/banana")),
            Ordering::Less
        );
        // Same letters, different case: still a stable, deterministic order
        assert_ne!(
            sorter.compare(&file("/d/readme"), &file("/d/README")),
            Ordering::Equal
        );
    }

    #[test]
    fn test_descending_flips_alphabetic() {
        let sorter = sorter(state(SortType::Alphabetic, SortDirection::Descending));
        assert_eq!(
            sorter.compare(&file("/d/a.txt"), &file("/d/b.txt")),
            Ordering::Greater
        );
    }

    #[test]
    fn test_modification_time_orders_by_timestamp_then_name() {
        let sorter = sorter(state(SortType::ModificationTime, SortDirection::Ascending));
        let earlier = SystemTime::UNIX_EPOCH + Duration::from_secs(100);
        let later = SystemTime::UNIX_EPOCH + Duration::from_secs(200);

        let mut old = file("/d/old.txt");
        old.modified = Some(earlier);
        let mut new = file("/d/new.txt");
        new.modified = Some(later);

        assert_eq!(sorter.compare(&old, &new), Ordering::Less);

        let mut tied_a = file("/d/a.txt");
        tied_a.modified = Some(earlier);
        let mut tied_b = file("/d/b.txt");
        tied_b.modified = Some(earlier);
        assert_eq!(sorter.compare(&tied_a, &tied_b), Ordering::Less);
    }

    #[test]
    fn test_unknown_timestamps_rank_last() {
        let sorter = sorter(state(SortType::CreationTime, SortDirection::Ascending));
        let mut known = file("/d/known.txt");
        known.created = Some(SystemTime::UNIX_EPOCH);
        let unknown = file("/d/unknown.txt");

        assert_eq!(sorter.compare(&known, &unknown), Ordering::Less);
        assert_eq!(sorter.compare(&unknown, &known), Ordering::Greater);
    }

    #[test]
    fn test_custom_ranks_by_stored_order() {
        let orders = Arc::new(CustomOrderStore::new(
            MemoryStorage::empty(),
            CasingPolicy::Sensitive,
        ));
        orders
            .set_order(
                Path::new("/d"),
                vec!["b".to_string(), "a".to_string(), "c".to_string()],
            )
            .unwrap();
        let sorter = TreeSorter::new(state(SortType::Custom, SortDirection::Ascending), orders);

        // Stored order is b, a, c: /d/b sorts before /d/a
        assert_eq!(sorter.compare(&file("/d/b"), &file("/d/a")), Ordering::Less);
        assert_eq!(sorter.compare(&file("/d/a"), &file("/d/b")), Ordering::Greater);

        // /d/z is not in the stored order: after both known items
        assert_eq!(sorter.compare(&file("/d/z"), &file("/d/a")), Ordering::Greater);
        assert_eq!(sorter.compare(&file("/d/z"), &file("/d/b")), Ordering::Greater);
    }

    #[test]
    fn test_custom_unknown_items_order_by_name() {
        let orders = Arc::new(CustomOrderStore::new(
            MemoryStorage::empty(),
            CasingPolicy::Sensitive,
        ));
        orders
            .set_order(Path::new("/d"), vec!["pinned".to_string()])
            .unwrap();
        let sorter = TreeSorter::new(state(SortType::Custom, SortDirection::Ascending), orders);

        assert_eq!(
            sorter.compare(&file("/d/alpha"), &file("/d/beta")),
            Ordering::Less
        );
    }

    #[test]
    fn test_custom_without_stored_order_falls_back_to_name() {
        let sorter = sorter(state(SortType::Custom, SortDirection::Ascending));
        assert_eq!(
            sorter.compare(&file("/d/a.txt"), &file("/d/b.txt")),
            Ordering::Less
        );
    }

    #[test]
    fn test_switches_replace_whole_state() {
        let mut sorter = sorter(SortState::default());

        sorter.set_type(SortType::Alphabetic);
        assert_eq!(
            sorter.state(),
            state(SortType::Alphabetic, SortDirection::Ascending)
        );

        sorter.set_direction(SortDirection::Descending);
        assert_eq!(
            sorter.state(),
            state(SortType::Alphabetic, SortDirection::Descending)
        );

        sorter.switch_to(SortType::Custom, SortDirection::Ascending);
        assert_eq!(
            sorter.state(),
            state(SortType::Custom, SortDirection::Ascending)
        );
    }

    #[test]
    fn test_compare_is_antisymmetric() {
        let sorter = sorter(state(SortType::Alphabetic, SortDirection::Ascending));
        let a = file("/d/a.txt");
        let b = file("/d/b.txt");

        assert_eq!(sorter.compare(&a, &b), sorter.compare(&b, &a).reverse());
        assert_eq!(sorter.compare(&a, &a), Ordering::Equal);
    }

    #[test]
    fn test_sort_type_config_values() {
        assert_eq!(SortType::from_config_value("default"), Some(SortType::Default));
        assert_eq!(
            SortType::from_config_value("alphabetic"),
            Some(SortType::Alphabetic)
        );
        assert_eq!(
            SortType::from_config_value("creationTime"),
            Some(SortType::CreationTime)
        );
        assert_eq!(
            SortType::from_config_value("modificationTime"),
            Some(SortType::ModificationTime)
        );
        assert_eq!(SortType::from_config_value("custom"), Some(SortType::Custom));
        assert_eq!(SortType::from_config_value("bogus"), None);
    }

    #[test]
    fn test_tree_item_from_path_reads_metadata() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("note.md");
        fs::write(&path, "hello").unwrap();

        let item = TreeItem::from_path(&path);
        assert_eq!(item.name, "note.md");
        assert!(!item.is_dir);
        assert!(item.modified.is_some());

        let dir_item = TreeItem::from_path(dir.path());
        assert!(dir_item.is_dir);
    }
}
