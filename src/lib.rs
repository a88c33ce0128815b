// Chunk: docs/chunks/explorer_sync - Explorer/file-tree synchronization subsystem
// Chunk: docs/chunks/custom_sibling_order - Persisted per-directory ordering

//! lite-edit-explorer: file-tree synchronization for the explorer sidebar.
//!
//! This crate keeps an in-memory file tree in step with a directory subtree
//! on disk. It watches the root, absorbs batched (and noisy) filesystem
//! change notifications, and decides when the tree-rendering layer should
//! refresh, coalescing bursts so a `git checkout` is one refresh, not five
//! hundred.
//!
//! # Overview
//!
//! The pipeline, bottom up:
//!
//! - [`CasingPolicy`]: segment-wise path equality and ancestor checks under
//!   the active filesystem's casing regime.
//! - [`ChangeBatch`] / [`ChangeEventSet`]: a batch of raw change records
//!   plus the "does this batch match/affect path P" queries.
//! - [`ChangeCoalescer`]: the debounce state machine that delays refresh
//!   reactions until a quiet period elapses.
//! - [`WriteSuppression`]: drops the watcher's echo of the application's
//!   own writes.
//! - [`TreeSyncService`]: owns the watch subscription and the processing
//!   thread, and fires the injected refresh callback.
//!
//! Sibling ordering during a refresh is a separate concern: [`TreeSorter`]
//! selects among the default, alphabetic, timestamp, and custom strategies,
//! consulting [`CustomOrderStore`] for user-defined per-directory orders.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use lite_edit_explorer::{
//!     CasingPolicy, ChangeBatch, ChangeEventSet, ChangeKind, RawChange,
//! };
//!
//! let batch = ChangeBatch::from_records(vec![
//!     RawChange::new("/workspace/notes/todo.md", ChangeKind::Updated),
//! ]);
//! let set = ChangeEventSet::new(batch, CasingPolicy::Sensitive);
//!
//! // The exact file matches; the parent directory is affected but does
//! // not match.
//! assert!(set.matches(Path::new("/workspace/notes/todo.md"), &[ChangeKind::Updated]));
//! assert!(!set.matches(Path::new("/workspace/notes"), &[ChangeKind::Updated]));
//! assert!(set.affects(Path::new("/workspace/notes"), &ChangeKind::ALL));
//! ```

mod change_coalescer;
mod change_set;
mod change_suppression;
mod custom_order;
mod path_matcher;
mod settings;
mod tree_sort;
mod tree_sync;
mod watch;

pub use change_coalescer::{ChangeCoalescer, DEFAULT_QUIET_WINDOW_MS};
pub use change_set::{ChangeBatch, ChangeEventSet, ChangeKind, RawChange};
pub use change_suppression::{WriteSuppression, DEFAULT_SUPPRESSION_TTL_MS};
pub use custom_order::{
    CustomOrderStore, JsonOrderStorage, OrderStorage, PersistErrorCallback, PersistenceError,
};
pub use path_matcher::CasingPolicy;
pub use settings::{settings_file_path, Settings, SORT_DIRECTION_KEY, SORT_TYPE_KEY};
pub use tree_sort::{SortDirection, SortState, SortType, TreeItem, TreeSorter};
pub use tree_sync::{RefreshCallback, ServiceState, SyncError, TreeSyncService};
pub use watch::{NotifyWatchProvider, WatchError, WatchProvider, WatchSubscription};
