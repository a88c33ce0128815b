// Chunk: docs/chunks/explorer_sync - Watch subscription provider
//!
//! The watch subscription boundary.
//!
//! `TreeSyncService` never talks to the platform watcher directly; it is
//! handed a [`WatchProvider`] at construction, which lets tests substitute a
//! scripted double and keeps the notify-specific event translation in one
//! place.
//!
//! The real provider wraps `notify`'s `RecommendedWatcher` (FSEvents on
//! macOS, inotify on Linux). Raw `notify` events are translated into
//! [`ChangeBatch`]es and pushed onto an mpsc channel; the service's
//! processing thread drains that channel. A subscription is released by
//! dropping it — the watcher is owned by the subscription guard, the same
//! ownership shape the rest of the editor uses for its per-buffer watchers.

use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::change_set::{ChangeBatch, ChangeKind, RawChange};

/// A watch could not be established.
///
/// Fatal to `TreeSyncService::init`: the message is human-readable and meant
/// to be surfaced by the caller's notification layer.
#[derive(Debug)]
pub struct WatchError {
    /// The root that could not be watched.
    pub path: PathBuf,
    /// Human-readable description of the failure.
    pub message: String,
}

impl WatchError {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for WatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot watch {}: {}", self.path.display(), self.message)
    }
}

impl std::error::Error for WatchError {}

/// An owned, cancelable watch subscription.
///
/// Holds whatever the provider needs kept alive for events to keep flowing;
/// dropping the subscription releases the watch.
pub struct WatchSubscription {
    _guard: Box<dyn Any + Send>,
}

impl std::fmt::Debug for WatchSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSubscription").finish()
    }
}

impl WatchSubscription {
    /// Wraps a provider-specific guard object.
    pub fn new(guard: impl Any + Send) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }
}

/// Supplies recursive watch subscriptions for a root directory.
pub trait WatchProvider {
    /// Begins watching `root` recursively, delivering change batches on
    /// `batches` until the returned subscription is dropped.
    fn watch(&self, root: &Path, batches: Sender<ChangeBatch>)
        -> Result<WatchSubscription, WatchError>;
}

/// The production provider, backed by `notify`.
pub struct NotifyWatchProvider;

impl WatchProvider for NotifyWatchProvider {
    fn watch(
        &self,
        root: &Path,
        batches: Sender<ChangeBatch>,
    ) -> Result<WatchSubscription, WatchError> {
        // notify reports a missing root asynchronously on some platforms;
        // checking up front gives the caller a deterministic error.
        if !root.is_dir() {
            return Err(WatchError::new(root, "not a directory"));
        }

        let mut watcher = RecommendedWatcher::new(
            move |result: Result<Event, notify::Error>| {
                if let Ok(event) = result {
                    let batch = batch_from_event(&event);
                    if !batch.is_empty() {
                        let _ = batches.send(batch);
                    }
                }
            },
            Config::default(),
        )
        .map_err(|e| WatchError::new(root, format!("failed to create watcher: {}", e)))?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::new(root, format!("failed to watch directory: {}", e)))?;

        Ok(WatchSubscription::new(watcher))
    }
}

/// Translates one raw `notify` event into a change batch.
///
/// Renames become a delete of the old path and an add of the new one, so
/// downstream consumers only ever see the three tree-level kinds. Access
/// events and other noise produce an empty batch.
fn batch_from_event(event: &Event) -> ChangeBatch {
    let mut batch = ChangeBatch::new();

    match event.kind {
        EventKind::Create(_) => {
            for path in &event.paths {
                batch.push(RawChange::new(path.clone(), ChangeKind::Added));
            }
        }
        EventKind::Remove(_) => {
            for path in &event.paths {
                batch.push(RawChange::new(path.clone(), ChangeKind::Deleted));
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            // paths[0] is the old name, paths[1] the new one
            if let Some(from) = event.paths.first() {
                batch.push(RawChange::new(from.clone(), ChangeKind::Deleted));
            }
            if let Some(to) = event.paths.get(1) {
                batch.push(RawChange::new(to.clone(), ChangeKind::Added));
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            for path in &event.paths {
                batch.push(RawChange::new(path.clone(), ChangeKind::Deleted));
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            for path in &event.paths {
                batch.push(RawChange::new(path.clone(), ChangeKind::Added));
            }
        }
        EventKind::Modify(_) => {
            for path in &event.paths {
                batch.push(RawChange::new(path.clone(), ChangeKind::Updated));
            }
        }
        // Access events and anything else notify may grow are noise here
        _ => {}
    }

    batch
}
