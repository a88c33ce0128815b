// Chunk: docs/chunks/explorer_sync - Tree synchronization service
//!
//! Top-level orchestrator for explorer/file-tree synchronization.
//!
//! `TreeSyncService` owns the watch subscription for one root directory and
//! the processing thread that reacts to its changes. Incoming batches flow
//! through self-write suppression into the coalescer; each coalesced
//! aggregate is checked against the watched root (`affects`) and, when it
//! touches the subtree, the injected tree-refresh callback fires.
//!
//! ## Lifecycle
//!
//! `Closed -> Open -> Closed`. Exactly one root may be open per instance;
//! `init` on an open service is a programmer error and leaves the existing
//! watch undisturbed. `close` is idempotent, safe from any state, and
//! synchronously cancels the pending aggregate: the subscription and the
//! processing thread are torn down together, as one bundle, before `close`
//! returns. Dropping the service closes it.
//!
//! ## Threads
//!
//! All service state transitions happen on the caller's thread. The only
//! background work is the processing thread, which owns the coalescer and
//! communicates through channels (batches in, stop signal in, refresh
//! callback out).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::change_coalescer::{ChangeCoalescer, DEFAULT_QUIET_WINDOW_MS};
use crate::change_set::{ChangeBatch, ChangeEventSet, ChangeKind};
use crate::change_suppression::WriteSuppression;
use crate::path_matcher::CasingPolicy;
use crate::watch::{WatchError, WatchProvider, WatchSubscription};

/// Type alias for the tree-refresh callback.
///
/// Owned by the UI layer; the service only ever invokes it. Called from the
/// processing thread on coalesced changes and from the caller's thread on
/// manual `refresh()`.
pub type RefreshCallback = Box<dyn Fn() + Send + Sync>;

/// Errors from opening a root.
#[derive(Debug)]
pub enum SyncError {
    /// `init` was called while a root is already open. The existing watch
    /// is undisturbed.
    AlreadyOpen,
    /// The watch subscription could not be established; the service stays
    /// closed and does not retry.
    Watch(WatchError),
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::AlreadyOpen => write!(f, "a root is already open on this service"),
            SyncError::Watch(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::AlreadyOpen => None,
            SyncError::Watch(e) => Some(e),
        }
    }
}

impl From<WatchError> for SyncError {
    fn from(e: WatchError) -> Self {
        SyncError::Watch(e)
    }
}

/// Observable service state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Closed,
    Open,
}

/// How often the processing thread wakes to poll the stop channel when no
/// deadline is nearer.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Bundles the refresh callback with its generation counter so both sides
/// (manual `refresh()` and the processing thread) fire them together.
#[derive(Clone)]
struct RefreshSignal {
    callback: Arc<RefreshCallback>,
    generation: Arc<AtomicU64>,
}

impl RefreshSignal {
    fn fire(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        (self.callback)();
    }
}

/// The resources acquired by one `init` call, released together on close.
struct OpenRoot {
    root: PathBuf,
    /// Keeps the watch alive; dropped on close.
    _subscription: WatchSubscription,
    stop_tx: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

/// Watches one root directory and drives tree refreshes from its changes.
pub struct TreeSyncService {
    policy: CasingPolicy,
    provider: Box<dyn WatchProvider>,
    /// Refresh callback plus the generation counter the UI polls to learn
    /// whether the tree changed since it last rendered.
    signal: RefreshSignal,
    suppression: Arc<Mutex<WriteSuppression>>,
    quiet_window_ms: u64,
    open: Option<OpenRoot>,
}

impl TreeSyncService {
    /// Creates a closed service with the default quiet window (100ms).
    pub fn new<F>(provider: Box<dyn WatchProvider>, policy: CasingPolicy, on_refresh: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_quiet_window(provider, policy, on_refresh, DEFAULT_QUIET_WINDOW_MS)
    }

    /// Creates a closed service with a custom coalescing quiet window.
    pub fn with_quiet_window<F>(
        provider: Box<dyn WatchProvider>,
        policy: CasingPolicy,
        on_refresh: F,
        quiet_window_ms: u64,
    ) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            policy,
            provider,
            signal: RefreshSignal {
                callback: Arc::new(Box::new(on_refresh)),
                generation: Arc::new(AtomicU64::new(0)),
            },
            suppression: Arc::new(Mutex::new(WriteSuppression::new(policy))),
            quiet_window_ms,
            open: None,
        }
    }

    /// Begins watching `root`.
    ///
    /// Fails with `AlreadyOpen` if a root is open, or `Watch` if the
    /// subscription cannot be established (e.g. the directory is missing);
    /// in both cases the service state is unchanged and nothing is retried.
    pub fn init(&mut self, root: &Path) -> Result<(), SyncError> {
        if self.open.is_some() {
            return Err(SyncError::AlreadyOpen);
        }

        let (batch_tx, batch_rx) = mpsc::channel::<ChangeBatch>();
        let subscription = self.provider.watch(root, batch_tx)?;

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread = spawn_processing_thread(
            root.to_path_buf(),
            self.policy,
            ChangeCoalescer::new(self.quiet_window_ms),
            batch_rx,
            stop_rx,
            Arc::clone(&self.suppression),
            self.signal.clone(),
        );

        self.open = Some(OpenRoot {
            root: root.to_path_buf(),
            _subscription: subscription,
            stop_tx,
            thread: Some(thread),
        });

        Ok(())
    }

    pub fn state(&self) -> ServiceState {
        if self.open.is_some() {
            ServiceState::Open
        } else {
            ServiceState::Closed
        }
    }

    /// The currently watched root, if open.
    pub fn watched_root(&self) -> Option<&Path> {
        self.open.as_ref().map(|open| open.root.as_path())
    }

    /// Forces a tree refresh now, regardless of pending changes.
    ///
    /// No-op when closed. A coalesced aggregate that lands after a manual
    /// refresh is simply re-evaluated and may trigger a further refresh;
    /// manual refreshes are authoritative and idempotent, never "missed".
    pub fn refresh(&self) {
        if self.open.is_none() {
            return;
        }
        self.signal.fire();
    }

    /// Marks `path` as just written by the application itself, so the
    /// watcher's echo of that write does not trigger a refresh.
    pub fn suppress(&self, path: &Path) {
        self.suppression
            .lock()
            .unwrap()
            .suppress(path, Instant::now());
    }

    /// The number of refresh-callback invocations so far.
    pub fn refresh_generation(&self) -> u64 {
        self.signal.generation.load(Ordering::SeqCst)
    }

    /// Stops watching and releases every resource acquired by `init`.
    ///
    /// Idempotent and safe from any state. The pending coalescer aggregate
    /// is discarded: by the time this returns, the processing thread has
    /// exited and no further refresh can fire from it.
    pub fn close(&mut self) {
        let Some(mut open) = self.open.take() else {
            return;
        };

        // Order matters only in that both signals reach the thread: the
        // stop send wakes it, and dropping the subscription disconnects the
        // batch channel.
        let _ = open.stop_tx.send(());
        drop(open._subscription);

        if let Some(thread) = open.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for TreeSyncService {
    fn drop(&mut self) {
        self.close();
    }
}

/// Spawns the thread that turns raw batches into refresh decisions.
///
/// The loop mirrors the editor's other watcher threads: block on the batch
/// channel with a bounded timeout, run the debounce bookkeeping, exit on
/// stop signal or channel disconnect.
fn spawn_processing_thread(
    root: PathBuf,
    policy: CasingPolicy,
    mut coalescer: ChangeCoalescer,
    batch_rx: Receiver<ChangeBatch>,
    stop_rx: Receiver<()>,
    suppression: Arc<Mutex<WriteSuppression>>,
    signal: RefreshSignal,
) -> JoinHandle<()> {
    thread::spawn(move || {
        loop {
            // Check for stop signal (non-blocking)
            if stop_rx.try_recv().is_ok() {
                break;
            }

            // Wait for the next batch, but never past the coalescer's
            // deadline or the stop-poll interval.
            let now = Instant::now();
            let timeout = coalescer
                .deadline()
                .map(|deadline| deadline.saturating_duration_since(now).min(IDLE_POLL))
                .unwrap_or(IDLE_POLL);

            match batch_rx.recv_timeout(timeout) {
                Ok(mut batch) => {
                    let now = Instant::now();
                    suppression.lock().unwrap().filter_batch(&mut batch, now);
                    if !batch.is_empty() {
                        coalescer.schedule(batch, now);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                // Subscription dropped; nothing further can arrive
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if let Some(aggregate) = coalescer.take_ready(Instant::now()) {
                let set = ChangeEventSet::new(aggregate, policy);
                if set.affects(&root, &ChangeKind::ALL) {
                    signal.fire();
                }
            }
        }
    })
}
