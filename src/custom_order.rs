// Chunk: docs/chunks/custom_sibling_order - Persisted per-directory ordering
//!
//! Persisted user-defined sibling ordering.
//!
//! When the user drags explorer entries into a custom arrangement, the
//! ordered list of child names for that directory is recorded here and
//! consulted by the sorter whenever the sort type is `Custom`.
//!
//! ## Durability Model
//!
//! The in-memory cache is authoritative for the UI: `set_order` and
//! `remove_order` update it immediately and the just-performed reorder never
//! visibly reverts. Durable persistence happens on a background worker
//! thread, best-effort; an I/O failure is reported through the error
//! callback (and a warning on stderr) without unwinding the caller.
//!
//! ## Storage Format
//!
//! One JSON array of child-name strings per directory, written through the
//! [`OrderStorage`] trait. The bundled [`JsonOrderStorage`] keeps one file
//! per directory under a configurable root, named by the SHA-256 of the
//! directory's normalized key — lookups stay O(1) per directory and an
//! update never rewrites other directories' records.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::path_matcher::CasingPolicy;

/// Application name used for the default storage directory.
const APP_NAME: &str = "lite-edit";

/// Subdirectory holding one order file per directory.
const ORDER_DIR: &str = "explorer-order";

/// A custom-order read or write failed against durable storage.
///
/// Never fatal: the in-memory order is still authoritative and the caller's
/// control flow is not unwound. Surfacing a retry or warning is the
/// caller's responsibility.
#[derive(Debug)]
pub struct PersistenceError {
    /// Normalized key of the directory whose record was involved.
    pub dir_key: String,
    /// The underlying I/O failure.
    pub source: io::Error,
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to persist custom order for {}: {}",
            self.dir_key, self.source
        )
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Type alias for the persistence error callback.
///
/// Invoked from the persist worker thread (write/remove failures) or from
/// the calling thread (lazy-load failures).
pub type PersistErrorCallback = Box<dyn Fn(PersistenceError) + Send + Sync>;

/// Durable key-value persistence for per-directory order records.
///
/// Keys are the casing-policy-normalized directory paths. Implementations
/// must treat a missing record as `Ok(None)` on load and removal of a
/// missing record as success.
pub trait OrderStorage: Send + Sync {
    fn load(&self, key: &str) -> io::Result<Option<Vec<String>>>;
    fn store(&self, key: &str, order: &[String]) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// Wire shape of one persisted record: a bare JSON array of child names.
#[derive(Debug, Serialize, Deserialize)]
#[serde(transparent)]
struct OrderRecord(Vec<String>);

/// One JSON file per directory under a root directory.
pub struct JsonOrderStorage {
    root: PathBuf,
}

impl JsonOrderStorage {
    /// Creates a storage rooted at `root`. The directory is created lazily
    /// on the first write.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Creates a storage under the platform data directory
    /// (`~/Library/Application Support/lite-edit/explorer-order` on macOS).
    ///
    /// Returns `None` if the data directory cannot be determined.
    pub fn in_default_location() -> Option<Self> {
        let root = dirs::data_dir()?.join(APP_NAME).join(ORDER_DIR);
        Some(Self::new(root))
    }

    fn file_for(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let digest = hasher.finalize();

        let mut name = String::with_capacity(digest.len() * 2 + 5);
        for byte in digest {
            name.push_str(&format!("{:02x}", byte));
        }
        name.push_str(".json");

        self.root.join(name)
    }
}

impl OrderStorage for JsonOrderStorage {
    fn load(&self, key: &str) -> io::Result<Option<Vec<String>>> {
        let contents = match fs::read_to_string(self.file_for(key)) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let record: OrderRecord = serde_json::from_str(&contents)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(Some(record.0))
    }

    fn store(&self, key: &str, order: &[String]) -> io::Result<()> {
        fs::create_dir_all(&self.root)?;
        let contents = serde_json::to_string(&OrderRecord(order.to_vec()))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(self.file_for(key), contents)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.file_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Work items for the persist worker thread.
enum PersistJob {
    Store { key: String, order: Vec<String> },
    Remove { key: String },
}

/// Cache entry: `None` records a directory known to have no persisted order,
/// so storage is not re-consulted on every lookup.
type CachedOrder = Option<Vec<String>>;

/// Owns the per-directory custom orders.
///
/// Reads hit the in-memory cache (lazily filled from storage); writes update
/// the cache immediately and enqueue the durable step to the worker thread.
/// Dropping the store lets in-flight writes complete before the worker
/// exits.
pub struct CustomOrderStore {
    policy: CasingPolicy,
    cache: Mutex<HashMap<String, CachedOrder>>,
    storage: Arc<dyn OrderStorage>,
    on_error: Arc<PersistErrorCallback>,
    job_tx: Option<Sender<PersistJob>>,
    worker: Option<JoinHandle<()>>,
}

impl CustomOrderStore {
    /// Creates a store whose persistence failures are reported as stderr
    /// warnings.
    pub fn new(storage: Arc<dyn OrderStorage>, policy: CasingPolicy) -> Self {
        Self::with_error_callback(storage, policy, |error| {
            eprintln!("Warning: {}", error);
        })
    }

    /// Creates a store with a callback for persistence failures.
    ///
    /// The callback may be invoked from the persist worker thread.
    pub fn with_error_callback<F>(
        storage: Arc<dyn OrderStorage>,
        policy: CasingPolicy,
        on_error: F,
    ) -> Self
    where
        F: Fn(PersistenceError) + Send + Sync + 'static,
    {
        let on_error: Arc<PersistErrorCallback> = Arc::new(Box::new(on_error));

        let (job_tx, job_rx) = mpsc::channel::<PersistJob>();
        let worker_storage = Arc::clone(&storage);
        let worker_on_error = Arc::clone(&on_error);

        let worker = thread::spawn(move || {
            // Exits when the store drops its sender
            while let Ok(job) = job_rx.recv() {
                let (key, result) = match job {
                    PersistJob::Store { key, order } => {
                        let result = worker_storage.store(&key, &order);
                        (key, result)
                    }
                    PersistJob::Remove { key } => {
                        let result = worker_storage.remove(&key);
                        (key, result)
                    }
                };

                if let Err(source) = result {
                    worker_on_error(PersistenceError {
                        dir_key: key,
                        source,
                    });
                }
            }
        });

        Self {
            policy,
            cache: Mutex::new(HashMap::new()),
            storage,
            on_error,
            job_tx: Some(job_tx),
            worker: Some(worker),
        }
    }

    /// The casing policy keys are normalized under.
    pub fn policy(&self) -> CasingPolicy {
        self.policy
    }

    /// Returns the persisted child-name order for `dir`, if any.
    ///
    /// The first lookup for a directory consults storage; afterwards the
    /// cached answer (present or absent) is returned. Never blocks on
    /// pending writes.
    pub fn get_order(&self, dir: &Path) -> Option<Vec<String>> {
        let key = self.policy.normalized_key(dir);
        let mut cache = self.cache.lock().unwrap();

        if let Some(cached) = cache.get(&key) {
            return cached.clone();
        }

        let loaded = match self.storage.load(&key) {
            Ok(order) => order,
            Err(source) => {
                (self.on_error)(PersistenceError {
                    dir_key: key.clone(),
                    source,
                });
                // Unreadable record degrades to "no custom order"
                None
            }
        };

        cache.insert(key, loaded.clone());
        loaded
    }

    /// Overwrites the order for `dir`.
    ///
    /// The in-memory order is updated before this returns; the durable write
    /// runs on the worker thread. Fails only when the worker is no longer
    /// accepting jobs.
    pub fn set_order(&self, dir: &Path, order: Vec<String>) -> Result<(), PersistenceError> {
        let key = self.policy.normalized_key(dir);

        self.cache
            .lock()
            .unwrap()
            .insert(key.clone(), Some(order.clone()));

        self.enqueue(PersistJob::Store { key, order })
    }

    /// Removes the order for `dir`. Idempotent; no error if absent.
    ///
    /// Called when a directory is removed from the tree so its record does
    /// not outlive it. An enqueue failure is reported through the error
    /// callback rather than returned.
    pub fn remove_order(&self, dir: &Path) {
        let key = self.policy.normalized_key(dir);

        self.cache.lock().unwrap().insert(key.clone(), None);

        if let Err(error) = self.enqueue(PersistJob::Remove { key }) {
            (self.on_error)(error);
        }
    }

    fn enqueue(&self, job: PersistJob) -> Result<(), PersistenceError> {
        let key = match &job {
            PersistJob::Store { key, .. } | PersistJob::Remove { key } => key.clone(),
        };

        let sent = match &self.job_tx {
            Some(tx) => tx.send(job).is_ok(),
            // Sender is only taken in drop
            None => false,
        };

        if sent {
            Ok(())
        } else {
            Err(PersistenceError {
                dir_key: key,
                source: io::Error::new(io::ErrorKind::BrokenPipe, "persist worker stopped"),
            })
        }
    }
}

impl Drop for CustomOrderStore {
    fn drop(&mut self) {
        // Disconnect the channel so the worker drains remaining jobs and
        // exits; in-flight writes complete before we return.
        drop(self.job_tx.take());
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory storage double with optional scripted failure.
    struct MemoryStorage {
        records: Mutex<HashMap<String, Vec<String>>>,
        fail_writes: bool,
    }

    impl MemoryStorage {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                records: Mutex::new(HashMap::new()),
                fail_writes: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                records: Mutex::new(HashMap::new()),
                fail_writes: true,
            })
        }
    }

    impl OrderStorage for MemoryStorage {
        fn load(&self, key: &str) -> io::Result<Option<Vec<String>>> {
            Ok(self.records.lock().unwrap().get(key).cloned())
        }

        fn store(&self, key: &str, order: &[String]) -> io::Result<()> {
            if self.fail_writes {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
            }
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

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_set_then_get_is_immediate() {
        let store = CustomOrderStore::new(MemoryStorage::new(), CasingPolicy::Sensitive);
        let dir = Path::new("/d");

        store.set_order(dir, names(&["b", "a", "c"])).unwrap();

        // In-memory immediacy: no persistence round-trip required
        assert_eq!(store.get_order(dir), Some(names(&["b", "a", "c"])));
    }

    #[test]
    fn test_get_missing_order_is_none() {
        let store = CustomOrderStore::new(MemoryStorage::new(), CasingPolicy::Sensitive);
        assert_eq!(store.get_order(Path::new("/nowhere")), None);
    }

    #[test]
    fn test_set_overwrites_prior_order() {
        let store = CustomOrderStore::new(MemoryStorage::new(), CasingPolicy::Sensitive);
        let dir = Path::new("/d");

        store.set_order(dir, names(&["a", "b"])).unwrap();
        store.set_order(dir, names(&["b", "a"])).unwrap();

        assert_eq!(store.get_order(dir), Some(names(&["b", "a"])));
    }

    #[test]
    fn test_remove_order_is_idempotent() {
        let store = CustomOrderStore::new(MemoryStorage::new(), CasingPolicy::Sensitive);
        let dir = Path::new("/d");

        store.set_order(dir, names(&["a"])).unwrap();
        store.remove_order(dir);
        store.remove_order(dir);

        assert_eq!(store.get_order(dir), None);
    }

    #[test]
    fn test_case_insensitive_keys_share_a_record() {
        let store = CustomOrderStore::new(MemoryStorage::new(), CasingPolicy::Insensitive);

        store
            .set_order(Path::new("/Notes/Daily"), names(&["b", "a"]))
            .unwrap();

        assert_eq!(
            store.get_order(Path::new("/notes/daily")),
            Some(names(&["b", "a"]))
        );
    }

    #[test]
    fn test_case_sensitive_keys_are_distinct() {
        let store = CustomOrderStore::new(MemoryStorage::new(), CasingPolicy::Sensitive);

        store
            .set_order(Path::new("/Notes"), names(&["b", "a"]))
            .unwrap();

        assert_eq!(store.get_order(Path::new("/notes")), None);
    }

    #[test]
    fn test_write_failure_reports_error_but_keeps_memory_state() {
        let errors = Arc::new(AtomicUsize::new(0));
        let errors_seen = Arc::clone(&errors);

        let store = CustomOrderStore::with_error_callback(
            MemoryStorage::failing(),
            CasingPolicy::Sensitive,
            move |_error| {
                errors_seen.fetch_add(1, Ordering::SeqCst);
            },
        );
        let dir = Path::new("/d");

        store.set_order(dir, names(&["a", "b"])).unwrap();

        // In-memory state stays authoritative despite the failed write
        assert_eq!(store.get_order(dir), Some(names(&["a", "b"])));

        // Dropping drains the worker, so the failure has been reported
        drop(store);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_flushes_pending_writes() {
        let storage = MemoryStorage::new();
        let store = CustomOrderStore::new(
            Arc::clone(&storage) as Arc<dyn OrderStorage>,
            CasingPolicy::Sensitive,
        );

        store.set_order(Path::new("/d"), names(&["x", "y"])).unwrap();
        drop(store);

        assert_eq!(
            storage.records.lock().unwrap().get("/d"),
            Some(&names(&["x", "y"]))
        );
    }

    #[test]
    fn test_lazy_load_from_storage() {
        let storage = MemoryStorage::new();
        storage
            .records
            .lock()
            .unwrap()
            .insert("/d".to_string(), names(&["persisted"]));

        let store = CustomOrderStore::new(
            Arc::clone(&storage) as Arc<dyn OrderStorage>,
            CasingPolicy::Sensitive,
        );

        assert_eq!(store.get_order(Path::new("/d")), Some(names(&["persisted"])));
    }

    #[test]
    fn test_json_storage_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = JsonOrderStorage::new(dir.path().join("orders"));

        assert_eq!(storage.load("/d").unwrap(), None);

        storage.store("/d", &names(&["b", "a", "c"])).unwrap();
        assert_eq!(storage.load("/d").unwrap(), Some(names(&["b", "a", "c"])));

        storage.remove("/d").unwrap();
        assert_eq!(storage.load("/d").unwrap(), None);
        // Removing again is fine
        storage.remove("/d").unwrap();
    }

    #[test]
    fn test_json_storage_files_are_per_key() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = JsonOrderStorage::new(dir.path().to_path_buf());

        storage.store("/a", &names(&["one"])).unwrap();
        storage.store("/b", &names(&["two"])).unwrap();

        assert_eq!(storage.load("/a").unwrap(), Some(names(&["one"])));
        assert_eq!(storage.load("/b").unwrap(), Some(names(&["two"])));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_json_storage_rejects_malformed_record() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = JsonOrderStorage::new(dir.path().to_path_buf());

        storage.store("/d", &names(&["a"])).unwrap();
        let file = storage.file_for("/d");
        fs::write(&file, "not json").unwrap();

        assert!(storage.load("/d").is_err());
    }
}
