//! Key-value persistence for node layouts and presets.
//!
//! Everything above this module treats storage as best effort: reads that
//! fail look like absent keys, and writes that hit the quota are retried with
//! fewer entries before being dropped.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::common::config::StorageSettings;

mod file;
mod memory;
mod node_store;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use node_store::{NODE_LAYOUTS_KEY, NodeLayoutStore};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Quota exceeded writing {key}: {needed} bytes needed, limit is {limit}")]
    QuotaExceeded { key: String, needed: u64, limit: u64 },
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A string blob store with an optional size quota.
pub trait KvStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

type SharedStore = Arc<Mutex<Box<dyn KvStore + Send>>>;

/// Cloneable access to a store, or to nothing at all when no storage medium
/// exists. An unavailable handle reads as empty and accepts every write.
#[derive(Clone, Default)]
pub struct StorageHandle(Option<SharedStore>);

impl fmt::Debug for StorageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_available() { "available" } else { "unavailable" };
        f.debug_tuple("StorageHandle").field(&state).finish()
    }
}

impl StorageHandle {
    pub fn new(store: impl KvStore + Send + 'static) -> Self {
        Self(Some(Arc::new(Mutex::new(Box::new(store)))))
    }

    pub fn unavailable() -> Self { Self(None) }

    /// Opens the on-disk store described by `settings`.
    pub fn from_settings(settings: &StorageSettings) -> Self {
        Self::new(FileStore::new(settings.resolved_data_dir(), settings.quota_bytes))
    }

    pub fn is_available(&self) -> bool { self.0.is_some() }

    pub fn read(&self, key: &str) -> Option<String> {
        let store = self.0.as_ref()?;
        match store.lock().get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "failed to read from storage");
                None
            }
        }
    }

    pub fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        match &self.0 {
            Some(store) => store.lock().set(key, value),
            None => Ok(()),
        }
    }

    pub fn remove(&self, key: &str) {
        let Some(store) = &self.0 else { return };
        if let Err(err) = store.lock().remove(key) {
            warn!(key, error = %err, "failed to remove key from storage");
        }
    }
}

/// What happened to a save that went through [`write_with_eviction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// No storage medium; nothing was written.
    Skipped,
    /// The quota was hit and only the newest `kept` entries were written.
    Evicted { kept: usize, dropped: usize },
    Failed,
}

/// Writes `entries` (ordered oldest first) under `key`. On a quota error the
/// write is retried keeping only the newest `steps[i]` entries, for each step
/// smaller than the current count.
pub(crate) fn write_with_eviction<T>(
    storage: &StorageHandle,
    key: &str,
    entries: &[T],
    steps: &[usize],
    encode: impl Fn(&[T]) -> Result<String, serde_json::Error>,
) -> SaveOutcome {
    if !storage.is_available() {
        return SaveOutcome::Skipped;
    }

    match try_write(storage, key, entries, &encode) {
        Ok(true) => return SaveOutcome::Saved,
        Ok(false) => {}
        Err(err) => {
            warn!(key, error = %err, "failed to save");
            return SaveOutcome::Failed;
        }
    }

    for &keep in steps.iter().filter(|&&keep| keep < entries.len()) {
        let kept = &entries[entries.len() - keep..];
        match try_write(storage, key, kept, &encode) {
            Ok(true) => {
                let dropped = entries.len() - keep;
                warn!(key, kept = keep, dropped, "storage quota exceeded; evicted oldest entries");
                return SaveOutcome::Evicted { kept: keep, dropped };
            }
            Ok(false) => debug!(key, keep, "still over quota"),
            Err(err) => {
                warn!(key, error = %err, "failed to save after eviction");
                return SaveOutcome::Failed;
            }
        }
    }

    warn!(key, entries = entries.len(), "storage quota exceeded even after eviction; save dropped");
    SaveOutcome::Failed
}

/// `Ok(false)` means the write hit the quota.
fn try_write<T>(
    storage: &StorageHandle,
    key: &str,
    entries: &[T],
    encode: &impl Fn(&[T]) -> Result<String, serde_json::Error>,
) -> Result<bool, StorageError> {
    let blob = encode(entries)?;
    match storage.write(key, &blob) {
        Ok(()) => Ok(true),
        Err(StorageError::QuotaExceeded { .. }) => Ok(false),
        Err(err) => Err(err),
    }
}
