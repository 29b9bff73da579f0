//! In-Memory Key-Value Store
//!
//! A single reader/writer lock guards the map. Reads validate entries under
//! the shared lock; the lazy delete of an expired entry happens only after
//! that guard is gone.

use chrono::{DateTime, Utc};
use hashbrown::HashMap;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::entry::{now_secs, Entry};
use super::vacuum::AutoVacuum;
use crate::config::VacuumConfig;

/// Everything behind the lock
#[derive(Debug, Default)]
pub(super) struct Table {
    pub(super) entries: HashMap<String, Entry>,
    /// Upper bound on expiring entries added since the last vacuum
    pub(super) dirty_estimate: usize,
    pub(super) last_vacuum_at: Option<DateTime<Utc>>,
    pub(super) vacuum_count: u64,
}

/// State shared by every handle and the vacuum task
#[derive(Debug)]
pub(super) struct Shared {
    pub(super) table: RwLock<Table>,
    /// Dropping the sender also stops the vacuum task
    shutdown_tx: watch::Sender<bool>,
    vacuum_task: Mutex<Option<JoinHandle<()>>>,
}

/// Point-in-time counters
#[derive(Debug, Clone, PartialEq)]
pub struct StoreStats {
    /// Raw entry count, expired entries included
    pub len: usize,
    pub dirty_estimate: usize,
    pub last_vacuum_at: Option<DateTime<Utc>>,
    pub vacuum_count: u64,
}

/// Thread-safe in-memory key-value store with per-entry expiration
///
/// Cloning is cheap and every clone sees the same data. When a tokio runtime
/// is available the store runs a background vacuum task, which stops on
/// [`Store::close`] or once the last handle is dropped.
#[derive(Debug, Clone)]
pub struct Store {
    shared: Arc<Shared>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    /// Create a new empty store with the default vacuum configuration
    pub fn new() -> Self {
        Self::with_config(VacuumConfig::default())
    }

    /// Create a new empty store
    ///
    /// The auto-vacuum task is spawned on the current tokio runtime. Outside
    /// a runtime the store still works, it just never vacuums on its own.
    pub fn with_config(config: VacuumConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shared = Arc::new(Shared {
            table: RwLock::new(Table::default()),
            shutdown_tx,
            vacuum_task: Mutex::new(None),
        });

        if config.enabled {
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    let task = AutoVacuum::new(Arc::downgrade(&shared), config, shutdown_rx);
                    *shared.vacuum_task.lock() = Some(runtime.spawn(task.run()));
                }
                Err(_) => warn!("no tokio runtime available, auto-vacuum disabled"),
            }
        }

        Self { shared }
    }

    /// Store a value that never expires
    pub fn put(&self, key: impl Into<String>, value: impl Into<String>) {
        let entry = Entry::permanent(value);
        let mut table = self.shared.table.write();
        table.entries.insert(key.into(), entry);
    }

    /// Store a value that expires at `expires_at` (second precision)
    pub fn put_ttl(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) {
        let entry = Entry::from_deadline(value.into(), expires_at);
        let mut table = self.shared.table.write();
        table.entries.insert(key.into(), entry);
        table.dirty_estimate = table.dirty_estimate.saturating_add(1);
    }

    /// Get value by key, `None` if absent or expired
    ///
    /// An expired entry is deleted on the way out.
    pub fn get(&self, key: &str) -> Option<String> {
        {
            let table = self.shared.table.read();
            let entry = table.entries.get(key)?;
            if entry.is_valid() {
                return Some(entry.value().to_owned());
            }
        }

        self.evict_expired(key);
        None
    }

    /// Remove the entry if it is still expired once the write lock is held.
    /// A concurrent overwrite between the two locks survives.
    fn evict_expired(&self, key: &str) {
        let mut table = self.shared.table.write();
        let now = now_secs();
        if table.entries.get(key).is_some_and(|e| !e.is_valid_at(now)) {
            table.entries.remove(key);
            debug!(key, "evicted expired key on read");
        }
    }

    /// Delete key, returns true if key existed
    pub fn delete(&self, key: &str) -> bool {
        let mut table = self.shared.table.write();
        table.entries.remove(key).is_some()
    }

    /// Check if key exists and is not expired. Never deletes.
    pub fn exists(&self, key: &str) -> bool {
        let table = self.shared.table.read();
        table.entries.get(key).map(Entry::is_valid).unwrap_or(false)
    }

    /// Number of entries in the map, including expired ones that have not
    /// been reclaimed yet. Run [`Store::vacuum`] first for a live count.
    pub fn len(&self) -> usize {
        self.shared.table.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every expired entry, returns count of removed entries
    pub fn vacuum(&self) -> usize {
        self.shared.vacuum()
    }

    pub fn stats(&self) -> StoreStats {
        let table = self.shared.table.read();
        StoreStats {
            len: table.entries.len(),
            dirty_estimate: table.dirty_estimate,
            last_vacuum_at: table.last_vacuum_at,
            vacuum_count: table.vacuum_count,
        }
    }

    /// Stop the background vacuum task. The store stays usable.
    pub fn close(&self) {
        self.shared.shutdown_tx.send_replace(true);
    }

    pub fn is_auto_vacuum_running(&self) -> bool {
        self.shared
            .vacuum_task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    #[cfg(test)]
    pub(super) fn take_vacuum_task(&self) -> Option<JoinHandle<()>> {
        self.shared.vacuum_task.lock().take()
    }

    /// Copy of all entries sorted by key, taken under the shared lock
    pub(crate) fn sorted_entries(&self) -> Vec<(String, Entry)> {
        let mut entries: Vec<(String, Entry)> = {
            let table = self.shared.table.read();
            table
                .entries
                .iter()
                .map(|(k, e)| (k.clone(), e.clone()))
                .collect()
        };
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Swap in a fully built map, returns the new entry count
    pub(crate) fn replace_entries<I>(&self, entries: I) -> usize
    where
        I: IntoIterator<Item = (String, Entry)>,
    {
        let entries: HashMap<String, Entry> = entries.into_iter().collect();
        let expiring = entries.values().filter(|e| !e.is_permanent()).count();
        let count = entries.len();

        let mut table = self.shared.table.write();
        table.entries = entries;
        table.dirty_estimate = expiring;
        count
    }
}
