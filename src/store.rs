//! Observable cache store shared by every endpoint of an `Api`.
//!
//! The store is a single `tokio::sync::watch` cell holding an immutable
//! [`Snapshot`]. All mutation goes through [`CacheStore::write`], which hands
//! the updater the current snapshot and installs whatever it returns. Returning
//! the very same `Arc` means "no change": nothing is installed and nobody is
//! woken. Writers are serialised by the channel's lock, which is what makes
//! the read path's check-then-claim step atomic.

use crate::entry::{CacheEntry, EntryState, TagSet};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;

/// Immutable view of the cache at one point in time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    entries: HashMap<String, CacheEntry>,
    version: u64,
}

impl Snapshot {
    pub fn get(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of changes applied to the store before this snapshot.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CacheEntry)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    /// Copy of this snapshot with `entry` stored under its key, replacing any
    /// previous entry for that key.
    pub fn with_entry(&self, entry: CacheEntry) -> Snapshot {
        let mut next = self.clone();
        next.entries.insert(entry.key.clone(), entry);
        next
    }

    /// Copy of this snapshot with every entry of `entries` stored.
    pub fn with_entries<It>(&self, entries: It) -> Snapshot
    where
        It: IntoIterator<Item = CacheEntry>,
    {
        let mut next = self.clone();
        next.entries
            .extend(entries.into_iter().map(|entry| (entry.key.clone(), entry)));
        next
    }

    /// Copy of this snapshot without `key`.
    pub fn without(&self, key: &str) -> Snapshot {
        let mut next = self.clone();
        next.entries.remove(key);
        next
    }

    /// Copy of this snapshot keeping only entries for which `keep` is true,
    /// together with the number of entries dropped.
    pub fn retain<P>(&self, mut keep: P) -> (Snapshot, usize)
    where
        P: FnMut(&CacheEntry) -> bool,
    {
        let entries: HashMap<String, CacheEntry> = self
            .entries
            .iter()
            .filter(|(_, entry)| keep(entry))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let removed = self.entries.len() - entries.len();
        (
            Snapshot {
                entries,
                version: self.version,
            },
            removed,
        )
    }
}

/// Receiver side of the store's notifications.
pub type StoreSubscription = watch::Receiver<Arc<Snapshot>>;

/// Observable mapping from request fingerprint to cache entry.
///
/// # Example
///
/// ```
/// use query_kit::store::CacheStore;
///
/// let store = CacheStore::new();
/// assert!(store.read().is_empty());
///
/// // Returning the input unchanged is a no-op: no version bump, no wake-up.
/// let changed = store.write(|snapshot| snapshot.clone());
/// assert!(!changed);
/// assert_eq!(store.read().version(), 0);
/// ```
pub struct CacheStore {
    cell: watch::Sender<Arc<Snapshot>>,
    next_fetch_id: AtomicU64,
}

impl CacheStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (cell, _) = watch::channel(Arc::new(Snapshot::default()));
        CacheStore {
            cell,
            next_fetch_id: AtomicU64::new(1),
        }
    }

    /// Current snapshot. Treat it as immutable; change the store via `write`.
    pub fn read(&self) -> Arc<Snapshot> {
        self.cell.borrow().clone()
    }

    /// Apply `updater` to the current snapshot.
    ///
    /// Returns `true` if the updater produced a different snapshot, in which
    /// case it is installed and subscribers are notified.
    ///
    /// The updater runs under the store's write lock. It must not call back
    /// into the store (`read`, `len`, `write`, ...), or it deadlocks.
    pub fn write<U>(&self, updater: U) -> bool
    where
        U: FnOnce(&Arc<Snapshot>) -> Arc<Snapshot>,
    {
        self.modify(|current| {
            let next = updater(current);
            let changed = !Arc::ptr_eq(&next, current);
            (next, changed)
        })
    }

    /// Like `write`, but the updater also returns a value to the caller.
    ///
    /// The updater runs under the store's write lock; it must not call back
    /// into the store.
    pub(crate) fn modify<U, R>(&self, updater: U) -> R
    where
        U: FnOnce(&Arc<Snapshot>) -> (Arc<Snapshot>, R),
    {
        let mut outcome = None;
        self.cell.send_if_modified(|current| {
            let (mut next, result) = updater(current);
            outcome = Some(result);
            if Arc::ptr_eq(&next, current) {
                return false;
            }
            Arc::make_mut(&mut next).version = current.version + 1;
            debug!("✓ Store WRITE -> version {}", next.version);
            *current = next;
            true
        });
        match outcome {
            Some(result) => result,
            // send_if_modified always runs the closure exactly once
            None => unreachable!("store updater did not run"),
        }
    }

    /// Subscribe to store changes.
    ///
    /// The receiver is woken after each changing write. It may skip
    /// intermediate snapshots but always observes writes in order.
    pub fn subscribe(&self) -> StoreSubscription {
        self.cell.subscribe()
    }

    /// Remove every entry whose tags intersect `tags`, in a single write.
    ///
    /// Returns the number of removed entries. Matching nothing is a silent
    /// no-op that does not notify subscribers.
    pub fn invalidate(&self, tags: &TagSet) -> usize {
        if tags.is_empty() {
            return 0;
        }

        let removed = self.modify(|snapshot| {
            let (next, removed) = snapshot.retain(|entry| !entry.matches_any(tags));
            if removed == 0 {
                (snapshot.clone(), 0)
            } else {
                (Arc::new(next), removed)
            }
        });

        debug!("✓ Store INVALIDATE {:?} -> {} entries", tags, removed);
        removed
    }

    /// Remove a single key. Returns whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        let removed = self.write(|snapshot| {
            if snapshot.contains_key(key) {
                Arc::new(snapshot.without(key))
            } else {
                snapshot.clone()
            }
        });
        debug!("✓ Store REMOVE {} -> {}", key, removed);
        removed
    }

    /// Drop every entry, including in-flight claims.
    ///
    /// Fetches already in flight for cleared keys discard their results.
    pub fn clear(&self) {
        self.write(|snapshot| {
            if snapshot.is_empty() {
                snapshot.clone()
            } else {
                let (next, _) = snapshot.retain(|_| false);
                Arc::new(next)
            }
        });
        warn!("⚠ Store CLEAR executed - all cached responses dropped!");
    }

    pub fn len(&self) -> usize {
        self.cell.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cell.borrow().is_empty()
    }

    /// Entry counts by state.
    pub fn stats(&self) -> StoreStats {
        let snapshot = self.read();
        let now = Instant::now();
        let mut stats = StoreStats {
            total_entries: snapshot.len(),
            version: snapshot.version(),
            ..StoreStats::default()
        };

        for (_, entry) in snapshot.iter() {
            match entry.state {
                EntryState::Pending => stats.pending_entries += 1,
                EntryState::Loaded(_) if entry.is_expired(now) => stats.expired_entries += 1,
                EntryState::Loaded(_) => stats.loaded_entries += 1,
                EntryState::Failed(_) => stats.failed_entries += 1,
            }
        }
        stats
    }

    /// Print store statistics to debug log.
    pub fn log_stats(&self) {
        let stats = self.stats();
        debug!(
            "Store Stats: {} entries ({} pending, {} loaded, {} expired, {} failed) at version {}",
            stats.total_entries,
            stats.pending_entries,
            stats.loaded_entries,
            stats.expired_entries,
            stats.failed_entries,
            stats.version
        );
    }

    pub(crate) fn next_fetch_id(&self) -> u64 {
        self.next_fetch_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Store statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub total_entries: usize,
    pub pending_entries: usize,
    pub loaded_entries: usize,
    pub expired_entries: usize,
    pub failed_entries: usize,
    pub version: u64,
}
