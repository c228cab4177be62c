//! Cache entries held by the store.

use crate::error::Error;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Set of invalidation tags.
pub type TagSet = BTreeSet<String>;

/// Expiry instant for a response settled at `settled_at`.
///
/// A zero TTL means no expiry, as does a TTL too large to represent as an
/// instant.
pub fn expiry_after(settled_at: Instant, ttl: Option<Duration>) -> Option<Instant> {
    ttl.filter(|ttl| !ttl.is_zero())
        .and_then(|ttl| settled_at.checked_add(ttl))
}

/// Lifecycle state of a cache entry.
#[derive(Clone, Debug, PartialEq)]
pub enum EntryState {
    /// A fetch has been claimed for this key and is in flight.
    Pending,
    /// The fetch resolved with a JSON payload.
    Loaded(Arc<Value>),
    /// The fetch failed. Stays until re-armed or invalidated.
    Failed(Error),
}

/// One cached response, keyed by its request fingerprint.
///
/// Entries compare by value, so consumers can skip re-evaluation when the
/// entry they care about did not change between two snapshots.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub state: EntryState,
    pub expires_at: Option<Instant>,
    pub tags: Arc<TagSet>,
    /// Fetch cycle that claimed this entry.
    pub fetch_id: u64,
}

impl CacheEntry {
    /// A fresh claim for `key`, created before the fetch is issued.
    pub fn pending(key: impl Into<String>, tags: Arc<TagSet>, fetch_id: u64) -> Self {
        CacheEntry {
            key: key.into(),
            state: EntryState::Pending,
            expires_at: None,
            tags,
            fetch_id,
        }
    }

    /// Settle this claim with a payload.
    pub fn loaded(self, payload: Arc<Value>, expires_at: Option<Instant>) -> Self {
        CacheEntry {
            state: EntryState::Loaded(payload),
            expires_at,
            ..self
        }
    }

    /// Settle this claim with a failure.
    pub fn failed(self, error: Error) -> Self {
        CacheEntry {
            state: EntryState::Failed(error),
            expires_at: None,
            ..self
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, EntryState::Pending)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, EntryState::Failed(_))
    }

    /// True once `expires_at` is in the past. An entry is still live at
    /// exactly `expires_at`. Entries without expiry never expire.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|exp| now > exp)
    }

    /// Payload of a loaded entry that has not expired.
    pub fn live_payload(&self, now: Instant) -> Option<&Arc<Value>> {
        match &self.state {
            EntryState::Loaded(payload) if !self.is_expired(now) => Some(payload),
            _ => None,
        }
    }

    /// True when this entry carries any of `tags`.
    ///
    /// An entry without tags never matches.
    pub fn matches_any(&self, tags: &TagSet) -> bool {
        !self.tags.is_disjoint(tags)
    }
}
