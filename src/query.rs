//! Cached reads.
//!
//! A [`Query`] is a consumer handle for one cache key. Creating it evaluates
//! the key against the store under the query's strategy and, when nothing
//! usable is cached or in flight, claims the key with a pending entry and
//! spawns the fetch. The claim happens inside a single store write, so two
//! queries racing for the same key can never both start a fetch.
//!
//! Fetches run on their own tokio task and outlive the handle that started
//! them. A completed fetch only lands if its claim is still current: if the
//! entry was invalidated or re-claimed in the meantime the result is dropped.

use crate::api::Api;
use crate::entry::{expiry_after, CacheEntry, EntryState, TagSet};
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::request::Request;
use crate::store::StoreSubscription;
use crate::strategy::CacheStrategy;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// What a consumer currently sees for its key.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryState<T> {
    Loading,
    Loaded(T),
    Failed(Error),
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Loaded(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            QueryState::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            QueryState::Loaded(data) => Some(data),
            _ => None,
        }
    }
}

/// Everything needed to claim a key and run its fetch.
#[derive(Debug)]
pub(crate) struct FetchPlan {
    pub(crate) key: String,
    pub(crate) request: Request,
    pub(crate) tags: Arc<TagSet>,
    pub(crate) ttl: Option<Duration>,
}

/// Outcome of evaluating a key against one snapshot.
#[derive(Debug, PartialEq)]
enum Decision {
    Hit(Arc<Value>),
    Join,
    Fail(Error),
    Miss,
    Claim,
}

fn decide(entry: Option<&CacheEntry>, strategy: CacheStrategy, now: Instant) -> Decision {
    let settled = match entry {
        Some(entry) if entry.is_pending() => return Decision::Join,
        Some(_) if strategy == CacheStrategy::Invalidate => return Decision::Claim,
        Some(entry) => match &entry.state {
            EntryState::Failed(error) => return Decision::Fail(error.clone()),
            _ => entry.live_payload(now).cloned(),
        },
        None => None,
    };

    match (settled, strategy) {
        (Some(payload), _) => Decision::Hit(payload),
        (None, CacheStrategy::Fresh) => Decision::Miss,
        (None, _) => Decision::Claim,
    }
}

enum Claim {
    Hit(Arc<Value>),
    Joined,
    Claimed,
    Failed(Error),
    Miss,
}

/// Handle on one cached read.
///
/// Dropping the handle does not cancel a fetch it started.
pub struct Query<T, F: Fetcher> {
    api: Api<F>,
    plan: Arc<FetchPlan>,
    strategy: CacheStrategy,
    subscription: StoreSubscription,
    last_seen: Option<CacheEntry>,
    _payload: PhantomData<fn() -> T>,
}

impl<T, F> Query<T, F>
where
    T: DeserializeOwned,
    F: Fetcher,
{
    pub(crate) fn start(api: Api<F>, plan: FetchPlan, strategy: CacheStrategy) -> Self {
        let subscription = api.store().subscribe();
        let mut query = Query {
            api,
            plan: Arc::new(plan),
            // Invalidate applies to the first evaluation only.
            strategy: match strategy {
                CacheStrategy::Invalidate => CacheStrategy::Refresh,
                other => other,
            },
            subscription,
            last_seen: None,
            _payload: PhantomData,
        };

        match query.claim(strategy) {
            Claim::Claimed => query.api.metrics().record_miss(&query.plan.key),
            Claim::Joined => query.api.metrics().record_dedup(&query.plan.key),
            _ => {}
        }
        query.last_seen = query.api.store().read().get(&query.plan.key).cloned();
        query
    }

    /// Cache key this query reads.
    pub fn key(&self) -> &str {
        &self.plan.key
    }

    pub fn request(&self) -> &Request {
        &self.plan.request
    }

    /// Evaluate the key against the current store.
    ///
    /// A loaded entry is decoded into `T`. An entry that expired or was
    /// evicted since the last evaluation is claimed again (except under
    /// `Fresh`, which reports `Error::CacheMiss`).
    pub fn state(&self) -> QueryState<T> {
        match self.claim(self.strategy) {
            Claim::Hit(payload) => {
                self.api.metrics().record_hit(&self.plan.key);
                match T::deserialize(payload.as_ref()) {
                    Ok(data) => QueryState::Loaded(data),
                    Err(e) => {
                        let error = Error::from(e);
                        self.api
                            .metrics()
                            .record_error(&self.plan.key, &error.to_string());
                        QueryState::Failed(error)
                    }
                }
            }
            Claim::Joined => QueryState::Loading,
            Claim::Claimed => {
                self.api.metrics().record_miss(&self.plan.key);
                QueryState::Loading
            }
            Claim::Failed(error) => QueryState::Failed(error),
            Claim::Miss => QueryState::Failed(Error::CacheMiss),
        }
    }

    /// Discard the settled entry for this key and fetch it again.
    ///
    /// Joins the in-flight fetch instead if there is one. Returns whether a
    /// new fetch was started.
    pub fn refetch(&self) -> bool {
        match self.claim(CacheStrategy::Invalidate) {
            Claim::Claimed => {
                self.api.metrics().record_miss(&self.plan.key);
                true
            }
            _ => false,
        }
    }

    /// Wait until the entry for this key changes.
    ///
    /// Changes to other keys do not wake the caller.
    ///
    /// # Errors
    /// Returns `Error::Other` if the store was dropped.
    pub async fn changed(&mut self) -> Result<()> {
        loop {
            self.subscription
                .changed()
                .await
                .map_err(|_| Error::Other("cache store dropped".to_string()))?;

            let current = self
                .subscription
                .borrow_and_update()
                .get(&self.plan.key)
                .cloned();
            if current != self.last_seen {
                self.last_seen = current;
                return Ok(());
            }
        }
    }

    /// Wait until the key settles and return its data or failure.
    ///
    /// # Errors
    /// Returns the fetch failure, a decode error, or `Error::CacheMiss` under
    /// the `Fresh` strategy.
    pub async fn wait(&mut self) -> Result<T> {
        loop {
            match self.state() {
                QueryState::Loaded(data) => return Ok(data),
                QueryState::Failed(error) => return Err(error),
                QueryState::Loading => self.changed().await?,
            }
        }
    }

    fn claim(&self, strategy: CacheStrategy) -> Claim {
        let store = self.api.store();
        let plan = &self.plan;
        let now = Instant::now();
        let fetch_id = store.next_fetch_id();

        let claim = store.modify(|snapshot| {
            match decide(snapshot.get(&plan.key), strategy, now) {
                Decision::Claim => {
                    let entry = CacheEntry::pending(&plan.key, Arc::clone(&plan.tags), fetch_id);
                    (Arc::new(snapshot.with_entry(entry)), Claim::Claimed)
                }
                Decision::Hit(payload) => (Arc::clone(snapshot), Claim::Hit(payload)),
                Decision::Join => (Arc::clone(snapshot), Claim::Joined),
                Decision::Fail(error) => (Arc::clone(snapshot), Claim::Failed(error)),
                Decision::Miss => (Arc::clone(snapshot), Claim::Miss),
            }
        });

        if let Claim::Claimed = claim {
            debug!("✓ Claimed {} (fetch {}, {})", plan.key, fetch_id, strategy);
            tokio::spawn(run_fetch(self.api.clone(), Arc::clone(&self.plan), fetch_id));
        }
        claim
    }
}

async fn run_fetch<F: Fetcher>(api: Api<F>, plan: Arc<FetchPlan>, fetch_id: u64) {
    let started = Instant::now();
    let outcome = match api.fetcher().fetch(plan.request.clone()).await {
        Ok(response) => response.json_value().map(Arc::new),
        Err(e) => Err(e),
    };
    let settled_at = Instant::now();

    let applied = api.store().modify(|snapshot| match snapshot.get(&plan.key) {
        Some(entry) if entry.is_pending() && entry.fetch_id == fetch_id => {
            let entry = entry.clone();
            let settled = match &outcome {
                Ok(payload) => {
                    entry.loaded(Arc::clone(payload), expiry_after(settled_at, plan.ttl))
                }
                Err(error) => entry.failed(error.clone()),
            };
            (Arc::new(snapshot.with_entry(settled)), true)
        }
        _ => (Arc::clone(snapshot), false),
    });

    match (outcome, applied) {
        (Ok(_), true) => {
            let elapsed = started.elapsed();
            api.metrics().record_fetch(&plan.key, elapsed);
            info!("✓ Fetch {} for {} completed in {:?}", fetch_id, plan.request.url, elapsed);
        }
        (Err(error), true) => {
            api.metrics().record_error(&plan.key, &error.to_string());
            warn!("✗ Fetch {} for {} failed: {}", fetch_id, plan.request.url, error);
        }
        (_, false) => {
            debug!("Discarding fetch {} for {}: claim superseded", fetch_id, plan.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tags() -> Arc<TagSet> {
        Arc::new(TagSet::new())
    }

    #[test]
    fn test_decide_empty_key() {
        let now = Instant::now();
        assert_eq!(decide(None, CacheStrategy::Refresh, now), Decision::Claim);
        assert_eq!(decide(None, CacheStrategy::Invalidate, now), Decision::Claim);
        assert_eq!(decide(None, CacheStrategy::Fresh, now), Decision::Miss);
    }

    #[test]
    fn test_decide_pending_always_joins() {
        let now = Instant::now();
        let pending = CacheEntry::pending("k", tags(), 1);
        for strategy in [CacheStrategy::Fresh, CacheStrategy::Refresh, CacheStrategy::Invalidate] {
            assert_eq!(decide(Some(&pending), strategy, now), Decision::Join);
        }
    }

    #[test]
    fn test_decide_live_entry() {
        let now = Instant::now();
        let payload = Arc::new(json!([1]));
        let loaded = CacheEntry::pending("k", tags(), 1).loaded(Arc::clone(&payload), None);

        assert_eq!(
            decide(Some(&loaded), CacheStrategy::Refresh, now),
            Decision::Hit(Arc::clone(&payload))
        );
        assert_eq!(
            decide(Some(&loaded), CacheStrategy::Fresh, now),
            Decision::Hit(payload)
        );
        assert_eq!(
            decide(Some(&loaded), CacheStrategy::Invalidate, now),
            Decision::Claim
        );
    }

    #[test]
    fn test_decide_expired_entry() {
        let now = Instant::now();
        let expired = CacheEntry::pending("k", tags(), 1)
            .loaded(Arc::new(json!(1)), Some(now - Duration::from_millis(1)));

        assert_eq!(decide(Some(&expired), CacheStrategy::Refresh, now), Decision::Claim);
        assert_eq!(decide(Some(&expired), CacheStrategy::Fresh, now), Decision::Miss);
    }

    #[test]
    fn test_decide_failed_entry_needs_rearm() {
        let now = Instant::now();
        let error = Error::TransportError("down".to_string());
        let failed = CacheEntry::pending("k", tags(), 1).failed(error.clone());

        assert_eq!(
            decide(Some(&failed), CacheStrategy::Refresh, now),
            Decision::Fail(error.clone())
        );
        assert_eq!(
            decide(Some(&failed), CacheStrategy::Fresh, now),
            Decision::Fail(error)
        );
        assert_eq!(
            decide(Some(&failed), CacheStrategy::Invalidate, now),
            Decision::Claim
        );
    }

    #[test]
    fn test_query_state_accessors() {
        let loaded: QueryState<u8> = QueryState::Loaded(3);
        assert_eq!(loaded.data(), Some(&3));
        assert!(!loaded.is_loading());
        assert_eq!(loaded.into_data(), Some(3));

        let failed: QueryState<u8> = QueryState::Failed(Error::CacheMiss);
        assert_eq!(failed.error(), Some(&Error::CacheMiss));
        assert!(QueryState::<u8>::Loading.is_loading());
    }
}
