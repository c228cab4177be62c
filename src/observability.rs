//! Observability hooks and default expiry policies.
//!
//! query-kit separates two ambient concerns from the engine:
//!
//! - **Metrics (`CacheMetrics`)**: hits, claims, joined fetches, fetch timing,
//!   invalidation sweeps and failures
//! - **TTL Policies (`TtlPolicy`)**: expiry for endpoints that do not declare
//!   their own TTL
//!
//! # Metrics
//!
//! ```ignore
//! use query_kit::observability::CacheMetrics;
//! use std::time::Duration;
//!
//! struct PrometheusMetrics;
//!
//! impl CacheMetrics for PrometheusMetrics {
//!     fn record_fetch(&self, _key: &str, _duration: Duration) {
//!         // histogram!("query_fetch_latency").record(duration);
//!     }
//! }
//!
//! // let api = Api::builder(fetcher)
//! //     .metrics(Box::new(PrometheusMetrics))
//! //     .build()?;
//! ```
//!
//! The trait's default methods log through the `log` crate; `NoOpMetrics`
//! discards everything and is what an `Api` uses unless told otherwise.
//!
//! # TTL Policies
//!
//! ```
//! use query_kit::observability::TtlPolicy;
//! use std::time::Duration;
//!
//! // Everything expires after 30 seconds unless the endpoint says otherwise
//! let _policy = TtlPolicy::Fixed(Duration::from_secs(30));
//!
//! // Per-endpoint defaults, keyed by endpoint name
//! let _policy = TtlPolicy::PerEndpoint(|endpoint| match endpoint {
//!     "stats" => Duration::from_secs(1),
//!     _ => Duration::from_secs(600),
//! });
//! ```
//!
//! | Policy | Meaning |
//! |--------|---------|
//! | `Default` | No expiry; entries leave only through invalidation |
//! | `Fixed` | Uniform expiry for every endpoint |
//! | `PerEndpoint` | Expiry chosen by endpoint name |
//!
//! A zero duration from either policy also means no expiry.

use crate::entry::TagSet;
use std::time::Duration;

/// Trait for cache metrics collection.
pub trait CacheMetrics: Send + Sync {
    /// A query was answered from a live cached entry.
    fn record_hit(&self, key: &str) {
        debug!("Cache HIT: {}", key);
    }

    /// A query found no live entry and claimed the key.
    fn record_miss(&self, key: &str) {
        debug!("Cache MISS: {}", key);
    }

    /// A query joined a fetch that was already in flight.
    fn record_dedup(&self, key: &str) {
        debug!("Cache JOIN in-flight: {}", key);
    }

    /// A fetch completed successfully.
    fn record_fetch(&self, key: &str, duration: Duration) {
        debug!("Cache FETCH: {} took {:?}", key, duration);
    }

    /// A mutation sweep removed `removed` entries.
    fn record_invalidate(&self, tags: &TagSet, removed: usize) {
        debug!("Cache INVALIDATE {:?}: {} entries", tags, removed);
    }

    /// A fetch or decode failed.
    fn record_error(&self, key: &str, error: &str) {
        warn!("Cache ERROR for {}: {}", key, error);
    }
}

/// Default metrics implementation (no-op).
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {
    fn record_hit(&self, _key: &str) {}
    fn record_miss(&self, _key: &str) {}
    fn record_dedup(&self, _key: &str) {}
    fn record_fetch(&self, _key: &str, _duration: Duration) {}
    fn record_invalidate(&self, _tags: &TagSet, _removed: usize) {}
    fn record_error(&self, _key: &str, _error: &str) {}
}

/// Metrics implementation that only logs, using the trait's default methods.
#[derive(Clone, Default)]
pub struct LogMetrics;

impl CacheMetrics for LogMetrics {}

/// Default TTL policy for endpoints without their own TTL.
#[derive(Clone, Debug, Default)]
pub enum TtlPolicy {
    /// No TTL (entries live until invalidated)
    #[default]
    Default,

    /// Fixed duration for all endpoints
    Fixed(Duration),

    /// Custom per-endpoint policy
    PerEndpoint(fn(&str) -> Duration),
}

impl TtlPolicy {
    /// Get TTL for an endpoint name.
    pub fn get_ttl(&self, endpoint: &str) -> Option<Duration> {
        match self {
            TtlPolicy::Default => None,
            TtlPolicy::Fixed(d) => Some(*d),
            TtlPolicy::PerEndpoint(f) => Some(f(endpoint)),
        }
    }
}
