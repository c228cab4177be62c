//! The `Api`: owner of one cache store and the endpoints built on it.
//!
//! Each `Api` is constructed explicitly and owns an independent store, so
//! several instances can coexist without sharing cached responses. `Api` is
//! `Clone`; clones share the same store, fetcher and settings.

use crate::config::ApiConfig;
use crate::endpoint::{Endpoint, EndpointConfig};
use crate::entry::TagSet;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::key::CacheKeyBuilder;
use crate::observability::{CacheMetrics, NoOpMetrics, TtlPolicy};
use crate::request::{Method, RequestDefaults};
use crate::store::CacheStore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub(crate) struct ApiInner<F> {
    store: CacheStore,
    fetcher: F,
    defaults: RequestDefaults,
    metrics: Box<dyn CacheMetrics>,
    ttl_policy: TtlPolicy,
    endpoint_seq: AtomicU64,
}

/// Entry point: builds endpoints that share one cache store.
///
/// # Example
///
/// ```no_run
/// use query_kit::{Api, EndpointConfig, Endpoint};
/// use query_kit::fetch::InMemoryFetcher;
///
/// # async fn run() -> query_kit::Result<()> {
/// let api = Api::builder(InMemoryFetcher::new())
///     .base_url("https://fakeapi.com")
///     .build()?;
///
/// let items: Endpoint<(), Vec<String>, _> =
///     api.get(EndpointConfig::new(|_: &()| "/items").tags(["items"]));
///
/// let data = items.fetch(&()).await?;
/// # let _ = data;
/// # Ok(())
/// # }
/// ```
pub struct Api<F: Fetcher> {
    inner: Arc<ApiInner<F>>,
}

impl<F: Fetcher> Clone for Api<F> {
    fn clone(&self) -> Self {
        Api {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F: Fetcher> Api<F> {
    /// Create an `Api` with no base URL, no default headers and no expiry.
    pub fn new(fetcher: F) -> Self {
        Api {
            inner: Arc::new(ApiInner {
                store: CacheStore::new(),
                fetcher,
                defaults: RequestDefaults::default(),
                metrics: Box::new(NoOpMetrics),
                ttl_policy: TtlPolicy::default(),
                endpoint_seq: AtomicU64::new(1),
            }),
        }
    }

    pub fn builder(fetcher: F) -> ApiBuilder<F> {
        ApiBuilder::new(fetcher)
    }

    /// Build an endpoint for `method`.
    ///
    /// Endpoints without an explicit name are named `"{METHOD}:{n}"` from a
    /// per-`Api` counter; the name is part of every cache key the endpoint
    /// derives.
    pub fn endpoint<I, T>(&self, method: Method, config: EndpointConfig<I>) -> Endpoint<I, T, F> {
        let name = match config.name() {
            Some(name) => name.to_string(),
            None => {
                let seq = self.inner.endpoint_seq.fetch_add(1, Ordering::Relaxed);
                CacheKeyBuilder::build_composite(&[method.as_str(), &seq.to_string()])
            }
        };
        debug!("✓ Endpoint {} registered ({})", name, method);
        Endpoint::new(self.clone(), name, method, config)
    }

    pub fn get<I, T>(&self, config: EndpointConfig<I>) -> Endpoint<I, T, F> {
        self.endpoint(Method::Get, config)
    }

    pub fn post<I, T>(&self, config: EndpointConfig<I>) -> Endpoint<I, T, F> {
        self.endpoint(Method::Post, config)
    }

    pub fn put<I, T>(&self, config: EndpointConfig<I>) -> Endpoint<I, T, F> {
        self.endpoint(Method::Put, config)
    }

    pub fn patch<I, T>(&self, config: EndpointConfig<I>) -> Endpoint<I, T, F> {
        self.endpoint(Method::Patch, config)
    }

    pub fn delete<I, T>(&self, config: EndpointConfig<I>) -> Endpoint<I, T, F> {
        self.endpoint(Method::Delete, config)
    }

    /// The cache store shared by every endpoint of this `Api`.
    pub fn store(&self) -> &CacheStore {
        &self.inner.store
    }

    pub fn fetcher(&self) -> &F {
        &self.inner.fetcher
    }

    pub fn defaults(&self) -> &RequestDefaults {
        &self.inner.defaults
    }

    pub(crate) fn metrics(&self) -> &dyn CacheMetrics {
        self.inner.metrics.as_ref()
    }

    pub(crate) fn ttl_policy(&self) -> &TtlPolicy {
        &self.inner.ttl_policy
    }

    /// Evict every cached entry carrying any of `tags`, outside of a mutation.
    ///
    /// Returns the number of evicted entries.
    pub fn invalidate_tags<S>(&self, tags: impl IntoIterator<Item = S>) -> usize
    where
        S: Into<String>,
    {
        let tags: TagSet = tags.into_iter().map(Into::into).collect();
        self.sweep(&tags)
    }

    pub(crate) fn sweep(&self, tags: &TagSet) -> usize {
        if tags.is_empty() {
            return 0;
        }
        let removed = self.inner.store.invalidate(tags);
        self.inner.metrics.record_invalidate(tags, removed);
        removed
    }

    /// True when both handles share the same store.
    pub fn ptr_eq(&self, other: &Api<F>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Builder for [`Api`].
pub struct ApiBuilder<F> {
    fetcher: F,
    config: ApiConfig,
    metrics: Option<Box<dyn CacheMetrics>>,
    ttl_policy: Option<TtlPolicy>,
}

impl<F: Fetcher> ApiBuilder<F> {
    pub fn new(fetcher: F) -> Self {
        ApiBuilder {
            fetcher,
            config: ApiConfig::default(),
            metrics: None,
            ttl_policy: None,
        }
    }

    /// Replace the whole configuration (base URL, headers, default TTL).
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = config;
        self
    }

    /// Prefix prepended to every endpoint URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Header sent with every request unless the endpoint overrides it.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(name.into(), value.into());
        self
    }

    /// Set custom metrics handler.
    pub fn metrics(mut self, metrics: Box<dyn CacheMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Set custom TTL policy. Takes precedence over `default_ttl_secs`.
    pub fn ttl_policy(mut self, policy: TtlPolicy) -> Self {
        self.ttl_policy = Some(policy);
        self
    }

    /// # Errors
    /// Returns `Error::ConfigError` if the configuration is invalid.
    pub fn build(self) -> Result<Api<F>> {
        self.config.validate()?;

        let ttl_policy = self
            .ttl_policy
            .unwrap_or_else(|| self.config.ttl_policy());
        let defaults = self.config.request_defaults();
        info!(
            "✓ Api ready (base_url: {:?}, {} default headers, ttl policy: {:?})",
            defaults.base_url,
            defaults.headers.len(),
            ttl_policy
        );

        Ok(Api {
            inner: Arc::new(ApiInner {
                store: CacheStore::new(),
                fetcher: self.fetcher,
                defaults,
                metrics: self.metrics.unwrap_or_else(|| Box::new(NoOpMetrics)),
                ttl_policy,
                endpoint_seq: AtomicU64::new(1),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::fetch::InMemoryFetcher;
    use std::time::Duration;

    #[test]
    fn test_api_creation() {
        let api = Api::new(InMemoryFetcher::new());
        assert!(api.store().is_empty());
        assert_eq!(api.defaults().base_url, "");
    }

    #[test]
    fn test_api_clone_shares_store() {
        let api1 = Api::new(InMemoryFetcher::new());
        let api2 = api1.clone();
        assert!(api1.ptr_eq(&api2));
        assert!(std::ptr::eq(api1.store(), api2.store()));
    }

    #[test]
    fn test_api_instances_are_independent() {
        let api1 = Api::new(InMemoryFetcher::new());
        let api2 = Api::new(InMemoryFetcher::new());
        assert!(!api1.ptr_eq(&api2));
        assert!(!std::ptr::eq(api1.store(), api2.store()));
    }

    #[test]
    fn test_api_builder_applies_config() {
        let api = Api::builder(InMemoryFetcher::new())
            .base_url("https://fakeapi.com")
            .header("Accept", "application/json")
            .config_ttl(7)
            .build()
            .expect("Failed to build");

        assert_eq!(api.defaults().base_url, "https://fakeapi.com");
        assert_eq!(api.defaults().headers["accept"], "application/json");
        assert_eq!(
            api.ttl_policy().get_ttl("any"),
            Some(Duration::from_secs(7))
        );
    }

    #[test]
    fn test_api_builder_ttl_policy_wins_over_config() {
        let api = Api::builder(InMemoryFetcher::new())
            .config_ttl(7)
            .ttl_policy(TtlPolicy::Default)
            .build()
            .expect("Failed to build");

        assert_eq!(api.ttl_policy().get_ttl("any"), None);
    }

    #[test]
    fn test_api_builder_rejects_invalid_config() {
        let result = Api::builder(InMemoryFetcher::new())
            .header("bad name", "v")
            .build();
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[test]
    fn test_api_endpoint_names() {
        let api = Api::new(InMemoryFetcher::new());
        let first = api.get::<(), ()>(EndpointConfig::new(|_: &()| "/a"));
        let second = api.post::<(), ()>(EndpointConfig::new(|_: &()| "/b"));
        let named = api.get::<(), ()>(EndpointConfig::new(|_: &()| "/c").named("items"));

        assert_eq!(first.name(), "GET:1");
        assert_eq!(second.name(), "POST:2");
        assert_eq!(named.name(), "items");
    }

    #[test]
    fn test_api_invalidate_tags_empty_is_noop() {
        let api = Api::new(InMemoryFetcher::new());
        assert_eq!(api.invalidate_tags(Vec::<String>::new()), 0);
        assert_eq!(api.invalidate_tags(["items"]), 0);
    }

    impl<F: Fetcher> ApiBuilder<F> {
        fn config_ttl(mut self, secs: u64) -> Self {
            self.config.default_ttl_secs = Some(secs);
            self
        }
    }
}
