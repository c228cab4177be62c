//! Endpoint declarations.
//!
//! An endpoint turns a typed input into a concrete request. Reads go through
//! [`Endpoint::query`], writes through [`Endpoint::mutation`]; both share the
//! owning `Api`'s store.

use crate::api::Api;
use crate::entry::TagSet;
use crate::error::Result;
use crate::fetch::Fetcher;
use crate::key::CacheKeyBuilder;
use crate::mutation::Mutation;
use crate::query::{FetchPlan, Query};
use crate::request::{Method, Request, RequestSpec};
use crate::strategy::CacheStrategy;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

type RequestFn<I> = dyn Fn(&I) -> RequestSpec + Send + Sync;

/// Declaration of one endpoint: how to build its request and how its
/// responses are cached.
///
/// ```
/// use query_kit::{EndpointConfig, RequestSpec};
/// use std::time::Duration;
///
/// let by_id = EndpointConfig::new(|id: &u32| format!("/items/{id}"))
///     .ttl(Duration::from_secs(30))
///     .tags(["items"]);
///
/// let create = EndpointConfig::new(|name: &String| {
///     RequestSpec::new("/items").body(serde_json::json!({ "name": name }))
/// })
/// .invalidates(["items"]);
/// # let _ = (by_id, create);
/// ```
pub struct EndpointConfig<I> {
    request: Arc<RequestFn<I>>,
    ttl: Option<Duration>,
    tags: Arc<TagSet>,
    invalidates: Arc<TagSet>,
    name: Option<String>,
}

impl<I> EndpointConfig<I> {
    /// `request` maps an input to a URL path (`&str`/`String`) or a full
    /// [`RequestSpec`].
    pub fn new<R, S>(request: R) -> Self
    where
        I: 'static,
        R: Fn(&I) -> S + Send + Sync + 'static,
        S: Into<RequestSpec>,
    {
        EndpointConfig {
            request: Arc::new(move |input: &I| request(input).into()),
            ttl: None,
            tags: Arc::new(TagSet::new()),
            invalidates: Arc::new(TagSet::new()),
            name: None,
        }
    }

    /// Cached responses expire this long after their fetch completes.
    /// `Duration::ZERO` means no expiry.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn ttl_secs(self, secs: u64) -> Self {
        self.ttl(Duration::from_secs(secs))
    }

    /// Tags attached to every entry this endpoint caches.
    pub fn tags<It, S>(mut self, tags: It) -> Self
    where
        It: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Arc::new(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Tags whose entries are evicted after a successful mutation.
    pub fn invalidates<It, S>(mut self, tags: It) -> Self
    where
        It: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.invalidates = Arc::new(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Explicit endpoint name. Used in cache keys and by `TtlPolicy::PerEndpoint`.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl<I> fmt::Debug for EndpointConfig<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfig")
            .field("name", &self.name)
            .field("ttl", &self.ttl)
            .field("tags", &self.tags)
            .field("invalidates", &self.invalidates)
            .finish_non_exhaustive()
    }
}

/// An endpoint bound to an [`Api`], producing `T` from input `I`.
pub struct Endpoint<I, T, F: Fetcher> {
    api: Api<F>,
    name: Arc<str>,
    method: Method,
    config: Arc<EndpointConfig<I>>,
    _payload: PhantomData<fn() -> T>,
}

impl<I, T, F: Fetcher> Clone for Endpoint<I, T, F> {
    fn clone(&self) -> Self {
        Endpoint {
            api: self.api.clone(),
            name: Arc::clone(&self.name),
            method: self.method,
            config: Arc::clone(&self.config),
            _payload: PhantomData,
        }
    }
}

impl<I, T, F: Fetcher> Endpoint<I, T, F> {
    pub(crate) fn new(api: Api<F>, name: String, method: Method, config: EndpointConfig<I>) -> Self {
        Endpoint {
            api,
            name: name.into(),
            method,
            config: Arc::new(config),
            _payload: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn tags(&self) -> &TagSet {
        &self.config.tags
    }

    pub fn invalidated_tags(&self) -> &TagSet {
        &self.config.invalidates
    }

    pub fn api(&self) -> &Api<F> {
        &self.api
    }

    /// Effective expiry: the endpoint's own TTL, else the Api's policy.
    /// A zero TTL means no expiry.
    pub fn ttl(&self) -> Option<Duration> {
        self.config
            .ttl
            .or_else(|| self.api.ttl_policy().get_ttl(&self.name))
            .filter(|ttl| !ttl.is_zero())
    }

    /// The concrete request issued for `input`.
    ///
    /// # Errors
    /// Returns `Error::SerializationError` if the request body cannot be encoded.
    pub fn resolve(&self, input: &I) -> Result<Request> {
        let spec = (self.config.request)(input);
        self.api.defaults().resolve(self.method, spec)
    }

    /// Cache key under which the response for `input` is stored.
    ///
    /// # Errors
    /// Returns `Error::SerializationError` if the request cannot be resolved.
    pub fn key(&self, input: &I) -> Result<String> {
        CacheKeyBuilder::derive(&self.name, &self.resolve(input)?)
    }

    fn plan(&self, input: &I) -> Result<FetchPlan> {
        let request = self.resolve(input)?;
        let key = CacheKeyBuilder::derive(&self.name, &request)?;
        Ok(FetchPlan {
            key,
            request,
            tags: Arc::clone(&self.config.tags),
            ttl: self.ttl(),
        })
    }
}

impl<I, T, F> Endpoint<I, T, F>
where
    T: DeserializeOwned,
    F: Fetcher,
{
    /// Start a cached read for `input` with the default strategy.
    ///
    /// If no live entry exists the key is claimed and a fetch is started
    /// immediately; callers that ask for the same key in the meantime join it.
    ///
    /// # Errors
    /// Returns `Error::SerializationError` if the request cannot be resolved.
    pub fn query(&self, input: &I) -> Result<Query<T, F>> {
        self.query_with(input, CacheStrategy::default())
    }

    /// Start a cached read for `input` under `strategy`.
    ///
    /// # Errors
    /// Returns `Error::SerializationError` if the request cannot be resolved.
    pub fn query_with(&self, input: &I, strategy: CacheStrategy) -> Result<Query<T, F>> {
        let plan = self.plan(input)?;
        Ok(Query::start(self.api.clone(), plan, strategy))
    }

    /// Read `input` through the cache and wait for the result.
    ///
    /// # Errors
    /// Returns the fetch failure, a decode error, or `Error::SerializationError`
    /// if the request cannot be resolved.
    pub async fn fetch(&self, input: &I) -> Result<T> {
        self.query(input)?.wait().await
    }

    /// Read several inputs concurrently. Duplicate inputs share one fetch.
    pub async fn fetch_many(&self, inputs: &[I]) -> Vec<Result<T>> {
        futures::future::join_all(inputs.iter().map(|input| self.fetch(input))).await
    }

    /// Issue the request for `input` directly, bypassing the cache.
    pub(crate) async fn send(&self, input: &I) -> Result<T> {
        let request = self.resolve(input)?;
        debug!("» {} {} ({})", request.method, request.url, self.name);
        let response = self.api.fetcher().fetch(request).await?;
        response.parse()
    }

    /// Write handle for this endpoint.
    ///
    /// Each call returns an independent handle with its own state.
    pub fn mutation(&self) -> Mutation<I, T, F> {
        Mutation::new(self.clone())
    }
}

impl<I, T, F: Fetcher> fmt::Debug for Endpoint<I, T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("config", &self.config)
            .finish()
    }
}
