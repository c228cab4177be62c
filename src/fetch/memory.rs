//! Scripted in-memory fetcher for tests, demos and offline development.
//!
//! Routes are matched on `(method, url)`. Every call is counted and recorded,
//! which is what lets tests assert how many network operations the engine
//! actually issued.

use super::{Fetcher, Response};
use crate::error::{Error, Result};
use crate::request::{Method, Request};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder = dyn Fn(&Request) -> Result<Response> + Send + Sync;

/// Thread-safe scripted fetcher.
///
/// Clones share routes, counters and history.
///
/// # Example
///
/// ```no_run
/// use query_kit::fetch::{Fetcher, InMemoryFetcher};
/// use query_kit::request::{Method, Request};
/// use serde_json::json;
///
/// #[tokio::main]
/// async fn main() -> query_kit::Result<()> {
///     let fetcher = InMemoryFetcher::new();
///     fetcher.route(Method::Get, "/items", &json!(["foo", "bar"]))?;
///
///     let response = fetcher.fetch(Request::new(Method::Get, "/items")).await?;
///     assert_eq!(response.json_value()?, json!(["foo", "bar"]));
///     assert_eq!(fetcher.calls(Method::Get, "/items"), 1);
///     Ok(())
/// }
/// ```
#[derive(Clone, Default)]
pub struct InMemoryFetcher {
    routes: Arc<DashMap<(Method, String), Arc<Responder>>>,
    calls: Arc<DashMap<(Method, String), usize>>,
    total: Arc<AtomicUsize>,
    history: Arc<Mutex<Vec<Request>>>,
    latency: Option<Duration>,
}

impl InMemoryFetcher {
    /// Create a fetcher with no routes and no latency.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `latency` (uses the tokio clock).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Answer `method url` with `body` encoded as JSON.
    ///
    /// # Errors
    /// Returns `Error::SerializationError` if `body` cannot be encoded.
    pub fn route<B: Serialize>(&self, method: Method, url: &str, body: &B) -> Result<()> {
        let response = Response::json(body)?;
        self.route_fn(method, url, move |_| Ok(response.clone()));
        Ok(())
    }

    /// Answer `method url` by calling `responder` with the request.
    pub fn route_fn<R>(&self, method: Method, url: &str, responder: R)
    where
        R: Fn(&Request) -> Result<Response> + Send + Sync + 'static,
    {
        self.routes
            .insert((method, url.to_string()), Arc::new(responder));
        debug!("✓ InMemory ROUTE {} {}", method, url);
    }

    /// Make `method url` fail with a transport error.
    pub fn fail(&self, method: Method, url: &str, message: &str) {
        let message = message.to_string();
        self.route_fn(method, url, move |_| {
            Err(Error::TransportError(message.clone()))
        });
    }

    /// Number of fetches issued for `method url`.
    pub fn calls(&self, method: Method, url: &str) -> usize {
        self.calls
            .get(&(method, url.to_string()))
            .map(|count| *count)
            .unwrap_or(0)
    }

    /// Number of fetches issued for any route.
    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// Every request received, in arrival order.
    pub fn requests(&self) -> Vec<Request> {
        match self.history.lock() {
            Ok(history) => history.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, request: &Request) {
        *self
            .calls
            .entry((request.method, request.url.clone()))
            .or_insert(0) += 1;
        self.total.fetch_add(1, Ordering::SeqCst);
        match self.history.lock() {
            Ok(mut history) => history.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }
    }
}

impl Fetcher for InMemoryFetcher {
    async fn fetch(&self, request: Request) -> Result<Response> {
        self.record(&request);

        // Clone the responder out so no map guard is held across the await.
        let responder = self
            .routes
            .get(&(request.method, request.url.clone()))
            .map(|route| Arc::clone(route.value()));

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match responder {
            Some(responder) => {
                debug!("✓ InMemory FETCH {} {}", request.method, request.url);
                responder(&request)
            }
            None => {
                debug!("✗ InMemory FETCH {} {} -> no route", request.method, request.url);
                Err(Error::TransportError(format!(
                    "no route for {} {}",
                    request.method, request.url
                )))
            }
        }
    }
}
