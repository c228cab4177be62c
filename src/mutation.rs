//! Writes that bypass the cache and evict what they make stale.

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Observable state of a mutation handle.
#[derive(Clone, Debug, PartialEq)]
pub struct MutationState<T> {
    pub loading: bool,
    /// Result of the last successful call.
    pub data: Option<T>,
    /// Failure of the last call, cleared when a new call starts.
    pub error: Option<Error>,
}

impl<T> Default for MutationState<T> {
    fn default() -> Self {
        MutationState {
            loading: false,
            data: None,
            error: None,
        }
    }
}

/// Write handle for an endpoint.
///
/// Every call issues the request unconditionally; nothing is read from or
/// written to the cache. When the call succeeds, every cached entry tagged
/// with one of the endpoint's `invalidates` tags is evicted in a single store
/// write. Failed calls evict nothing.
///
/// Clones share state.
pub struct Mutation<I, T, F: Fetcher> {
    endpoint: Endpoint<I, T, F>,
    state: Arc<watch::Sender<MutationState<T>>>,
}

impl<I, T, F: Fetcher> Clone for Mutation<I, T, F> {
    fn clone(&self) -> Self {
        Mutation {
            endpoint: self.endpoint.clone(),
            state: Arc::clone(&self.state),
        }
    }
}

impl<I, T, F: Fetcher> Mutation<I, T, F> {
    pub(crate) fn new(endpoint: Endpoint<I, T, F>) -> Self {
        let (state, _) = watch::channel(MutationState::default());
        Mutation {
            endpoint,
            state: Arc::new(state),
        }
    }

    pub fn endpoint(&self) -> &Endpoint<I, T, F> {
        &self.endpoint
    }
}

impl<I, T, F> Mutation<I, T, F>
where
    T: DeserializeOwned + Clone,
    F: Fetcher,
{
    /// Snapshot of the handle's state.
    pub fn state(&self) -> MutationState<T> {
        self.state.borrow().clone()
    }

    /// Receive every state change of this handle.
    pub fn subscribe(&self) -> watch::Receiver<MutationState<T>> {
        self.state.subscribe()
    }

    /// Issue the request for `input`.
    ///
    /// # Errors
    /// Returns the fetch failure or a decode error. The error is also kept in
    /// the handle's state.
    pub async fn mutate(&self, input: &I) -> Result<T> {
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        match self.endpoint.send(input).await {
            Ok(data) => {
                self.state.send_modify(|state| {
                    state.loading = false;
                    state.data = Some(data.clone());
                });
                let removed = self.endpoint.api().sweep(self.endpoint.invalidated_tags());
                info!(
                    "✓ Mutation {} succeeded, {} cached entries invalidated",
                    self.endpoint.name(),
                    removed
                );
                Ok(data)
            }
            Err(error) => {
                self.state.send_modify(|state| {
                    state.loading = false;
                    state.error = Some(error.clone());
                });
                warn!("✗ Mutation {} failed: {}", self.endpoint.name(), error);
                Err(error)
            }
        }
    }

    /// Run `mutate` on a background task.
    pub fn spawn(&self, input: I) -> JoinHandle<Result<T>>
    where
        I: Send + Sync + 'static,
        T: Send + Sync + 'static,
    {
        let mutation = self.clone();
        tokio::spawn(async move { mutation.mutate(&input).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Api;
    use crate::endpoint::EndpointConfig;
    use crate::fetch::InMemoryFetcher;
    use crate::request::Method;
    use serde_json::{json, Value};

    #[tokio::test]
    async fn test_mutation_state_transitions() {
        let fetcher = InMemoryFetcher::new();
        fetcher
            .route(Method::Post, "/items", &json!({ "id": 1 }))
            .expect("Failed to route");
        let api = Api::new(fetcher.clone());
        let create: Endpoint<(), Value, _> = api.post(EndpointConfig::new(|_: &()| "/items"));

        let mutation = create.mutation();
        assert_eq!(mutation.state(), MutationState::default());

        let data = mutation.mutate(&()).await.expect("Failed to mutate");
        assert_eq!(data, json!({ "id": 1 }));

        let state = mutation.state();
        assert!(!state.loading);
        assert_eq!(state.data, Some(json!({ "id": 1 })));
        assert_eq!(state.error, None);
    }

    #[tokio::test]
    async fn test_mutation_failure_is_recorded() {
        let fetcher = InMemoryFetcher::new();
        fetcher.fail(Method::Delete, "/items/1", "refused");
        let api = Api::new(fetcher);
        let remove: Endpoint<u32, Value, _> =
            api.delete(EndpointConfig::new(|id: &u32| format!("/items/{id}")));

        let mutation = remove.mutation();
        let result = mutation.mutate(&1).await;

        let expected = Error::TransportError("refused".to_string());
        assert_eq!(result, Err(expected.clone()));
        assert_eq!(mutation.state().error, Some(expected));
        assert!(!mutation.state().loading);
    }

    #[tokio::test]
    async fn test_mutation_spawn() {
        let fetcher = InMemoryFetcher::new();
        fetcher
            .route(Method::Put, "/items/2", &json!("ok"))
            .expect("Failed to route");
        let api = Api::new(fetcher.clone());
        let update: Endpoint<u32, String, _> =
            api.put(EndpointConfig::new(|id: &u32| format!("/items/{id}")));

        let handle = update.mutation().spawn(2);
        let result = handle.await.expect("Task failed");

        assert_eq!(result, Ok("ok".to_string()));
        assert_eq!(fetcher.calls(Method::Put, "/items/2"), 1);
    }

    #[tokio::test]
    async fn test_mutation_handles_are_independent() {
        let fetcher = InMemoryFetcher::new();
        fetcher
            .route(Method::Post, "/items", &json!(1))
            .expect("Failed to route");
        let api = Api::new(fetcher);
        let create: Endpoint<(), u32, _> = api.post(EndpointConfig::new(|_: &()| "/items"));

        let first = create.mutation();
        let second = create.mutation();
        first.mutate(&()).await.expect("Failed to mutate");

        assert_eq!(first.state().data, Some(1));
        assert_eq!(second.state().data, None);
    }
}
