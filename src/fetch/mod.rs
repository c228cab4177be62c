//! Fetcher implementations: the injected network operation.

use crate::error::{Error, Result};
use crate::request::Request;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;

pub mod memory;
#[cfg(feature = "reqwest")]
pub mod http;

pub use memory::InMemoryFetcher;
#[cfg(feature = "reqwest")]
pub use http::ReqwestFetcher;

/// Raw response produced by a fetcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Response {
            status,
            body: body.into(),
        }
    }

    /// A 200 response whose body is `value` encoded as JSON.
    ///
    /// # Errors
    /// Returns `Error::SerializationError` if `value` cannot be encoded.
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value).map_err(Error::encoding)?;
        Ok(Response::new(200, body))
    }

    /// Parse the body as an untyped JSON value.
    ///
    /// # Errors
    /// Returns `Error::DeserializationError` if the body is not valid JSON.
    pub fn json_value(&self) -> Result<Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Parse the body into `T`.
    ///
    /// # Errors
    /// Returns `Error::DeserializationError` if the body does not decode into `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Trait for the network operation the engine delegates to.
///
/// The engine treats a fetch as opaque: it passes the resolved request
/// unmodified and only requires a JSON-decodable body on success. Status codes
/// are not interpreted.
///
/// Fetches run on spawned tokio tasks, so the returned future must be `Send`
/// and the fetcher must be shareable across threads.
///
/// # Example
///
/// ```
/// use query_kit::fetch::{Fetcher, Response};
/// use query_kit::request::Request;
/// use query_kit::Result;
///
/// struct Echo;
///
/// impl Fetcher for Echo {
///     async fn fetch(&self, request: Request) -> Result<Response> {
///         Response::json(&request.url)
///     }
/// }
/// ```
pub trait Fetcher: Send + Sync + 'static {
    /// Perform the request.
    ///
    /// # Errors
    /// Returns `Err` (typically `Error::TransportError`) if no response could
    /// be obtained.
    fn fetch(&self, request: Request) -> impl Future<Output = Result<Response>> + Send;
}

/// Adapter turning an async closure into a [`Fetcher`].
///
/// ```
/// use query_kit::fetch::{FnFetcher, Response};
///
/// let fetcher = FnFetcher::new(|request: query_kit::request::Request| async move {
///     Response::json(&vec![request.url])
/// });
/// # let _ = fetcher;
/// ```
#[derive(Clone)]
pub struct FnFetcher<Fun> {
    fun: Fun,
}

impl<Fun> FnFetcher<Fun> {
    pub fn new(fun: Fun) -> Self {
        FnFetcher { fun }
    }
}

impl<Fun, Fut> Fetcher for FnFetcher<Fun>
where
    Fun: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response>> + Send,
{
    fn fetch(&self, request: Request) -> impl Future<Output = Result<Response>> + Send {
        (self.fun)(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Method;
    use serde_json::json;

    #[test]
    fn test_response_json_roundtrip() {
        let response = Response::json(&json!({ "id": 1 })).expect("Failed to encode");
        assert_eq!(response.status, 200);
        assert_eq!(response.json_value().expect("Failed to parse"), json!({ "id": 1 }));
    }

    #[test]
    fn test_response_invalid_json() {
        let response = Response::new(200, "<html>");
        assert!(matches!(
            response.json_value(),
            Err(Error::DeserializationError(_))
        ));
    }

    #[test]
    fn test_response_typed_parse() {
        let response = Response::new(200, "[1,2,3]");
        let parsed: Vec<u8> = response.parse().expect("Failed to parse");
        assert_eq!(parsed, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fn_fetcher() {
        let fetcher = FnFetcher::new(|request: Request| async move {
            Response::json(&json!({ "url": request.url }))
        });

        let response = fetcher
            .fetch(Request::new(Method::Get, "/items"))
            .await
            .expect("Failed to fetch");
        assert_eq!(
            response.json_value().expect("Failed to parse"),
            json!({ "url": "/items" })
        );
    }
}
