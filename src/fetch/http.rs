//! HTTP fetcher backed by `reqwest` (feature `reqwest`).

use super::{Fetcher, Response};
use crate::error::Result;
use crate::request::{Method, Request};
use std::time::Duration;

/// Fetcher that performs real HTTP requests.
///
/// # Example
///
/// ```no_run
/// use query_kit::fetch::ReqwestFetcher;
/// use query_kit::Api;
/// use std::time::Duration;
///
/// # fn main() -> query_kit::Result<()> {
/// let fetcher = ReqwestFetcher::builder()
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// let api = Api::builder(fetcher)
///     .base_url("https://fakeapi.com")
///     .build()?;
/// # let _ = api;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Create a fetcher with reqwest's default client settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing client (connection pool, proxies, TLS settings).
    pub fn with_client(client: reqwest::Client) -> Self {
        ReqwestFetcher { client }
    }

    pub fn builder() -> ReqwestFetcherBuilder {
        ReqwestFetcherBuilder::default()
    }
}

/// Builder for [`ReqwestFetcher`].
#[derive(Debug, Default)]
pub struct ReqwestFetcherBuilder {
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ReqwestFetcherBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// # Errors
    /// Returns `Error::TransportError` if the client cannot be constructed
    /// (e.g. TLS backend initialisation failure).
    pub fn build(self) -> Result<ReqwestFetcher> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }
        Ok(ReqwestFetcher::with_client(builder.build()?))
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
    }
}

impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, request: Request) -> Result<Response> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), &request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            if !request.headers.contains_key("content-type") {
                builder = builder.header("content-type", "application/json");
            }
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        debug!("✓ HTTP {} {} -> {}", request.method, request.url, status);

        Ok(Response::new(status, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_mapping() {
        assert_eq!(to_reqwest_method(Method::Get), reqwest::Method::GET);
        assert_eq!(to_reqwest_method(Method::Patch), reqwest::Method::PATCH);
    }

    #[test]
    fn test_builder() {
        let fetcher = ReqwestFetcher::builder()
            .timeout(Duration::from_secs(1))
            .user_agent("query-kit-test")
            .build();
        assert!(fetcher.is_ok());
    }
}
