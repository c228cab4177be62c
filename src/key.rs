//! Cache key derivation.

use crate::error::{Error, Result};
use crate::request::{Method, Request};
use serde::Serialize;
use std::collections::BTreeMap;

/// Canonical fields of a request that participate in the fingerprint.
///
/// Serialized as a JSON array so that every field is delimited and escaped.
#[derive(Serialize)]
struct Fingerprint<'a>(
    &'a str,
    Method,
    &'a str,
    &'a BTreeMap<String, String>,
    Option<&'a str>,
);

/// Builder for cache keys.
pub struct CacheKeyBuilder;

impl CacheKeyBuilder {
    /// Derive the cache key for a resolved request of the named endpoint.
    ///
    /// The key is a pure function of the endpoint identity, method, resolved
    /// URL, headers and body. Headers are kept in a sorted map, so equal
    /// requests always produce identical keys, and any differing field
    /// produces a different key.
    ///
    /// # Example
    ///
    /// ```
    /// use query_kit::key::CacheKeyBuilder;
    /// use query_kit::request::{Method, Request};
    ///
    /// let request = Request::new(Method::Get, "https://api.test/items");
    /// let key = CacheKeyBuilder::derive("items", &request).unwrap();
    /// assert_eq!(key, r#"["items","GET","https://api.test/items",{},null]"#);
    /// ```
    ///
    /// # Errors
    /// Returns `Error::SerializationError` if the fingerprint cannot be encoded.
    pub fn derive(endpoint: &str, request: &Request) -> Result<String> {
        let fingerprint = Fingerprint(
            endpoint,
            request.method,
            &request.url,
            &request.headers,
            request.body.as_deref(),
        );
        serde_json::to_string(&fingerprint).map_err(Error::encoding)
    }

    /// Build composite label from multiple parts.
    pub fn build_composite(parts: &[&str]) -> String {
        parts.join(":")
    }
}
