//! Request descriptions and their resolution against API defaults.
//!
//! An endpoint turns its input into a [`RequestSpec`]: either a bare path
//! (`"/items/1"`) or a path plus header overrides and a JSON body. The
//! [`RequestDefaults`] owned by the `Api` resolve it into the concrete
//! [`Request`] handed to the fetcher and used for cache key derivation.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// HTTP method of an endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an endpoint produces for one input, before defaults are applied.
///
/// # Example
///
/// ```
/// use query_kit::request::RequestSpec;
/// use serde_json::json;
///
/// let plain: RequestSpec = "/items".into();
/// let detailed = RequestSpec::new("/items")
///     .header("X-Trace", "abc")
///     .body(json!({ "name": "widget" }));
/// assert_eq!(plain.url(), detailed.url());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestSpec {
    url: String,
    headers: BTreeMap<String, String>,
    body: Option<Value>,
}

impl RequestSpec {
    pub fn new(url: impl Into<String>) -> Self {
        RequestSpec {
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    /// Add a header override. Header names are case-insensitive.
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Attach a JSON body.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach any serializable value as the JSON body.
    ///
    /// # Errors
    /// Returns `Error::SerializationError` if `body` cannot be represented as JSON.
    pub fn json<B: Serialize>(self, body: &B) -> Result<Self> {
        let value = serde_json::to_value(body).map_err(Error::encoding)?;
        Ok(self.body(value))
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl From<&str> for RequestSpec {
    fn from(url: &str) -> Self {
        RequestSpec::new(url)
    }
}

impl From<String> for RequestSpec {
    fn from(url: String) -> Self {
        RequestSpec::new(url)
    }
}

impl From<&String> for RequestSpec {
    fn from(url: &String) -> Self {
        RequestSpec::new(url.as_str())
    }
}

/// A fully resolved request: what the fetcher receives and what the cache
/// key is derived from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Request {
    pub method: Method,
    pub url: String,
    /// Lower-cased header names, sorted.
    pub headers: BTreeMap<String, String>,
    /// Serialized JSON body, if any.
    pub body: Option<String>,
}

impl Request {
    /// Convenience constructor for a body-less request.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Request {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
        }
    }
}

/// Base URL and default headers applied to every request of an `Api`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestDefaults {
    pub base_url: String,
    pub headers: BTreeMap<String, String>,
}

impl RequestDefaults {
    /// Build the concrete request for an endpoint.
    ///
    /// The base URL is prefixed verbatim. Default headers are merged first and
    /// then overridden by the endpoint's own headers. The body is always
    /// serialized from its JSON value. The method is fixed by the endpoint.
    ///
    /// # Errors
    /// Returns `Error::SerializationError` if the body cannot be serialized.
    pub fn resolve(&self, method: Method, spec: RequestSpec) -> Result<Request> {
        let mut headers = self.headers.clone();
        headers.extend(spec.headers);

        let body = match spec.body {
            Some(value) => Some(serde_json::to_string(&value).map_err(Error::encoding)?),
            None => None,
        };

        Ok(Request {
            method,
            url: format!("{}{}", self.base_url, spec.url),
            headers,
            body,
        })
    }
}
