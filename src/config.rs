//! Api configuration.
//!
//! `ApiConfig` can be built in code or deserialized from any serde format:
//!
//! ```
//! use query_kit::config::ApiConfig;
//!
//! let config: ApiConfig = serde_json::from_str(r#"{
//!     "base_url": "https://fakeapi.com",
//!     "headers": { "Accept": "application/json" },
//!     "default_ttl_secs": 60
//! }"#).unwrap();
//!
//! assert!(config.validate().is_ok());
//! ```

use crate::error::{Error, Result};
use crate::observability::TtlPolicy;
use crate::request::RequestDefaults;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Request defaults and expiry shared by every endpoint of an `Api`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Prefix prepended to every endpoint URL.
    pub base_url: String,
    /// Headers sent with every request; endpoint headers override them.
    pub headers: BTreeMap<String, String>,
    /// Expiry for endpoints that do not declare a TTL. `None` = no expiry.
    pub default_ttl_secs: Option<u64>,
}

impl ApiConfig {
    /// Check the configuration for values that can never produce a valid request.
    ///
    /// # Errors
    /// Returns `Error::ConfigError` when:
    /// - `base_url` has surrounding whitespace
    /// - a header name is empty or contains whitespace or `:`
    /// - a header value contains a line break
    /// - `default_ttl_secs` is zero
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim() != self.base_url {
            return Err(Error::ConfigError(format!(
                "base_url has surrounding whitespace: {:?}",
                self.base_url
            )));
        }

        for (name, value) in &self.headers {
            if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c == ':') {
                return Err(Error::ConfigError(format!("invalid header name: {:?}", name)));
            }
            if value.contains(['\r', '\n']) {
                return Err(Error::ConfigError(format!(
                    "header {} has a line break in its value",
                    name
                )));
            }
        }

        if self.default_ttl_secs == Some(0) {
            return Err(Error::ConfigError(
                "default_ttl_secs must be positive; omit it for no expiry".to_string(),
            ));
        }

        Ok(())
    }

    /// Request defaults derived from this config. Header names are lower-cased.
    pub fn request_defaults(&self) -> RequestDefaults {
        RequestDefaults {
            base_url: self.base_url.clone(),
            headers: self
                .headers
                .iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
                .collect(),
        }
    }

    /// TTL policy derived from `default_ttl_secs`.
    pub fn ttl_policy(&self) -> TtlPolicy {
        match self.default_ttl_secs {
            Some(secs) => TtlPolicy::Fixed(Duration::from_secs(secs)),
            None => TtlPolicy::Default,
        }
    }
}
