//! Error types for the query cache.

use std::fmt;

/// Result type for query-kit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for query-kit.
///
/// Errors are `Clone` because a single failed fetch is reported to every
/// consumer waiting on the same cache key, and the failure is kept in the
/// store as part of the entry state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The injected fetcher failed to produce a response.
    ///
    /// Common causes:
    /// - Connection refused or reset
    /// - DNS resolution failure
    /// - No route configured on an `InMemoryFetcher`
    ///
    /// **Recovery:** the cache entry is marked `Failed`; call
    /// `Query::refetch()` (or query with `CacheStrategy::Invalidate`) to re-arm it.
    TransportError(String),

    /// A response body or cached payload could not be decoded.
    ///
    /// Raised when:
    /// - The response body is not valid JSON
    /// - The JSON payload does not match the requested Rust type
    DeserializationError(String),

    /// A request body or cache key could not be encoded.
    SerializationError(String),

    /// Cache miss under `CacheStrategy::Fresh`.
    ///
    /// Not necessarily an error condition; only returned when the caller
    /// asked for cache-only reads.
    CacheMiss,

    /// Invalid `ApiConfig` or builder input.
    ///
    /// **Recovery:** fix configuration and rebuild the `Api`.
    ConfigError(String),

    /// Generic error with custom message.
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TransportError(msg) => write!(f, "Transport error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::CacheMiss => write!(f, "Cache miss"),
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Classify a serde_json failure that happened while encoding.
    pub(crate) fn encoding(e: serde_json::Error) -> Self {
        Error::SerializationError(e.to_string())
    }
}

// ============================================================================
// Conversions from other error types
// ============================================================================

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            Error::TransportError(e.to_string())
        } else if e.is_syntax() || e.is_eof() || e.is_data() {
            Error::DeserializationError(e.to_string())
        } else {
            Error::SerializationError(e.to_string())
        }
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::TransportError(format!("reqwest error: {}", e))
    }
}
