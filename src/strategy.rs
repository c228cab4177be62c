//! Read strategies for the query engine.
//!
//! Every query runs under one of three strategies:
//!
//! ```
//! use query_kit::strategy::CacheStrategy;
//!
//! // 1. Refresh - cache-first, fetch on miss or expiry (default)
//! let _s = CacheStrategy::Refresh;
//!
//! // 2. Fresh - cache only, never fetch
//! let _s = CacheStrategy::Fresh;
//!
//! // 3. Invalidate - discard the settled entry and fetch again
//! let _s = CacheStrategy::Invalidate;
//! ```
//!
//! | Strategy | Live entry | Missing / expired | Failed | In flight |
//! |----------|-----------|-------------------|--------|-----------|
//! | **Refresh** | Return | Claim + fetch | Return failure | Join |
//! | **Fresh** | Return | `Error::CacheMiss` | Return failure | Join |
//! | **Invalidate** | Claim + fetch | Claim + fetch | Claim + fetch | Join |
//!
//! No strategy starts a second fetch for a key whose fetch is still in
//! flight.

/// Strategy enum controlling read-path behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CacheStrategy {
    /// **Fresh**: Answer from cache only.
    ///
    /// Flow:
    /// 1. Check cache
    /// 2. If live: return cached value
    /// 3. If in flight: wait for it
    /// 4. Otherwise: `Error::CacheMiss` (no fetch)
    Fresh,

    /// **Refresh**: Cache first, fetch on miss.
    ///
    /// Flow:
    /// 1. Check cache
    /// 2. If live: return cached value
    /// 3. If in flight: wait for it
    /// 4. If missing or expired: claim the key, fetch, store
    /// 5. If failed: return the failure until re-armed
    #[default]
    Refresh,

    /// **Invalidate**: Re-fetch regardless of the settled entry.
    ///
    /// Use to re-arm a failed key or force fresh data.
    ///
    /// Flow:
    /// 1. If in flight: wait for it
    /// 2. Otherwise: claim the key, fetch, store
    Invalidate,
}

impl std::fmt::Display for CacheStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheStrategy::Fresh => write!(f, "Fresh"),
            CacheStrategy::Refresh => write!(f, "Refresh"),
            CacheStrategy::Invalidate => write!(f, "Invalidate"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_display() {
        assert_eq!(CacheStrategy::Fresh.to_string(), "Fresh");
        assert_eq!(CacheStrategy::Refresh.to_string(), "Refresh");
        assert_eq!(CacheStrategy::Invalidate.to_string(), "Invalidate");
    }

    #[test]
    fn test_strategy_default() {
        assert_eq!(CacheStrategy::default(), CacheStrategy::Refresh);
    }

    #[test]
    fn test_strategy_equality() {
        assert_eq!(CacheStrategy::Fresh, CacheStrategy::Fresh);
        assert_ne!(CacheStrategy::Fresh, CacheStrategy::Refresh);
    }
}
