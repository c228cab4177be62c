//! # query-kit
//!
//! A client-side request cache for JSON APIs, with in-flight deduplication
//! and tag-based invalidation.
//!
//! ## Features
//!
//! - **Deduplication:** concurrent reads of the same request share one fetch
//! - **Tagged invalidation:** mutations evict every cached response carrying
//!   a tag they declare
//! - **Expiry:** per-endpoint or Api-wide TTLs, measured on the tokio clock
//! - **Observable store:** subscribe to every change of the cache
//! - **Transport agnostic:** plug in any [`fetch::Fetcher`]; an in-memory one
//!   and a `reqwest` one (feature `reqwest`) are included
//! - **Production Ready:** Built-in logging, metrics support, and error handling
//!
//! ## Quick Start
//!
//! ```no_run
//! use query_kit::{Api, Endpoint, EndpointConfig, RequestSpec};
//! use query_kit::fetch::InMemoryFetcher;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> query_kit::Result<()> {
//!     // 1. Build an Api around a fetcher
//!     let api = Api::builder(InMemoryFetcher::new())
//!         .base_url("https://fakeapi.com")
//!         .build()?;
//!
//!     // 2. Declare a read endpoint whose responses carry the "items" tag
//!     let items: Endpoint<(), Vec<String>, _> =
//!         api.get(EndpointConfig::new(|_: &()| "/items").tags(["items"]));
//!
//!     // 3. Declare a write endpoint that makes "items" stale
//!     let add_item: Endpoint<String, serde_json::Value, _> =
//!         api.post(
//!             EndpointConfig::new(|name: &String| {
//!                 RequestSpec::new("/items").body(json!({ "name": name }))
//!             })
//!             .invalidates(["items"]),
//!         );
//!
//!     // 4. Concurrent readers share one fetch
//!     let (a, b) = tokio::join!(items.fetch(&()), items.fetch(&()));
//!     assert_eq!(a?, b?);
//!
//!     // 5. A successful mutation evicts the cached list; the next read refetches
//!     add_item.mutation().mutate(&"baz".to_string()).await?;
//!     let fresh = items.fetch(&()).await?;
//!     # let _ = fresh;
//!     Ok(())
//! }
//! ```
//!
//! ### Watching a query
//!
//! ```ignore
//! let mut query = items.query(&())?;
//! loop {
//!     match query.state() {
//!         QueryState::Loading => println!("loading..."),
//!         QueryState::Loaded(list) => println!("{list:?}"),
//!         QueryState::Failed(e) => println!("error: {e}"),
//!     }
//!     query.changed().await?;
//! }
//! ```

#[macro_use]
extern crate log;

pub mod api;
pub mod config;
pub mod endpoint;
pub mod entry;
pub mod error;
pub mod fetch;
pub mod key;
pub mod mutation;
pub mod observability;
pub mod query;
pub mod request;
pub mod store;
pub mod strategy;

// Re-exports for convenience
pub use api::{Api, ApiBuilder};
pub use config::ApiConfig;
pub use endpoint::{Endpoint, EndpointConfig};
pub use error::{Error, Result};
pub use fetch::Fetcher;
pub use mutation::{Mutation, MutationState};
pub use query::{Query, QueryState};
pub use request::{Method, RequestSpec};
pub use strategy::CacheStrategy;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
