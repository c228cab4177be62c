//! Basic usage example of the query cache.

use query_kit::fetch::{FnFetcher, Response};
use query_kit::request::Request;
use query_kit::{
    Api, CacheStrategy, Endpoint, EndpointConfig, Error, Method, QueryState, RequestSpec, Result,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Example entity: Item
#[derive(Clone, Serialize, Deserialize, Debug)]
struct Item {
    id: u32,
    name: String,
}

/// Mock server that simulates a JSON API
#[derive(Clone, Default)]
struct ItemServer {
    items: Arc<Mutex<Vec<Item>>>,
}

impl ItemServer {
    fn seeded() -> Self {
        let server = ItemServer::default();
        if let Ok(mut items) = server.items.lock() {
            items.push(Item { id: 1, name: "foo".to_string() });
            items.push(Item { id: 2, name: "bar".to_string() });
        }
        server
    }

    async fn handle(&self, request: Request) -> Result<Response> {
        println!("  [HTTP] {} {}", request.method, request.url);
        tokio::time::sleep(Duration::from_millis(20)).await;

        let mut items = self
            .items
            .lock()
            .map_err(|_| Error::Other("server state poisoned".to_string()))?;
        let path = request.url.trim_start_matches("https://fakeapi.com");

        match (request.method, path) {
            (Method::Get, "/items") => Response::json(&*items),
            (Method::Post, "/items") => {
                let body: Value = serde_json::from_str(request.body.as_deref().unwrap_or("{}"))?;
                let name = body["name"].as_str().unwrap_or("unnamed").to_string();
                let item = Item {
                    id: items.iter().map(|i| i.id).max().unwrap_or(0) + 1,
                    name,
                };
                items.push(item.clone());
                Response::json(&item)
            }
            (Method::Delete, path) => {
                let id: u32 = path
                    .trim_start_matches("/items/")
                    .parse()
                    .map_err(|_| Error::TransportError(format!("bad path {}", path)))?;
                items.retain(|item| item.id != id);
                Response::json(&json!({ "deleted": id }))
            }
            _ => Ok(Response::new(404, "null")),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .try_init()
        .ok();

    println!("\n=== Query Kit - Basic Example ===\n");

    // 1. Build the Api around a fetcher
    println!("1. Building the Api...");
    let handler = ItemServer::seeded();
    let api = Api::builder(FnFetcher::new(move |request: Request| {
        let handler = handler.clone();
        async move { handler.handle(request).await }
    }))
    .base_url("https://fakeapi.com")
    .header("Accept", "application/json")
    .build()?;

    let items: Endpoint<(), Vec<Item>, _> = api.get(
        EndpointConfig::new(|_: &()| "/items")
            .named("items")
            .tags(["items"])
            .ttl_secs(60),
    );
    let add_item: Endpoint<String, Item, _> = api.post(
        EndpointConfig::new(|name: &String| {
            RequestSpec::new("/items").body(json!({ "name": name }))
        })
        .invalidates(["items"]),
    );
    let delete_item: Endpoint<u32, Value, _> = api.delete(
        EndpointConfig::new(|id: &u32| format!("/items/{}", id)).invalidates(["items"]),
    );
    println!("   ✓ Api ready\n");

    // 2. Two readers at once - one request
    println!("2. Two simultaneous readers:");
    let (a, b) = tokio::join!(items.fetch(&()), items.fetch(&()));
    println!("   ✓ Reader A: {:?}", a?);
    println!("   ✓ Reader B: {:?}\n", b?);

    // 3. Cache hit
    println!("3. Reading again (cache hit):");
    let query = items.query(&())?;
    if let QueryState::Loaded(list) = query.state() {
        println!("   ✓ Served from cache: {} items\n", list.len());
    }

    // 4. Mutation invalidates the list
    println!("4. Adding an item:");
    let created = add_item.mutation().mutate(&"baz".to_string()).await?;
    println!("   ✓ Created {:?}", created);
    println!("   ✓ List after invalidation: {:?}\n", items.fetch(&()).await?);

    // 5. Watching a query across a delete
    println!("5. Watching the list while deleting item 1:");
    let mut watched = items.query(&())?;
    let deleter = delete_item.mutation();
    let pending = deleter.spawn(1);
    watched.changed().await?;
    println!("   ✓ List evicted, reloading...");
    println!("   ✓ Watched list: {:?}", watched.wait().await?);
    pending
        .await
        .map_err(|e| Error::Other(e.to_string()))??;
    println!();

    // 6. Fresh strategy - cache only
    println!("6. Fresh strategy (cache only) on an unknown endpoint:");
    let missing: Endpoint<(), Value, _> = api.get(EndpointConfig::new(|_: &()| "/missing"));
    match missing.query_with(&(), CacheStrategy::Fresh)?.state() {
        QueryState::Failed(Error::CacheMiss) => println!("   ✓ Cache miss, no request issued\n"),
        other => println!("   ? Unexpected state: {:?}\n", other),
    }

    api.store().log_stats();
    let stats = api.store().stats();
    println!(
        "=== Store: {} entries ({} loaded, {} pending) ===\n",
        stats.total_entries, stats.loaded_entries, stats.pending_entries
    );

    Ok(())
}
