//! Performance benchmarks for query-kit
//!
//! This benchmark suite measures:
//! - Cache key derivation across body sizes
//! - Read path (cache hit, forced refetch, concurrent dedup)
//! - Tag invalidation sweeps across store sizes
//!
//! Run with: cargo bench
//! View results: open target/criterion/report/index.html

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use query_kit::entry::{CacheEntry, TagSet};
use query_kit::fetch::InMemoryFetcher;
use query_kit::key::CacheKeyBuilder;
use query_kit::request::Request;
use query_kit::store::CacheStore;
use query_kit::{Api, CacheStrategy, Endpoint, EndpointConfig, Method};
use serde_json::json;
use std::hint::black_box;
use std::sync::Arc;

// ============================================================================
// Benchmark Fixtures
// ============================================================================

const SIZES: [usize; 3] = [100, 1_000, 10_000];

fn payload_api() -> (Api<InMemoryFetcher>, Endpoint<usize, Vec<u8>, InMemoryFetcher>) {
    let fetcher = InMemoryFetcher::new();
    for size in SIZES {
        fetcher
            .route(Method::Get, &format!("/payload/{}", size), &vec![7u8; size])
            .expect("Failed to route");
    }
    let api = Api::new(fetcher);
    let payload = api.get(
        EndpointConfig::new(|size: &usize| format!("/payload/{}", size)).tags(["payload"]),
    );
    (api, payload)
}

fn filled_store(entries: usize) -> CacheStore {
    let store = CacheStore::new();
    store.write(|snapshot| {
        Arc::new(snapshot.with_entries((0..entries).map(|i| {
            let tag = if i % 2 == 0 { "even" } else { "odd" };
            let tags: TagSet = [tag.to_string()].into_iter().collect();
            CacheEntry::pending(format!("key-{}", i), Arc::new(tags), i as u64)
                .loaded(Arc::new(json!(i)), None)
        })))
    });
    store
}

// ============================================================================
// Key Derivation
// ============================================================================

fn key_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("key");

    for size in SIZES {
        let mut request = Request::new(Method::Post, "https://fakeapi.com/items");
        request
            .headers
            .insert("authorization".to_string(), "Bearer token".to_string());
        request.body = Some("x".repeat(size));

        group
            .throughput(Throughput::Bytes(size as u64))
            .bench_with_input(BenchmarkId::new("derive", size), &request, |b, request| {
                b.iter(|| CacheKeyBuilder::derive(black_box("items"), black_box(request)))
            });
    }

    group.finish();
}

// ============================================================================
// Read Path
// ============================================================================

fn read_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");
    let rt = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");

    for size in SIZES {
        // Cache hit: payload decoded from the stored JSON
        group
            .throughput(Throughput::Bytes(size as u64))
            .bench_with_input(BenchmarkId::new("hit", size), &size, |b, &size| {
                let (_api, payload) = rt.block_on(async {
                    let (api, payload) = payload_api();
                    payload.fetch(&size).await.expect("Failed to warm cache");
                    (api, payload)
                });

                b.to_async(&rt)
                    .iter(|| async { payload.fetch(black_box(&size)).await });
            });

        // Forced refetch: claim, fetch, settle, decode
        group
            .throughput(Throughput::Bytes(size as u64))
            .bench_with_input(BenchmarkId::new("refetch", size), &size, |b, &size| {
                let (_api, payload) = payload_api();

                b.to_async(&rt).iter(|| async {
                    payload
                        .query_with(black_box(&size), CacheStrategy::Invalidate)
                        .expect("Failed to query")
                        .wait()
                        .await
                });
            });
    }

    // Concurrent readers joining one fetch
    group.bench_function("dedup_16", |b| {
        let (_api, payload) = payload_api();

        b.to_async(&rt).iter(|| async {
            let first = payload
                .query_with(&100, CacheStrategy::Invalidate)
                .expect("Failed to query");
            drop(first);
            payload.fetch_many(&[100; 16]).await
        });
    });

    group.finish();
}

// ============================================================================
// Invalidation
// ============================================================================

fn invalidation_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("invalidate");
    let even: TagSet = ["even".to_string()].into_iter().collect();

    for entries in [100, 1_000, 10_000] {
        group.bench_with_input(
            BenchmarkId::new("sweep_half", entries),
            &entries,
            |b, &entries| {
                b.iter_batched(
                    || filled_store(entries),
                    |store| store.invalidate(black_box(&even)),
                    criterion::BatchSize::LargeInput,
                )
            },
        );
    }

    group.bench_function("sweep_no_match", |b| {
        let store = filled_store(1_000);
        let none: TagSet = ["missing".to_string()].into_iter().collect();
        b.iter(|| store.invalidate(black_box(&none)))
    });

    group.finish();
}

// ============================================================================
// Benchmark Registration
// ============================================================================

criterion_group!(
    benches,
    key_benchmarks,
    read_benchmarks,
    invalidation_benchmarks
);
criterion_main!(benches);
