//! Property-based tests for cache key derivation.
//!
//! # Properties Tested
//!
//! 1. **Determinism**: identical inputs always share one key
//! 2. **URL Sensitivity**: inputs resolving to different URLs never share a key
//! 3. **Body Sensitivity**: inputs with different bodies never share a key
//! 4. **Header Order**: the order headers are declared in does not matter
//! 5. **Endpoint Identity**: two endpoints never share keys

use proptest::prelude::*;
use query_kit::fetch::InMemoryFetcher;
use query_kit::key::CacheKeyBuilder;
use query_kit::request::Request;
use query_kit::{Api, Endpoint, EndpointConfig, Method, RequestSpec};
use serde_json::{json, Value};
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
struct Input {
    path: String,
    body: Option<Value>,
}

type Echo = Endpoint<Input, Value, InMemoryFetcher>;

fn endpoint(api: &Api<InMemoryFetcher>, method: Method) -> Echo {
    api.endpoint(
        method,
        EndpointConfig::new(|input: &Input| {
            let spec = RequestSpec::new(input.path.as_str());
            match &input.body {
                Some(body) => spec.body(body.clone()),
                None => spec,
            }
        }),
    )
}

fn arb_body() -> impl Strategy<Value = Option<Value>> {
    prop_oneof![
        Just(None),
        any::<i64>().prop_map(|n| Some(json!(n))),
        any::<String>().prop_map(|s| Some(json!({ "name": s }))),
        prop::collection::vec(any::<bool>(), 0..5).prop_map(|v| Some(json!(v))),
    ]
}

fn arb_input() -> impl Strategy<Value = Input> {
    (any::<String>(), arb_body()).prop_map(|(path, body)| Input { path, body })
}

fn arb_headers() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[a-z][a-z0-9-]{0,12}", "[ -~]{0,16}"), 0..6)
}

proptest! {
    /// Property: deriving a key twice for the same input yields the same key
    #[test]
    fn prop_identical_inputs_share_key(input in arb_input()) {
        let api = Api::new(InMemoryFetcher::new());
        let echo = endpoint(&api, Method::Post);

        let key1 = echo.key(&input).expect("Key derivation should succeed");
        let key2 = echo.key(&input.clone()).expect("Key derivation should succeed");

        prop_assert_eq!(key1, key2, "Key derivation must be deterministic");
    }

    /// Property: different URLs never collide, whatever the bodies
    #[test]
    fn prop_different_urls_never_collide(
        a in any::<String>(),
        b in any::<String>(),
        body in arb_body(),
    ) {
        prop_assume!(a != b);
        let api = Api::new(InMemoryFetcher::new());
        let echo = endpoint(&api, Method::Get);

        let key_a = echo.key(&Input { path: a, body: body.clone() }).expect("key");
        let key_b = echo.key(&Input { path: b, body }).expect("key");

        prop_assert_ne!(key_a, key_b);
    }

    /// Property: different bodies never collide on the same URL
    #[test]
    fn prop_different_bodies_never_collide(
        path in any::<String>(),
        a in arb_body(),
        b in arb_body(),
    ) {
        prop_assume!(a != b);
        let api = Api::new(InMemoryFetcher::new());
        let echo = endpoint(&api, Method::Post);

        let key_a = echo.key(&Input { path: path.clone(), body: a }).expect("key");
        let key_b = echo.key(&Input { path, body: b }).expect("key");

        prop_assert_ne!(key_a, key_b);
    }

    /// Property: header declaration order does not affect the key
    #[test]
    fn prop_header_order_is_irrelevant(headers in arb_headers()) {
        let forward = headers
            .iter()
            .fold(RequestSpec::new("/items"), |spec, (k, v)| spec.header(k, v.clone()));
        let backward = headers
            .iter()
            .rev()
            .fold(RequestSpec::new("/items"), |spec, (k, v)| spec.header(k, v.clone()));

        // Later declarations win, so compare only header sets without duplicates.
        let distinct: BTreeMap<_, _> = headers.iter().cloned().collect();
        prop_assume!(distinct.len() == headers.len());

        let api = Api::new(InMemoryFetcher::new());
        let resolve = |spec: RequestSpec| -> Request {
            api.defaults().resolve(Method::Get, spec).expect("resolve")
        };

        let key_forward = CacheKeyBuilder::derive("items", &resolve(forward)).expect("key");
        let key_backward = CacheKeyBuilder::derive("items", &resolve(backward)).expect("key");

        prop_assert_eq!(key_forward, key_backward);
    }

    /// Property: two endpoints with identical requests never share keys
    #[test]
    fn prop_endpoints_never_share_keys(input in arb_input()) {
        let api = Api::new(InMemoryFetcher::new());
        let first = endpoint(&api, Method::Post);
        let second = endpoint(&api, Method::Post);

        prop_assert_eq!(
            first.resolve(&input).expect("resolve"),
            second.resolve(&input).expect("resolve")
        );
        prop_assert_ne!(
            first.key(&input).expect("key"),
            second.key(&input).expect("key")
        );
    }
}
