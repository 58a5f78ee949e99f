//! Integration tests for the blocking API client
//!
//! The mock server runs on an owned tokio runtime; the client is driven from
//! the plain test thread, as a synchronous caller would.

#![allow(dead_code)]

mod support;

use crucible_core::JsonCodec;
use crucible_infra::api::{BlockingClient, ClientError, Compression, ResourceRequest};
use serde_json::{json, Value};
use support::{build, requests_to, settings_builder, token_mock};
use tempfile::TempDir;
use tokio::runtime::Runtime;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TRANSFORMATION: &str = "/transformations/Transformation-9c2d-acme-binding-kinase";

// Fields drop in order: the server goes before its runtime.
struct Harness {
    server: MockServer,
    runtime: Runtime,
    cache: TempDir,
}

impl Harness {
    fn new() -> Self {
        let runtime = Runtime::new().expect("runtime");
        let server = runtime.block_on(MockServer::start());
        Self { server, runtime, cache: TempDir::new().expect("temp dir") }
    }

    fn mount(&self, mock: Mock) {
        self.runtime.block_on(mock.mount(&self.server));
    }

    fn client(&self) -> BlockingClient {
        BlockingClient::new(build(settings_builder(&self.server.uri(), self.cache.path())))
            .expect("client")
    }

    fn hits(&self, route: &str) -> usize {
        self.runtime.block_on(requests_to(&self.server, route)).len()
    }
}

/// Validates token exchange, 401 refresh and successful fetch in sequence.
///
/// # Test Steps
/// 1. Reject the first fetch with 401
/// 2. Verify the fetch succeeds after exactly one refresh
/// 3. Fetch again and verify no further exchange happens
#[test]
fn test_refresh_once_then_reuse_token() {
    let harness = Harness::new();
    harness.mount(token_mock(2));
    harness.mount(
        Mock::given(method("GET"))
            .and(path(TRANSFORMATION))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1),
    );
    harness.mount(
        Mock::given(method("GET"))
            .and(path(TRANSFORMATION))
            .and(header("authorization", "Bearer abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "t1"}))),
    );

    let client = harness.client();
    let request = ResourceRequest::new(TRANSFORMATION);
    let first: Value = client.get_resource(&request).unwrap();
    let second: Value = client.get_resource(&request).unwrap();

    assert_eq!(first, second);
    assert_eq!(harness.hits("/token"), 2);
    assert_eq!(harness.hits(TRANSFORMATION), 3);
}

/// Validates the retry budget with the blocking executor.
#[test]
fn test_retry_budget_exhausted() {
    let harness = Harness::new();
    harness.mount(token_mock(1));
    harness.mount(
        Mock::given(method("GET"))
            .and(path(TRANSFORMATION))
            .respond_with(ResponseTemplate::new(502)),
    );

    let err = harness.client().get_resource::<Value>(&ResourceRequest::new(TRANSFORMATION)).unwrap_err();

    assert_eq!(err.status_code(), Some(502));
    assert_eq!(harness.hits(TRANSFORMATION), 4);
}

#[test]
fn test_non_retryable_status() {
    let harness = Harness::new();
    harness.mount(token_mock(1));
    harness.mount(
        Mock::given(method("GET"))
            .and(path(TRANSFORMATION))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({"detail": "bad key"}))),
    );

    let err = harness.client().get_resource::<Value>(&ResourceRequest::new(TRANSFORMATION)).unwrap_err();

    assert!(matches!(err, ClientError::Api { status_code: 422, ref detail, .. } if detail == "bad key"));
    assert_eq!(harness.hits(TRANSFORMATION), 1);
}

/// Validates listing, posting and health probes.
#[test]
fn test_resource_operations() {
    let harness = Harness::new();
    harness.mount(token_mock(1));
    harness.mount(
        Mock::given(method("GET"))
            .and(path("/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"}))),
    );
    harness.mount(
        Mock::given(method("GET")).and(path("/check")).respond_with(ResponseTemplate::new(200)),
    );
    harness.mount(
        Mock::given(method("GET"))
            .and(path("/transformations"))
            .and(query_param("return_gufe", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Transformation-9c2d-acme-binding-kinase": {"name": "t1"},
            }))),
    );
    harness.mount(
        Mock::given(method("GET")).and(path("/transformations")).respond_with(
            ResponseTemplate::new(200).set_body_json(json!(["Transformation-9c2d-acme-binding-kinase"])),
        ),
    );
    harness.mount(
        Mock::given(method("POST"))
            .and(path("/networks"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"created": true}))),
    );

    let client = harness.client();
    assert_eq!(client.get_info().unwrap(), json!({"status": "ok"}));
    client.api_check().unwrap();

    let request = ResourceRequest::new("/transformations");
    let keys = client.query_scoped_keys(&request).unwrap();
    assert_eq!(keys[0].to_string(), "Transformation-9c2d-acme-binding-kinase");
    let objects = client.query_scoped_objects(&request, &JsonCodec::<Value>::new()).unwrap();
    assert_eq!(objects[0].1, json!({"name": "t1"}));

    let created: Value = client.post_resource("/networks", &json!({"a": 1}), Compression::Off).unwrap();
    assert_eq!(created, json!({"created": true}));
    let codec = JsonCodec::<Value>::new();
    let created = client.post_object("/networks", &json!({"b": 2}), &codec, Compression::Off).unwrap();
    assert_eq!(created, json!({"created": true}));
    let posts = harness.runtime.block_on(requests_to(&harness.server, "/networks"));
    assert_eq!(posts[0].body, br#"{"a":1}"#);
    assert_eq!(posts[1].body, br#"{"b":2}"#);
    assert!(posts[0].headers.get("content-encoding").is_none());

    let info = client.get_object(&ResourceRequest::new("/info"), &codec).unwrap();
    assert_eq!(info, json!({"status": "ok"}));
}

/// Validates the local cache from the blocking context.
#[test]
fn test_cached_fetch() {
    let harness = Harness::new();
    harness.mount(token_mock(1));
    harness.mount(
        Mock::given(method("GET"))
            .and(path(TRANSFORMATION))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "t1"}))),
    );

    let client = harness.client();
    let request = ResourceRequest::new(TRANSFORMATION).param("return_gufe", true);
    for _ in 0..3 {
        let value: Value = client.get_resource_cached(&request).unwrap();
        assert_eq!(value["name"], "t1");
    }

    assert_eq!(harness.hits(TRANSFORMATION), 1);
    assert_eq!(client.to_string(), format!("BlockingClient('{}')", harness.server.uri()));
}
