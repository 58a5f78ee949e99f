//! Integration tests for the content-addressed object store
//!
//! Runs the store against the in-memory backend, covering placement,
//! round trips, validation, listing, and teardown.

use crucible_core::{
    Codec, JsonCodec, MemoryBlobBackend, ObjectStore, ResultAddress, StoreError,
};
use crucible_domain::{ContentKey, DomainError, ObjectLocation, Scope, ScopedKey};
use futures::StreamExt;
use futures::TryStreamExt;
use serde_json::json;

const PREFIX: &str = "staging";

async fn store() -> ObjectStore<MemoryBlobBackend> {
    let store = ObjectStore::new(MemoryBlobBackend::new().with_page_size(3), PREFIX);
    store.initialize().await.expect("initialize");
    store
}

fn entity() -> ScopedKey {
    "Transformation-7c1e-acme-binding-kinase".parse().expect("valid key")
}

fn artifact() -> ContentKey {
    "ProtocolDAGResult-9f0a".parse().expect("valid key")
}

/// Validates that pushed bytes pull back identically by location and by keys.
///
/// # Test Steps
/// 1. Encode a result with the JSON codec and push it
/// 2. Pull it by the returned location
/// 3. Pull it again by entity and artifact keys
/// 4. Verify both reads match and decode to the original value
#[tokio::test]
async fn test_push_pull_round_trip() {
    let store = store().await;
    let codec = JsonCodec::<serde_json::Value>::new();
    let result = json!({"protocol": "RelativeHybridTopology", "estimate": -3.2});
    let bytes = codec.encode(&result).expect("encode");

    let object_ref =
        store.push(&entity(), bytes.clone(), true, &artifact(), Some("worker-1")).await.expect("push");
    assert_eq!(object_ref.scope, *entity().scope());
    assert_eq!(object_ref.obj_key, artifact());
    assert_eq!(object_ref.creator.as_deref(), Some("worker-1"));
    assert!(object_ref.ok);

    let by_location =
        store.pull(&ResultAddress::Location(object_ref.location.clone())).await.expect("pull");
    assert_eq!(by_location, bytes);

    let artifact_key = ScopedKey::new(artifact(), entity().scope().clone()).expect("scoped");
    let by_keys = store
        .pull(&ResultAddress::Keys { entity: entity(), artifact: artifact_key, ok: true })
        .await
        .expect("pull");
    assert_eq!(by_keys, bytes);
    assert_eq!(codec.decode(&by_keys).expect("decode"), result);
}

/// Validates idempotent placement and that the prefix is applied in the
/// backend but hidden from locations.
///
/// # Test Steps
/// 1. Push the same inputs twice
/// 2. Verify identical locations and a single stored object
/// 3. Verify the backend key carries the store prefix
#[tokio::test]
async fn test_push_is_idempotent() {
    let store = store().await;

    let first = store.push(&entity(), b"a".to_vec(), true, &artifact(), None).await.expect("push");
    let second = store.push(&entity(), b"a".to_vec(), true, &artifact(), None).await.expect("push");

    assert_eq!(first.location, second.location);
    assert_eq!(store.backend().len(), 1);
    assert!(!first.location.as_str().starts_with(PREFIX));

    let listed: Vec<ObjectLocation> = store.iter_contents("").try_collect().await.expect("list");
    assert_eq!(listed, vec![first.location]);
}

/// Validates that success and failure routes are kept apart.
#[tokio::test]
async fn test_failures_route_separately() {
    let store = store().await;

    let ok = store.push(&entity(), b"ok".to_vec(), true, &artifact(), None).await.expect("push");
    let failed =
        store.push(&entity(), b"failed".to_vec(), false, &artifact(), None).await.expect("push");

    assert_ne!(ok.location, failed.location);
    assert!(failed.location.as_str().contains("/failures/"));
    assert_eq!(
        store.pull(&ResultAddress::Location(failed.location)).await.expect("pull"),
        b"failed"
    );
}

/// Validates that mismatched scopes fail validation before any backend read.
///
/// # Test Steps
/// 1. Build an artifact key in a different scope than the entity
/// 2. Pull by keys
/// 3. Verify a scope-mismatch validation error and zero backend gets
#[tokio::test]
async fn test_pull_rejects_scope_mismatch() {
    let store = store().await;
    let other_scope = Scope::specific("acme", "binding", "other").expect("scope");
    let artifact_key = ScopedKey::new(artifact(), other_scope).expect("scoped");

    let err = store
        .pull(&ResultAddress::Keys { entity: entity(), artifact: artifact_key, ok: true })
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Validation(DomainError::ScopeMismatch { .. })));
    assert_eq!(store.backend().get_calls(), 0);
}

/// Validates existence probes and delete semantics.
///
/// # Test Steps
/// 1. Push an object and verify it exists without any get call
/// 2. Delete it and verify it no longer exists
/// 3. Delete again and verify NotFound
#[tokio::test]
async fn test_exists_and_delete() {
    let store = store().await;
    let object_ref = store.push(&entity(), b"x".to_vec(), true, &artifact(), None).await.expect("push");

    assert!(store.exists(&object_ref.location).await.expect("exists"));
    assert_eq!(store.backend().get_calls(), 0);

    store.delete(&object_ref.location).await.expect("delete");
    assert!(!store.exists(&object_ref.location).await.expect("exists"));

    let err = store.delete(&object_ref.location).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

/// Validates that rejected writes surface as errors rather than refs.
#[tokio::test]
async fn test_rejected_write() {
    let store = ObjectStore::new(MemoryBlobBackend::new().rejecting_writes(503), PREFIX);
    store.initialize().await.expect("initialize");

    let err = store.push(&entity(), b"x".to_vec(), true, &artifact(), None).await.unwrap_err();
    assert!(matches!(err, StoreError::WriteRejected { status: 503, .. }));
    assert!(!store.store_check().await);
}

/// Validates scope-filtered, paginated, restartable, abandonable listing.
///
/// # Test Steps
/// 1. Push seven results across two projects (page size is three)
/// 2. List one project's scope and verify only its five results appear
/// 3. Take two items and drop the stream, then list again from scratch
#[tokio::test]
async fn test_iter_contents_by_scope() {
    let store = store().await;
    for i in 0..5 {
        let artifact: ContentKey = format!("ProtocolDAGResult-k{i}").parse().expect("key");
        store.push(&entity(), vec![i], true, &artifact, None).await.expect("push");
    }
    let other: ScopedKey = "Transformation-7c1e-acme-binding-other".parse().expect("key");
    for i in 0..2 {
        let artifact: ContentKey = format!("ProtocolDAGResult-o{i}").parse().expect("key");
        store.push(&other, vec![i], true, &artifact, None).await.expect("push");
    }

    let listed: Vec<ObjectLocation> =
        store.iter_scope(entity().scope()).try_collect().await.expect("list");
    assert_eq!(listed.len(), 5);
    assert!(listed.iter().all(|l| l.as_str().contains("/kinase/")));

    let partial: Vec<_> = store.iter_contents("").take(2).collect().await;
    assert_eq!(partial.len(), 2);

    let everything: Vec<ObjectLocation> = store.iter_contents("").try_collect().await.expect("list");
    assert_eq!(everything.len(), 7);
}

/// Validates teardown and the store self-check.
///
/// # Test Steps
/// 1. Verify the self-check passes and leaves nothing behind
/// 2. Push objects, reset, and verify the container is gone
#[tokio::test]
async fn test_store_check_and_reset() {
    let store = store().await;

    assert!(store.store_check().await);
    assert!(store.backend().is_empty());

    for i in 0..4 {
        let artifact: ContentKey = format!("ProtocolDAGResult-r{i}").parse().expect("key");
        store.push(&entity(), vec![i], i % 2 == 0, &artifact, None).await.expect("push");
    }

    store.reset().await.expect("reset");
    assert!(!store.backend().container_exists());
    assert!(!store.store_check().await);
}
