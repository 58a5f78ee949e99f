//! Integration tests for identifiers and object addressing
//!
//! Exercises the public surface the client and object store rely on: lossless
//! string forms, scope containment, and deterministic object placement.

use chrono::Utc;
use crucible_domain::{ContentKey, DomainError, ObjectLocation, ObjectRef, Route, Scope, ScopedKey};

// ============================================================================
// ScopedKey Round Trips
// ============================================================================

/// Every valid combination of components survives a render/parse cycle
#[test]
fn test_scoped_key_round_trip_across_components() {
    let kinds = ["Transformation", "ProtocolDAGResultRef", "AlchemicalNetwork"];
    let tokens = ["0", "5f2b9c", "a_long_token_123"];
    let scopes = [("acme", "c1", "p1"), ("org_2", "campaign_b", "proj9"), ("x", "y", "z")];

    for kind in kinds {
        for token in tokens {
            for (org, campaign, project) in scopes {
                let key = ScopedKey::new(
                    ContentKey::new(kind, token).unwrap(),
                    Scope::specific(org, campaign, project).unwrap(),
                )
                .unwrap();

                let parsed: ScopedKey = key.to_string().parse().unwrap();
                assert_eq!(parsed, key);
                assert_eq!(parsed.kind(), kind);
                assert_eq!(parsed.token(), token);
            }
        }
    }
}

/// Keys differing in any single component compare unequal
#[test]
fn test_scoped_key_equality_covers_all_fields() {
    let base: ScopedKey = "Transformation-abc-acme-c1-p1".parse().unwrap();
    for other in [
        "Network-abc-acme-c1-p1",
        "Transformation-abd-acme-c1-p1",
        "Transformation-abc-acmf-c1-p1",
        "Transformation-abc-acme-c2-p1",
        "Transformation-abc-acme-c1-p2",
    ] {
        assert_ne!(base, other.parse::<ScopedKey>().unwrap(), "{other}");
    }
}

// ============================================================================
// Object Placement
// ============================================================================

/// The entity key's scope plus both content keys fully determine the location
#[test]
fn test_location_from_scoped_keys() {
    let entity: ScopedKey = "Transformation-abc-acme-c1-p1".parse().unwrap();
    let artifact: ContentKey = "ProtocolDAGResult-def".parse().unwrap();

    let location =
        ObjectLocation::for_result(entity.scope(), entity.content_key(), Route::Failures, &artifact)
            .unwrap();

    assert_eq!(
        location.to_string(),
        "protocoldagresult/acme/c1/p1/Transformation-abc/failures/ProtocolDAGResult-def/obj.json.zst"
    );
    assert!(location.as_str().starts_with(&ObjectLocation::scope_prefix(entity.scope())));
}

/// ObjectRef serializes with string-form identifiers
#[test]
fn test_object_ref_serialization() {
    let scope = Scope::specific("acme", "c1", "p1").unwrap();
    let obj_key: ContentKey = "ProtocolDAGResult-def".parse().unwrap();
    let location = ObjectLocation::new("protocoldagresult/acme/c1/p1/x/results/y/obj.json.zst");

    let object_ref = ObjectRef {
        location: location.clone(),
        obj_key,
        scope,
        ok: true,
        datetime_created: Utc::now(),
        creator: Some("worker-7".into()),
    };

    let value = serde_json::to_value(&object_ref).unwrap();
    assert_eq!(value["location"], location.as_str());
    assert_eq!(value["obj_key"], "ProtocolDAGResult-def");
    assert_eq!(value["scope"], "acme-c1-p1");
    assert_eq!(object_ref.route(), Route::Results);

    let back: ObjectRef = serde_json::from_value(value).unwrap();
    assert_eq!(back, object_ref);
}

// ============================================================================
// Errors
// ============================================================================

/// Domain errors serialize as tagged values
#[test]
fn test_domain_error_serializes_tagged() {
    let err = "bogus".parse::<ScopedKey>().unwrap_err();
    assert_eq!(err, DomainError::InvalidScopedKey("bogus".into()));

    let value = serde_json::to_value(&err).unwrap();
    assert_eq!(value["type"], "InvalidScopedKey");
    assert_eq!(value["message"], "bogus");
}
