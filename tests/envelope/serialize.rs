use doc_envelope::{DocumentEnvelope, Etag, Metadata, SerializeOptions, ETAG_FIELD, METADATA_FIELD};
use serde_json::{json, Map, Value};

// ============================================================================
// Helpers
// ============================================================================

const TOKEN: &str = "11111111-1111-1111-1111-111111111111";

fn obj(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn token() -> Etag {
    TOKEN.parse().expect("valid etag")
}

fn full(data: Value, metadata: Value) -> DocumentEnvelope {
    DocumentEnvelope::full("docs/1", token(), obj(data), Metadata::from_map(obj(metadata)))
        .expect("full envelope")
}

// ============================================================================
// Full documents
// ============================================================================

#[test]
fn serializes_data_with_nested_metadata() {
    let mut env = full(json!({ "name": "ok" }), json!({}));
    let body = env.serialize();

    assert_eq!(
        body.into_value(),
        json!({ "name": "ok", "@metadata": { "@etag": TOKEN } })
    );
}

#[test]
fn serialized_json_text_keeps_field_order() {
    let mut env = full(
        json!({ "name": "ok", "age": 3 }),
        json!({ "Raven-Entity-Name": "Docs" }),
    );
    let text = env.serialize().to_json_string().unwrap();
    assert_eq!(
        text,
        format!(
            r#"{{"name":"ok","age":3,"@metadata":{{"Raven-Entity-Name":"Docs","@etag":"{TOKEN}"}}}}"#
        )
    );
}

#[test]
fn stale_etag_is_overwritten_not_duplicated() {
    let mut env = full(json!({ "name": "ok" }), json!({ "@etag": "stale" }));
    let body = env.serialize();

    let meta = body.get(METADATA_FIELD).unwrap().as_object().unwrap();
    assert_eq!(meta.len(), 1);
    assert_eq!(meta[ETAG_FIELD], json!(TOKEN));
}

#[test]
fn every_data_field_is_returned() {
    let data = json!({ "a": 1, "b": [1, 2], "c": { "d": null }, "e": "x" });
    let mut env = full(data.clone(), json!({ "Content-Type": "application/json" }));
    let body = env.serialize();

    for (k, v) in data.as_object().unwrap() {
        assert_eq!(body.get(k), Some(v), "field {k}");
    }
    assert_eq!(body.as_map().len(), 5);
    assert_eq!(
        body.get(METADATA_FIELD).unwrap()["Content-Type"],
        json!("application/json")
    );
}

#[test]
fn serialize_is_idempotent() {
    let mut env = full(json!({ "name": "ok" }), json!({ "@etag": "stale", "x": 1 }));
    let first = env.serialize().to_json_vec().unwrap();
    let second = env.serialize().to_json_vec().unwrap();
    assert_eq!(first, second);
}

#[test]
fn changing_etag_changes_only_the_etag() {
    let mut env = full(json!({ "name": "ok" }), json!({ "x": 1 }));
    let before = env.serialize().into_map();

    let newer = env.etag().increment();
    env.set_etag(newer);
    let after = env.serialize().into_map();

    let mut before_meta = before[METADATA_FIELD].as_object().unwrap().clone();
    let mut after_meta = after[METADATA_FIELD].as_object().unwrap().clone();
    assert_eq!(before_meta.shift_remove(ETAG_FIELD), Some(json!(TOKEN)));
    assert_eq!(
        after_meta.shift_remove(ETAG_FIELD),
        Some(json!(newer.to_string()))
    );
    assert_eq!(before_meta, after_meta);

    let strip = |mut m: Map<String, Value>| {
        m.shift_remove(METADATA_FIELD);
        m
    };
    assert_eq!(strip(before), strip(after));
}

#[test]
fn stamp_is_visible_on_envelope_metadata() {
    let mut env = full(json!({ "name": "ok" }), json!({}));
    assert_eq!(env.metadata().unwrap().etag().unwrap(), None);
    env.serialize();
    assert_eq!(env.metadata().unwrap().etag().unwrap(), Some(token()));
}

#[test]
fn include_id_adds_key_after_etag() {
    let mut env = full(json!({ "name": "ok" }), json!({}));
    let body = env.serialize_with(&SerializeOptions { include_id: true });
    assert_eq!(
        body.into_value(),
        json!({ "name": "ok", "@metadata": { "@etag": TOKEN, "@id": "docs/1" } })
    );
}

#[test]
fn include_id_does_not_carry_over_to_default_serialize() {
    let mut env = DocumentEnvelope::full("docs/1", Etag::from_u128(1), Map::new(), Metadata::new())
        .expect("full envelope");

    let with_id = env.serialize_with(&SerializeOptions { include_id: true });
    assert_eq!(
        with_id.into_value(),
        json!({ "@metadata": { "@etag": "00000000-0000-0000-0000-000000000001", "@id": "docs/1" } })
    );

    let plain = env.serialize();
    assert_eq!(
        plain.into_value(),
        json!({ "@metadata": { "@etag": "00000000-0000-0000-0000-000000000001" } })
    );
}

// ============================================================================
// Projections
// ============================================================================

#[test]
fn projection_is_returned_verbatim() {
    let mut env = DocumentEnvelope::from_parts(
        "docs/1",
        token(),
        Some(obj(json!({ "name": "ok" }))),
        Some(Metadata::new()),
        Some(obj(json!({ "count": 3 }))),
    )
    .unwrap();

    assert_eq!(env.serialize().into_value(), json!({ "count": 3 }));
}

#[test]
fn projection_never_gets_metadata() {
    let mut env =
        DocumentEnvelope::projected("docs/1", token(), obj(json!({ "@etag": "x", "n": 1 })));
    let body = env.serialize();
    assert!(body.get(METADATA_FIELD).is_none());
    assert_eq!(body.get(ETAG_FIELD), Some(&json!("x")));
    assert_eq!(env.projection().unwrap(), body.as_map());
}

#[test]
fn empty_projection_serializes_to_empty_object() {
    let mut env = DocumentEnvelope::projected("q/1", Etag::EMPTY, Map::new());
    assert_eq!(env.serialize().to_json_string().unwrap(), "{}");
}

// ============================================================================
// Client-side parsing
// ============================================================================

#[test]
fn client_reads_back_etag_from_body() {
    let mut env = full(json!({ "name": "ok" }), json!({ "x": 1 }));
    let wire = env.serialize().to_json_vec().unwrap();

    let value: Value = serde_json::from_slice(&wire).unwrap();
    let parsed = DocumentEnvelope::from_serialized("docs/1", value).unwrap();
    assert_eq!(parsed.etag(), token());
    assert_eq!(parsed.data().unwrap(), &obj(json!({ "name": "ok" })));
    assert_eq!(parsed.metadata().unwrap().get("x"), Some(&json!(1)));
}
