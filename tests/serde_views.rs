#![cfg(feature = "serde")]

use serde_json::json;
use vellum_cbor::{decode, Value};

fn h(s: &str) -> Vec<u8> {
    hex::decode(s.replace(' ', "")).unwrap()
}

#[test]
fn marked_byte_strings_render_as_text() {
    // Tag 21: base64url without padding.
    let b64url = decode(&h("d54401020304")).unwrap();
    assert_eq!(serde_json::to_value(&b64url).unwrap(), json!("AQIDBA"));

    // Tag 22: base64 with padding.
    let b64 = decode(&h("d64401020304")).unwrap();
    assert_eq!(serde_json::to_value(&b64).unwrap(), json!("AQIDBA=="));

    // Tag 23: base16.
    let b16 = decode(&h("d74401020304")).unwrap();
    assert_eq!(serde_json::to_value(&b16).unwrap(), json!("01020304"));
}

#[test]
fn unmarked_byte_strings_stay_raw() {
    let plain = decode(&h("4401020304")).unwrap();
    assert_eq!(
        serde_json::to_value(&plain).unwrap(),
        json!([1, 2, 3, 4])
    );
}

#[test]
fn scalars_and_containers_map_onto_json() {
    let value = decode(&h("a26161016162820203")).unwrap();
    assert_eq!(
        serde_json::to_value(&value).unwrap(),
        json!({"a": 1, "b": [2, 3]})
    );

    assert_eq!(
        serde_json::to_value(decode(&h("f6")).unwrap()).unwrap(),
        serde_json::Value::Null
    );
    assert_eq!(
        serde_json::to_value(decode(&h("f7")).unwrap()).unwrap(),
        serde_json::Value::Null
    );
}

#[test]
fn datetimes_render_as_rfc3339_text() {
    let value = decode(&h("c11a514b67b0")).unwrap();
    assert_eq!(
        serde_json::to_value(&value).unwrap(),
        json!("2013-03-21T20:04:00Z")
    );
}

#[test]
fn bignums_render_as_decimal_text() {
    let value = decode(&h("c249010000000000000000")).unwrap();
    assert_eq!(
        serde_json::to_value(&value).unwrap(),
        json!("18446744073709551616")
    );
}

#[test]
fn tagged_wrappers_render_as_objects() {
    let value = decode(&h("d9d9f70f")).unwrap();
    assert_eq!(
        serde_json::to_value(&value).unwrap(),
        json!({"tag": 55799, "value": 15})
    );
}

#[test]
fn sets_and_typed_arrays_render_as_sequences() {
    let set = decode(&h("d9010283010203")).unwrap();
    assert_eq!(serde_json::to_value(&set).unwrap(), json!([1, 2, 3]));

    let typed = decode(&h("d8454401000200")).unwrap();
    assert_eq!(serde_json::to_value(&typed).unwrap(), json!([1, 2]));
}
