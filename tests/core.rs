use std::sync::{Arc, Mutex};

use vellum_cbor::{
    decode, decode_all, encode, encode_all, encode_canonical, encode_one, CborError,
    DecodeOptions, EncodeOptions, Encoder, ErrorCode, Extension, LoopDetector, UndefinedPolicy,
    Value,
};

#[test]
fn scalar_roundtrips() {
    for value in [
        Value::Integer(0),
        Value::Integer(1_000_000),
        Value::Integer(-1),
        Value::Bool(false),
        Value::Bool(true),
        Value::Null,
        Value::Undefined,
        Value::Text("IETF".into()),
        Value::from(vec![1u8, 2, 3, 4]),
    ] {
        let bytes = encode(&value).unwrap();
        assert_eq!(decode(&bytes).unwrap(), value);
    }
}

#[test]
fn encode_all_concatenates_in_push_order() {
    let a = Value::Integer(0);
    let b = Value::Text("a".into());
    let bytes = encode_all([&a, &b]).unwrap();
    assert_eq!(bytes, vec![0x00, 0x61, b'a']);

    let items = decode_all(&bytes, &DecodeOptions::default()).unwrap();
    assert_eq!(items, vec![a, b]);
}

#[test]
fn canonical_mode_is_declared_unimplemented() {
    let value = Value::Integer(1);
    let err = encode_canonical([&value]).unwrap_err();
    assert_eq!(err.code, ErrorCode::CanonicalNotImplemented);
    assert!(err.to_string().contains("canonical mode not implemented"));
}

#[test]
fn undefined_policies() {
    let value = Value::Undefined;

    let bytes = encode(&value).unwrap();
    assert_eq!(bytes, vec![0xf7]);

    let raw = EncodeOptions {
        undefined: UndefinedPolicy::Raw(vec![0xf6]),
        ..EncodeOptions::default()
    };
    assert_eq!(encode_one(&value, &raw).unwrap(), vec![0xf6]);

    let replace = EncodeOptions {
        undefined: UndefinedPolicy::Replace(Value::Text("gone".into())),
        ..EncodeOptions::default()
    };
    assert_eq!(
        encode_one(&value, &replace).unwrap(),
        encode(&Value::Text("gone".into())).unwrap()
    );

    let with = EncodeOptions {
        undefined: UndefinedPolicy::With(Arc::new(|| Value::Integer(7))),
        ..EncodeOptions::default()
    };
    assert_eq!(encode_one(&value, &with).unwrap(), vec![0x07]);
}

#[test]
fn undefined_map_keys_can_be_disallowed() {
    let map = Value::Map(vec![(Value::Undefined, Value::Integer(1))]);

    // Allowed by default.
    assert!(encode(&map).is_ok());

    let options = EncodeOptions {
        disallow_undefined_keys: true,
        ..EncodeOptions::default()
    };
    let err = encode_one(&map, &options).unwrap_err();
    assert_eq!(err.code, ErrorCode::UndefinedMapKey);
    assert!(err.to_string().contains("Invalid Map key: undefined"));
}

#[test]
fn omitted_undefined_entries_shrink_the_map() {
    let map = Value::Map(vec![
        (Value::Text("a".into()), Value::Integer(1)),
        (Value::Text("b".into()), Value::Undefined),
    ]);
    let options = EncodeOptions {
        omit_undefined_entries: true,
        ..EncodeOptions::default()
    };
    let bytes = encode_one(&map, &options).unwrap();
    assert_eq!(bytes, vec![0xa1, 0x61, b'a', 0x01]);
}

#[test]
fn simple_values_in_reserved_range_are_unencodable() {
    for v in 24u8..=31 {
        let err = encode(&Value::Simple(v)).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidSimpleEncoding(v));
    }
    assert_eq!(encode(&Value::Simple(16)).unwrap(), vec![0xf0]);
    assert_eq!(encode(&Value::Simple(255)).unwrap(), vec![0xf8, 0xff]);
}

#[test]
fn failed_push_rolls_back_to_the_item_boundary() {
    let mut encoder = Encoder::new();
    encoder.push(&Value::Integer(1)).unwrap();
    let before = encoder.as_bytes().to_vec();

    let bad = Value::Array(vec![Value::Integer(2), Value::Simple(24)]);
    assert!(encoder.push(&bad).is_err());
    assert_eq!(encoder.as_bytes(), before.as_slice());

    encoder.push(&Value::Integer(3)).unwrap();
    assert_eq!(encoder.into_bytes(), vec![0x01, 0x03]);
}

#[derive(Debug, Default)]
struct SelfCycle {
    inner: Mutex<Option<Value>>,
}

impl Extension for SelfCycle {
    fn type_name(&self) -> &'static str {
        "SelfCycle"
    }

    fn encode_cbor(&self, encoder: &mut Encoder) -> Result<(), CborError> {
        let inner = self.inner.lock().unwrap().clone();
        match inner {
            Some(value) => encoder.push(&value),
            None => encoder.push(&Value::Null),
        }
    }
}

#[test]
fn reentered_extension_is_a_loop() {
    let ext = Arc::new(SelfCycle::default());
    *ext.inner.lock().unwrap() = Some(Value::Extension(ext.clone()));

    let value = Value::Extension(ext);
    let options = EncodeOptions {
        detect_loops: true,
        ..EncodeOptions::default()
    };
    let err = encode_one(&value, &options).unwrap_err();
    assert_eq!(err.code, ErrorCode::LoopDetected);
    assert!(err.to_string().contains("Loop detected while CBOR encoding"));
}

#[derive(Debug)]
struct NullExt;

impl Extension for NullExt {
    fn type_name(&self) -> &'static str {
        "NullExt"
    }

    fn encode_cbor(&self, encoder: &mut Encoder) -> Result<(), CborError> {
        encoder.push(&Value::Null)
    }
}

#[test]
fn sequential_reuse_of_an_extension_is_not_a_loop() {
    let ext: Arc<dyn Extension> = Arc::new(NullExt);
    let value = Value::Array(vec![
        Value::Extension(ext.clone()),
        Value::Extension(ext),
    ]);
    let options = EncodeOptions {
        detect_loops: true,
        ..EncodeOptions::default()
    };
    assert_eq!(encode_one(&value, &options).unwrap(), vec![0x82, 0xf6, 0xf6]);
}

#[test]
fn supplied_detector_is_used_and_resettable() {
    let detector = LoopDetector::new();
    let mut encoder = Encoder::with_detector(EncodeOptions::default(), detector);
    encoder
        .push(&Value::Array(vec![Value::Integer(1)]))
        .unwrap();
    encoder.reset_detector();
    assert_eq!(encoder.into_bytes(), vec![0x81, 0x01]);
}
