use vellum_cbor::{decode, decode_first, encode, DecodeLimits, DecodeOptions, ErrorCode, Value};

fn h(s: &str) -> Vec<u8> {
    hex::decode(s.replace(' ', "")).unwrap()
}

/// Definite-length vectors whose decoded value re-encodes to the same bytes.
#[test]
fn byte_exact_roundtrips() {
    let vectors = [
        "00",
        "01",
        "0a",
        "17",
        "1818",
        "1864",
        "190100",
        "1a000f4240",
        "1b000000e8d4a51000",
        "1bffffffffffffffff",
        "20",
        "29",
        "3863",
        "3903e7",
        "3bffffffffffffffff",
        "f4",
        "f5",
        "f6",
        "f7",
        "60",
        "6161",
        "6449455446",
        "62225c",
        "63e6b0b4",
        "40",
        "4401020304",
        "80",
        "83010203",
        "8301820203820405",
        "a0",
        "a201020304",
        "a26161016162820203",
        "826161a161626163",
        "fa47c35000",
        "fb3ff199999999999a",
        "fb7e37e43c8800759c",
        "c249010000000000000000",
        "c349010000000000000000",
        "c11a514b67b0",
        "c1fb41d452d9ec200000",
        "d9010283010203",
        "f0",
        "f8ff",
    ];
    for vector in vectors {
        let bytes = h(vector);
        let value = decode(&bytes).unwrap();
        assert_eq!(encode(&value).unwrap(), bytes, "roundtrip of {vector}");
    }
}

#[test]
fn decode_integer_boundaries() {
    assert_eq!(decode(&h("00")).unwrap(), Value::Integer(0));
    assert_eq!(decode(&h("17")).unwrap(), Value::Integer(23));
    assert_eq!(decode(&h("1818")).unwrap(), Value::Integer(24));
    assert_eq!(decode(&h("18ff")).unwrap(), Value::Integer(255));
    assert_eq!(decode(&h("190100")).unwrap(), Value::Integer(256));
    assert_eq!(decode(&h("19ffff")).unwrap(), Value::Integer(65_535));
    assert_eq!(decode(&h("1a00010000")).unwrap(), Value::Integer(65_536));
    assert_eq!(
        decode(&h("1b001fffffffffffff")).unwrap(),
        Value::Integer(9_007_199_254_740_991)
    );
    assert_eq!(
        decode(&h("1b0020000000000000")).unwrap(),
        Value::Integer(9_007_199_254_740_992)
    );
    assert_eq!(
        decode(&h("1bffffffffffffffff")).unwrap(),
        Value::Integer((1 << 64) - 1)
    );
    assert_eq!(decode(&h("20")).unwrap(), Value::Integer(-1));
    assert_eq!(
        decode(&h("3bffffffffffffffff")).unwrap(),
        Value::Integer(-(1i128 << 64))
    );
}

#[test]
fn decode_half_precision() {
    let cases: &[(&str, f64)] = &[
        ("f90000", 0.0),
        ("f90001", 5.960_464_477_539_063e-8),
        ("f90400", 6.103_515_625e-5),
        ("f93c00", 1.0),
        ("f93e00", 1.5),
        ("f97bff", 65504.0),
        ("f9c400", -4.0),
    ];
    for (vector, expected) in cases {
        assert_eq!(decode(&h(vector)).unwrap(), Value::Float(*expected));
    }

    match decode(&h("f97e00")).unwrap() {
        Value::Float(f) => assert!(f.is_nan()),
        other => panic!("expected float, got {other:?}"),
    }
    assert_eq!(decode(&h("f97c00")).unwrap(), Value::Float(f64::INFINITY));
    assert_eq!(
        decode(&h("f9fc00")).unwrap(),
        Value::Float(f64::NEG_INFINITY)
    );
    match decode(&h("f98000")).unwrap() {
        Value::Float(f) => assert!(f == 0.0 && f.is_sign_negative()),
        other => panic!("expected float, got {other:?}"),
    }
}

#[test]
fn decode_simple_values() {
    assert_eq!(decode(&h("f4")).unwrap(), Value::Bool(false));
    assert_eq!(decode(&h("f5")).unwrap(), Value::Bool(true));
    assert_eq!(decode(&h("f6")).unwrap(), Value::Null);
    assert_eq!(decode(&h("f7")).unwrap(), Value::Undefined);
    assert_eq!(decode(&h("f0")).unwrap(), Value::Simple(16));
    assert_eq!(decode(&h("f820")).unwrap(), Value::Simple(32));
    assert_eq!(decode(&h("f8ff")).unwrap(), Value::Simple(255));
}

#[test]
fn failure_prefixes_match_the_error_taxonomy() {
    let reserved = decode(&h("1c")).unwrap_err();
    assert_eq!(reserved.code, ErrorCode::AdditionalInfoReserved(28));
    assert!(reserved
        .to_string()
        .contains("Additional info not implemented"));

    let bad_chunk = decode(&h("5f4000")).unwrap_err();
    assert_eq!(bad_chunk.code, ErrorCode::InvalidIndefiniteMajor(0));
    assert!(bad_chunk
        .to_string()
        .contains("Invalid major type in indefinite encoding"));

    let stray_break = decode(&h("ff")).unwrap_err();
    assert_eq!(stray_break.code, ErrorCode::InvalidBreak);
    assert!(stray_break.to_string().contains("Invalid BREAK"));

    let truncated_map = decode(&h("a100")).unwrap_err();
    assert_eq!(truncated_map.code, ErrorCode::InsufficientData);
    assert!(truncated_map.to_string().contains("Insufficient data"));

    let bad_simple = decode(&h("f818")).unwrap_err();
    assert_eq!(bad_simple.code, ErrorCode::InvalidSimpleEncoding(24));
    assert!(bad_simple
        .to_string()
        .contains("Invalid two-byte encoding of simple value"));
}

#[test]
fn truncation_is_insufficient_data() {
    for vector in ["18", "19ff", "1a", "44010203", "62c3", "9f", "bf6161"] {
        let err = decode(&h(vector)).unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientData, "prefix {vector}");
    }
}

#[test]
fn trailing_bytes_are_unexpected_data() {
    let err = decode(&h("0000")).unwrap_err();
    assert_eq!(err.code, ErrorCode::UnexpectedData);
    assert_eq!(err.offset, 1);
    assert!(err.to_string().contains("Unexpected data"));
}

#[test]
fn invalid_utf8_is_fatal() {
    let err = decode(&h("62c328")).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidUtf8);
}

#[test]
fn indefinite_heads_on_integer_majors_are_invalid() {
    for vector in ["1f", "3f", "df"] {
        let err = decode(&h(vector)).unwrap_err();
        assert_eq!(
            err.code,
            ErrorCode::InvalidIndefiniteEncoding,
            "prefix {vector}"
        );
    }
}

#[test]
fn depth_limit_stops_nesting_bombs() {
    let mut bytes = vec![0x81u8; 6];
    bytes.push(0x00);

    let mut options = DecodeOptions::default();
    options.limits.max_depth = 4;
    let err = decode_first(&bytes, &options).unwrap_err();
    assert_eq!(err.code, ErrorCode::DepthLimitExceeded);

    options.limits.max_depth = 6;
    assert!(decode_first(&bytes, &options).is_ok());
}

#[test]
fn input_limit_is_enforced_up_front() {
    let options = DecodeOptions {
        limits: DecodeLimits::for_bytes(2),
        ..DecodeOptions::default()
    };
    let err = decode_first(&h("4401020304"), &options).unwrap_err();
    assert_eq!(err.code, ErrorCode::InputLimitExceeded);
}
