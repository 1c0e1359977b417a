//! Integration tests for the pack wire codec

use sable_value::codec::Reader;
use sable_value::{Value, ValueError};

fn round_trip(v: &Value) -> Value {
    let packed = v.pack();
    Value::unpack(&packed).unwrap_or_else(|e| panic!("unpack of {packed:?} failed: {e}"))
}

#[test]
fn test_round_trip_numbers() {
    for v in [
        Value::long(0),
        Value::long(i32::MIN),
        Value::long(i32::MAX),
        Value::double(0.1),
        Value::double(-0.0),
        Value::double(1e300),
        Value::double(f64::MIN_POSITIVE),
        Value::double(f64::INFINITY),
    ] {
        let back = round_trip(&v);
        assert_eq!(back.kind(), v.kind());
        assert_eq!(back, v);
    }
}

#[test]
fn test_round_trip_double_bits() {
    for n in [0.1 + 0.2, std::f64::consts::PI, -123456.789e-12, 5e-324] {
        let back = round_trip(&Value::double(n));
        assert_eq!(back.as_number().map(f64::to_bits), Some(n.to_bits()));
    }
}

#[test]
fn test_nan_stays_nan() {
    let back = round_trip(&Value::double(f64::NAN));
    assert!(back.as_number().is_some_and(f64::is_nan));
}

#[test]
fn test_round_trip_strings() {
    for text in [
        "",
        "plain",
        "S3:abc",
        "a2:i1i2",
        ":::",
        "s",
        "\u{0}\u{1}",
        "h\u{e9}llo \u{65e5}\u{672c} \u{1F600}",
    ] {
        let v = Value::string(text);
        assert_eq!(round_trip(&v), v, "text {text:?}");

        // and nested, where strings take the length-prefixed form
        let nested = Value::array([v.clone(), Value::long(1)]);
        assert_eq!(round_trip(&nested), nested, "nested {text:?}");
    }
}

#[test]
fn test_round_trip_nested_arrays() {
    let v = Value::array([
        Value::Uninit,
        Value::boolean(false),
        Value::array([]),
        Value::array([Value::array([Value::string("deep")])]),
        Value::double(-2.5),
    ]);
    assert_eq!(round_trip(&v), v);
}

#[test]
fn test_pack_onto_appends_stream_form() {
    let mut out = String::from("prefix|");
    Value::string("x").pack_onto(&mut out);
    Value::long(3).pack_onto(&mut out);
    assert_eq!(out, "prefix|S1:xi3");

    let mut reader = Reader::new(&out.as_bytes()[7..]);
    assert_eq!(Value::unpack_with_len(&mut reader).unwrap(), Value::string("x"));
    assert_eq!(Value::unpack_with_len(&mut reader).unwrap(), Value::long(3));
    assert!(reader.is_at_end());
}

#[test]
fn test_multibyte_length_prefix_counts_bytes() {
    let mut out = String::new();
    Value::string("\u{1F600}ab").pack_onto(&mut out);
    assert_eq!(out, "S6:\u{1F600}ab");
}

#[test]
fn test_unknown_tag() {
    let err = Value::unpack("z").unwrap_err();
    assert!(matches!(err, ValueError::Deserialize { offset: 0, .. }));
}

#[test]
fn test_truncated_never_reads_past_end() {
    let full = Value::array([
        Value::string("hello"),
        Value::long(12345),
        Value::array([Value::boolean(true)]),
    ])
    .pack();
    // every strict prefix must fail cleanly
    for end in 0..full.len() {
        let prefix = &full.as_bytes()[..end];
        match Value::unpack(prefix) {
            Err(ValueError::Deserialize { offset, .. }) => assert!(offset <= end),
            other => panic!("prefix of {end} bytes gave {other:?}"),
        }
    }
}

#[test]
fn test_length_prefix_past_end() {
    let err = Value::unpack("S100:short").unwrap_err();
    assert!(matches!(err, ValueError::Deserialize { offset: 5, .. }));
}

#[test]
fn test_trailing_bytes_rejected() {
    assert!(Value::unpack("i1i2").is_err());
    assert!(Value::unpack("S1:xy").is_err());
    // the top-level string form has no trailer to reject
    assert_eq!(Value::unpack("sxy").unwrap(), Value::string("xy"));
}

#[test]
fn test_bad_payloads() {
    for bad in ["b2", "i--1", "i99999999999", "r1.2.3", "rinfinity", "a-1:", "a1u"] {
        assert!(
            matches!(Value::unpack(bad), Err(ValueError::Deserialize { .. })),
            "accepted {bad:?}"
        );
    }
}
