//! Integration tests for operator dispatch and comparisons

use sable_value::{Value, ValueError, ValueKind, ValueRef};
use std::cmp::Ordering;

#[test]
fn test_string_plus_long() {
    let result = Value::string("a").plus(&Value::long(5)).unwrap();
    assert_eq!(result, Value::string("a5"));
}

#[test]
fn test_long_plus_long() {
    let result = Value::long(2).plus(&Value::long(3)).unwrap();
    assert_eq!(result, Value::long(5));
    assert_eq!(result.kind(), ValueKind::Long);
}

#[test]
fn test_numeric_promotion() {
    let result = Value::long(2).plus(&Value::double(0.5)).unwrap();
    assert_eq!(result.kind(), ValueKind::Double);
    assert_eq!(result.as_number(), Some(2.5));

    let result = Value::double(1.5).minus(&Value::long(2)).unwrap();
    assert_eq!(result, Value::double(-0.5));
}

#[test]
fn test_long_overflow_wraps() {
    let result = Value::long(i32::MAX).plus(&Value::long(1)).unwrap();
    assert_eq!(result, Value::long(i32::MIN));
}

#[test]
fn test_string_plus_double_uses_canonical_text() {
    let result = Value::string("x=").plus(&Value::double(0.1)).unwrap();
    assert_eq!(result, Value::string("x=0.1"));
    let result = Value::double(2.0).plus(&Value::string("!")).unwrap();
    assert_eq!(result, Value::string("2!"));
}

#[test]
fn test_string_minus_removes_occurrences() {
    let result = Value::string("banana").minus(&Value::string("an")).unwrap();
    assert_eq!(result, Value::string("ba"));
    let result = Value::string("1x1y1").minus(&Value::long(1)).unwrap();
    assert_eq!(result, Value::string("xy"));
}

#[test]
fn test_array_append_and_concat() {
    let arr = Value::array([Value::long(1)]);
    let appended = arr.plus(&Value::string("two")).unwrap();
    assert_eq!(appended, Value::array([Value::long(1), Value::string("two")]));

    let joined = arr.plus(&Value::array([Value::long(2), Value::long(3)])).unwrap();
    assert_eq!(
        joined,
        Value::array([Value::long(1), Value::long(2), Value::long(3)])
    );
    // the left operand is untouched by the non-mutating form
    assert_eq!(arr, Value::array([Value::long(1)]));
}

#[test]
fn test_unsupported_combination_is_type_mismatch() {
    let err = Value::array([]).plus(&Value::Uninit).unwrap_err();
    assert_eq!(
        err,
        ValueError::TypeMismatch {
            op: "add",
            lhs: ValueKind::Array,
            rhs: ValueKind::Uninit,
        }
    );

    let err = Value::long(1).plus(&Value::array([])).unwrap_err();
    assert!(matches!(err, ValueError::TypeMismatch { .. }));
    assert_eq!(err.to_string(), "TypeError: cannot add Integer and Array");

    assert!(Value::string("a").minus(&Value::boolean(true)).is_err());
    assert!(Value::long(1).minus(&Value::string("1")).is_err());
}

#[test]
fn test_plus_assign_in_place() {
    let mut s = Value::string("ab");
    s.plus_assign(&Value::long(1)).unwrap();
    assert_eq!(s, Value::string("ab1"));

    let mut n = Value::double(1.0);
    n.plus_assign(&Value::long(1)).unwrap();
    assert_eq!(n, Value::double(2.0));
}

#[test]
fn test_plus_assign_rebinds_on_kind_change() {
    let mut n = Value::long(1);
    n.plus_assign(&Value::double(0.5)).unwrap();
    assert_eq!(n.kind(), ValueKind::Double);

    let mut n = Value::long(1);
    n.plus_assign(&Value::string("st")).unwrap();
    assert_eq!(n, Value::string("1st"));
}

#[test]
fn test_failed_assign_leaves_slot_unchanged() {
    let mut n = Value::long(7);
    assert!(n.plus_assign(&Value::Uninit).is_err());
    assert_eq!(n, Value::long(7));
}

#[test]
fn test_shared_slot_assign() {
    let slot = ValueRef::new(Value::array([]));
    let alias = slot.clone();
    slot.plus_assign(&Value::long(1)).unwrap();
    alias.plus_assign(&Value::long(2)).unwrap();
    assert_eq!(slot.get(), Value::array([Value::long(1), Value::long(2)]));

    slot.minus_assign(&Value::long(1)).unwrap();
    assert_eq!(alias.get(), Value::array([Value::long(2)]));
}

#[test]
fn test_compare_numeric_across_kinds() {
    assert_eq!(Value::long(2).compare(&Value::double(2.0)), Some(Ordering::Equal));
    assert_eq!(Value::long(2).compare(&Value::double(2.5)), Some(Ordering::Less));
    assert!(Value::double(3.0).equals(&Value::long(3)));
    assert!(Value::long(-1).less_than(&Value::long(0)));
}

#[test]
fn test_compare_cross_kind_is_undefined() {
    assert_eq!(Value::long(1).compare(&Value::string("1")), None);
    assert!(!Value::long(1).equals(&Value::string("1")));
    assert!(!Value::long(1).less_than(&Value::string("2")));
    assert!(!Value::string("2").less_than(&Value::long(1)));
}

#[test]
fn test_compare_strings_by_code_point() {
    assert!(Value::string("a").less_than(&Value::string("b")));
    assert!(Value::string("z").less_than(&Value::string("\u{e9}")));
    assert!(Value::string("\u{FFFF}").less_than(&Value::string("\u{10000}")));
}

#[test]
fn test_compare_arrays_elementwise() {
    let a = Value::array([Value::long(1), Value::string("x")]);
    let b = Value::array([Value::double(1.0), Value::string("x")]);
    assert!(a.equals(&b));
    assert_eq!(a.compare(&Value::array([])), None);
    assert!(!a.less_than(&b));
}

#[test]
fn test_uninit_equals_uninit() {
    assert!(Value::Uninit.equals(&Value::Uninit));
    assert!(!Value::Uninit.equals(&Value::long(0)));
}
