//! Operator dispatch
//!
//! Binary operators resolve in two steps. The left operand's kind picks a
//! per-kind entry point (`long_binary`, `string_binary`, ...); that entry point
//! matches on the right operand to pick the combination rule. A pair with no
//! rule falls through to the default arm and becomes
//! [`ValueError::TypeMismatch`].
//!
//! ```text
//!              rhs:  Long      Double    String    Array   Bool  Uninit
//! lhs Long    +      Long      Double    String    -       -     -
//!     Double  +      Double    Double    String    -       -     -
//!     String  +      String    String    String    String  -     -
//!     Array   +      append    append    append    concat  append -
//! ```
//!
//! Each operator has two call shapes. The non-mutating form (`plus`,
//! `minus`) returns a new value. The mutating form (`plus_assign`,
//! `minus_assign`) is called on the slot holding the left operand: when the
//! result keeps the left kind the storage is updated in place, otherwise the
//! slot is rebound to the new value.

use crate::array::ObjArray;
use crate::error::{ValueError, ValueResult};
use crate::string::StringValue;
use crate::value::{Value, ValueKind, ValueRef, format_double};
use std::cmp::Ordering;

/// Binary operators routed through dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
}

impl BinaryOp {
    /// Verb used in mismatch messages
    pub fn verb(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "subtract",
        }
    }
}

fn mismatch(op: BinaryOp, lhs: &Value, rhs: &Value) -> ValueError {
    ValueError::type_mismatch(op.verb(), lhs.kind(), rhs.kind())
}

/// Canonical text of a numeric operand, if it is one
fn numeric_text(value: &Value) -> Option<String> {
    match value {
        Value::Long(n) => Some(n.to_string()),
        Value::Double(n) => Some(format_double(*n)),
        _ => None,
    }
}

// Long ---------------------------------------------------------------------

fn long_binary(op: BinaryOp, lhs: i32, rhs: &Value) -> Option<Value> {
    match (op, rhs) {
        (BinaryOp::Add, Value::Long(r)) => Some(Value::Long(lhs.wrapping_add(*r))),
        (BinaryOp::Sub, Value::Long(r)) => Some(Value::Long(lhs.wrapping_sub(*r))),
        (BinaryOp::Add, Value::Double(r)) => Some(Value::Double(f64::from(lhs) + r)),
        (BinaryOp::Sub, Value::Double(r)) => Some(Value::Double(f64::from(lhs) - r)),
        (BinaryOp::Add, Value::String(r)) => Some(Value::string(format!("{}{}", lhs, r))),
        _ => None,
    }
}

// Double -------------------------------------------------------------------

fn double_binary(op: BinaryOp, lhs: f64, rhs: &Value) -> Option<Value> {
    match (op, rhs) {
        (BinaryOp::Add, Value::Long(r)) => Some(Value::Double(lhs + f64::from(*r))),
        (BinaryOp::Sub, Value::Long(r)) => Some(Value::Double(lhs - f64::from(*r))),
        (BinaryOp::Add, Value::Double(r)) => Some(Value::Double(lhs + r)),
        (BinaryOp::Sub, Value::Double(r)) => Some(Value::Double(lhs - r)),
        (BinaryOp::Add, Value::String(r)) => {
            Some(Value::string(format!("{}{}", format_double(lhs), r)))
        }
        _ => None,
    }
}

// String -------------------------------------------------------------------

/// Text the right operand contributes to a string operation
///
/// An array contributes its printed form, `{ 1, "a" }`.
fn string_operand(rhs: &Value) -> Option<String> {
    match rhs {
        Value::String(s) => Some(s.as_str().to_string()),
        Value::Array(_) => Some(rhs.string_rep()),
        other => numeric_text(other),
    }
}

fn string_binary(op: BinaryOp, lhs: &StringValue, rhs: &Value) -> Option<Value> {
    let text = string_operand(rhs)?;
    let mut result = lhs.clone();
    string_apply(op, &mut result, &text);
    Some(Value::String(result))
}

fn string_apply(op: BinaryOp, lhs: &mut StringValue, text: &str) {
    match op {
        BinaryOp::Add => lhs.push_str(text),
        BinaryOp::Sub => lhs.remove(text),
    }
}

// Array --------------------------------------------------------------------

fn array_accepts(rhs: &Value) -> bool {
    !matches!(rhs, Value::Uninit)
}

fn array_apply(op: BinaryOp, lhs: &mut ObjArray, rhs: &Value) {
    match (op, rhs) {
        (BinaryOp::Add, Value::Array(other)) => lhs.extend_from(other),
        (BinaryOp::Add, scalar) => lhs.push(scalar.clone()),
        (BinaryOp::Sub, Value::Array(other)) => {
            for value in other.values() {
                lhs.remove_equal(&value);
            }
        }
        (BinaryOp::Sub, scalar) => lhs.remove_equal(scalar),
    }
}

fn array_binary(op: BinaryOp, lhs: &ObjArray, rhs: &Value) -> Option<Value> {
    if !array_accepts(rhs) {
        return None;
    }
    let mut result = lhs.clone();
    array_apply(op, &mut result, rhs);
    Some(Value::Array(result))
}

impl Value {
    /// Apply `op` without modifying either operand.
    pub fn binary(&self, op: BinaryOp, rhs: &Value) -> ValueResult<Value> {
        let result = match self {
            Value::Long(l) => long_binary(op, *l, rhs),
            Value::Double(l) => double_binary(op, *l, rhs),
            Value::String(l) => string_binary(op, l, rhs),
            Value::Array(l) => array_binary(op, l, rhs),
            Value::Uninit | Value::Bool(_) => None,
        };
        result.ok_or_else(|| mismatch(op, self, rhs))
    }

    /// `self + rhs` as a new value
    pub fn plus(&self, rhs: &Value) -> ValueResult<Value> {
        self.binary(BinaryOp::Add, rhs)
    }

    /// `self - rhs` as a new value
    pub fn minus(&self, rhs: &Value) -> ValueResult<Value> {
        self.binary(BinaryOp::Sub, rhs)
    }

    /// Apply `op` to the slot holding `self`.
    ///
    /// On error the slot is left unchanged.
    pub fn binary_assign(&mut self, op: BinaryOp, rhs: &Value) -> ValueResult<()> {
        match (&mut *self, rhs) {
            (Value::Long(l), Value::Long(r)) => {
                *l = match op {
                    BinaryOp::Add => l.wrapping_add(*r),
                    BinaryOp::Sub => l.wrapping_sub(*r),
                };
                Ok(())
            }
            (Value::Double(l), r) if r.kind().is_numeric() => {
                let r = r.as_number().unwrap_or_default();
                match op {
                    BinaryOp::Add => *l += r,
                    BinaryOp::Sub => *l -= r,
                }
                Ok(())
            }
            (Value::String(l), r) => {
                let text = string_operand(r).ok_or_else(|| {
                    ValueError::type_mismatch(op.verb(), ValueKind::String, r.kind())
                })?;
                string_apply(op, l, &text);
                Ok(())
            }
            (Value::Array(l), r) if array_accepts(r) => {
                array_apply(op, l, r);
                Ok(())
            }
            _ => {
                let result = self.binary(op, rhs)?;
                *self = result;
                Ok(())
            }
        }
    }

    /// `self += rhs`
    pub fn plus_assign(&mut self, rhs: &Value) -> ValueResult<()> {
        self.binary_assign(BinaryOp::Add, rhs)
    }

    /// `self -= rhs`
    pub fn minus_assign(&mut self, rhs: &Value) -> ValueResult<()> {
        self.binary_assign(BinaryOp::Sub, rhs)
    }

    /// Three-way comparison; `None` when the kinds have no ordering rule.
    pub fn compare(&self, rhs: &Value) -> Option<Ordering> {
        match (self, rhs) {
            (Value::Uninit, Value::Uninit) => Some(Ordering::Equal),
            (Value::Bool(l), Value::Bool(r)) => Some(l.cmp(r)),
            (Value::Long(l), Value::Long(r)) => Some(l.cmp(r)),
            (Value::Long(_) | Value::Double(_), Value::Long(_) | Value::Double(_)) => {
                let l = self.as_number()?;
                let r = rhs.as_number()?;
                l.partial_cmp(&r)
            }
            (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
            (Value::Array(l), Value::Array(r)) => (l == r).then_some(Ordering::Equal),
            _ => None,
        }
    }

    /// Script equality
    pub fn equals(&self, rhs: &Value) -> bool {
        self.compare(rhs) == Some(Ordering::Equal)
    }

    /// Script `<`; false for kinds without an ordering rule
    pub fn less_than(&self, rhs: &Value) -> bool {
        self.compare(rhs) == Some(Ordering::Less)
    }
}

impl ValueRef {
    /// `slot += rhs`, in place when the slot's kind allows it
    pub fn plus_assign(&self, rhs: &Value) -> ValueResult<()> {
        self.with_mut(|value| value.plus_assign(rhs))
    }

    /// `slot -= rhs`, in place when the slot's kind allows it
    pub fn minus_assign(&self, rhs: &Value) -> ValueResult<()> {
        self.with_mut(|value| value.minus_assign(rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_promotion() {
        assert_eq!(Value::long(2).plus(&Value::long(3)).unwrap(), Value::long(5));
        assert_eq!(
            Value::long(2).plus(&Value::double(0.5)).unwrap().kind(),
            ValueKind::Double
        );
        assert_eq!(
            Value::double(2.5).minus(&Value::long(1)).unwrap(),
            Value::double(1.5)
        );
    }

    #[test]
    fn test_long_wraps() {
        assert_eq!(
            Value::long(i32::MAX).plus(&Value::long(1)).unwrap(),
            Value::long(i32::MIN)
        );
    }

    #[test]
    fn test_string_concat() {
        assert_eq!(
            Value::string("a").plus(&Value::long(5)).unwrap(),
            Value::string("a5")
        );
        assert_eq!(
            Value::string("x=").plus(&Value::double(0.25)).unwrap(),
            Value::string("x=0.25")
        );
        assert_eq!(
            Value::long(5).plus(&Value::string("a")).unwrap(),
            Value::string("5a")
        );
    }

    #[test]
    fn test_string_minus_removes() {
        assert_eq!(
            Value::string("banana").minus(&Value::string("an")).unwrap(),
            Value::string("ba")
        );
        assert_eq!(
            Value::string("a1b1").minus(&Value::long(1)).unwrap(),
            Value::string("ab")
        );
    }

    #[test]
    fn test_array_append_and_concat() {
        let arr = Value::array([Value::long(1)]);
        assert_eq!(
            arr.plus(&Value::string("x")).unwrap(),
            Value::array([Value::long(1), Value::string("x")])
        );
        assert_eq!(
            arr.plus(&Value::array([Value::long(2), Value::long(3)])).unwrap(),
            Value::array([Value::long(1), Value::long(2), Value::long(3)])
        );
        // the left operand is untouched by the non-mutating form
        assert_eq!(arr, Value::array([Value::long(1)]));
    }

    #[test]
    fn test_undefined_pairs_mismatch() {
        let err = Value::array([]).plus(&Value::Uninit).unwrap_err();
        assert_eq!(
            err,
            ValueError::type_mismatch("add", ValueKind::Array, ValueKind::Uninit)
        );
        assert!(Value::boolean(true).plus(&Value::long(1)).is_err());
        assert!(Value::string("a").plus(&Value::boolean(true)).is_err());
        assert!(Value::long(1).minus(&Value::string("1")).is_err());
    }

    #[test]
    fn test_string_with_array_uses_printed_form() {
        let arr = Value::array([Value::long(1), Value::string("a")]);
        assert_eq!(
            Value::string("x=").plus(&arr).unwrap(),
            Value::string("x={ 1, \"a\" }")
        );
        assert_eq!(
            Value::string("<{ 1, \"a\" }>").minus(&arr).unwrap(),
            Value::string("<>")
        );

        let mut s = Value::string("v");
        s.plus_assign(&Value::array([])).unwrap();
        assert_eq!(s.kind(), ValueKind::String);
        assert_eq!(s, Value::string(format!("v{}", Value::array([]).string_rep())));
    }

    #[test]
    fn test_assign_in_place_keeps_identity() {
        let mut s = Value::string("ab");
        let id = s.as_string().unwrap().id();
        s.plus_assign(&Value::long(1)).unwrap();
        assert_eq!(s, Value::string("ab1"));
        assert_eq!(s.as_string().unwrap().id(), id);
    }

    #[test]
    fn test_assign_rebinds_on_kind_change() {
        let mut v = Value::long(1);
        v.plus_assign(&Value::double(0.5)).unwrap();
        assert_eq!(v, Value::double(1.5));

        let mut w = Value::long(1);
        w.plus_assign(&Value::string("x")).unwrap();
        assert_eq!(w, Value::string("1x"));
    }

    #[test]
    fn test_assign_error_leaves_slot() {
        let mut v = Value::string("keep");
        assert!(v.plus_assign(&Value::Uninit).is_err());
        assert_eq!(v, Value::string("keep"));
    }

    #[test]
    fn test_value_ref_assign() {
        let slot = ValueRef::new(Value::array([]));
        slot.plus_assign(&Value::long(7)).unwrap();
        slot.plus_assign(&Value::long(8)).unwrap();
        slot.minus_assign(&Value::long(7)).unwrap();
        assert_eq!(slot.get(), Value::array([Value::long(8)]));
    }

    #[test]
    fn test_compare() {
        assert_eq!(
            Value::long(1).compare(&Value::double(1.5)),
            Some(Ordering::Less)
        );
        assert!(Value::double(2.0).equals(&Value::long(2)));
        assert!(Value::string("a").less_than(&Value::string("b")));
        assert_eq!(Value::string("1").compare(&Value::long(1)), None);
        assert!(!Value::string("1").equals(&Value::long(1)));
        assert_eq!(Value::double(f64::NAN).compare(&Value::double(f64::NAN)), None);
        assert!(Value::Uninit.equals(&Value::Uninit));
    }

    #[test]
    fn test_array_equality_has_no_order() {
        let a = Value::array([Value::long(1)]);
        let b = Value::array([Value::long(2)]);
        assert_eq!(a.compare(&a.clone()), Some(Ordering::Equal));
        assert_eq!(a.compare(&b), None);
        assert!(!a.less_than(&b));
    }
}
