//! Subscript access
//!
//! Script indices are 1-based. Array indices are positions; string indices
//! are code points and are translated to byte offsets before any slice is
//! taken. An index outside `1..=len` fails with
//! [`ValueError::IndexOutOfRange`].
//!
//! Two indices on a string read as `[begin, len]` and select a substring.

use crate::error::{ValueError, ValueResult};
use crate::string::StringValue;
use crate::value::{Value, ValueKind};

/// Zero-based position for a 1-based script index into `len` elements
fn position(container: ValueKind, index: &Value, len: usize) -> ValueResult<usize> {
    let Some(n) = index.as_long() else {
        return Err(ValueError::type_mismatch("index", container, index.kind()));
    };
    if n < 1 || n as usize > len {
        return Err(ValueError::out_of_range(i64::from(n), len));
    }
    Ok(n as usize - 1)
}

/// Zero-based `(start, len)` for a `[begin, len]` string range
fn string_range(s: &StringValue, begin: &Value, len: &Value) -> ValueResult<(usize, usize)> {
    let count = s.length();
    let (Some(b), Some(l)) = (begin.as_long(), len.as_long()) else {
        let bad = if begin.as_long().is_none() { begin } else { len };
        return Err(ValueError::type_mismatch("index", ValueKind::String, bad.kind()));
    };
    if b < 1 || b as usize > count + 1 {
        return Err(ValueError::out_of_range(i64::from(b), count));
    }
    if l < 0 {
        return Err(ValueError::out_of_range(i64::from(l), count));
    }
    Ok((b as usize - 1, l as usize))
}

/// Text a string assignment writes
fn assigned_text(target: &Value) -> ValueResult<&str> {
    target
        .as_string()
        .map(StringValue::as_str)
        .ok_or_else(|| ValueError::type_mismatch("assign", ValueKind::String, target.kind()))
}

impl Value {
    /// `self[index]`
    pub fn subscript(&self, index: &Value) -> ValueResult<Value> {
        match self {
            Value::Array(arr) => {
                let pos = position(ValueKind::Array, index, arr.len())?;
                arr.get(pos)
                    .ok_or_else(|| ValueError::out_of_range((pos + 1) as i64, arr.len()))
            }
            Value::String(s) => {
                let pos = position(ValueKind::String, index, s.length())?;
                Ok(Value::String(s.substring(pos, 1)))
            }
            other => Err(ValueError::type_mismatch("index", other.kind(), index.kind())),
        }
    }

    /// `self[i, j, ...]`
    ///
    /// Arrays chain through nested elements; a string consumes exactly two
    /// indices as `[begin, len]`.
    pub fn subscript_multi(&self, indices: &[Value]) -> ValueResult<Value> {
        match (self, indices) {
            (_, []) => Err(ValueError::invalid_argument("subscript needs at least one index")),
            (_, [only]) => self.subscript(only),
            (Value::String(s), [begin, len]) => {
                let (start, len) = string_range(s, begin, len)?;
                Ok(Value::String(s.substring(start, len)))
            }
            (Value::String(_), _) => Err(ValueError::invalid_argument(
                "string subscript takes [begin, len]",
            )),
            (Value::Array(arr), [first, rest @ ..]) => {
                let pos = position(ValueKind::Array, first, arr.len())?;
                match arr.slot(pos) {
                    Some(slot) => slot.with(|element| element.subscript_multi(rest)),
                    None => Err(ValueError::out_of_range((pos + 1) as i64, arr.len())),
                }
            }
            (other, [first, ..]) => Err(ValueError::type_mismatch(
                "index",
                other.kind(),
                first.kind(),
            )),
        }
    }

    /// `self[index] := target`; returns the assigned value.
    pub fn subscript_assign(&mut self, index: &Value, target: Value) -> ValueResult<Value> {
        match self {
            Value::Array(arr) => {
                let pos = position(ValueKind::Array, index, arr.len())?;
                arr.set(pos, target.clone());
                Ok(target)
            }
            Value::String(s) => {
                let pos = position(ValueKind::String, index, s.length())?;
                s.replace_range(pos, 1, assigned_text(&target)?)?;
                Ok(target)
            }
            other => Err(ValueError::type_mismatch("index", other.kind(), index.kind())),
        }
    }

    /// `self[i, j, ...] := target`; returns the assigned value.
    pub fn subscript_multi_assign(&mut self, indices: &[Value], target: Value) -> ValueResult<Value> {
        if let [only] = indices {
            return self.subscript_assign(only, target);
        }
        match (self, indices) {
            (_, []) => Err(ValueError::invalid_argument("subscript needs at least one index")),
            (Value::String(s), [begin, len]) => {
                let (start, len) = string_range(s, begin, len)?;
                s.replace_range(start, len, assigned_text(&target)?)?;
                Ok(target)
            }
            (Value::String(_), _) => Err(ValueError::invalid_argument(
                "string subscript takes [begin, len]",
            )),
            (Value::Array(arr), [first, rest @ ..]) => {
                let pos = position(ValueKind::Array, first, arr.len())?;
                match arr.slot(pos) {
                    Some(slot) => slot.with_mut(|element| element.subscript_multi_assign(rest, target)),
                    None => Err(ValueError::out_of_range((pos + 1) as i64, arr.len())),
                }
            }
            (other, [first, ..]) => Err(ValueError::type_mismatch(
                "index",
                other.kind(),
                first.kind(),
            )),
        }
    }
}
