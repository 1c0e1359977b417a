//! Built-in method catalog
//!
//! Every built-in method has a stable numeric id and a script-visible name.
//! Names resolve case-insensitively. Script positions (`find`, `substr`,
//! `subreplace`, `insert`, `erase`) are 1-based like subscripts.

use crate::array::ObjArray;
use crate::error::{ValueError, ValueResult};
use crate::string::{ConstString, DEFAULT_TRIM_SET, StringValue, TrimSide, is_valid_unicode};
use crate::value::{Value, ValueKind};
use rustc_hash::FxHashMap;
use std::sync::LazyLock;

/// Identifier of a built-in method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MethodId {
    // String
    Length = 1,
    Upper = 2,
    Lower = 3,
    Find = 4,
    Trim = 5,
    Replace = 6,
    SubReplace = 7,
    Substr = 8,
    Split = 9,
    Join = 10,
    IsValidUnicode = 11,
    Utf16 = 12,
    Utf32 = 13,

    // Array
    Size = 101,
    Append = 102,
    Insert = 103,
    Erase = 104,
    Reverse = 105,
}

impl MethodId {
    /// All catalog entries
    pub const ALL: [MethodId; 18] = [
        Self::Length,
        Self::Upper,
        Self::Lower,
        Self::Find,
        Self::Trim,
        Self::Replace,
        Self::SubReplace,
        Self::Substr,
        Self::Split,
        Self::Join,
        Self::IsValidUnicode,
        Self::Utf16,
        Self::Utf32,
        Self::Size,
        Self::Append,
        Self::Insert,
        Self::Erase,
        Self::Reverse,
    ];

    /// Stable numeric id
    pub fn id(self) -> u16 {
        self as u16
    }

    /// Catalog entry for a numeric id
    pub fn from_id(id: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.id() == id)
    }

    /// Catalog entry for a name, ignoring ASCII case
    pub fn lookup(name: &str) -> Option<Self> {
        static BY_NAME: LazyLock<FxHashMap<&'static str, MethodId>> =
            LazyLock::new(|| MethodId::ALL.into_iter().map(|m| (m.name(), m)).collect());
        BY_NAME.get(name.to_ascii_lowercase().as_str()).copied()
    }

    /// Script-visible name
    pub fn name(self) -> &'static str {
        match self {
            Self::Length => "length",
            Self::Upper => "upper",
            Self::Lower => "lower",
            Self::Find => "find",
            Self::Trim => "trim",
            Self::Replace => "replace",
            Self::SubReplace => "subreplace",
            Self::Substr => "substr",
            Self::Split => "split",
            Self::Join => "join",
            Self::IsValidUnicode => "isvalidunicode",
            Self::Utf16 => "utf16",
            Self::Utf32 => "utf32",
            Self::Size => "size",
            Self::Append => "append",
            Self::Insert => "insert",
            Self::Erase => "erase",
            Self::Reverse => "reverse",
        }
    }

    /// Kind of value the method is defined on
    pub fn receiver(self) -> ValueKind {
        if self.id() > 100 {
            ValueKind::Array
        } else {
            ValueKind::String
        }
    }

    /// Whether the method changes its receiver
    pub fn mutates(self) -> bool {
        matches!(
            self,
            Self::Replace
                | Self::SubReplace
                | Self::Append
                | Self::Insert
                | Self::Erase
                | Self::Reverse
        )
    }
}

impl std::fmt::Display for MethodId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn arity(method: MethodId, args: &[Value], min: usize, max: usize) -> ValueResult<()> {
    if args.len() < min || args.len() > max {
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{min} to {max}")
        };
        return Err(ValueError::invalid_argument(format!(
            "{method} takes {expected} argument(s), got {}",
            args.len()
        )));
    }
    Ok(())
}

fn long_arg(method: MethodId, args: &[Value], pos: usize) -> ValueResult<i32> {
    args[pos].as_long().ok_or_else(|| {
        ValueError::invalid_argument(format!(
            "{method}: argument {} must be Integer, got {}",
            pos + 1,
            args[pos].type_name()
        ))
    })
}

fn str_arg(method: MethodId, args: &[Value], pos: usize) -> ValueResult<&str> {
    args[pos].as_string().map(StringValue::as_str).ok_or_else(|| {
        ValueError::invalid_argument(format!(
            "{method}: argument {} must be String, got {}",
            pos + 1,
            args[pos].type_name()
        ))
    })
}

/// Zero-based start for a 1-based script position that may point one past the end
fn start_arg(method: MethodId, args: &[Value], pos: usize, len: usize) -> ValueResult<usize> {
    let n = long_arg(method, args, pos)?;
    if n < 1 || n as usize > len + 1 {
        return Err(ValueError::out_of_range(i64::from(n), len));
    }
    Ok(n as usize - 1)
}

fn len_arg(method: MethodId, args: &[Value], pos: usize) -> ValueResult<usize> {
    let n = long_arg(method, args, pos)?;
    usize::try_from(n)
        .map_err(|_| ValueError::invalid_argument(format!("{method}: negative length {n}")))
}

fn code_units(units: impl IntoIterator<Item = i32>) -> Value {
    Value::array(units.into_iter().map(Value::long))
}

/// Non-mutating string methods
fn string_query(s: &StringValue, method: MethodId, args: &[Value]) -> ValueResult<Value> {
    match method {
        MethodId::Length => {
            arity(method, args, 0, 0)?;
            Ok(Value::long(s.length() as i32))
        }
        MethodId::Upper | MethodId::Lower => {
            arity(method, args, 0, 0)?;
            let mut out = s.clone();
            if method == MethodId::Upper {
                out.to_upper();
            } else {
                out.to_lower();
            }
            Ok(Value::String(out))
        }
        MethodId::Find => {
            arity(method, args, 1, 2)?;
            let target = str_arg(method, args, 0)?;
            let start = if args.len() > 1 {
                start_arg(method, args, 1, s.length())?
            } else {
                0
            };
            let found = s.find(target, start).map_or(0, |i| i as i32 + 1);
            Ok(Value::long(found))
        }
        MethodId::Trim => {
            arity(method, args, 0, 2)?;
            let set = if args.is_empty() {
                DEFAULT_TRIM_SET
            } else {
                str_arg(method, args, 0)?
            };
            let side = if args.len() > 1 {
                let code = long_arg(method, args, 1)?;
                TrimSide::from_code(code).ok_or_else(|| {
                    ValueError::invalid_argument(format!("trim: unknown side {code}"))
                })?
            } else {
                TrimSide::Both
            };
            let mut out = s.clone();
            out.trim(set, side);
            Ok(Value::String(out))
        }
        MethodId::Substr => {
            arity(method, args, 2, 2)?;
            let start = start_arg(method, args, 0, s.length())?;
            let len = len_arg(method, args, 1)?;
            Ok(Value::String(s.substring(start, len)))
        }
        MethodId::Split => {
            arity(method, args, 0, 1)?;
            let sep = if args.is_empty() {
                None
            } else {
                Some(str_arg(method, args, 0)?)
            };
            Ok(Value::array(s.split(sep).into_iter().map(Value::String)))
        }
        MethodId::Join => {
            arity(method, args, 1, 1)?;
            let Some(items) = args[0].as_array() else {
                return Err(ValueError::invalid_argument(format!(
                    "join: argument 1 must be Array, got {}",
                    args[0].type_name()
                )));
            };
            let parts: Vec<String> = items.values().iter().map(Value::string_rep).collect();
            Ok(Value::string(parts.join(s.as_str())))
        }
        MethodId::IsValidUnicode => {
            arity(method, args, 0, 0)?;
            Ok(Value::boolean(is_valid_unicode(s.as_bytes())))
        }
        MethodId::Utf16 => {
            arity(method, args, 0, 0)?;
            Ok(code_units(s.to_utf16().into_iter().map(i32::from)))
        }
        MethodId::Utf32 => {
            arity(method, args, 0, 0)?;
            Ok(code_units(s.to_utf32().into_iter().map(|c| c as i32)))
        }
        other => Err(ValueError::no_such_method(format!("String.{other}"))),
    }
}

/// Mutating string methods; both return the updated string
fn string_update(s: &mut StringValue, method: MethodId, args: &[Value]) -> ValueResult<Value> {
    match method {
        MethodId::Replace => {
            arity(method, args, 2, 2)?;
            let pattern = str_arg(method, args, 0)?;
            let with = str_arg(method, args, 1)?;
            s.replace(pattern, with);
        }
        MethodId::SubReplace => {
            arity(method, args, 3, 3)?;
            let with = str_arg(method, args, 0)?;
            let start = start_arg(method, args, 1, s.length())?;
            let len = len_arg(method, args, 2)?;
            s.replace_range(start, len, with)?;
        }
        other => return string_query(s, other, args),
    }
    Ok(Value::String(s.clone()))
}

fn array_call(arr: &mut ObjArray, method: MethodId, args: &[Value]) -> ValueResult<Value> {
    match method {
        MethodId::Size => {
            arity(method, args, 0, 0)?;
            Ok(Value::long(arr.len() as i32))
        }
        MethodId::Append => {
            arity(method, args, 1, usize::MAX)?;
            for value in args {
                arr.push(value.clone());
            }
            Ok(Value::long(arr.len() as i32))
        }
        MethodId::Insert => {
            arity(method, args, 2, 2)?;
            let at = start_arg(method, args, 0, arr.len())?;
            arr.insert(at, args[1].clone());
            Ok(Value::long(arr.len() as i32))
        }
        MethodId::Erase => {
            arity(method, args, 1, 1)?;
            let n = long_arg(method, args, 0)?;
            let len = arr.len();
            if n < 1 {
                return Err(ValueError::out_of_range(i64::from(n), len));
            }
            arr.remove(n as usize - 1)
                .ok_or_else(|| ValueError::out_of_range(i64::from(n), len))
        }
        MethodId::Reverse => {
            arity(method, args, 0, 0)?;
            arr.reverse();
            Ok(Value::Uninit)
        }
        other => Err(ValueError::no_such_method(format!("Array.{other}"))),
    }
}

impl Value {
    /// Call a built-in method by name
    pub fn call_method(&mut self, name: &str, args: &[Value]) -> ValueResult<Value> {
        let method = MethodId::lookup(name)
            .ok_or_else(|| ValueError::no_such_method(format!("{}.{name}", self.type_name())))?;
        self.call_method_id(method, args)
    }

    /// Call a built-in method by catalog entry
    pub fn call_method_id(&mut self, method: MethodId, args: &[Value]) -> ValueResult<Value> {
        match self {
            Value::String(s) if method.receiver() == ValueKind::String => {
                string_update(s, method, args)
            }
            Value::Array(arr) if method.receiver() == ValueKind::Array => {
                array_call(arr, method, args)
            }
            other => Err(ValueError::no_such_method(format!(
                "{}.{method}",
                other.type_name()
            ))),
        }
    }
}

impl ConstString {
    /// Call a non-mutating built-in method by name
    pub fn call_method(&self, name: &str, args: &[Value]) -> ValueResult<Value> {
        let method = MethodId::lookup(name)
            .ok_or_else(|| ValueError::no_such_method(format!("ConstString.{name}")))?;
        self.call_method_id(method, args)
    }

    /// Call a non-mutating built-in method by catalog entry
    pub fn call_method_id(&self, method: MethodId, args: &[Value]) -> ValueResult<Value> {
        if method.mutates() || method.receiver() != ValueKind::String {
            return Err(ValueError::no_such_method(format!("ConstString.{method}")));
        }
        string_query(self, method, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case() {
        assert_eq!(MethodId::lookup("Length"), Some(MethodId::Length));
        assert_eq!(MethodId::lookup("ISVALIDUNICODE"), Some(MethodId::IsValidUnicode));
        assert_eq!(MethodId::lookup("nope"), None);
    }

    #[test]
    fn test_ids_are_stable() {
        for method in MethodId::ALL {
            assert_eq!(MethodId::from_id(method.id()), Some(method));
        }
        assert_eq!(MethodId::Length.id(), 1);
        assert_eq!(MethodId::Size.id(), 101);
        assert_eq!(MethodId::from_id(0), None);
    }

    #[test]
    fn test_find_is_one_based() {
        let mut s = Value::string("h\u{e9}llo h\u{e9}llo");
        let arg = [Value::string("llo")];
        assert_eq!(s.call_method("find", &arg).unwrap(), Value::long(3));
        let from = [Value::string("llo"), Value::long(4)];
        assert_eq!(s.call_method("find", &from).unwrap(), Value::long(9));
        let missing = [Value::string("xyz")];
        assert_eq!(s.call_method("find", &missing).unwrap(), Value::long(0));
    }

    #[test]
    fn test_replace_mutates() {
        let mut s = Value::string("a-b-c");
        s.call_method("replace", &[Value::string("-"), Value::string("+")])
            .unwrap();
        assert_eq!(s, Value::string("a+b+c"));

        s.call_method(
            "subreplace",
            &[Value::string("XY"), Value::long(2), Value::long(3)],
        )
        .unwrap();
        assert_eq!(s, Value::string("aXYc"));
    }

    #[test]
    fn test_trim_sides() {
        let mut s = Value::string("  pad  ");
        assert_eq!(s.call_method("trim", &[]).unwrap(), Value::string("pad"));
        let leading = [Value::string(" "), Value::long(1)];
        assert_eq!(s.call_method("trim", &leading).unwrap(), Value::string("pad  "));
        let bad = [Value::string(" "), Value::long(7)];
        assert!(matches!(
            s.call_method("trim", &bad),
            Err(ValueError::InvalidArgument(_))
        ));
        // trim returns a copy
        assert_eq!(s, Value::string("  pad  "));
    }

    #[test]
    fn test_split_and_join() {
        let mut s = Value::string("a,b,,c");
        let parts = s.call_method("split", &[Value::string(",")]).unwrap();
        assert_eq!(
            parts,
            Value::array(["a", "b", "", "c"].map(Value::string))
        );
        let mut sep = Value::string("/");
        assert_eq!(sep.call_method("join", &[parts]).unwrap(), Value::string("a/b//c"));
    }

    #[test]
    fn test_code_units() {
        let mut s = Value::string("a\u{1F600}");
        assert_eq!(
            s.call_method("utf16", &[]).unwrap(),
            Value::array([Value::long(0x61), Value::long(0xD83D), Value::long(0xDE00)])
        );
        assert_eq!(
            s.call_method("utf32", &[]).unwrap(),
            Value::array([Value::long(0x61), Value::long(0x1F600)])
        );
    }

    #[test]
    fn test_array_methods() {
        let mut arr = Value::array([Value::long(1), Value::long(2)]);
        assert_eq!(arr.call_method("append", &[Value::long(3)]).unwrap(), Value::long(3));
        arr.call_method("insert", &[Value::long(1), Value::long(0)])
            .unwrap();
        assert_eq!(
            arr.call_method("erase", &[Value::long(4)]).unwrap(),
            Value::long(3)
        );
        arr.call_method("reverse", &[]).unwrap();
        assert_eq!(
            arr,
            Value::array([Value::long(2), Value::long(1), Value::long(0)])
        );
        assert!(matches!(
            arr.call_method("erase", &[Value::long(0)]),
            Err(ValueError::IndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_wrong_receiver() {
        let mut n = Value::long(1);
        assert_eq!(
            n.call_method("length", &[]).unwrap_err(),
            ValueError::no_such_method("Integer.length")
        );
        let mut arr = Value::array([]);
        assert!(matches!(
            arr.call_method("upper", &[]),
            Err(ValueError::NoSuchMethod(_))
        ));
    }

    #[test]
    fn test_const_string_hides_mutators() {
        let c = ConstString::new("fixed");
        assert_eq!(c.call_method("upper", &[]).unwrap(), Value::string("FIXED"));
        assert_eq!(
            c.call_method("replace", &[Value::string("f"), Value::string("m")])
                .unwrap_err(),
            ValueError::no_such_method("ConstString.replace")
        );
        assert!(c.call_method("size", &[]).is_err());
    }

    #[test]
    fn test_bad_arguments() {
        let mut s = Value::string("abc");
        assert!(matches!(
            s.call_method("find", &[]),
            Err(ValueError::InvalidArgument(_))
        ));
        assert!(matches!(
            s.call_method("substr", &[Value::long(1), Value::long(-2)]),
            Err(ValueError::InvalidArgument(_))
        ));
        assert!(matches!(
            s.call_method("join", &[Value::long(1)]),
            Err(ValueError::InvalidArgument(_))
        ));
    }
}
