//! Script runtime values
//!
//! [`Value`] is a closed set of kinds. The kind of a value is fixed when it is
//! constructed; operators never change a value's kind in place, they rebind
//! the slot holding it instead (see [`crate::dispatch`]).
//!
//! Heap-backed payloads are shared through [`ValueRef`] slots, the binding
//! cells that arrays store and that the mutating operator forms update.

use crate::array::ObjArray;
use crate::string::StringValue;
use parking_lot::Mutex;
use std::sync::Arc;

/// Kind tag of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Unassigned variable
    Uninit,
    /// Boolean
    Bool,
    /// 32-bit signed integer
    Long,
    /// 64-bit float
    Double,
    /// Unicode string
    String,
    /// Ordered collection
    Array,
}

impl ValueKind {
    /// User-visible type label
    pub fn name(self) -> &'static str {
        match self {
            Self::Uninit => "Uninit",
            Self::Bool => "Boolean",
            Self::Long => "Integer",
            Self::Double => "Double",
            Self::String => "String",
            Self::Array => "Array",
        }
    }

    /// Whether this kind takes part in numeric promotion
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Long | Self::Double)
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A script runtime value
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Unassigned variable
    #[default]
    Uninit,
    /// Boolean
    Bool(bool),
    /// 32-bit signed integer; arithmetic wraps
    Long(i32),
    /// 64-bit float
    Double(f64),
    /// Unicode string
    String(StringValue),
    /// Ordered collection
    Array(ObjArray),
}

impl Value {
    /// Create an integer value
    pub fn long(n: i32) -> Self {
        Self::Long(n)
    }

    /// Create a float value
    pub fn double(n: f64) -> Self {
        Self::Double(n)
    }

    /// Create a boolean value
    pub fn boolean(b: bool) -> Self {
        Self::Bool(b)
    }

    /// Create a string from internally produced text
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(StringValue::untainted(s))
    }

    /// Create a string from external bytes, sanitizing them
    pub fn tainted(bytes: impl AsRef<[u8]>) -> Self {
        Self::String(StringValue::tainted(bytes))
    }

    /// Create an array from values
    pub fn array(values: impl IntoIterator<Item = Value>) -> Self {
        Self::Array(ObjArray::from_values(values))
    }

    /// Kind tag of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Uninit => ValueKind::Uninit,
            Self::Bool(_) => ValueKind::Bool,
            Self::Long(_) => ValueKind::Long,
            Self::Double(_) => ValueKind::Double,
            Self::String(_) => ValueKind::String,
            Self::Array(_) => ValueKind::Array,
        }
    }

    /// User-visible type label
    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn is_uninit(&self) -> bool {
        matches!(self, Self::Uninit)
    }

    /// Script truthiness
    pub fn is_true(&self) -> bool {
        match self {
            Self::Uninit => false,
            Self::Bool(b) => *b,
            Self::Long(n) => *n != 0,
            Self::Double(n) => *n != 0.0,
            Self::String(s) => !s.is_empty(),
            Self::Array(a) => !a.is_empty(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i32> {
        match self {
            Self::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric value of a Long or Double
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Long(n) => Some(f64::from(*n)),
            Self::Double(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&StringValue> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_string_mut(&mut self) -> Option<&mut StringValue> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ObjArray> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut ObjArray> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Plain text form, used for concatenation and printing.
    pub fn string_rep(&self) -> String {
        match self {
            Self::Uninit => "<uninitialized object>".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Long(n) => n.to_string(),
            Self::Double(n) => format_double(*n),
            Self::String(s) => s.as_str().to_string(),
            Self::Array(a) => a.string_rep(),
        }
    }

    /// Text form with strings quoted, used inside composite representations.
    pub fn formatted_rep(&self) -> String {
        match self {
            Self::String(s) => format!("\"{}\"", s.as_str()),
            other => other.string_rep(),
        }
    }

    /// Approximate memory footprint in bytes
    pub fn size_estimate(&self) -> usize {
        match self {
            Self::String(s) => s.size_estimate(),
            Self::Array(a) => std::mem::size_of::<Self>() + a.size_estimate(),
            _ => std::mem::size_of::<Self>(),
        }
    }
}

/// Canonical text of a float: shortest form that parses back to the same bits.
pub fn format_double(n: f64) -> String {
    n.to_string()
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.string_rep())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Long(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Double(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::string(s)
    }
}

impl From<StringValue> for Value {
    fn from(s: StringValue) -> Self {
        Self::String(s)
    }
}

impl From<ObjArray> for Value {
    fn from(a: ObjArray) -> Self {
        Self::Array(a)
    }
}

/// Shared binding slot for a value
///
/// Cloning a `ValueRef` shares the slot; use [`ValueRef::get`] for a copy of
/// the value it holds.
#[derive(Clone, Default)]
pub struct ValueRef(Arc<Mutex<Value>>);

impl ValueRef {
    /// Create a new slot holding `value`
    pub fn new(value: Value) -> Self {
        Self(Arc::new(Mutex::new(value)))
    }

    /// Copy of the current value
    pub fn get(&self) -> Value {
        self.0.lock().clone()
    }

    /// Rebind the slot
    pub fn set(&self, value: Value) {
        *self.0.lock() = value;
    }

    /// Rebind the slot, returning the previous value
    pub fn replace(&self, value: Value) -> Value {
        std::mem::replace(&mut *self.0.lock(), value)
    }

    /// Run `f` against the current value without copying it
    pub fn with<R>(&self, f: impl FnOnce(&Value) -> R) -> R {
        f(&*self.0.lock())
    }

    /// Run `f` against the current value with mutable access
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Value) -> R) -> R {
        f(&mut *self.0.lock())
    }

    /// Whether both handles share one slot
    pub fn ptr_eq(&self, other: &ValueRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for ValueRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ValueRef({:?})", *self.0.lock())
    }
}

impl From<Value> for ValueRef {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
