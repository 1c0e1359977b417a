//! Value core error types

use crate::value::ValueKind;
use thiserror::Error;

/// Errors raised by operator dispatch, subscripts, methods and the wire codec
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueError {
    /// No dispatch rule exists for the operand kinds
    #[error("TypeError: cannot {op} {lhs} and {rhs}")]
    TypeMismatch {
        /// Operation name ("add", "subtract", "index", ...)
        op: &'static str,
        /// Left operand kind
        lhs: ValueKind,
        /// Right operand kind
        rhs: ValueKind,
    },

    /// Subscript or range outside the value's bounds
    #[error("RangeError: index {index} out of range for length {len}")]
    IndexOutOfRange {
        /// Requested index as supplied by the caller
        index: i64,
        /// Length of the indexed value
        len: usize,
    },

    /// Malformed or truncated pack buffer
    #[error("DeserializeError: {reason} at offset {offset}")]
    Deserialize {
        /// Byte offset where decoding failed
        offset: usize,
        /// What was wrong with the input
        reason: String,
    },

    /// Unknown method name or id
    #[error("NoSuchMethod: {0}")]
    NoSuchMethod(String),

    /// Method called with unusable arguments
    #[error("InvalidArgument: {0}")]
    InvalidArgument(String),

    /// Explicit validity check rejected the bytes
    #[error("InvalidUnicode: invalid UTF-8 after byte {valid_up_to}")]
    InvalidUnicode {
        /// Length of the valid prefix
        valid_up_to: usize,
    },

    /// A substring view outlived a mutation of its owner
    #[error("StaleView: owning string was mutated or replaced")]
    StaleView,
}

impl ValueError {
    /// Create a type mismatch error
    pub fn type_mismatch(op: &'static str, lhs: ValueKind, rhs: ValueKind) -> Self {
        Self::TypeMismatch { op, lhs, rhs }
    }

    /// Create an out of range error
    pub fn out_of_range(index: i64, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }

    /// Create a deserialization error
    pub fn deserialize(offset: usize, reason: impl Into<String>) -> Self {
        Self::Deserialize {
            offset,
            reason: reason.into(),
        }
    }

    /// Create a no such method error
    pub fn no_such_method(name: impl Into<String>) -> Self {
        Self::NoSuchMethod(name.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Result type for value operations
pub type ValueResult<T> = std::result::Result<T, ValueError>;
