//! # Sable Value
//!
//! Runtime value core for the Sable scripting runtime.
//!
//! ## Design Principles
//!
//! - **Closed kinds**: a [`Value`] never changes kind in place; operators
//!   rebind the slot instead
//! - **Two-step dispatch**: the left operand picks an entry point, the right
//!   operand picks the rule
//! - **Valid text only**: every [`StringValue`] holds valid UTF-8; external
//!   bytes are repaired on the way in
//! - **Self-describing pack format**: any value round-trips through
//!   [`Value::pack`] / [`Value::unpack`] without a schema

#![warn(clippy::all)]

pub mod array;
pub mod codec;
pub mod dispatch;
pub mod error;
pub mod method;
pub mod string;
pub mod subscript;
pub mod value;

pub use array::ObjArray;
pub use codec::{MAX_DEPTH, Reader};
pub use dispatch::BinaryOp;
pub use error::{ValueError, ValueResult};
pub use method::MethodId;
pub use string::{ConstString, StringValue, SubString, TrimSide};
pub use value::{Value, ValueKind, ValueRef};
