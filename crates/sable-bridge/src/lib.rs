//! # Sable Bridge
//!
//! Marshals calls from runtime-execution threads onto a single dedicated
//! engine thread.
//!
//! ## Design Principles
//!
//! - **Single owner**: engine state is created on the engine thread and only
//!   ever touched there
//! - **Requests, not callbacks**: every call yields a [`Request`] with an id,
//!   time-ordered checkpoints and exactly one result
//! - **Failures stay in the future**: errors and panics inside a call are
//!   delivered as the call's outcome and the engine thread keeps running
//! - **Cooperative cancellation**: dropping a [`RequestFuture`] discards the
//!   result; the call still runs

#![warn(clippy::all)]

pub mod bridge;
pub mod config;
pub mod error;
pub mod program;
pub mod request;

pub use bridge::{AsyncCallBridge, BridgeStats, BridgeStatsSnapshot, Env};
pub use config::{BridgeBuilder, BridgeConfig};
pub use error::{BridgeError, BridgeResult};
pub use program::{ContextState, ExecutionContext, Program};
pub use request::{Checkpoint, Request, RequestFuture};
