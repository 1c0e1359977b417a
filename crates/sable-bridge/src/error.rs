//! Error types for sable-bridge

use sable_value::ValueError;
use thiserror::Error;

/// Outcome of a bridged call that did not produce a result
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// The callable returned an error
    #[error("Engine call failed: {0}")]
    CallFailed(String),

    /// The callable panicked; the engine thread survived
    #[error("Engine call panicked: {0}")]
    Panicked(String),

    /// The bridge stopped before the call completed
    #[error("Bridge shut down before the call completed")]
    Shutdown,

    /// The call queue is at capacity
    #[error("Bridge call queue is full")]
    QueueFull,

    /// The waiting side stopped waiting; the call may still run
    #[error("Caller stopped waiting for the call")]
    Abandoned,

    /// The engine factory failed on the engine thread
    #[error("Engine initialization failed: {0}")]
    EngineInit(String),

    /// Values could not be marshalled across the thread boundary
    #[error(transparent)]
    Codec(#[from] ValueError),
}

impl BridgeError {
    /// Create a call failure from the callable's error, keeping its context chain
    pub fn call_failed(err: &anyhow::Error) -> Self {
        Self::CallFailed(format!("{err:#}"))
    }

    /// Create an engine initialization error
    pub fn engine_init(message: impl Into<String>) -> Self {
        Self::EngineInit(message.into())
    }
}

/// Result type alias for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;
