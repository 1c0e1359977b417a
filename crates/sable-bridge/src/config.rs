//! Bridge configuration
//!
//! [`BridgeConfig`] can be deserialized from JSON so hosts can keep bridge
//! settings next to the rest of their configuration; [`BridgeBuilder`] is the
//! programmatic form.

use crate::bridge::AsyncCallBridge;
use crate::error::BridgeResult;
use serde::Deserialize;

/// Default name of the engine thread
pub const DEFAULT_THREAD_NAME: &str = "sable-engine";

/// Default capacity of the call queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Settings for an [`AsyncCallBridge`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Name given to the engine thread.
    /// Default: "sable-engine"
    pub thread_name: String,

    /// Calls that may wait in the queue before `make_call` blocks and
    /// `try_make_call` fails. Minimum 1.
    /// Default: 1024
    pub queue_capacity: usize,

    /// Id given to the first request.
    /// Default: 1
    pub first_request_id: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            first_request_id: 1,
        }
    }
}

impl BridgeConfig {
    /// Parse a config from JSON; missing fields take their defaults.
    ///
    /// ```
    /// use sable_bridge::BridgeConfig;
    ///
    /// let config = BridgeConfig::from_json(r#"{ "queue_capacity": 8 }"#).unwrap();
    /// assert_eq!(config.queue_capacity, 8);
    /// assert_eq!(config.thread_name, "sable-engine");
    /// ```
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.normalized())
    }

    fn normalized(mut self) -> Self {
        self.queue_capacity = self.queue_capacity.max(1);
        self
    }
}

/// Builder for creating an [`AsyncCallBridge`] with custom configuration
#[derive(Debug, Clone, Default)]
pub struct BridgeBuilder {
    pub(crate) config: BridgeConfig,
}

impl BridgeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the engine thread name
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = name.into();
        self
    }

    /// Set the call queue capacity (backpressure threshold)
    ///
    /// When the queue is full, `try_make_call` returns `QueueFull`.
    /// Default is 1024.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity.max(1);
        self
    }

    /// Set the id of the first request
    pub fn first_request_id(mut self, id: u64) -> Self {
        self.config.first_request_id = id;
        self
    }

    /// Replace all settings
    pub fn config(mut self, config: BridgeConfig) -> Self {
        self.config = config.normalized();
        self
    }

    /// Start the engine thread and create the engine state on it
    ///
    /// Blocks until `factory` has run. A factory error or panic is reported
    /// as `EngineInit` and no thread is left behind.
    pub fn build<E, F>(self, factory: F) -> BridgeResult<AsyncCallBridge<E>>
    where
        E: 'static,
        F: FnOnce() -> anyhow::Result<E> + Send + 'static,
    {
        AsyncCallBridge::start(self.config, factory)
    }
}
