//! Single-owner engine thread
//!
//! An [`AsyncCallBridge`] owns exactly one engine thread and the engine state
//! that lives on it. Any number of runtime threads submit callables with
//! [`make_call`](AsyncCallBridge::make_call); each callable runs on the engine
//! thread with exclusive access to the state and its outcome comes back
//! through a [`RequestFuture`].
//!
//! # Example
//!
//! ```no_run
//! use sable_bridge::{AsyncCallBridge, Request};
//!
//! #[tokio::main]
//! async fn main() {
//!     let bridge = AsyncCallBridge::new(|| Ok(Vec::<String>::new())).unwrap();
//!
//!     let request: Request<usize> = bridge
//!         .make_call(|env| {
//!             env.push("hello".to_string());
//!             Ok(env.len())
//!         })
//!         .await;
//!     assert_eq!(request.into_result(), Ok(1));
//!
//!     bridge.shutdown().await;
//! }
//! ```

use crate::config::{BridgeBuilder, BridgeConfig};
use crate::error::{BridgeError, BridgeResult};
use crate::request::{Checkpoint, Request, RequestFuture};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use std::ops::{Deref, DerefMut};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, error, info_span, trace, warn};

/// Statistics about bridge operation
///
/// All counters are atomic and can be read at any time without locking.
#[derive(Debug, Default)]
pub struct BridgeStats {
    /// Calls accepted into the queue
    pub calls_submitted: AtomicU64,
    /// Calls the engine thread finished (successfully or with error)
    pub calls_completed: AtomicU64,
    /// Calls that returned an error or panicked
    pub calls_failed: AtomicU64,
    /// Finished calls whose caller had already dropped the future
    pub calls_abandoned: AtomicU64,
}

impl BridgeStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get snapshot of current stats
    pub fn snapshot(&self) -> BridgeStatsSnapshot {
        BridgeStatsSnapshot {
            calls_submitted: self.calls_submitted.load(Ordering::Relaxed),
            calls_completed: self.calls_completed.load(Ordering::Relaxed),
            calls_failed: self.calls_failed.load(Ordering::Relaxed),
            calls_abandoned: self.calls_abandoned.load(Ordering::Relaxed),
        }
    }

    /// Calls submitted but not yet finished
    pub fn calls_in_flight(&self) -> u64 {
        let submitted = self.calls_submitted.load(Ordering::Relaxed);
        let completed = self.calls_completed.load(Ordering::Relaxed);
        submitted.saturating_sub(completed)
    }

    fn record<T>(&self, result: &BridgeResult<T>) {
        self.calls_completed.fetch_add(1, Ordering::Relaxed);
        if result.is_err() {
            self.calls_failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// A point-in-time snapshot of bridge statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeStatsSnapshot {
    pub calls_submitted: u64,
    pub calls_completed: u64,
    pub calls_failed: u64,
    pub calls_abandoned: u64,
}

impl BridgeStatsSnapshot {
    /// Get the success rate as a percentage (0.0 - 100.0)
    pub fn success_rate(&self) -> f64 {
        if self.calls_completed == 0 {
            100.0
        } else {
            let succeeded = self.calls_completed - self.calls_failed;
            (succeeded as f64 / self.calls_completed as f64) * 100.0
        }
    }
}

/// What a callable sees while it runs on the engine thread
///
/// Dereferences to the engine state.
pub struct Env<'a, E> {
    engine: &'a mut E,
    id: u64,
    checkpoints: &'a mut Vec<Checkpoint>,
}

impl<E> Env<'_, E> {
    /// Id of the request being served
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn engine(&self) -> &E {
        self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        self.engine
    }

    /// Record a custom checkpoint on the current request
    ///
    /// The bridge's own labels ("enqueued", "dispatched", "completed",
    /// "failed") are recorded with a `custom:` prefix so a request keeps
    /// exactly one terminal checkpoint.
    pub fn checkpoint(&mut self, label: impl Into<String>) {
        let label = label.into();
        let label = if Checkpoint::is_reserved(&label) {
            format!("custom:{label}")
        } else {
            label
        };
        self.checkpoints.push(Checkpoint::now(label));
    }
}

impl<E> Deref for Env<'_, E> {
    type Target = E;

    fn deref(&self) -> &E {
        self.engine
    }
}

impl<E> DerefMut for Env<'_, E> {
    fn deref_mut(&mut self) -> &mut E {
        self.engine
    }
}

type Task<E> = Box<dyn FnOnce(&mut E, &BridgeStats) + Send>;

/// Message on the engine queue
enum Job<E> {
    /// Run one call
    Call(Task<E>),
    /// Stop after the calls queued ahead of this one
    Shutdown,
}

/// Schedules callables onto a single engine thread
///
/// The bridge is `Send + Sync` for any `E`: the engine state is created on
/// the engine thread and never leaves it. Share the bridge by reference or
/// `Arc` between runtime threads.
pub struct AsyncCallBridge<E: 'static> {
    job_tx: Sender<Job<E>>,
    engine: Option<JoinHandle<()>>,
    next_id: AtomicU64,
    stats: Arc<BridgeStats>,
    thread_name: String,
}

impl<E: 'static> AsyncCallBridge<E> {
    /// Create a bridge with default configuration
    pub fn new<F>(factory: F) -> BridgeResult<Self>
    where
        F: FnOnce() -> anyhow::Result<E> + Send + 'static,
    {
        BridgeBuilder::new().build(factory)
    }

    pub(crate) fn start<F>(config: BridgeConfig, factory: F) -> BridgeResult<Self>
    where
        F: FnOnce() -> anyhow::Result<E> + Send + 'static,
    {
        let (job_tx, job_rx) = bounded::<Job<E>>(config.queue_capacity);
        let (ready_tx, ready_rx) = bounded::<Result<(), String>>(1);
        let stats = Arc::new(BridgeStats::new());

        let engine_stats = stats.clone();
        let handle = std::thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || run_engine(factory, job_rx, ready_tx, engine_stats))
            .map_err(|e| BridgeError::engine_init(format!("Failed to spawn engine thread: {e}")))?;

        let ready = ready_rx
            .recv()
            .unwrap_or_else(|_| Err("engine thread exited during startup".to_string()));
        if let Err(message) = ready {
            let _ = handle.join();
            return Err(BridgeError::EngineInit(message));
        }

        debug!(name = %config.thread_name, "Bridge started");
        Ok(Self {
            job_tx,
            engine: Some(handle),
            next_id: AtomicU64::new(config.first_request_id),
            stats,
            thread_name: config.thread_name,
        })
    }

    /// Schedule `callable` on the engine thread
    ///
    /// Returns as soon as the call is queued; blocks only while the queue is
    /// full. If the bridge has stopped, the returned future resolves to a
    /// `Shutdown` error.
    ///
    /// Called from a callable already running on the engine thread, it never
    /// blocks: a full queue resolves the future to `QueueFull`.
    pub fn make_call<T, R, F>(&self, callable: F) -> RequestFuture<T>
    where
        T: Send + 'static,
        R: Into<T>,
        F: FnOnce(&mut Env<'_, E>) -> anyhow::Result<R> + Send + 'static,
    {
        let (future, job) = self.prepare(callable);
        // the engine thread would wait on its own queue forever
        let wait = !self.on_engine_thread();
        match self.enqueue(job, wait) {
            Ok(()) => future,
            Err(err) => {
                debug!(id = future.id(), error = %err, "Call rejected");
                future.reject(err)
            }
        }
    }

    /// Schedule `callable` without blocking
    ///
    /// Fails with `QueueFull` when the queue is at capacity and with
    /// `Shutdown` when the engine thread has stopped.
    pub fn try_make_call<T, R, F>(&self, callable: F) -> BridgeResult<RequestFuture<T>>
    where
        T: Send + 'static,
        R: Into<T>,
        F: FnOnce(&mut Env<'_, E>) -> anyhow::Result<R> + Send + 'static,
    {
        let (future, job) = self.prepare(callable);
        self.enqueue(job, false)?;
        Ok(future)
    }

    /// Put a job on the queue, counting it as submitted if it was accepted
    fn enqueue(&self, job: Job<E>, wait: bool) -> BridgeResult<()> {
        self.stats.calls_submitted.fetch_add(1, Ordering::Relaxed);
        let sent = if wait {
            self.job_tx.send(job).map_err(|_| BridgeError::Shutdown)
        } else {
            self.job_tx.try_send(job).map_err(|e| match e {
                TrySendError::Full(_) => BridgeError::QueueFull,
                TrySendError::Disconnected(_) => BridgeError::Shutdown,
            })
        };
        if sent.is_err() {
            self.stats.calls_submitted.fetch_sub(1, Ordering::Relaxed);
        }
        sent
    }

    fn on_engine_thread(&self) -> bool {
        self.engine
            .as_ref()
            .is_some_and(|handle| handle.thread().id() == std::thread::current().id())
    }

    /// Allocate an id, record "enqueued" and wrap `callable` into a job
    fn prepare<T, R, F>(&self, callable: F) -> (RequestFuture<T>, Job<E>)
    where
        T: Send + 'static,
        R: Into<T>,
        F: FnOnce(&mut Env<'_, E>) -> anyhow::Result<R> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let enqueued = Instant::now();
        let (tx, rx) = oneshot::channel();

        let task: Task<E> = Box::new(move |engine: &mut E, stats: &BridgeStats| {
            let _span = info_span!("call", id).entered();
            let mut checkpoints = vec![
                Checkpoint::at(Checkpoint::ENQUEUED, enqueued),
                Checkpoint::now(Checkpoint::DISPATCHED),
            ];

            let result = {
                let mut env = Env {
                    engine,
                    id,
                    checkpoints: &mut checkpoints,
                };
                execute_with_panic_handler(|| callable(&mut env).map(Into::into))
            };
            checkpoints.push(Checkpoint::now(if result.is_ok() {
                Checkpoint::COMPLETED
            } else {
                Checkpoint::FAILED
            }));
            stats.record(&result);

            if tx.send(Request::new(id, checkpoints, result)).is_err() {
                stats.calls_abandoned.fetch_add(1, Ordering::Relaxed);
                trace!("Caller abandoned request");
            }
        });

        (RequestFuture::new(id, enqueued, rx), Job::Call(task))
    }

    /// Get the bridge statistics
    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    /// Name of the engine thread
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// Check if the engine thread is still running
    pub fn is_running(&self) -> bool {
        self.engine
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the engine thread after the calls already queued
    pub async fn shutdown(mut self) {
        let Some(handle) = self.engine.take() else {
            return;
        };
        // Sending may block on a full queue, so both steps run off the async runtime
        let job_tx = self.job_tx.clone();
        tokio::task::spawn_blocking(move || stop_engine(&job_tx, handle))
            .await
            .ok();
    }

    /// Stop the engine thread from a non-async thread
    pub fn shutdown_blocking(mut self) {
        if let Some(handle) = self.engine.take() {
            stop_engine(&self.job_tx, handle);
        }
    }
}

impl<E: 'static> Drop for AsyncCallBridge<E> {
    fn drop(&mut self) {
        if self.on_engine_thread() {
            // dropped by one of its own calls; the loop ends once the queue disconnects
            self.engine = None;
            let _ = self.job_tx.try_send(Job::Shutdown);
            return;
        }
        if let Some(handle) = self.engine.take() {
            stop_engine(&self.job_tx, handle);
        }
    }
}

fn stop_engine<E>(job_tx: &Sender<Job<E>>, handle: JoinHandle<()>) {
    let _ = job_tx.send(Job::Shutdown);
    if handle.join().is_err() {
        error!("Engine thread panicked");
    }
}

/// Body of the engine thread
///
/// Creates the engine state, reports readiness, then runs calls in queue
/// order until a shutdown message arrives or every sender is gone.
fn run_engine<E, F>(
    factory: F,
    job_rx: Receiver<Job<E>>,
    ready_tx: Sender<Result<(), String>>,
    stats: Arc<BridgeStats>,
) where
    F: FnOnce() -> anyhow::Result<E>,
{
    let thread_name = std::thread::current()
        .name()
        .unwrap_or("sable-engine")
        .to_string();

    let _span = info_span!("bridge", name = %thread_name).entered();
    debug!("Engine thread starting");

    let mut engine = match catch_unwind(AssertUnwindSafe(factory)) {
        Ok(Ok(engine)) => engine,
        Ok(Err(e)) => {
            let message = format!("{e:#}");
            warn!(error = %message, "Engine factory failed");
            let _ = ready_tx.send(Err(message));
            return;
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            warn!(error = %message, "Engine factory panicked");
            let _ = ready_tx.send(Err(message));
            return;
        }
    };
    let _ = ready_tx.send(Ok(()));
    debug!("Engine thread ready");

    for job in job_rx.iter() {
        match job {
            Job::Call(task) => task(&mut engine, &stats),
            Job::Shutdown => {
                debug!("Received shutdown signal");
                break;
            }
        }
    }

    drop(engine);
    debug!("Engine thread stopped");
}

/// Run a callable, turning errors and panics into bridge errors
fn execute_with_panic_handler<T, F>(f: F) -> BridgeResult<T>
where
    F: FnOnce() -> anyhow::Result<T>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            debug!(error = %format!("{e:#}"), "Call failed");
            Err(BridgeError::call_failed(&e))
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!("Engine call panicked: {}", message);
            Err(BridgeError::Panicked(message))
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
