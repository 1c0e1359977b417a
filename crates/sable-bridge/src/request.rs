//! Requests and their futures
//!
//! A [`Request`] is the record of one bridged call: its id, the checkpoints
//! it passed and its single result. The engine thread builds the record and
//! hands it over exactly once through a oneshot channel; the caller holds the
//! receiving end as a [`RequestFuture`].

use crate::error::{BridgeError, BridgeResult};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;

/// A labelled point in time on a request's path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    label: String,
    at: Instant,
}

impl Checkpoint {
    /// Call accepted into the bridge queue
    pub const ENQUEUED: &'static str = "enqueued";
    /// Engine thread picked the call up
    pub const DISPATCHED: &'static str = "dispatched";
    /// Callable returned a result
    pub const COMPLETED: &'static str = "completed";
    /// Callable failed, panicked, or never ran
    pub const FAILED: &'static str = "failed";

    /// Labels the bridge records itself
    pub const RESERVED: [&'static str; 4] =
        [Self::ENQUEUED, Self::DISPATCHED, Self::COMPLETED, Self::FAILED];

    pub fn is_reserved(label: &str) -> bool {
        Self::RESERVED.contains(&label)
    }

    pub(crate) fn now(label: impl Into<String>) -> Self {
        Self::at(label, Instant::now())
    }

    pub(crate) fn at(label: impl Into<String>, at: Instant) -> Self {
        Self {
            label: label.into(),
            at,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn instant(&self) -> Instant {
        self.at
    }
}

/// Completed record of one bridged call
#[derive(Debug)]
pub struct Request<T> {
    id: u64,
    checkpoints: Vec<Checkpoint>,
    result: BridgeResult<T>,
}

impl<T> Request<T> {
    pub(crate) fn new(id: u64, checkpoints: Vec<Checkpoint>, result: BridgeResult<T>) -> Self {
        Self {
            id,
            checkpoints,
            result,
        }
    }

    /// Record for a call that never reached the engine thread
    pub(crate) fn rejected(id: u64, enqueued: Instant, error: BridgeError) -> Self {
        Self::new(
            id,
            vec![
                Checkpoint::at(Checkpoint::ENQUEUED, enqueued),
                Checkpoint::now(Checkpoint::FAILED),
            ],
            Err(error),
        )
    }

    /// Record for a call that never reached a result because the bridge stopped
    pub(crate) fn shutdown(id: u64, enqueued: Instant) -> Self {
        Self::rejected(id, enqueued, BridgeError::Shutdown)
    }

    /// Id assigned by the bridge that ran this call
    pub fn id(&self) -> u64 {
        self.id
    }

    /// All checkpoints in the order they were recorded
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    /// First checkpoint with `label`
    pub fn checkpoint(&self, label: &str) -> Option<&Checkpoint> {
        self.checkpoints.iter().find(|c| c.label == label)
    }

    /// Time from enqueue to the checkpoint with `label`
    pub fn since_enqueued(&self, label: &str) -> Option<Duration> {
        let start = self.checkpoints.first()?;
        Some(self.checkpoint(label)?.at.saturating_duration_since(start.at))
    }

    /// Time from the first to the last checkpoint
    pub fn elapsed(&self) -> Duration {
        match (self.checkpoints.first(), self.checkpoints.last()) {
            (Some(first), Some(last)) => last.at.saturating_duration_since(first.at),
            _ => Duration::ZERO,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn result(&self) -> &BridgeResult<T> {
        &self.result
    }

    pub fn into_result(self) -> BridgeResult<T> {
        self.result
    }
}

/// Future resolving to the [`Request`] of a submitted call
///
/// Await it from async code, or call [`blocking_wait`](Self::blocking_wait)
/// from a plain thread. Dropping it abandons the result; the call itself
/// still runs.
#[must_use = "dropping a RequestFuture abandons the call's result"]
#[derive(Debug)]
pub struct RequestFuture<T> {
    id: u64,
    enqueued: Instant,
    rx: oneshot::Receiver<Request<T>>,
}

impl<T> RequestFuture<T> {
    pub(crate) fn new(id: u64, enqueued: Instant, rx: oneshot::Receiver<Request<T>>) -> Self {
        Self { id, enqueued, rx }
    }

    /// Id of the pending request
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Replace the pending result with `error`, resolving immediately
    pub(crate) fn reject(self, error: BridgeError) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Request::rejected(self.id, self.enqueued, error));
        Self::new(self.id, self.enqueued, rx)
    }

    /// Block the current thread until the request completes
    ///
    /// Must not be called from inside an async runtime.
    pub fn blocking_wait(self) -> Request<T> {
        match self.rx.blocking_recv() {
            Ok(request) => request,
            Err(_) => Request::shutdown(self.id, self.enqueued),
        }
    }
}

impl<T> Future for RequestFuture<T> {
    type Output = Request<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(request)) => Poll::Ready(request),
            Poll::Ready(Err(_)) => Poll::Ready(Request::shutdown(this.id, this.enqueued)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_record() {
        let request = Request::<i32>::shutdown(7, Instant::now());
        assert_eq!(request.id(), 7);
        let labels: Vec<_> = request.checkpoints().iter().map(Checkpoint::label).collect();
        assert_eq!(labels, ["enqueued", "failed"]);
        assert_eq!(request.into_result(), Err(BridgeError::Shutdown));
    }

    #[test]
    fn test_since_enqueued() {
        let start = Instant::now();
        let request = Request::new(
            1,
            vec![
                Checkpoint::at(Checkpoint::ENQUEUED, start),
                Checkpoint::at(Checkpoint::COMPLETED, start + Duration::from_millis(5)),
            ],
            Ok(()),
        );
        assert_eq!(
            request.since_enqueued(Checkpoint::COMPLETED),
            Some(Duration::from_millis(5))
        );
        assert_eq!(request.elapsed(), Duration::from_millis(5));
        assert_eq!(request.since_enqueued("missing"), None);
    }

    #[tokio::test]
    async fn test_dropped_sender_resolves_to_shutdown() {
        let (tx, rx) = oneshot::channel::<Request<String>>();
        let future = RequestFuture::new(3, Instant::now(), rx);
        drop(tx);
        let request = future.await;
        assert_eq!(request.id(), 3);
        assert_eq!(request.result(), &Err(BridgeError::Shutdown));
    }

    #[test]
    fn test_reject_resolves_with_error() {
        let (_tx, rx) = oneshot::channel::<Request<()>>();
        let future = RequestFuture::new(8, Instant::now(), rx).reject(BridgeError::QueueFull);
        assert_eq!(future.id(), 8);
        let request = future.blocking_wait();
        assert_eq!(request.checkpoint(Checkpoint::FAILED).map(Checkpoint::label), Some("failed"));
        assert_eq!(request.into_result(), Err(BridgeError::QueueFull));
    }

    #[test]
    fn test_reserved_labels() {
        assert!(Checkpoint::is_reserved("completed"));
        assert!(!Checkpoint::is_reserved("loaded"));
    }

    #[test]
    fn test_blocking_wait_delivers() {
        let (tx, rx) = oneshot::channel();
        let future = RequestFuture::new(4, Instant::now(), rx);
        std::thread::spawn(move || {
            let _ = tx.send(Request::new(4, Vec::new(), Ok(42)));
        });
        assert_eq!(future.blocking_wait().into_result(), Ok(42));
    }
}
