//! Units of deferred work and the handles that deliver their results

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use intelligence_domain::{IntelligenceError, Result};
use tokio::sync::oneshot;

/// A unit of work executed by the [`TaskScheduler`](super::TaskScheduler).
///
/// Tasks own everything they need (transport, session, queue handles) so a
/// factory can build an equivalent fresh task for the single 401 replay.
#[async_trait]
pub trait Task: Send + Sync + 'static {
    /// Value delivered on success.
    type Output: Send + 'static;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether a 401 triggers reauthentication and one replay.
    fn auto_refresh(&self) -> bool {
        true
    }

    /// Run the task once. A 401 must surface as `Request(Unauthorized)`.
    async fn execute(&self) -> Result<Self::Output>;
}

/// Resolves exactly once with the task's outcome.
///
/// If the scheduler drops the task without running it (shutdown, worker
/// panic) the handle resolves with [`IntelligenceError::ShutDown`].
#[must_use = "dropping the handle discards the task's result, not the task"]
#[derive(Debug)]
pub struct TaskHandle<T> {
    receiver: oneshot::Receiver<Result<T>>,
}

impl<T> TaskHandle<T> {
    pub(crate) const fn new(receiver: oneshot::Receiver<Result<T>>) -> Self {
        Self { receiver }
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(IntelligenceError::ShutDown)))
    }
}
