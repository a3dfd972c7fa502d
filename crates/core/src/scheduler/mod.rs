//! Serial FIFO task scheduler
//!
//! Producers push tasks onto an unbounded channel from any thread; a single
//! worker drains it, running one task at a time (including its retry) before
//! receiving the next. Lifecycle follows the start/stop worker pattern:
//! `start` spawns the worker, `shutdown` cancels dispatch, waits for the
//! in-flight task and drops whatever is still queued.

pub mod retry;
pub mod task;

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub use retry::{run_authenticated, Reauthenticator};
pub use task::{Task, TaskHandle};

use crate::connectivity::Connectivity;

/// Type-erased task closure queued on the channel.
type Job = Box<dyn FnOnce(Arc<dyn Reauthenticator>) -> BoxFuture<'static, ()> + Send>;

/// Type alias for the worker handle to avoid complexity warnings
type WorkerHandle = Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>>;

/// Scheduler lifecycle errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("scheduler already running")]
    AlreadyRunning,

    #[error("scheduler has been shut down")]
    ShutDown,

    #[error("scheduler worker panicked")]
    WorkerPanicked,

    #[error("scheduler worker did not stop within {0:?}")]
    StopTimeout(Duration),
}

/// Configuration for the task scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How long `shutdown` waits for the in-flight task.
    pub join_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        // Connect + read timeout of one exchange, a replay, and margin.
        Self { join_timeout: Duration::from_secs(120) }
    }
}

/// Serial FIFO scheduler with a single background worker.
pub struct TaskScheduler {
    sender: mpsc::UnboundedSender<Job>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Job>>>,
    reauthenticator: Arc<dyn Reauthenticator>,
    connectivity: Arc<dyn Connectivity>,
    config: SchedulerConfig,
    cancellation_token: CancellationToken,
    worker: WorkerHandle,
    pending: Arc<AtomicUsize>,
}

impl TaskScheduler {
    /// Create a stopped scheduler. Tasks submitted before [`start`] wait in
    /// the queue.
    ///
    /// [`start`]: TaskScheduler::start
    pub fn new(
        reauthenticator: Arc<dyn Reauthenticator>,
        connectivity: Arc<dyn Connectivity>,
        config: SchedulerConfig,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
            reauthenticator,
            connectivity,
            config,
            cancellation_token: CancellationToken::new(),
            worker: Arc::new(tokio::sync::Mutex::new(None)),
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Spawn the worker.
    ///
    /// # Errors
    /// `AlreadyRunning` on a second call, `ShutDown` after [`shutdown`].
    ///
    /// [`shutdown`]: TaskScheduler::shutdown
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<(), SchedulerError> {
        if self.cancellation_token.is_cancelled() {
            return Err(SchedulerError::ShutDown);
        }
        let Some(receiver) = self.receiver.lock().take() else {
            return Err(SchedulerError::AlreadyRunning);
        };

        info!("Starting task scheduler");

        let reauthenticator = Arc::clone(&self.reauthenticator);
        let cancel = self.cancellation_token.clone();
        let handle = tokio::spawn(async move {
            Self::worker_loop(receiver, reauthenticator, cancel).await;
        });

        *self.worker.lock().await = Some(handle);

        info!("Task scheduler started");
        Ok(())
    }

    /// Stop dispatching, wait for the in-flight task, drop queued tasks.
    ///
    /// Handles of dropped tasks resolve with `ShutDown`. Calling this on a
    /// scheduler that never started drops its queue the same way.
    ///
    /// # Errors
    /// `WorkerPanicked` or `StopTimeout` when the worker cannot be joined.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        info!("Stopping task scheduler");
        self.cancellation_token.cancel();

        // Never started: dropping the receiver resolves queued handles.
        let unstarted = self.receiver.lock().take();
        drop(unstarted);

        if let Some(handle) = self.worker.lock().await.take() {
            match tokio::time::timeout(self.config.join_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Scheduler worker panicked: {}", e);
                    return Err(SchedulerError::WorkerPanicked);
                }
                Err(_) => {
                    warn!("Scheduler worker did not complete within timeout");
                    return Err(SchedulerError::StopTimeout(self.config.join_timeout));
                }
            }
        }

        info!("Task scheduler stopped");
        Ok(())
    }

    /// Whether the worker is currently running.
    pub async fn is_running(&self) -> bool {
        self.worker.lock().await.is_some() && !self.cancellation_token.is_cancelled()
    }

    /// Current network reachability.
    pub fn has_connection(&self) -> bool {
        self.connectivity.has_connection()
    }

    /// Tasks submitted but not yet finished, including the running one.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Queue a task. A 401 replay executes a second clone of `task`.
    pub fn submit<T>(&self, task: T) -> TaskHandle<T::Output>
    where
        T: Task + Clone,
    {
        self.submit_with(move || task.clone())
    }

    /// Queue a task built by `factory`. The factory is called again to build
    /// the replay after a successful reauthentication.
    pub fn submit_with<T, F>(&self, factory: F) -> TaskHandle<T::Output>
    where
        T: Task,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let pending = Arc::clone(&self.pending);
        let guard = PendingGuard::new(pending);

        let job: Job = Box::new(move |reauthenticator| {
            Box::pin(async move {
                let outcome = run_authenticated(&factory, reauthenticator.as_ref()).await;
                if let Err(e) = &outcome {
                    warn!(code = ?e.code(), error = %e, "Task failed");
                }
                drop(guard);
                if result_tx.send(outcome).is_err() {
                    debug!("Task result discarded; handle was dropped");
                }
            })
        });

        if self.sender.send(job).is_err() {
            debug!("Task submitted after shutdown");
        }

        TaskHandle::new(result_rx)
    }

    /// Background drain loop
    async fn worker_loop(
        mut receiver: mpsc::UnboundedReceiver<Job>,
        reauthenticator: Arc<dyn Reauthenticator>,
        cancel: CancellationToken,
    ) {
        loop {
            let job = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("Scheduler worker cancelled");
                    break;
                }
                job = receiver.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            let run = AssertUnwindSafe(job(Arc::clone(&reauthenticator))).catch_unwind();
            if run.await.is_err() {
                warn!("Task panicked; its handle resolves as shut down");
            }
        }

        receiver.close();
        let mut dropped = 0_usize;
        while let Ok(job) = receiver.try_recv() {
            drop(job);
            dropped += 1;
        }
        if dropped > 0 {
            info!(dropped, "Dropped queued tasks on shutdown");
        }
    }
}

/// Ensure the worker is cancelled when the scheduler is dropped
impl Drop for TaskScheduler {
    fn drop(&mut self) {
        if !self.cancellation_token.is_cancelled() {
            debug!("TaskScheduler dropped while running; cancelling");
            self.cancellation_token.cancel();
        }
    }
}

/// Tracks queued-or-running tasks; decremented when the job is dropped,
/// whether it ran or not.
struct PendingGuard {
    pending: Arc<AtomicUsize>,
}

impl PendingGuard {
    fn new(pending: Arc<AtomicUsize>) -> Self {
        pending.fetch_add(1, Ordering::SeqCst);
        Self { pending }
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }
}
