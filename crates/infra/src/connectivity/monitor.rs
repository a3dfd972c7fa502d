//! Watch-channel network monitor
//!
//! Hosts with a platform reachability API push changes through
//! [`NetworkMonitor::report`]. Without one, [`NetworkMonitor::start_probe`]
//! runs a background loop that treats any HTTP answer from a probe URL as
//! "connected" and a transport failure as "disconnected".

use std::sync::Arc;
use std::time::Duration;

use intelligence_core::{Connectivity, HttpRequest, Transport};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Type alias for the probe handle to avoid complexity warnings
type ProbeHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

/// Probe lifecycle errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("probe already running")]
    AlreadyRunning,

    #[error("probe did not stop within {0:?}")]
    StopTimeout(Duration),
}

/// Configuration for the reachability probe
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// URL requested on every tick.
    pub url: String,
    /// Delay between probes.
    pub interval: Duration,
}

/// Connectivity source backed by a `watch` channel.
pub struct NetworkMonitor {
    sender: watch::Sender<bool>,
    cancellation_token: CancellationToken,
    probe_handle: ProbeHandle,
}

impl NetworkMonitor {
    pub fn new(connected: bool) -> Self {
        let (sender, _) = watch::channel(connected);
        Self {
            sender,
            cancellation_token: CancellationToken::new(),
            probe_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Record the current reachability. Subscribers wake only on change.
    pub fn report(&self, connected: bool) {
        let changed = self.sender.send_if_modified(|current| {
            let changed = *current != connected;
            *current = connected;
            changed
        });
        if changed {
            info!(connected, "Network reachability changed");
        }
    }

    /// Spawn the probe loop.
    ///
    /// # Errors
    /// `AlreadyRunning` when a probe is active.
    #[instrument(skip(self, transport), fields(url = %config.url))]
    pub async fn start_probe(
        self: &Arc<Self>,
        transport: Arc<dyn Transport>,
        config: ProbeConfig,
    ) -> Result<(), ProbeError> {
        let mut handle = self.probe_handle.lock().await;
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return Err(ProbeError::AlreadyRunning);
        }

        let monitor = Arc::downgrade(self);
        let cancel = self.cancellation_token.child_token();
        *handle = Some(tokio::spawn(async move {
            loop {
                let Some(monitor) = monitor.upgrade() else { break };
                let reachable = transport.execute(HttpRequest::get(config.url.as_str())).await;
                match reachable {
                    Ok(response) => {
                        debug!(status = response.status, "Probe answered");
                        monitor.report(true);
                    }
                    Err(e) => {
                        debug!(error = %e, "Probe failed");
                        monitor.report(false);
                    }
                }
                drop(monitor);

                tokio::select! {
                    () = cancel.cancelled() => {
                        debug!("Probe loop cancelled");
                        break;
                    }
                    () = tokio::time::sleep(config.interval) => {}
                }
            }
        }));

        info!("Reachability probe started");
        Ok(())
    }

    /// Stop the probe loop, if one is running. Stopping is final.
    ///
    /// # Errors
    /// `StopTimeout` when the loop does not finish in time.
    #[instrument(skip(self))]
    pub async fn stop_probe(&self) -> Result<(), ProbeError> {
        self.cancellation_token.cancel();

        if let Some(handle) = self.probe_handle.lock().await.take() {
            let join_timeout = Duration::from_secs(5);
            match tokio::time::timeout(join_timeout, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Probe task panicked: {}", e),
                Err(_) => return Err(ProbeError::StopTimeout(join_timeout)),
            }
            info!("Reachability probe stopped");
        }
        Ok(())
    }
}

impl Connectivity for NetworkMonitor {
    fn has_connection(&self) -> bool {
        *self.sender.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

/// Ensure the probe is cancelled when the monitor is dropped
impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}
