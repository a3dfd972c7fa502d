//! Connectivity watcher
//!
//! Follows the connectivity watch channel and hands every
//! disconnected-to-connected transition to the SDK.

use std::sync::Weak;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::context::SdkInner;

pub(crate) async fn watch_connectivity(
    inner: Weak<SdkInner>,
    mut receiver: watch::Receiver<bool>,
    cancel: CancellationToken,
) {
    let mut was_connected = *receiver.borrow_and_update();
    debug!(connected = was_connected, "Connectivity watcher started");

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            changed = receiver.changed() => {
                if changed.is_err() {
                    debug!("Connectivity source dropped");
                    break;
                }
                let connected = *receiver.borrow_and_update();
                if connected && !was_connected {
                    let Some(inner) = inner.upgrade() else { break };
                    info!("Network reconnected");
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = inner.on_reconnected() => {}
                    }
                }
                was_connected = connected;
            }
        }
    }

    debug!("Connectivity watcher stopped");
}
