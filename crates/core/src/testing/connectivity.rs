//! Connectivity double driven by the test

use tokio::sync::watch;

use crate::connectivity::Connectivity;

/// Reachability flipped by hand with [`set_connected`].
///
/// [`set_connected`]: ManualConnectivity::set_connected
#[derive(Debug)]
pub struct ManualConnectivity {
    sender: watch::Sender<bool>,
}

impl ManualConnectivity {
    #[must_use]
    pub fn new(connected: bool) -> Self {
        let (sender, _) = watch::channel(connected);
        Self { sender }
    }

    /// Change reachability; subscribers are notified only on a change.
    pub fn set_connected(&self, connected: bool) {
        self.sender.send_if_modified(|current| {
            let changed = *current != connected;
            *current = connected;
            changed
        });
    }
}

impl Default for ManualConnectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for ManualConnectivity {
    fn has_connection(&self) -> bool {
        *self.sender.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}
