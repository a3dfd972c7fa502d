//! Port interface for connectivity detection

use tokio::sync::watch;

/// Reports whether the device can currently reach the network.
pub trait Connectivity: Send + Sync {
    /// Current reachability.
    fn has_connection(&self) -> bool;

    /// Receiver that observes every reachability change.
    fn subscribe(&self) -> watch::Receiver<bool>;
}
