//! Network reachability monitoring

mod monitor;

pub use monitor::{NetworkMonitor, ProbeConfig, ProbeError};
