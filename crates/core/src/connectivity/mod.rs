//! Network reachability port

pub mod ports;

pub use ports::Connectivity;
