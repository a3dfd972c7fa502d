//! # Intelligence Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The `reqwest` HTTP transport
//! - A JSON-file durable store
//! - A watch-channel network monitor with an optional reachability probe
//! - Configuration loading from environment variables and files
//! - Tracing subscriber initialisation
//!
//! ## Architecture
//! - Implements traits defined in `intelligence-core`
//! - Contains all "impure" code (network, filesystem, process environment)

pub mod config;
pub mod connectivity;
pub mod errors;
pub mod http;
pub mod logging;
pub mod storage;

// Re-export commonly used items
pub use connectivity::NetworkMonitor;
pub use http::{HttpTransport, HttpTransportBuilder};
pub use logging::{init_tracing, LogFormat, LoggingError};
pub use storage::FileStore;
