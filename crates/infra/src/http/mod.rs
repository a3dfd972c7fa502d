//! HTTP transport backed by `reqwest`

mod transport;

pub use transport::{HttpTransport, HttpTransportBuilder};
