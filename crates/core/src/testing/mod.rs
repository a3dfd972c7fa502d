//! In-memory doubles for the transport and connectivity ports
//!
//! Available to this crate's tests and, behind the `test-utils` feature, to
//! downstream test suites.

pub mod connectivity;
pub mod transport;

pub use connectivity::ManualConnectivity;
pub use transport::{MockReply, MockTransport};
