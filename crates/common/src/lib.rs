//! Foundation utilities shared across the Intelligence SDK crates.
//!
//! - [`time`]: wall-clock abstraction so token expiry and event ageing can be
//!   driven deterministically in tests
//! - [`random`]: credential-grade random strings for provisioned accounts
//! - [`testing`]: async polling helpers (`test-utils` feature)

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod random;
pub mod time;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

pub use random::{random_string, random_string_from, CREDENTIAL_CHARSET};
pub use time::{Clock, MockClock, SharedClock, SystemClock};
