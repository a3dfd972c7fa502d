//! Conversions from external infrastructure errors into port errors.

mod conversions;

pub(crate) use conversions::{store_io_error, store_serde_error};
pub use conversions::{transport_error, InfraError};
