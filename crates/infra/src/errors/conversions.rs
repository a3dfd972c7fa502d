//! Conversions from external infrastructure errors into port and domain
//! errors.

use intelligence_core::{StoreError, TransportError};
use intelligence_domain::{ConfigurationErrorKind, IntelligenceError};

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub IntelligenceError);

impl From<InfraError> for IntelligenceError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<IntelligenceError> for InfraError {
    fn from(value: IntelligenceError) -> Self {
        Self(value)
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TransportError */
/* -------------------------------------------------------------------------- */

/// Classify a `reqwest` failure. Only called for errors raised before a
/// status line was read, or while reading the body.
#[must_use]
pub fn transport_error(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_connect() {
        TransportError::Connection(err.to_string())
    } else if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io / serde_json → StoreError */
/* -------------------------------------------------------------------------- */

impl From<std::io::Error> for InfraError {
    fn from(err: std::io::Error) -> Self {
        Self(IntelligenceError::configuration(
            if err.kind() == std::io::ErrorKind::NotFound {
                ConfigurationErrorKind::FileNotFound
            } else {
                ConfigurationErrorKind::InvalidFile
            },
            err.to_string(),
        ))
    }
}

pub(crate) fn store_io_error(err: &std::io::Error) -> StoreError {
    StoreError::Io(err.to_string())
}

pub(crate) fn store_serde_error(err: &serde_json::Error) -> StoreError {
    StoreError::Serialization(err.to_string())
}
