//! Port interface for the HTTP transport

use async_trait::async_trait;
use intelligence_domain::IntelligenceError;
use thiserror::Error;

use super::types::{HttpRequest, HttpResponse};

/// Failures below the HTTP layer: no status code was received.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("transport error: {0}")]
    Other(String),
}

impl From<TransportError> for IntelligenceError {
    fn from(err: TransportError) -> Self {
        Self::unhandled(None, err.to_string())
    }
}

/// Executes a single HTTP exchange.
///
/// Implementations apply the connect/read timeouts themselves and must not
/// retry; retries are owned by the task scheduler's auth protocol.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return whatever status the server answered with.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
