//! HTTP transport port and the request/response values it carries

pub mod ports;
pub mod types;

pub use ports::{Transport, TransportError};
pub use types::{ErrorBody, HttpMethod, HttpRequest, HttpResponse};
