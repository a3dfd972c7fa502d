//! `{"Data": [...]}` response envelope used by the identity and location
//! services

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::errors::{IntelligenceError, RequestError};

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct DataEnvelope<T> {
    #[serde(rename = "Data", default)]
    data: Vec<T>,
}

/// Every item of the envelope, in order.
///
/// # Errors
/// `Request(ParseError)` when the body is not an envelope of `T`.
pub fn data_items<T: DeserializeOwned>(body: &str) -> crate::Result<Vec<T>> {
    serde_json::from_str::<DataEnvelope<T>>(body)
        .map(|envelope| envelope.data)
        .map_err(|e| IntelligenceError::Request(RequestError::ParseError(e.to_string())))
}

/// The first item of the envelope.
///
/// # Errors
/// `Request(ParseError)` when the body is malformed or the list is empty.
pub fn first_data_item<T: DeserializeOwned>(body: &str, what: &str) -> crate::Result<T> {
    data_items(body)?.into_iter().next().ok_or_else(|| {
        IntelligenceError::Request(RequestError::ParseError(format!("response contained no {what}")))
    })
}
