//! Forgiving deserializers for platform payloads
//!
//! The platform sends numeric ids as numbers or as strings depending on the
//! service, and enum codes it may extend at any time.

use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

/// An id sent as a number or a numeric string; anything else is `None`.
pub(crate) fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawId>::deserialize(deserializer)? {
        Some(RawId::Number(value)) => Some(value),
        Some(RawId::Text(text)) => text.trim().parse().ok(),
        None => None,
    })
}

/// A numeric enum code; unknown codes become `None` instead of failing the
/// whole payload.
pub(crate) fn lenient_code<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    Ok(lenient_id(deserializer)?.and_then(|code| T::try_from(code).ok()))
}
