//! Identifiers a user can register: push tokens, e-mail addresses and the like

use serde::{Deserialize, Serialize};

use super::lenient::{lenient_code, lenient_id};

/// Kind of identifier, as numbered by the identity service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum IdentifierType {
    Email = 1,
    Msn = 2,
    IosPushToken = 3,
    AndroidGcmToken = 4,
    WindowsPushToken = 5,
}

impl From<IdentifierType> for i64 {
    fn from(identifier_type: IdentifierType) -> Self {
        identifier_type as Self
    }
}

impl TryFrom<i64> for IdentifierType {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Email),
            2 => Ok(Self::Msn),
            3 => Ok(Self::IosPushToken),
            4 => Ok(Self::AndroidGcmToken),
            5 => Ok(Self::WindowsPushToken),
            other => Err(format!("unknown identifier type {other}")),
        }
    }
}

/// An identifier attached to a user within a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Identifier {
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub user_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub application_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub project_id: Option<i64>,
    #[serde(rename = "IdentifierTypeId", default, deserialize_with = "lenient_code")]
    pub identifier_type: Option<IdentifierType>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub is_confirmed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_updated: Option<String>,
}

impl Identifier {
    pub fn new(
        application_id: i64,
        identifier_type: IdentifierType,
        value: impl Into<String>,
        is_confirmed: bool,
    ) -> Self {
        Self {
            application_id: Some(application_id),
            identifier_type: Some(identifier_type),
            value: Some(value.into()),
            is_confirmed: Some(is_confirmed),
            ..Self::default()
        }
    }

    /// A confirmed push notification token for `application_id`.
    pub fn push_token(application_id: i64, token: impl Into<String>) -> Self {
        Self::new(application_id, IdentifierType::AndroidGcmToken, token, true)
    }

    /// Copy bound to `user_id` within `project_id`, ready to register.
    #[must_use]
    pub fn owned_by(&self, user_id: Option<i64>, project_id: i64) -> Self {
        Self { user_id, project_id: Some(project_id), ..self.clone() }
    }
}
