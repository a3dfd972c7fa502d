//! Platform user identities
//!
//! Field names follow the identity service's PascalCase JSON.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::envelope::data_items;
use super::lenient::lenient_id;
use crate::constants::{INTERNAL_PASSWORD_PREFIX, MIN_PASSWORD_LENGTH};
use crate::errors::{IdentityError, IntelligenceError};

/// A user of the platform: either the SDK's internal service account or a
/// real end user.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id", skip_serializing_if = "Option::is_none")]
    pub company_id: Option<i64>,
    #[serde(default)]
    pub username: String,
    /// Only kept for the internal user, whose credentials the SDK owns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

const fn default_active() -> bool {
    true
}

impl User {
    /// Build a user with a policy-checked password.
    ///
    /// # Errors
    /// `Identity(WeakPassword)` when the password fails [`User::is_password_valid`].
    pub fn new(
        company_id: i64,
        username: impl Into<String>,
        password: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> crate::Result<Self> {
        let password = password.into();
        if !Self::is_password_valid(&password) {
            return Err(IdentityError::WeakPassword.into());
        }

        Ok(Self {
            id: None,
            company_id: Some(company_id),
            username: username.into(),
            password: Some(password),
            first_name: Some(first_name.into()),
            last_name: Some(last_name.into()),
            avatar_url: None,
            is_active: true,
        })
    }

    /// The SDK's internal service account for the given credentials.
    ///
    /// Callers generate `username` and the random part of the password; the
    /// `Aa1` prefix guarantees the password policy holds.
    #[must_use]
    pub fn internal(company_id: i64, username: String, password_suffix: &str) -> Self {
        Self {
            id: None,
            company_id: Some(company_id),
            username,
            password: Some(format!("{INTERNAL_PASSWORD_PREFIX}{password_suffix}")),
            first_name: Some("SDK".to_string()),
            last_name: Some("User".to_string()),
            avatar_url: None,
            is_active: true,
        }
    }

    /// At least eight characters with an uppercase letter and a digit.
    #[must_use]
    pub fn is_password_valid(password: &str) -> bool {
        password.chars().count() >= MIN_PASSWORD_LENGTH
            && password.chars().any(|c| c.is_ascii_uppercase())
            && password.chars().any(|c| c.is_ascii_digit())
    }

    /// Body element for the create- and update-user requests.
    #[must_use]
    pub fn to_payload(&self) -> Value {
        json!({
            "Id": self.id.map(|id| id.to_string()),
            "CompanyId": self.company_id.map(|id| id.to_string()),
            "Username": self.username,
            "Password": self.password,
            "FirstName": self.first_name,
            "LastName": self.last_name,
            "AvatarUrl": self.avatar_url.clone().unwrap_or_default(),
            "LockingCount": "0",
            "Reference": "",
            "IsActive": "true",
            "MetaDataParameters": "",
            "UserTypeId": "User",
        })
    }

    /// Parse the first user of a `{"Data":[...]}` response.
    ///
    /// # Errors
    /// `Request(ParseError)` for malformed JSON and `Identity(InvalidUser)`
    /// when the list is empty or the user carries no id.
    pub fn from_data_response(body: &str) -> crate::Result<Self> {
        let user = data_items::<Self>(body)?
            .into_iter()
            .next()
            .ok_or_else(|| IdentityError::InvalidUser("response contained no user".to_string()))?;

        if user.id.is_none() {
            return Err(IdentityError::InvalidUser("user has no id".to_string()).into());
        }
        Ok(user)
    }

    /// Fields the identity service requires to create a user.
    ///
    /// # Errors
    /// `MissingParameter` naming the first absent field.
    pub fn validate_for_create(&self) -> crate::Result<()> {
        if self.company_id.is_none() {
            return Err(missing("company_id"));
        }
        if self.username.trim().is_empty() {
            return Err(missing("username"));
        }
        if self.password.is_none() {
            return Err(missing("password"));
        }
        if self.first_name.is_none() {
            return Err(missing("first_name"));
        }
        if self.last_name.is_none() {
            return Err(missing("last_name"));
        }
        if self.avatar_url.is_none() {
            return Err(missing("avatar_url"));
        }
        Ok(())
    }

    /// Fields the identity service requires to update a user. Usernames
    /// cannot be changed, so the username is not checked.
    ///
    /// # Errors
    /// `MissingParameter` naming the first absent field.
    pub fn validate_for_update(&self) -> crate::Result<()> {
        if self.id.is_none() {
            return Err(missing("id"));
        }
        if self.company_id.is_none() {
            return Err(missing("company_id"));
        }
        if self.first_name.is_none() {
            return Err(missing("first_name"));
        }
        if self.last_name.is_none() {
            return Err(missing("last_name"));
        }
        Ok(())
    }

    /// Copy of this user with the password stripped.
    #[must_use]
    pub fn without_password(&self) -> Self {
        Self { password: None, ..self.clone() }
    }
}

fn missing(field: &str) -> IntelligenceError {
    IntelligenceError::MissingParameter(field.to_string())
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("company_id", &self.company_id)
            .field("username", &self.username)
            .field("has_password", &self.password.is_some())
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}
