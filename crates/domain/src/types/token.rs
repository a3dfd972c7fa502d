//! Bearer tokens and per-tier token state

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{IntelligenceError, RequestError};

/// Body returned by the token endpoint for every grant type.
#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// An OAuth bearer token with an absolute expiry.
///
/// Persisted as JSON with the expiry stored as an instant, so a reloaded
/// token keeps its original deadline.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationToken {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

/// Lifecycle state of one identity tier's token slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Absent,
    Fresh,
    ExpiredRefreshable,
    ExpiredTerminal,
}

impl AuthenticationToken {
    /// Build a token directly.
    pub fn new(
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        refresh_token: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: Some(access_token.into()),
            token_type: Some(token_type.into()),
            refresh_token,
            expires_at: Some(expires_at),
            user_id: None,
        }
    }

    /// Parse a token endpoint response; expiry is `now + expires_in`.
    ///
    /// # Errors
    /// `Request(ParseError)` when a required field is missing or malformed,
    /// or when `expires_in` puts the expiry outside the representable range.
    pub fn from_response(body: &str, now: DateTime<Utc>) -> crate::Result<Self> {
        let response: TokenResponse = serde_json::from_str(body)
            .map_err(|e| IntelligenceError::Request(RequestError::ParseError(e.to_string())))?;

        let expires_at = Duration::try_seconds(response.expires_in)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| {
                RequestError::ParseError(format!("expires_in out of range: {}", response.expires_in))
            })?;

        Ok(Self {
            access_token: Some(response.access_token),
            token_type: Some(response.token_type),
            refresh_token: response.refresh_token,
            expires_at: Some(expires_at),
            user_id: None,
        })
    }

    /// Expiry unknown or not after `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at <= now)
    }

    /// The token cannot be used as-is and must be (re)acquired.
    #[must_use]
    pub fn requires_authentication(&self, now: DateTime<Utc>) -> bool {
        self.access_token.is_none() || self.is_expired(now)
    }

    /// Refresh token, when present and non-empty.
    #[must_use]
    pub fn usable_refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|token| !token.is_empty())
    }

    /// `Authorization` header value, when the token holds a value.
    #[must_use]
    pub fn bearer(&self) -> Option<String> {
        self.access_token.as_ref().map(|token| format!("Bearer {token}"))
    }

    /// Classify this token for the tier state machine.
    #[must_use]
    pub fn state(&self, now: DateTime<Utc>) -> TokenState {
        if self.access_token.is_none() {
            TokenState::Absent
        } else if !self.is_expired(now) {
            TokenState::Fresh
        } else if self.usable_refresh_token().is_some() {
            TokenState::ExpiredRefreshable
        } else {
            TokenState::ExpiredTerminal
        }
    }

    /// Clear every field, leaving an inert token.
    pub fn invalidate(&mut self) {
        *self = Self::default();
    }

    /// Attach the owning user id.
    #[must_use]
    pub const fn with_user_id(mut self, user_id: Option<i64>) -> Self {
        self.user_id = user_id;
        self
    }
}

impl std::fmt::Debug for AuthenticationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationToken")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("token_type", &self.token_type)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .field("user_id", &self.user_id)
            .finish()
    }
}
