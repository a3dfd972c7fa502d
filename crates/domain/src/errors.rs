//! Error types used throughout the SDK
//!
//! Every variant carries a stable numeric code (see [`IntelligenceError::code`])
//! so host applications can branch on failures without string matching.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the Intelligence SDK
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum IntelligenceError {
    #[error("Configuration error ({kind:?}): {message}")]
    Configuration { kind: ConfigurationErrorKind, message: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error("Server error {status}: {error}")]
    Server { status: u16, error: String, description: Option<String> },

    #[error("Task scheduler has shut down")]
    ShutDown,
}

/// What went wrong while reading or validating configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigurationErrorKind {
    FileNotFound,
    InvalidProperty,
    InvalidFile,
    MissingProperty,
}

/// Transport-level and HTTP-status failures.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "details")]
pub enum RequestError {
    #[error("Response could not be parsed: {0}")]
    ParseError(String),

    #[error("No internet connection")]
    Offline,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Unhandled error (status {code:?}): {message}")]
    UnhandledError { code: Option<u16>, message: String },
}

/// Authentication failures reported by the token endpoint.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthenticationError {
    #[error("Credentials incorrect")]
    CredentialError,

    #[error("Account disabled")]
    AccountDisabled,

    #[error("Account locked")]
    AccountLocked,

    #[error("Token invalid or expired")]
    TokenInvalidOrExpired,
}

/// User identity failures.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "details")]
pub enum IdentityError {
    #[error("Invalid user: {0}")]
    InvalidUser(String),

    #[error("Password does not meet the security requirements")]
    WeakPassword,
}

impl IntelligenceError {
    /// Shorthand for a configuration failure.
    pub fn configuration(kind: ConfigurationErrorKind, message: impl Into<String>) -> Self {
        Self::Configuration { kind, message: message.into() }
    }

    /// Shorthand for an unhandled response or transport failure.
    pub fn unhandled(code: Option<u16>, message: impl Into<String>) -> Self {
        Self::Request(RequestError::UnhandledError { code, message: message.into() })
    }

    /// Stable numeric error code. `None` for local lifecycle errors.
    #[must_use]
    pub const fn code(&self) -> Option<u32> {
        let code = match self {
            Self::Configuration { kind, .. } => match kind {
                ConfigurationErrorKind::FileNotFound => 1001,
                ConfigurationErrorKind::InvalidProperty => 1002,
                ConfigurationErrorKind::InvalidFile => 1003,
                ConfigurationErrorKind::MissingProperty => 1004,
            },
            Self::Request(err) => match err {
                RequestError::ParseError(_) => 2001,
                RequestError::Offline => 2003,
                RequestError::Unauthorized => 2004,
                RequestError::Forbidden => 2005,
                RequestError::UnhandledError { .. } => 2006,
            },
            Self::Server { .. } => 2006,
            Self::Authentication(err) => match err {
                AuthenticationError::CredentialError => 3001,
                AuthenticationError::AccountDisabled => 3002,
                AuthenticationError::AccountLocked => 3003,
                AuthenticationError::TokenInvalidOrExpired => 3004,
            },
            Self::Identity(err) => match err {
                IdentityError::InvalidUser(_) => 4001,
                IdentityError::WeakPassword => 4002,
            },
            Self::InvalidParameter(_) => 7001,
            Self::MissingParameter(_) => 7002,
            Self::ShutDown => return None,
        };
        Some(code)
    }

    /// True for failures a token refresh or re-login can heal.
    #[must_use]
    pub const fn is_authentication_class(&self) -> bool {
        matches!(self, Self::Authentication(_) | Self::Request(RequestError::Unauthorized))
    }
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, IntelligenceError>;
