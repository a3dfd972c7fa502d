//! Classification of failed token-endpoint responses

use intelligence_domain::constants::{
    AUTH_ACCOUNT_DISABLED, AUTH_ACCOUNT_LOCKED, AUTH_CREDENTIALS_INCORRECT, AUTH_FAILED,
    AUTH_INVALID_TOKEN, AUTH_TOKEN_INVALID_OR_EXPIRED,
};
use intelligence_domain::{AuthenticationError, IntelligenceError, RequestError};

use crate::http::{ErrorBody, HttpResponse};

/// Map a non-2xx authentication response onto the SDK error taxonomy.
///
/// 401 bodies are matched on their `error`/`error_description` strings; an
/// unrecognised 401 body is `Unauthorized` and an unparseable one is
/// `ParseError`.
pub fn classify_auth_failure(response: &HttpResponse) -> IntelligenceError {
    match response.status {
        401 => match serde_json::from_str::<ErrorBody>(&response.body) {
            Ok(body) => classify_unauthorized(&body),
            Err(e) => RequestError::ParseError(e.to_string()).into(),
        },
        403 => RequestError::Forbidden.into(),
        status => IntelligenceError::unhandled(Some(status), response.body.clone()),
    }
}

fn classify_unauthorized(body: &ErrorBody) -> IntelligenceError {
    let error = body.error.as_deref().unwrap_or_default();
    let description = body.error_description.as_deref().unwrap_or_default();

    let kind = match (error, description) {
        (AUTH_FAILED, AUTH_CREDENTIALS_INCORRECT) => Some(AuthenticationError::CredentialError),
        (AUTH_FAILED, AUTH_ACCOUNT_DISABLED) => Some(AuthenticationError::AccountDisabled),
        (AUTH_FAILED, AUTH_ACCOUNT_LOCKED) => Some(AuthenticationError::AccountLocked),
        (AUTH_INVALID_TOKEN, AUTH_TOKEN_INVALID_OR_EXPIRED) => {
            Some(AuthenticationError::TokenInvalidOrExpired)
        }
        _ => None,
    };

    kind.map_or_else(|| RequestError::Unauthorized.into(), IntelligenceError::Authentication)
}
