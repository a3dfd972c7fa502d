//! Request builders for the authentication endpoints

use intelligence_domain::{AuthenticationToken, Configuration, Module};

use crate::http::HttpRequest;

const ENDPOINT_TOKEN: &str = "token";
const ENDPOINT_VALIDATE: &str = "validate";

fn token_request(config: &Configuration, grant_type: &str) -> HttpRequest {
    HttpRequest::post(config.endpoint(Module::Authentication, ENDPOINT_TOKEN))
        .param("grant_type", grant_type)
        .param("client_id", &config.client_id)
        .param("client_secret", &config.client_secret)
}

/// Client-credentials grant for the application tier.
pub fn client_credentials(config: &Configuration) -> HttpRequest {
    token_request(config, "client_credentials")
}

/// Resource-owner password grant.
pub fn password_grant(config: &Configuration, username: &str, password: &str) -> HttpRequest {
    token_request(config, "password").param("username", username).param("password", password)
}

/// Refresh-token grant.
pub fn refresh_grant(config: &Configuration, refresh_token: &str) -> HttpRequest {
    token_request(config, "refresh_token").param("refresh_token", refresh_token)
}

/// Server-side validation of a still-unexpired token.
pub fn validate(config: &Configuration, token: &AuthenticationToken) -> HttpRequest {
    HttpRequest::get(config.endpoint(Module::Authentication, ENDPOINT_VALIDATE))
        .bearer(token.bearer())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use intelligence_domain::{CertificateTrustPolicy, Environment, Region};

    use super::*;
    use crate::http::HttpMethod;

    fn config() -> Configuration {
        Configuration {
            region: Region::Europe,
            environment: Environment::Production,
            client_id: "cid".into(),
            client_secret: "csecret".into(),
            project_id: 20,
            application_id: 30,
            company_id: 40,
            sdk_user_role: 1001,
            certificate_trust_policy: CertificateTrustPolicy::Valid,
            use_geofences: true,
            base_url: None,
        }
    }

    #[test]
    fn grants_carry_client_credentials() {
        let request = password_grant(&config(), "jane", "Secret123");
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.url, "https://authentication.phoenixplatform.eu/v2/token");
        assert_eq!(request.param_value("grant_type"), Some("password"));
        assert_eq!(request.param_value("client_id"), Some("cid"));
        assert_eq!(request.param_value("client_secret"), Some("csecret"));
        assert_eq!(request.param_value("username"), Some("jane"));

        let request = refresh_grant(&config(), "r-1");
        assert_eq!(request.param_value("grant_type"), Some("refresh_token"));
        assert_eq!(request.param_value("refresh_token"), Some("r-1"));
    }

    #[test]
    fn validate_is_bearer_get() {
        let token = AuthenticationToken::new("abc", "bearer", None, Utc::now() + Duration::hours(1));
        let request = validate(&config(), &token);
        assert_eq!(request.method, HttpMethod::Get);
        assert_eq!(request.header_value("Authorization"), Some("Bearer abc"));
    }
}
