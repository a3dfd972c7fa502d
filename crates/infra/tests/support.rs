//! Shared helpers for `intelligence-infra` integration tests.

#![allow(dead_code)]

use intelligence_domain::{CertificateTrustPolicy, Configuration, Environment, Region};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Configuration routing every module to `server`.
pub fn config_for(server: &MockServer) -> Configuration {
    Configuration {
        region: Region::Europe,
        environment: Environment::Local,
        client_id: "client".into(),
        client_secret: "secret".into(),
        project_id: 20,
        application_id: 30,
        company_id: 40,
        sdk_user_role: 1001,
        certificate_trust_policy: CertificateTrustPolicy::Valid,
        use_geofences: false,
        base_url: Some(server.uri()),
    }
}

pub fn token_response(access_token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": 3600,
    }))
}

/// Mount the happy-path platform: token grants, user creation, role
/// assignment, validation and the events endpoint.
pub async fn mount_platform(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/authentication/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(token_response("app-token"))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/authentication/token"))
        .and(body_string_contains("grant_type=password"))
        .respond_with(token_response("user-token"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/authentication/validate"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/identity/companies/40/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Data": [{"Id": 77, "CompanyId": 40, "Username": "generated", "IsActive": true}]
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path_regex(r"^/identity/projects/20/assignrole$"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/analytics/projects/20/events"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// Requests received by `server` whose path equals `wanted`.
pub async fn requests_to(server: &MockServer, wanted: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == wanted)
        .collect()
}
