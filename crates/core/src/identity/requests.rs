//! Request builders for the identity service

use intelligence_domain::constants::IDENTITY_PROVIDER_ID;
use intelligence_domain::{
    AuthenticationToken, Configuration, Identifier, IdentifierType, InstallationRecord, Module,
    User,
};
use serde_json::json;

use crate::http::HttpRequest;

fn bearer(token: Option<&AuthenticationToken>) -> Option<String> {
    token.and_then(AuthenticationToken::bearer)
}

fn company_users(config: &Configuration) -> String {
    config.endpoint(Module::Identity, &format!("companies/{}/users", config.company_id))
}

fn project_endpoint(config: &Configuration, path: &str) -> String {
    config.endpoint(Module::Identity, &format!("projects/{}/{path}", config.project_id))
}

/// Profile of the user owning `token`.
pub fn current_user(config: &Configuration, token: Option<&AuthenticationToken>) -> HttpRequest {
    HttpRequest::get(
        config.endpoint(Module::Identity, &format!("providers/{IDENTITY_PROVIDER_ID}/users/me")),
    )
    .bearer(bearer(token))
}

pub fn user_by_id(
    config: &Configuration,
    token: Option<&AuthenticationToken>,
    user_id: i64,
) -> HttpRequest {
    HttpRequest::get(format!("{}/{user_id}", company_users(config))).bearer(bearer(token))
}

/// Create `user` in the configured company.
pub fn create_user(
    config: &Configuration,
    token: Option<&AuthenticationToken>,
    user: &User,
) -> HttpRequest {
    HttpRequest::post(company_users(config)).bearer(bearer(token)).json(json!([user.to_payload()]))
}

pub fn update_user(
    config: &Configuration,
    token: Option<&AuthenticationToken>,
    user: &User,
) -> HttpRequest {
    HttpRequest::put(company_users(config)).bearer(bearer(token)).json(json!([user.to_payload()]))
}

/// Grant `role_id` to `user_id` on the configured project.
pub fn assign_role(
    config: &Configuration,
    token: Option<&AuthenticationToken>,
    user_id: i64,
    role_id: i64,
) -> HttpRequest {
    let url = project_endpoint(config, &format!("assignrole?userid={user_id}&roleid={role_id}"));
    HttpRequest::post(url).bearer(bearer(token)).json(json!([role_id]))
}

pub fn revoke_role(
    config: &Configuration,
    token: Option<&AuthenticationToken>,
    user_id: i64,
    role_id: i64,
) -> HttpRequest {
    let url = project_endpoint(config, &format!("revokerole?userid={user_id}&roleid={role_id}"));
    HttpRequest::delete(url).bearer(bearer(token))
}

pub fn create_installation(
    config: &Configuration,
    token: Option<&AuthenticationToken>,
    record: &InstallationRecord,
) -> HttpRequest {
    HttpRequest::post(project_endpoint(config, "installations"))
        .bearer(bearer(token))
        .json(json!([record]))
}

pub fn update_installation(
    config: &Configuration,
    token: Option<&AuthenticationToken>,
    record: &InstallationRecord,
) -> HttpRequest {
    HttpRequest::put(project_endpoint(config, "installations"))
        .bearer(bearer(token))
        .json(json!([record.to_update_payload()]))
}

pub fn register_identifier(
    config: &Configuration,
    token: Option<&AuthenticationToken>,
    identifier: &Identifier,
) -> HttpRequest {
    HttpRequest::post(project_endpoint(config, "identifiers"))
        .bearer(bearer(token))
        .json(json!([identifier]))
}

pub fn delete_identifier(
    config: &Configuration,
    token: Option<&AuthenticationToken>,
    identifier_id: i64,
) -> HttpRequest {
    HttpRequest::delete(project_endpoint(config, &format!("identifiers/{identifier_id}")))
        .bearer(bearer(token))
}

/// Remove whichever identifier holds `value` for this application,
/// regardless of the user owning it.
pub fn delete_identifier_on_behalf(
    config: &Configuration,
    token: Option<&AuthenticationToken>,
    value: &str,
    identifier_type: IdentifierType,
) -> HttpRequest {
    HttpRequest::delete(project_endpoint(config, "identifiers"))
        .bearer(bearer(token))
        .query("ApplicationId", config.application_id.to_string())
        .query("identifierValue", value)
        .query("IdentifierTypeId", i64::from(identifier_type).to_string())
}

#[cfg(test)]
mod tests {
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
    fn assign_role_uses_query_and_body() {
        let request = assign_role(&config(), None, 77, 1001);
        assert_eq!(
            request.url,
            "https://identity.phoenixplatform.eu/v2/projects/20/assignrole?userid=77&roleid=1001"
        );
        assert_eq!(request.body, Some(json!([1001])));
        assert!(request.header_value("Authorization").is_none());

        let request = revoke_role(&config(), None, 77, 5);
        assert_eq!(request.method, HttpMethod::Delete);
        assert!(request.url.ends_with("projects/20/revokerole?userid=77&roleid=5"));
        assert!(request.body.is_none());
    }

    #[test]
    fn user_requests_target_the_company() {
        let user = User::internal(40, "svc".into(), "abcdefgh");
        let request = create_user(&config(), None, &user);
        assert_eq!(request.url, "https://identity.phoenixplatform.eu/v2/companies/40/users");
        assert_eq!(request.body.as_ref().unwrap()[0]["Username"], "svc");

        let request = update_user(&config(), None, &user);
        assert_eq!(request.method, HttpMethod::Put);
        assert_eq!(request.url, "https://identity.phoenixplatform.eu/v2/companies/40/users");

        let request = user_by_id(&config(), None, 9);
        assert_eq!(request.url, "https://identity.phoenixplatform.eu/v2/companies/40/users/9");
    }

    #[test]
    fn delete_on_behalf_identifies_by_value_and_type() {
        let request =
            delete_identifier_on_behalf(&config(), None, "token value", IdentifierType::AndroidGcmToken);
        assert_eq!(request.method, HttpMethod::Delete);
        assert_eq!(request.url, "https://identity.phoenixplatform.eu/v2/projects/20/identifiers");
        assert_eq!(request.query_value("ApplicationId"), Some("30"));
        assert_eq!(request.query_value("identifierValue"), Some("token value"));
        assert_eq!(request.query_value("IdentifierTypeId"), Some("4"));
    }

    #[test]
    fn installation_update_sends_only_mutable_fields() {
        let record = InstallationRecord {
            id: Some(3),
            installation_id: Some("i-1".into()),
            installed_version: Some("2.0".into()),
            ..InstallationRecord::default()
        };
        let request = update_installation(&config(), None, &record);
        let element = &request.body.as_ref().unwrap()[0];
        assert_eq!(element["Id"], 3);
        assert_eq!(element["InstalledVersion"], "2.0");
        assert!(element.get("InstallationId").is_none());
    }
}
