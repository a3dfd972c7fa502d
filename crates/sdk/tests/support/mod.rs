//! Shared helpers for SDK end-to-end tests against a mock platform.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use intelligence_common::testing::poll_until;
use intelligence_common::SystemClock;
use intelligence_core::testing::ManualConnectivity;
use intelligence_core::MemoryStore;
use intelligence_domain::{CertificateTrustPolicy, Configuration, DeviceInfo, Environment, Region};
use intelligence_infra::HttpTransport;
use intelligence_sdk::{Collaborators, Intelligence};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const EVENTS_PATH: &str = "/analytics/projects/20/events";
pub const TOKEN_PATH: &str = "/authentication/token";
pub const INSTALLATIONS_PATH: &str = "/identity/projects/20/installations";
pub const GEOFENCES_PATH: &str = "/location/projects/20/geofences";

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

pub fn device() -> DeviceInfo {
    DeviceInfo {
        application_version: "2.1.0".into(),
        device_model: "Pixel 8".into(),
        os_name: "Android".into(),
        os_version: "14".into(),
    }
}

pub fn token_response(access_token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": 3600,
    }))
}

pub fn user_response(id: i64, username: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "Data": [{"Id": id, "CompanyId": 40, "Username": username, "IsActive": true}]
    }))
}

/// Mount token grants, provisioning, validation, installation
/// registration, geofences and the events endpoint.
pub async fn mount_platform(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=client_credentials"))
        .respond_with(token_response("app-token"))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=password"))
        .respond_with(token_response("internal-token"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/authentication/validate"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/identity/companies/40/users"))
        .respond_with(user_response(77, "generated"))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/identity/projects/20/assignrole"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(INSTALLATIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Data": [{
                "Id": 9,
                "InstallationId": "inst-1",
                "InstalledVersion": "2.1.0",
                "DeviceTypeId": 1,
                "ProjectId": 20,
                "ApplicationId": 30,
            }]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(GEOFENCES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Data": [{
                "Id": 3,
                "Name": "HQ",
                "Radius": 150.0,
                "Geolocation": {"Latitude": 51.5, "Longitude": -0.12},
            }]
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path(EVENTS_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

/// An SDK over the real HTTP transport, an in-memory store and manually
/// driven connectivity.
pub struct TestSdk {
    pub sdk: Intelligence,
    pub connectivity: Arc<ManualConnectivity>,
    pub store: Arc<MemoryStore>,
}

impl TestSdk {
    pub async fn new(server: &MockServer, connected: bool) -> anyhow::Result<Self> {
        Self::with_config(config_for(server), connected).await
    }

    pub async fn with_config(config: Configuration, connected: bool) -> anyhow::Result<Self> {
        let connectivity = Arc::new(ManualConnectivity::new(connected));
        let store = Arc::new(MemoryStore::new());
        let collaborators = Collaborators {
            transport: Arc::new(HttpTransport::for_configuration(&config)?),
            store: store.clone(),
            connectivity: connectivity.clone(),
            device: device(),
            clock: Arc::new(SystemClock),
        };
        let sdk = Intelligence::new(config, collaborators).await?;
        Ok(Self { sdk, connectivity, store })
    }
}

/// Requests received by `server` on `wanted`.
pub async fn requests_to(server: &MockServer, wanted: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == wanted)
        .collect()
}

/// Event types delivered to the events endpoint, in order.
pub async fn delivered_event_types(server: &MockServer) -> Vec<String> {
    requests_to(server, EVENTS_PATH)
        .await
        .iter()
        .filter_map(|request| serde_json::from_slice::<serde_json::Value>(&request.body).ok())
        .flat_map(|batch| batch.as_array().cloned().unwrap_or_default())
        .filter_map(|event| event["EventType"].as_str().map(str::to_string))
        .collect()
}

/// Wait until `server` has received at least `count` event batches.
pub async fn wait_for_batches(server: &MockServer, count: usize) -> bool {
    poll_until(Duration::from_secs(5), Duration::from_millis(20), || async move {
        requests_to(server, EVENTS_PATH).await.len() >= count
    })
    .await
}
