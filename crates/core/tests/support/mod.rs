//! Shared test helpers for `intelligence-core` integration tests.
//!
//! A [`Harness`] wires the auth session manager and scheduler to a scripted
//! transport, an in-memory store and a mock clock, so tests can focus on the
//! exchanges instead of the plumbing.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Duration;
use intelligence_common::{Clock, MockClock};
use intelligence_core::testing::{ManualConnectivity, MockReply, MockTransport};
use intelligence_core::{
    Analytics, AnalyticsContext, AuthSessionManager, DurableStore, Identity, IdentityContext,
    Location, LocationContext, MemoryStore, SchedulerConfig, Session, TaskScheduler, Tier,
};
use intelligence_domain::constants::KEY_INSTALLATION_RECORD;
use intelligence_domain::{
    AuthenticationToken, CertificateTrustPolicy, Configuration, DeviceInfo, Environment, Region,
    User,
};
use serde_json::{json, Value};

pub const INTERNAL_USER_ID: i64 = 77;

pub fn config() -> Configuration {
    Configuration {
        region: Region::Europe,
        environment: Environment::Production,
        client_id: "client".into(),
        client_secret: "secret".into(),
        project_id: 20,
        application_id: 30,
        company_id: 40,
        sdk_user_role: 1001,
        certificate_trust_policy: CertificateTrustPolicy::Valid,
        use_geofences: true,
        base_url: Some("http://mock".into()),
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

/// Token endpoint body for `access_token`, valid for one hour.
pub fn token_body(access_token: &str) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": 3600,
    })
}

pub fn token_reply(access_token: &str) -> MockReply {
    MockReply::json(200, &token_body(access_token))
}

/// Identity service `{"Data":[...]}` body for one user.
pub fn user_reply(id: i64, username: &str) -> MockReply {
    MockReply::json(
        200,
        &json!({"Data": [{"Id": id, "CompanyId": 40, "Username": username, "IsActive": true}]}),
    )
}

/// `{"Data":[...]}` body wrapping `items`.
pub fn data_reply(items: Value) -> MockReply {
    MockReply::json(200, &json!({ "Data": items }))
}

pub fn auth_failure(error: &str, description: &str) -> MockReply {
    MockReply::json(401, &json!({"error": error, "error_description": description}))
}

pub struct Harness {
    pub config: Arc<Configuration>,
    pub transport: Arc<MockTransport>,
    pub store: Arc<MemoryStore>,
    pub clock: MockClock,
    pub connectivity: Arc<ManualConnectivity>,
    pub session: Arc<Session>,
    pub auth: Arc<AuthSessionManager>,
    pub scheduler: Arc<TaskScheduler>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), MockClock::new())
    }

    /// Build a harness over an existing store, as a restarted process would.
    pub fn with_store(store: Arc<MemoryStore>, clock: MockClock) -> Self {
        let config = Arc::new(config());
        let transport = Arc::new(MockTransport::new());
        let connectivity = Arc::new(ManualConnectivity::new(true));
        let session = Arc::new(Session::load(store.clone()));
        let auth = Arc::new(AuthSessionManager::new(
            Arc::clone(&config),
            transport.clone(),
            Arc::clone(&session),
            Arc::new(clock.clone()),
        ));
        let scheduler = Arc::new(TaskScheduler::new(
            auth.clone(),
            connectivity.clone(),
            SchedulerConfig::default(),
        ));

        Self { config, transport, store, clock, connectivity, session, auth, scheduler }
    }

    pub fn analytics(&self) -> Analytics {
        Analytics::new(
            AnalyticsContext {
                config: Arc::clone(&self.config),
                device: device(),
                session: Arc::clone(&self.session),
                store: self.store.clone(),
                transport: self.transport.clone(),
                clock: Arc::new(self.clock.clone()),
            },
            Arc::clone(&self.scheduler),
        )
    }

    pub fn identity(&self) -> Identity {
        Identity::new(
            IdentityContext {
                config: Arc::clone(&self.config),
                device: device(),
                session: Arc::clone(&self.session),
                store: self.store.clone(),
                transport: self.transport.clone(),
            },
            Arc::clone(&self.scheduler),
        )
    }

    pub fn location(&self) -> Location {
        Location::new(
            LocationContext {
                config: Arc::clone(&self.config),
                session: Arc::clone(&self.session),
                store: self.store.clone(),
                transport: self.transport.clone(),
            },
            Arc::clone(&self.scheduler),
        )
    }

    /// Token expiring an hour from the mock clock's now.
    pub fn fresh_token(&self, access_token: &str) -> AuthenticationToken {
        AuthenticationToken::new(access_token, "bearer", None, self.clock.now() + Duration::hours(1))
    }

    /// Persist an installation record as the installation module would.
    pub fn store_installation(&self, installation_id: &str) {
        let record = json!({"InstallationId": installation_id}).to_string();
        self.store.set(KEY_INSTALLATION_RECORD, &record, true).unwrap();
    }

    /// Seed a provisioned internal user holding a fresh token.
    pub fn seed_internal_session(&self) {
        let user = User {
            id: Some(INTERNAL_USER_ID),
            company_id: Some(40),
            username: "sdk-user".into(),
            password: Some("Aa1password".into()),
            ..User::default()
        };
        self.session.set_token(Tier::Application, Some(self.fresh_token("app")));
        self.session.set_internal_user(Some(user));
        self.session.set_token(
            Tier::InternalUser,
            Some(self.fresh_token("internal").with_user_id(Some(INTERNAL_USER_ID))),
        );
    }
}
