//! Scheduler tasks for the identity service
//!
//! Every task goes through the retry protocol: a 401 reauthenticates the
//! session and replays the task once with the refreshed token.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use intelligence_domain::constants::KEY_INSTALLATION_RECORD;
use intelligence_domain::{
    first_data_item, AuthenticationToken, Configuration, DeviceInfo, Identifier, IdentifierType,
    InstallationRecord, RequestError, Result, User,
};
use tracing::{debug, info, instrument, warn};

use super::requests;
use crate::auth::{Session, Tier};
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::scheduler::Task;
use crate::storage::DurableStore;

/// Collaborators shared by the identity tasks.
pub struct IdentityContext {
    pub config: Arc<Configuration>,
    pub device: DeviceInfo,
    pub session: Arc<Session>,
    pub store: Arc<dyn DurableStore>,
    pub transport: Arc<dyn Transport>,
}

impl IdentityContext {
    fn current_token(&self) -> Result<AuthenticationToken> {
        self.session.current_token().ok_or_else(|| RequestError::Unauthorized.into())
    }

    fn application_token(&self) -> Result<AuthenticationToken> {
        self.session.token(Tier::Application).ok_or_else(|| RequestError::Unauthorized.into())
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.transport.execute(request).await?.error_for_status()
    }
}

/// Profile of the identity currently acting for the SDK.
#[derive(Clone)]
pub struct GetMeTask {
    context: Arc<IdentityContext>,
}

impl GetMeTask {
    pub const fn new(context: Arc<IdentityContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl Task for GetMeTask {
    type Output = User;

    fn name(&self) -> &'static str {
        "get_me"
    }

    async fn execute(&self) -> Result<User> {
        let token = self.context.current_token()?;
        let response =
            self.context.send(requests::current_user(&self.context.config, Some(&token))).await?;
        User::from_data_response(&response.body)
    }
}

#[derive(Clone)]
pub struct GetUserByIdTask {
    context: Arc<IdentityContext>,
    user_id: i64,
}

impl GetUserByIdTask {
    pub const fn new(context: Arc<IdentityContext>, user_id: i64) -> Self {
        Self { context, user_id }
    }
}

#[async_trait]
impl Task for GetUserByIdTask {
    type Output = User;

    fn name(&self) -> &'static str {
        "get_user_by_id"
    }

    async fn execute(&self) -> Result<User> {
        let token = self.context.application_token()?;
        let request = requests::user_by_id(&self.context.config, Some(&token), self.user_id);
        let response = self.context.send(request).await?;
        User::from_data_response(&response.body)
    }
}

/// Creates a user in the configured company with the application token.
#[derive(Clone)]
pub struct CreateUserTask {
    context: Arc<IdentityContext>,
    user: User,
}

impl CreateUserTask {
    pub const fn new(context: Arc<IdentityContext>, user: User) -> Self {
        Self { context, user }
    }
}

impl fmt::Debug for CreateUserTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateUserTask").field("user", &self.user).finish_non_exhaustive()
    }
}

#[async_trait]
impl Task for CreateUserTask {
    type Output = User;

    fn name(&self) -> &'static str {
        "create_user"
    }

    #[instrument(skip(self), fields(username = %self.user.username))]
    async fn execute(&self) -> Result<User> {
        let token = self.context.application_token()?;
        let request = requests::create_user(&self.context.config, Some(&token), &self.user);
        let response = self.context.send(request).await?;
        let created = User::from_data_response(&response.body)?.without_password();
        info!(user_id = ?created.id, "User created");
        Ok(created)
    }
}

/// Updates a user's profile with the acting identity's token.
#[derive(Clone)]
pub struct UpdateUserTask {
    context: Arc<IdentityContext>,
    user: User,
}

impl UpdateUserTask {
    pub const fn new(context: Arc<IdentityContext>, user: User) -> Self {
        Self { context, user }
    }
}

#[async_trait]
impl Task for UpdateUserTask {
    type Output = User;

    fn name(&self) -> &'static str {
        "update_user"
    }

    async fn execute(&self) -> Result<User> {
        let token = self.context.current_token()?;
        let request = requests::update_user(&self.context.config, Some(&token), &self.user);
        let response = self.context.send(request).await?;
        Ok(User::from_data_response(&response.body)?.without_password())
    }
}

/// Grant or revoke a project role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleChange {
    Assign,
    Revoke,
}

#[derive(Clone)]
pub struct RoleTask {
    context: Arc<IdentityContext>,
    change: RoleChange,
    user_id: i64,
    role_id: i64,
}

impl RoleTask {
    pub const fn new(
        context: Arc<IdentityContext>,
        change: RoleChange,
        user_id: i64,
        role_id: i64,
    ) -> Self {
        Self { context, change, user_id, role_id }
    }
}

#[async_trait]
impl Task for RoleTask {
    type Output = ();

    fn name(&self) -> &'static str {
        match self.change {
            RoleChange::Assign => "assign_role",
            RoleChange::Revoke => "revoke_role",
        }
    }

    async fn execute(&self) -> Result<()> {
        let token = self.context.application_token()?;
        let config = &self.context.config;
        let request = match self.change {
            RoleChange::Assign => {
                requests::assign_role(config, Some(&token), self.user_id, self.role_id)
            }
            RoleChange::Revoke => {
                requests::revoke_role(config, Some(&token), self.user_id, self.role_id)
            }
        };
        self.context.send(request).await?;
        debug!(user_id = self.user_id, role_id = self.role_id, change = ?self.change, "Role updated");
        Ok(())
    }
}

/// Registers an identifier for whichever user is acting when it runs.
#[derive(Clone)]
pub struct RegisterIdentifierTask {
    context: Arc<IdentityContext>,
    identifier: Identifier,
}

impl RegisterIdentifierTask {
    pub const fn new(context: Arc<IdentityContext>, identifier: Identifier) -> Self {
        Self { context, identifier }
    }
}

#[async_trait]
impl Task for RegisterIdentifierTask {
    type Output = Identifier;

    fn name(&self) -> &'static str {
        "register_identifier"
    }

    async fn execute(&self) -> Result<Identifier> {
        let token = self.context.current_token()?;
        let config = &self.context.config;
        let identifier =
            self.identifier.owned_by(self.context.session.current_user_id(), config.project_id);
        let response =
            self.context.send(requests::register_identifier(config, Some(&token), &identifier)).await?;
        first_data_item(&response.body, "identifier")
    }
}

#[derive(Clone)]
pub struct UnregisterIdentifierTask {
    context: Arc<IdentityContext>,
    identifier_id: i64,
}

impl UnregisterIdentifierTask {
    pub const fn new(context: Arc<IdentityContext>, identifier_id: i64) -> Self {
        Self { context, identifier_id }
    }
}

#[async_trait]
impl Task for UnregisterIdentifierTask {
    type Output = ();

    fn name(&self) -> &'static str {
        "unregister_identifier"
    }

    async fn execute(&self) -> Result<()> {
        let token = self.context.current_token()?;
        let request =
            requests::delete_identifier(&self.context.config, Some(&token), self.identifier_id);
        self.context.send(request).await?;
        Ok(())
    }
}

/// Removes an identifier by value, whoever owns it.
#[derive(Clone)]
pub struct DeleteIdentifierOnBehalfTask {
    context: Arc<IdentityContext>,
    value: String,
    identifier_type: IdentifierType,
}

impl DeleteIdentifierOnBehalfTask {
    pub const fn new(
        context: Arc<IdentityContext>,
        value: String,
        identifier_type: IdentifierType,
    ) -> Self {
        Self { context, value, identifier_type }
    }
}

#[async_trait]
impl Task for DeleteIdentifierOnBehalfTask {
    type Output = ();

    fn name(&self) -> &'static str {
        "delete_identifier_on_behalf"
    }

    async fn execute(&self) -> Result<()> {
        let token = self.context.current_token()?;
        let request = requests::delete_identifier_on_behalf(
            &self.context.config,
            Some(&token),
            &self.value,
            self.identifier_type,
        );
        self.context.send(request).await?;
        Ok(())
    }
}

/// What an installation sync did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallationSync {
    /// First registration of this installation.
    Created(InstallationRecord),
    /// The application version changed and the record was updated.
    Updated(InstallationRecord),
    /// The stored record already matches the running application.
    Current(InstallationRecord),
}

impl InstallationSync {
    #[must_use]
    pub const fn record(&self) -> &InstallationRecord {
        match self {
            Self::Created(record) | Self::Updated(record) | Self::Current(record) => record,
        }
    }
}

/// Registers this installation, or updates it after an application upgrade,
/// and persists the record the service returns.
#[derive(Clone)]
pub struct InstallationTask {
    context: Arc<IdentityContext>,
}

impl InstallationTask {
    pub const fn new(context: Arc<IdentityContext>) -> Self {
        Self { context }
    }

    fn stored_record(&self) -> Option<InstallationRecord> {
        let raw = self.context.store.get(KEY_INSTALLATION_RECORD)?;
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Stored installation record is unreadable; registering anew");
                None
            }
        }
    }
}

#[async_trait]
impl Task for InstallationTask {
    type Output = InstallationSync;

    fn name(&self) -> &'static str {
        "installation_sync"
    }

    #[instrument(skip(self))]
    async fn execute(&self) -> Result<InstallationSync> {
        let context = &self.context;
        let config = &context.config;
        let stored = self.stored_record().filter(|record| record.id.is_some());

        if let Some(record) = &stored {
            if !record.is_outdated(&context.device) {
                debug!("Installation record is current");
                return Ok(InstallationSync::Current(record.clone()));
            }
        }

        let token = context.current_token()?;
        let request = match &stored {
            Some(record) => {
                requests::update_installation(config, Some(&token), &record.updated_for(&context.device))
            }
            None => {
                let record = InstallationRecord::for_device(
                    &context.device,
                    config.project_id,
                    config.application_id,
                    context.session.current_user_id(),
                );
                requests::create_installation(config, Some(&token), &record)
            }
        };

        let response = context.send(request).await?;
        let record: InstallationRecord = first_data_item(&response.body, "installation")?;

        match serde_json::to_string(&record) {
            Ok(raw) => {
                if let Err(e) = context.store.set(KEY_INSTALLATION_RECORD, &raw, true) {
                    warn!(error = %e, "Installation record could not be persisted");
                }
            }
            Err(e) => warn!(error = %e, "Installation record could not be serialized"),
        }

        if stored.is_some() {
            info!(installation_id = ?record.installation_id, "Installation updated");
            Ok(InstallationSync::Updated(record))
        } else {
            info!(installation_id = ?record.installation_id, "Installation created");
            Ok(InstallationSync::Created(record))
        }
    }
}
