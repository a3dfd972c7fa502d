//! Identity service: parameter checks and task submission

use std::sync::Arc;

use intelligence_domain::constants::KEY_INSTALLATION_RECORD;
use intelligence_domain::{
    Identifier, IdentifierType, IdentityError, InstallationRecord, IntelligenceError,
    RequestError, Result, User,
};
use tracing::{debug, instrument};

use super::tasks::{
    CreateUserTask, DeleteIdentifierOnBehalfTask, GetMeTask, GetUserByIdTask, IdentityContext,
    InstallationSync, InstallationTask, RegisterIdentifierTask, RoleChange, RoleTask,
    UnregisterIdentifierTask, UpdateUserTask,
};
use crate::scheduler::{TaskHandle, TaskScheduler};

/// Users, roles, identifiers and the installation record.
///
/// Interactive operations fail fast with `Offline` when there is no
/// connection, then validate their parameters before anything is queued.
pub struct Identity {
    context: Arc<IdentityContext>,
    scheduler: Arc<TaskScheduler>,
}

impl Identity {
    pub fn new(context: IdentityContext, scheduler: Arc<TaskScheduler>) -> Self {
        Self { context: Arc::new(context), scheduler }
    }

    fn ensure_online(&self) -> Result<()> {
        if self.scheduler.has_connection() {
            Ok(())
        } else {
            Err(RequestError::Offline.into())
        }
    }

    fn context(&self) -> Arc<IdentityContext> {
        Arc::clone(&self.context)
    }

    /// Profile of the acting identity: the logged-in user, else the SDK's
    /// internal user.
    ///
    /// # Errors
    /// `Offline`, or the request's failure.
    pub async fn get_me(&self) -> Result<User> {
        self.ensure_online()?;
        self.scheduler.submit(GetMeTask::new(self.context())).await
    }

    /// # Errors
    /// `Offline`, `InvalidParameter` for a non-positive id, or the request's
    /// failure.
    pub async fn get_user_by_id(&self, user_id: i64) -> Result<User> {
        self.ensure_online()?;
        positive("user_id", user_id)?;
        self.scheduler.submit(GetUserByIdTask::new(self.context(), user_id)).await
    }

    /// Create `user` in the configured company. The returned user carries
    /// the assigned id and no password.
    ///
    /// # Errors
    /// `Offline`, `MissingParameter` for an incomplete user,
    /// `Identity(WeakPassword)`, or the request's failure.
    #[instrument(skip(self, user), fields(username = %user.username))]
    pub async fn create_user(&self, user: User) -> Result<User> {
        self.ensure_online()?;
        user.validate_for_create()?;
        if let Some(password) = user.password.as_deref() {
            if !User::is_password_valid(password) {
                return Err(IdentityError::WeakPassword.into());
            }
        }
        self.scheduler.submit(CreateUserTask::new(self.context(), user)).await
    }

    /// # Errors
    /// `Offline`, `MissingParameter` for an incomplete user, or the
    /// request's failure.
    pub async fn update_user(&self, user: User) -> Result<User> {
        self.ensure_online()?;
        user.validate_for_update()?;
        self.scheduler.submit(UpdateUserTask::new(self.context(), user)).await
    }

    /// # Errors
    /// `Offline`, `InvalidParameter` for a non-positive id, or the request's
    /// failure.
    pub async fn assign_role(&self, user_id: i64, role_id: i64) -> Result<()> {
        self.change_role(RoleChange::Assign, user_id, role_id).await
    }

    /// # Errors
    /// `Offline`, `InvalidParameter` for a non-positive id, or the request's
    /// failure.
    pub async fn revoke_role(&self, user_id: i64, role_id: i64) -> Result<()> {
        self.change_role(RoleChange::Revoke, user_id, role_id).await
    }

    async fn change_role(&self, change: RoleChange, user_id: i64, role_id: i64) -> Result<()> {
        self.ensure_online()?;
        positive("user_id", user_id)?;
        positive("role_id", role_id)?;
        self.scheduler.submit(RoleTask::new(self.context(), change, user_id, role_id)).await
    }

    /// Register `identifier` for the acting user.
    ///
    /// Any existing registration of the same value is removed first, so a
    /// push token moves to this user instead of being rejected as a
    /// duplicate. That removal's failure is not reported.
    ///
    /// # Errors
    /// `Offline`, `MissingParameter` without a value or type, or the
    /// registration's failure.
    #[instrument(skip(self, identifier))]
    pub async fn register_identifier(&self, identifier: Identifier) -> Result<Identifier> {
        self.ensure_online()?;
        let (value, identifier_type) = registration_key(&identifier)?;
        let previous = DeleteIdentifierOnBehalfTask::new(self.context(), value, identifier_type);
        if let Err(e) = self.scheduler.submit(previous).await {
            debug!(error = %e, "No previous registration removed");
        }

        self.scheduler.submit(RegisterIdentifierTask::new(self.context(), identifier)).await
    }

    /// Register a push notification token for the acting user.
    ///
    /// # Errors
    /// As [`register_identifier`](Self::register_identifier).
    pub async fn register_push_token(&self, token: &str) -> Result<Identifier> {
        let identifier = Identifier::push_token(self.context.config.application_id, token);
        self.register_identifier(identifier).await
    }

    /// # Errors
    /// `Offline`, `MissingParameter` without an id, or the request's
    /// failure.
    pub async fn unregister_identifier(&self, identifier: &Identifier) -> Result<()> {
        self.ensure_online()?;
        let identifier_id = identifier
            .id
            .ok_or_else(|| IntelligenceError::MissingParameter("id".to_string()))?;
        self.scheduler.submit(UnregisterIdentifierTask::new(self.context(), identifier_id)).await
    }

    /// Remove the registration holding `identifier`'s value, whoever owns it.
    ///
    /// # Errors
    /// `Offline`, `MissingParameter` without a value or type, or the
    /// request's failure.
    pub async fn delete_identifier_on_behalf(&self, identifier: &Identifier) -> Result<()> {
        self.ensure_online()?;
        let (value, identifier_type) = registration_key(identifier)?;
        let task = DeleteIdentifierOnBehalfTask::new(self.context(), value, identifier_type);
        self.scheduler.submit(task).await
    }

    /// Queue an installation sync. Waits for connectivity like any task.
    pub fn sync_installation(&self) -> TaskHandle<InstallationSync> {
        self.scheduler.submit(InstallationTask::new(self.context()))
    }

    /// The persisted installation record, if one was stored and is readable.
    pub fn installation(&self) -> Option<InstallationRecord> {
        self.context
            .store
            .get(KEY_INSTALLATION_RECORD)
            .and_then(|raw| serde_json::from_str(&raw).ok())
    }
}

fn registration_key(identifier: &Identifier) -> Result<(String, IdentifierType)> {
    let value = identifier
        .value
        .clone()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| IntelligenceError::MissingParameter("value".to_string()))?;
    let identifier_type = identifier
        .identifier_type
        .ok_or_else(|| IntelligenceError::MissingParameter("identifier_type".to_string()))?;
    Ok((value, identifier_type))
}

fn positive(name: &str, value: i64) -> Result<()> {
    if value > 0 {
        Ok(())
    } else {
        Err(IntelligenceError::InvalidParameter(name.to_string()))
    }
}
