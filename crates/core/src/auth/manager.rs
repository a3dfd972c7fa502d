//! Auth session manager
//!
//! Owns the startup algorithm, token checking for each tier, internal user
//! provisioning and the reauthentication entry point used by the retry
//! protocol. Every network call here runs without the retry protocol.

use std::sync::Arc;

use async_trait::async_trait;
use intelligence_common::{random_string, SharedClock};
use intelligence_domain::constants::{
    INTERNAL_PASSWORD_LENGTH, INTERNAL_PASSWORD_PREFIX, INTERNAL_USERNAME_LENGTH,
    INTERNAL_USER_CREATE_ATTEMPTS,
};
use intelligence_domain::{
    AuthenticationToken, Configuration, IdentityError, IntelligenceError, Result, TokenState, User,
};
use tracing::{debug, info, instrument, warn};

use super::classify::classify_auth_failure;
use super::requests;
use super::session::{Session, Tier};
use crate::http::Transport;
use crate::identity::requests as identity_requests;
use crate::scheduler::Reauthenticator;

/// Drives the three identity tiers against the authentication and identity
/// services.
pub struct AuthSessionManager {
    config: Arc<Configuration>,
    transport: Arc<dyn Transport>,
    session: Arc<Session>,
    clock: SharedClock,
}

impl AuthSessionManager {
    pub fn new(
        config: Arc<Configuration>,
        transport: Arc<dyn Transport>,
        session: Arc<Session>,
        clock: SharedClock,
    ) -> Self {
        Self { config, transport, session, clock }
    }

    pub const fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Startup algorithm, run once per SDK session.
    ///
    /// 1. re-acquire the application token
    /// 2. provision an internal user if none is stored
    /// 3. resolve the internal user's token
    /// 4. restore a stored user session, logging out if it cannot be resolved
    ///
    /// # Errors
    /// Application token or internal user failures; a user session that
    /// cannot be restored is cleared instead.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        self.session.set_token(Tier::Application, None);
        self.acquire_application_token().await?;

        let provisioned = if self.session.internal_user().is_none() {
            self.provision_internal_user().await?;
            true
        } else {
            false
        };
        self.resolve_internal_user(!provisioned).await?;

        if self.session.has_user_session() && !self.resolve_user().await {
            info!("Stored user session could not be restored; logging out");
            self.session.clear_user();
        }

        info!("Session started");
        Ok(())
    }

    /// Password grant for a real user followed by a profile fetch.
    ///
    /// # Errors
    /// `Authentication(..)` for rejected credentials, request errors for
    /// transport or status failures, `ParseError` for malformed bodies.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        let response = self
            .transport
            .execute(requests::password_grant(&self.config, username, password))
            .await?;
        if !response.is_success() {
            return Err(classify_auth_failure(&response));
        }
        let token = AuthenticationToken::from_response(&response.body, self.clock.now())?;

        let profile = self
            .transport
            .execute(identity_requests::current_user(&self.config, Some(&token)))
            .await?
            .error_for_status()?;
        let user = User::from_data_response(&profile.body)?.without_password();

        self.session.set_user(Some(user.clone()));
        self.session.set_token(Tier::User, Some(token.with_user_id(user.id)));
        info!(user_id = ?user.id, "User logged in");
        Ok(user)
    }

    /// Clear the real user's identity and token.
    pub fn logout(&self) {
        self.session.clear_user();
        info!("User logged out");
    }

    /// Resolve `token` to a usable token, if possible, without touching the
    /// session.
    ///
    /// Fresh tokens are validated server-side; expired or rejected tokens are
    /// refreshed when they carry a refresh token.
    pub async fn check_token(&self, token: &AuthenticationToken) -> Option<AuthenticationToken> {
        let now = self.clock.now();
        match token.state(now) {
            TokenState::Absent | TokenState::ExpiredTerminal => return None,
            TokenState::Fresh => {
                match self.transport.execute(requests::validate(&self.config, token)).await {
                    Ok(response) if response.is_success() => return Some(token.clone()),
                    Ok(response) => debug!(status = response.status, "Token failed validation"),
                    Err(e) => debug!(error = %e, "Token validation request failed"),
                }
            }
            TokenState::ExpiredRefreshable => {}
        }

        let refresh_token = token.usable_refresh_token()?;
        match self.transport.execute(requests::refresh_grant(&self.config, refresh_token)).await {
            Ok(response) if response.is_success() => {
                match AuthenticationToken::from_response(&response.body, self.clock.now()) {
                    Ok(refreshed) => Some(refreshed.with_user_id(token.user_id)),
                    Err(e) => {
                        warn!(error = %e, "Refreshed token could not be parsed");
                        None
                    }
                }
            }
            Ok(response) => {
                debug!(status = response.status, "Token refresh rejected");
                None
            }
            Err(e) => {
                debug!(error = %e, "Token refresh request failed");
                None
            }
        }
    }

    async fn acquire_application_token(&self) -> Result<()> {
        let response = self.transport.execute(requests::client_credentials(&self.config)).await?;
        if !response.is_success() {
            return Err(classify_auth_failure(&response));
        }
        let token = AuthenticationToken::from_response(&response.body, self.clock.now())?;
        self.session.set_token(Tier::Application, Some(token));
        debug!("Application token acquired");
        Ok(())
    }

    /// Create a random internal user, retrying the creation, then grant it
    /// the SDK role. The new identity replaces the stored one.
    #[instrument(skip(self))]
    async fn provision_internal_user(&self) -> Result<User> {
        let application_token = self.session.token(Tier::Application);
        let mut created = None;

        for attempt in 1..=INTERNAL_USER_CREATE_ATTEMPTS {
            let candidate = User::internal(
                self.config.company_id,
                random_string(INTERNAL_USERNAME_LENGTH),
                &random_string(INTERNAL_PASSWORD_LENGTH - INTERNAL_PASSWORD_PREFIX.len()),
            );
            match self.create_user(application_token.as_ref(), &candidate).await {
                Ok(mut user) => {
                    user.password = candidate.password;
                    created = Some(user);
                    break;
                }
                Err(e) => warn!(attempt, error = %e, "Internal user creation failed"),
            }
        }

        let user = created.ok_or_else(|| {
            IdentityError::InvalidUser("could not create the SDK user account".to_string())
        })?;
        let user_id = user
            .id
            .ok_or_else(|| IdentityError::InvalidUser("created user has no id".to_string()))?;

        let response = self
            .transport
            .execute(identity_requests::assign_role(
                &self.config,
                application_token.as_ref(),
                user_id,
                self.config.sdk_user_role,
            ))
            .await?;
        if !response.is_success() {
            warn!(status = response.status, "Role assignment failed");
            return Err(IdentityError::InvalidUser(
                "could not assign a role to the SDK user account".to_string(),
            )
            .into());
        }

        self.session.set_internal_user(Some(user.clone()));
        self.session.set_token(Tier::InternalUser, None);
        info!(user_id, "Internal user provisioned");
        Ok(user)
    }

    async fn create_user(
        &self,
        application_token: Option<&AuthenticationToken>,
        candidate: &User,
    ) -> Result<User> {
        let response = self
            .transport
            .execute(identity_requests::create_user(&self.config, application_token, candidate))
            .await?
            .error_for_status()?;
        User::from_data_response(&response.body)
    }

    /// Ensure the internal user holds a usable token.
    ///
    /// Falls back to the password grant, and when that fails with an
    /// authentication-class error, to a single re-provisioning if
    /// `allow_reprovision` is set.
    async fn resolve_internal_user(&self, allow_reprovision: bool) -> Result<()> {
        if let Some(token) = self.session.token(Tier::InternalUser) {
            if let Some(valid) = self.check_token(&token).await {
                self.session.set_token(Tier::InternalUser, Some(valid));
                return Ok(());
            }
        }

        match self.authenticate_internal_user().await {
            Ok(()) => Ok(()),
            Err(e) if allow_reprovision && e.is_authentication_class() => {
                warn!(error = %e, "Internal user rejected; provisioning a replacement");
                self.session.clear_internal_user();
                self.provision_internal_user().await?;
                self.authenticate_internal_user().await
            }
            Err(e) => Err(e),
        }
    }

    async fn authenticate_internal_user(&self) -> Result<()> {
        let user = self.session.internal_user().ok_or_else(|| {
            IntelligenceError::from(IdentityError::InvalidUser("no SDK user account".to_string()))
        })?;
        let password = user.password.as_deref().ok_or_else(|| {
            IntelligenceError::from(IdentityError::InvalidUser(
                "SDK user account has no stored password".to_string(),
            ))
        })?;

        let response = self
            .transport
            .execute(requests::password_grant(&self.config, &user.username, password))
            .await?;
        if !response.is_success() {
            return Err(classify_auth_failure(&response));
        }
        let token = AuthenticationToken::from_response(&response.body, self.clock.now())?;
        self.session.set_token(Tier::InternalUser, Some(token.with_user_id(user.id)));
        debug!("Internal user token acquired");
        Ok(())
    }

    /// Check the stored user token; `false` when it cannot be resolved.
    async fn resolve_user(&self) -> bool {
        let Some(token) = self.session.token(Tier::User) else {
            return false;
        };
        match self.check_token(&token).await {
            Some(valid) => {
                self.session.set_token(Tier::User, Some(valid));
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl Reauthenticator for AuthSessionManager {
    #[instrument(skip(self))]
    async fn reauthenticate(&self) -> bool {
        let now = self.clock.now();
        let application_stale = self
            .session
            .token(Tier::Application)
            .map_or(true, |token| token.requires_authentication(now));
        if application_stale {
            if let Err(e) = self.acquire_application_token().await {
                warn!(error = %e, "Application token could not be re-acquired");
                return false;
            }
        }

        let internal = if self.session.internal_user().is_none() {
            match self.provision_internal_user().await {
                Ok(_) => self.resolve_internal_user(false).await,
                Err(e) => Err(e),
            }
        } else {
            self.resolve_internal_user(true).await
        };
        if let Err(e) = internal {
            warn!(error = %e, "Internal user could not be reauthenticated");
            return false;
        }

        if self.session.has_user_session() && !self.resolve_user().await {
            info!("User session expired; logging out");
            self.session.clear_user();
            return false;
        }

        true
    }
}
