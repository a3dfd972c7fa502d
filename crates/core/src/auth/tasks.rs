//! Scheduler tasks for the interactive auth operations

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use intelligence_domain::{Result, User};

use super::manager::AuthSessionManager;
use crate::scheduler::Task;

/// Runs the startup algorithm. Never goes through the retry protocol.
#[derive(Clone)]
pub struct StartupTask {
    auth: Arc<AuthSessionManager>,
}

impl StartupTask {
    pub const fn new(auth: Arc<AuthSessionManager>) -> Self {
        Self { auth }
    }
}

#[async_trait]
impl Task for StartupTask {
    type Output = ();

    fn name(&self) -> &'static str {
        "startup"
    }

    fn auto_refresh(&self) -> bool {
        false
    }

    async fn execute(&self) -> Result<()> {
        self.auth.start().await
    }
}

/// Logs a real user in with a password grant.
#[derive(Clone)]
pub struct LoginTask {
    auth: Arc<AuthSessionManager>,
    username: String,
    password: String,
}

impl LoginTask {
    pub const fn new(auth: Arc<AuthSessionManager>, username: String, password: String) -> Self {
        Self { auth, username, password }
    }
}

impl fmt::Debug for LoginTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginTask").field("username", &self.username).finish_non_exhaustive()
    }
}

#[async_trait]
impl Task for LoginTask {
    type Output = User;

    fn name(&self) -> &'static str {
        "login"
    }

    fn auto_refresh(&self) -> bool {
        false
    }

    async fn execute(&self) -> Result<User> {
        self.auth.login(&self.username, &self.password).await
    }
}
