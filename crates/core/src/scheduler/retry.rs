//! Authenticated-task retry protocol
//!
//! A task that fails with `Unauthorized` and has `auto_refresh` set gets one
//! reauthentication attempt followed by exactly one replay of a freshly built
//! task. The replay's outcome is final.

use async_trait::async_trait;
use intelligence_domain::{IntelligenceError, RequestError, Result};
use tracing::{debug, info, warn};

use super::task::Task;

/// Restores a usable session after the server rejected the current token.
#[async_trait]
pub trait Reauthenticator: Send + Sync {
    /// Returns `true` when a valid token is in place again.
    async fn reauthenticate(&self) -> bool;
}

/// Run one task built by `factory` under the retry protocol.
///
/// # Errors
/// The task's own error, or `Unauthorized` when reauthentication fails.
pub async fn run_authenticated<T, F>(
    factory: &F,
    reauthenticator: &dyn Reauthenticator,
) -> Result<T::Output>
where
    T: Task,
    F: Fn() -> T + Sync,
{
    let task = factory();
    let name = task.name();
    debug!(task = name, "Executing task");

    match task.execute().await {
        Err(IntelligenceError::Request(RequestError::Unauthorized)) if task.auto_refresh() => {
            info!(task = name, "Request unauthorized, reauthenticating");
            if !reauthenticator.reauthenticate().await {
                warn!(task = name, "Reauthentication failed");
                return Err(RequestError::Unauthorized.into());
            }

            debug!(task = name, "Replaying task after reauthentication");
            factory().execute().await
        }
        outcome => outcome,
    }
}
