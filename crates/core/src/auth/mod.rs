//! Authentication: session tiers, the auth session manager and its tasks

pub mod classify;
pub mod manager;
pub mod requests;
pub mod session;
pub mod tasks;

pub use classify::classify_auth_failure;
pub use manager::AuthSessionManager;
pub use session::{Session, Tier};
pub use tasks::{LoginTask, StartupTask};
