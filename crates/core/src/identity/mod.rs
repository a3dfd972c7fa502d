//! Identity: users, roles, identifiers and the installation record

pub mod requests;
pub mod service;
pub mod tasks;

pub use service::Identity;
pub use tasks::{IdentityContext, InstallationSync, InstallationTask};
