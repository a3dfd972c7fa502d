//! # Intelligence Domain
//!
//! Business domain types for the Intelligence SDK.
//!
//! This crate contains:
//! - Error taxonomy with stable numeric codes
//! - Configuration (regions, environments, module endpoints)
//! - Tokens, users, identifiers, installations, geofences and analytics events
//! - Protocol constants and storage keys
//!
//! ## Architecture
//! - No dependencies on other Intelligence crates
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
