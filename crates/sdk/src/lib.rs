//! Intelligence SDK
//!
//! Host-facing entry point. [`Intelligence`] wires the session, the auth
//! session manager, the serial task scheduler, the analytics queue and the
//! identity and location services over the collaborators supplied by the
//! host (transport, durable store, connectivity, device facts, clock), and
//! reacts to connectivity changes.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use intelligence_domain::{AnalyticsEvent, DeviceInfo};
//! use intelligence_infra::NetworkMonitor;
//! use intelligence_sdk::{Collaborators, Intelligence};
//!
//! # async fn run() -> intelligence_domain::Result<()> {
//! let config = intelligence_infra::config::load()?;
//! let monitor = Arc::new(NetworkMonitor::new(true));
//! let collaborators =
//!     Collaborators::standard(&config, "intelligence.json", DeviceInfo::default(), monitor)?;
//!
//! let sdk = Intelligence::new(config, collaborators).await?;
//! sdk.start().await?;
//! sdk.track_event(AnalyticsEvent::new("Purchase").with_value("9.99"))?;
//! sdk.shutdown().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod context;
mod watcher;

pub use context::{Collaborators, Intelligence};
pub use intelligence_domain::{
    AnalyticsEvent, Configuration, DeviceInfo, Geofence, GeofenceQuery, Geolocation, Identifier,
    IdentifierType, InstallationRecord, IntelligenceError, Result, User,
};
