//! # Intelligence Core
//!
//! Session, scheduling and analytics logic - no infrastructure dependencies.
//!
//! This crate contains:
//! - The serial task scheduler and its 401 retry protocol
//! - The three-tier auth session manager
//! - The persistent analytics queue and batched flush
//! - Identity operations, installation sync and the geofence cache
//! - Port interfaces (traits) for HTTP, durable storage and connectivity
//!
//! ## Architecture Principles
//! - Only depends on `intelligence-common` and `intelligence-domain`
//! - No HTTP client, filesystem or platform code
//! - All external dependencies via traits

pub mod analytics;
pub mod auth;
pub mod connectivity;
pub mod http;
pub mod identity;
pub mod location;
pub mod scheduler;
pub mod storage;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export specific items to avoid ambiguity
pub use analytics::{Analytics, AnalyticsContext, EventQueue, FlushReport, FlushTask};
pub use auth::{AuthSessionManager, LoginTask, Session, StartupTask, Tier};
pub use connectivity::Connectivity;
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
pub use identity::{Identity, IdentityContext, InstallationSync, InstallationTask};
pub use location::{FetchGeofencesTask, Location, LocationContext};
pub use scheduler::{
    Reauthenticator, SchedulerConfig, SchedulerError, Task, TaskHandle, TaskScheduler,
};
pub use storage::{DurableStore, MemoryStore, StoreError};
