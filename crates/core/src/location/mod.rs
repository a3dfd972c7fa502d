//! Location: project geofences and their offline cache

pub mod service;
pub mod tasks;

pub use service::Location;
pub use tasks::{FetchGeofencesTask, LocationContext};
