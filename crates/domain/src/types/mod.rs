//! Domain types and models

pub mod device;
pub mod envelope;
pub mod event;
pub mod geofence;
pub mod identifier;
mod lenient;
pub mod token;
pub mod user;

pub use device::{DeviceInfo, DeviceType, InstallationRecord};
pub use envelope::{data_items, first_data_item};
pub use event::{AnalyticsEvent, EventContext, Geolocation, QueuedEvent};
pub use geofence::{Geofence, GeofenceQuery};
pub use identifier::{Identifier, IdentifierType};
pub use token::{AuthenticationToken, TokenState};
pub use user::User;
