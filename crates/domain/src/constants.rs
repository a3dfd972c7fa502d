//! SDK constants
//!
//! Centralized location for protocol constants, storage keys and event names.

use std::time::Duration;

// Transport timeouts
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
pub const READ_TIMEOUT: Duration = Duration::from_secs(20);

// Analytics queue
pub const ANALYTICS_BATCH_SIZE: usize = 100;
pub const ANALYTICS_MAX_EVENT_AGE_HOURS: i64 = 24;
pub const ANALYTICS_EVENT_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";
pub const ANALYTICS_INVALID_REQUEST: &str = "invalid_request";
pub const DEFAULT_EVENT_VALUE: &str = "0";

// Internal user provisioning
pub const INTERNAL_USER_CREATE_ATTEMPTS: usize = 5;
pub const INTERNAL_USERNAME_LENGTH: usize = 32;
pub const INTERNAL_PASSWORD_PREFIX: &str = "Aa1";
pub const INTERNAL_PASSWORD_LENGTH: usize = 32;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const IDENTITY_PROVIDER_ID: u32 = 300;

// Location service
pub const GEOFENCE_DEFAULT_RADIUS: f64 = 10_000.0;
pub const GEOFENCE_PAGE_SIZE: u32 = 50;

// Durable storage keys
pub const KEY_APPLICATION_TOKEN: &str = "ApplicationToken";
pub const KEY_INTERNAL_USER_TOKEN: &str = "InternalUserToken";
pub const KEY_USER_TOKEN: &str = "UserToken";
pub const KEY_INTERNAL_USER_IDENTITY: &str = "InternalUserIdentity";
pub const KEY_USER_IDENTITY: &str = "UserIdentity";
pub const KEY_INSTALLATION_RECORD: &str = "InstallationRecord";
pub const KEY_EVENT_QUEUE_SNAPSHOT: &str = "EventQueueSnapshot";
pub const KEY_GEOFENCE_CACHE: &str = "GeofenceCache";

// Standard analytics events
pub const EVENT_APPLICATION_OPENED: &str = "Phoenix.Identity.Application.Opened";
pub const EVENT_SCREEN_VIEWED: &str = "Phoenix.Identity.Application.ScreenViewed";
pub const EVENT_USER_CREATED: &str = "Phoenix.Identity.User.Created";
pub const EVENT_GEOFENCE_ENTERED: &str = "Phoenix.Location.Geofence.Entered";
pub const EVENT_GEOFENCE_EXITED: &str = "Phoenix.Location.Geofence.Exit";

// Auth failure strings returned by the token endpoint
pub const AUTH_FAILED: &str = "Authentication failed.";
pub const AUTH_CREDENTIALS_INCORRECT: &str = "Credentials incorrect.";
pub const AUTH_ACCOUNT_DISABLED: &str = "Account disabled.";
pub const AUTH_ACCOUNT_LOCKED: &str = "Account locked.";
pub const AUTH_INVALID_TOKEN: &str = "Invalid token.";
pub const AUTH_TOKEN_INVALID_OR_EXPIRED: &str = "Token invalid or expired.";
