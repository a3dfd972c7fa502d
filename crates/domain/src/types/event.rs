//! Analytics events and the enrichment context applied when they are queued

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::{
    ANALYTICS_EVENT_DATE_FORMAT, ANALYTICS_MAX_EVENT_AGE_HOURS, DEFAULT_EVENT_VALUE,
    EVENT_APPLICATION_OPENED, EVENT_GEOFENCE_ENTERED, EVENT_GEOFENCE_EXITED, EVENT_SCREEN_VIEWED,
    EVENT_USER_CREATED,
};

/// A geographic position attached to events.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Geolocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// An event as described by the host application.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsEvent {
    pub event_type: String,
    pub value: String,
    pub target_id: Option<String>,
    pub metadata: Option<BTreeMap<String, String>>,
    pub ip_address: Option<String>,
}

impl AnalyticsEvent {
    /// An event with the default value `"0"`.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            value: DEFAULT_EVENT_VALUE.to_string(),
            target_id: None,
            metadata: None,
            ip_address: None,
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    #[must_use]
    pub fn with_target(mut self, target_id: impl Into<String>) -> Self {
        self.target_id = Some(target_id.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    /// Tracked once after every successful startup.
    #[must_use]
    pub fn application_opened(application_id: i64) -> Self {
        Self::new(EVENT_APPLICATION_OPENED).with_target(application_id.to_string())
    }

    /// Time spent on a screen, in seconds.
    #[must_use]
    pub fn screen_viewed(screen_name: &str, seconds: f64) -> Self {
        Self::new(EVENT_SCREEN_VIEWED).with_value(seconds.to_string()).with_target(screen_name)
    }

    /// A user account was created through the SDK.
    #[must_use]
    pub fn user_created(user_id: i64) -> Self {
        Self::new(EVENT_USER_CREATED).with_target(user_id.to_string())
    }

    /// The device entered geofence `geofence_id`.
    #[must_use]
    pub fn geofence_entered(geofence_id: i64) -> Self {
        Self::geofence_transition(EVENT_GEOFENCE_ENTERED, geofence_id)
    }

    /// The device left geofence `geofence_id`.
    #[must_use]
    pub fn geofence_exited(geofence_id: i64) -> Self {
        Self::geofence_transition(EVENT_GEOFENCE_EXITED, geofence_id)
    }

    // The value carries the id in decimal form, e.g. "5.0".
    #[allow(clippy::cast_precision_loss)]
    fn geofence_transition(event_type: &str, geofence_id: i64) -> Self {
        Self::new(event_type)
            .with_value(format!("{:.1}", geofence_id as f64))
            .with_target(geofence_id.to_string())
    }
}

/// Values stamped onto every event when it is queued.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventContext {
    pub project_id: i64,
    pub application_id: i64,
    pub user_id: Option<i64>,
    pub installation_id: Option<String>,
    pub application_version: Option<String>,
    pub device_type: Option<String>,
    pub operating_system_version: Option<String>,
    pub location: Option<Geolocation>,
}

/// An enriched event as stored in the queue snapshot and sent on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct QueuedEvent {
    pub event_date: String,
    pub project_id: i64,
    pub event_type: String,
    pub event_value: String,
    #[serde(default)]
    pub target_id: Option<String>,
    #[serde(rename = "PhoenixIdentity_UserId", default)]
    pub user_id: Option<i64>,
    #[serde(rename = "PhoenixIdentity_ApplicationId")]
    pub application_id: i64,
    #[serde(rename = "PhoenixIdentity_InstallationId", default)]
    pub installation_id: Option<String>,
    #[serde(default)]
    pub application_version: Option<String>,
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub operating_system_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geolocation: Option<Geolocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_data: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub ip_address: Option<String>,
}

impl QueuedEvent {
    /// Stamp `event` with its creation time and the enrichment context.
    #[must_use]
    pub fn enrich(event: AnalyticsEvent, context: &EventContext, now: DateTime<Utc>) -> Self {
        Self {
            event_date: now.format(ANALYTICS_EVENT_DATE_FORMAT).to_string(),
            project_id: context.project_id,
            event_type: event.event_type,
            event_value: event.value,
            target_id: event.target_id,
            user_id: context.user_id,
            application_id: context.application_id,
            installation_id: context.installation_id.clone(),
            application_version: context.application_version.clone(),
            device_type: context.device_type.clone(),
            operating_system_version: context.operating_system_version.clone(),
            geolocation: context.location,
            meta_data: event.metadata,
            ip_address: event.ip_address,
        }
    }

    /// Creation instant, or `None` if the stored date is unreadable.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(&self.event_date, ANALYTICS_EVENT_DATE_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Older than the retention window, or undatable.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.created_at()
            .map_or(true, |created| now - created > Duration::hours(ANALYTICS_MAX_EVENT_AGE_HOURS))
    }
}
