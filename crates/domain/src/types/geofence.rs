//! Geofences defined for a project and the query used to fetch them

use serde::{Deserialize, Serialize};

use super::event::Geolocation;
use super::lenient::lenient_id;
use crate::constants::{GEOFENCE_DEFAULT_RADIUS, GEOFENCE_PAGE_SIZE};

/// A circular region around a point, as returned by the location service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Geofence {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id")]
    pub project_id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    /// Metres.
    #[serde(default)]
    pub radius: Option<f64>,
    pub geolocation: Geolocation,
    #[serde(default)]
    pub tags: Option<String>,
}

/// Paging and area filter for a geofence fetch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeofenceQuery {
    /// Centre of the search; the whole project when absent.
    pub location: Option<Geolocation>,
    /// Metres; sent truncated to whole metres.
    pub radius: f64,
    pub page_size: u32,
    pub page_number: u32,
}

impl Default for GeofenceQuery {
    fn default() -> Self {
        Self {
            location: None,
            radius: GEOFENCE_DEFAULT_RADIUS,
            page_size: GEOFENCE_PAGE_SIZE,
            page_number: 0,
        }
    }
}

impl GeofenceQuery {
    /// First page of geofences around `location`, with the default radius.
    #[must_use]
    pub fn around(location: Option<Geolocation>) -> Self {
        Self { location, ..Self::default() }
    }
}
