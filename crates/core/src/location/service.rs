//! Location service: geofence lookups and the persisted geofence cache

use std::sync::Arc;

use intelligence_domain::constants::KEY_GEOFENCE_CACHE;
use intelligence_domain::{Geofence, GeofenceQuery, RequestError, Result};
use tracing::warn;

use super::tasks::{FetchGeofencesTask, LocationContext};
use crate::scheduler::TaskScheduler;

pub struct Location {
    context: Arc<LocationContext>,
    scheduler: Arc<TaskScheduler>,
}

impl Location {
    pub fn new(context: LocationContext, scheduler: Arc<TaskScheduler>) -> Self {
        Self { context: Arc::new(context), scheduler }
    }

    /// Geofences matching `query`, fetched without touching the cache.
    ///
    /// # Errors
    /// `Offline`, or the request's failure.
    pub async fn geofences(&self, query: GeofenceQuery) -> Result<Vec<Geofence>> {
        self.fetch(query, false).await
    }

    /// Fetch geofences matching `query` and replace the cache with them.
    ///
    /// # Errors
    /// `Offline`, or the request's failure. The cache is left untouched
    /// when the fetch fails.
    pub async fn refresh_cached_geofences(&self, query: GeofenceQuery) -> Result<Vec<Geofence>> {
        self.fetch(query, true).await
    }

    async fn fetch(&self, query: GeofenceQuery, cache: bool) -> Result<Vec<Geofence>> {
        if !self.scheduler.has_connection() {
            return Err(RequestError::Offline.into());
        }
        let task = FetchGeofencesTask::new(Arc::clone(&self.context), query, cache);
        self.scheduler.submit(task).await
    }

    /// Geofences from the last cache refresh, ordered by id. Unreadable
    /// entries are skipped.
    pub fn cached_geofences(&self) -> Vec<Geofence> {
        let Some(entries) = self.context.store.get_string_set(KEY_GEOFENCE_CACHE) else {
            return Vec::new();
        };
        let mut geofences: Vec<Geofence> = entries
            .iter()
            .filter_map(|entry| match serde_json::from_str(entry) {
                Ok(geofence) => Some(geofence),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable cached geofence");
                    None
                }
            })
            .collect();
        geofences.sort_by_key(|geofence| geofence.id);
        geofences
    }
}
