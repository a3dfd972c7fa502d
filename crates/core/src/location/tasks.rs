//! Geofence fetch against the location service

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use intelligence_domain::constants::KEY_GEOFENCE_CACHE;
use intelligence_domain::{
    data_items, AuthenticationToken, Configuration, Geofence, GeofenceQuery, Module, RequestError,
    Result,
};
use tracing::{debug, instrument, warn};

use crate::auth::Session;
use crate::http::{HttpRequest, Transport};
use crate::scheduler::Task;
use crate::storage::DurableStore;

/// Collaborators shared by the location tasks.
pub struct LocationContext {
    pub config: Arc<Configuration>,
    pub session: Arc<Session>,
    pub store: Arc<dyn DurableStore>,
    pub transport: Arc<dyn Transport>,
}

/// One page of the project's geofences. The search centre is only sent
/// when the query has one; the radius goes out in whole metres.
pub fn geofences_request(
    config: &Configuration,
    token: &AuthenticationToken,
    query: &GeofenceQuery,
) -> HttpRequest {
    let url = config.endpoint(Module::Location, &format!("projects/{}/geofences", config.project_id));
    let mut request = HttpRequest::get(url).bearer(token.bearer());
    if let Some(location) = query.location {
        request = request
            .query("longitude", location.longitude.to_string())
            .query("latitude", location.latitude.to_string());
    }
    #[allow(clippy::cast_possible_truncation)]
    let radius = query.radius as i64;
    request
        .query("radius", radius.to_string())
        .query("pagesize", query.page_size.to_string())
        .query("pagenumber", query.page_number.to_string())
}

/// Fetches geofences, optionally replacing the persisted cache with them.
#[derive(Clone)]
pub struct FetchGeofencesTask {
    context: Arc<LocationContext>,
    query: GeofenceQuery,
    cache: bool,
}

impl FetchGeofencesTask {
    pub const fn new(context: Arc<LocationContext>, query: GeofenceQuery, cache: bool) -> Self {
        Self { context, query, cache }
    }

    fn write_cache(&self, geofences: &[Geofence]) {
        let mut entries = BTreeSet::new();
        for geofence in geofences {
            match serde_json::to_string(geofence) {
                Ok(entry) => {
                    entries.insert(entry);
                }
                Err(e) => warn!(geofence_id = ?geofence.id, error = %e, "Geofence not cached"),
            }
        }
        match self.context.store.set_string_set(KEY_GEOFENCE_CACHE, &entries, true) {
            Ok(()) => debug!(cached = entries.len(), "Geofence cache replaced"),
            Err(e) => warn!(error = %e, "Geofence cache could not be written"),
        }
    }
}

#[async_trait]
impl Task for FetchGeofencesTask {
    type Output = Vec<Geofence>;

    fn name(&self) -> &'static str {
        "fetch_geofences"
    }

    #[instrument(skip(self), fields(cache = self.cache))]
    async fn execute(&self) -> Result<Vec<Geofence>> {
        let token = self.context.session.current_token().ok_or(RequestError::Unauthorized)?;
        let request = geofences_request(&self.context.config, &token, &self.query);
        let response = self.context.transport.execute(request).await?.error_for_status()?;
        let geofences: Vec<Geofence> = data_items(&response.body)?;
        debug!(count = geofences.len(), "Geofences fetched");

        if self.cache {
            self.write_cache(&geofences);
        }
        Ok(geofences)
    }
}
