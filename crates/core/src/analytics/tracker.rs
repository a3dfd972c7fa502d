//! Analytics service: event intake and flush scheduling

use std::sync::Arc;

use intelligence_common::SharedClock;
use intelligence_domain::constants::KEY_INSTALLATION_RECORD;
use intelligence_domain::{
    AnalyticsEvent, Configuration, DeviceInfo, EventContext, Geolocation, InstallationRecord,
    IntelligenceError, QueuedEvent, Result,
};
use parking_lot::RwLock;
use tracing::{debug, instrument};

use super::flush::{FlushReport, FlushTask};
use super::queue::EventQueue;
use crate::auth::Session;
use crate::http::Transport;
use crate::scheduler::{TaskHandle, TaskScheduler};
use crate::storage::DurableStore;

/// Collaborators shared by the analytics service.
pub struct AnalyticsContext {
    pub config: Arc<Configuration>,
    pub device: DeviceInfo,
    pub session: Arc<Session>,
    pub store: Arc<dyn DurableStore>,
    pub transport: Arc<dyn Transport>,
    pub clock: SharedClock,
}

/// Accepts events from the host, enriches and persists them, and keeps at
/// most one flush waiting on the scheduler.
pub struct Analytics {
    context: AnalyticsContext,
    scheduler: Arc<TaskScheduler>,
    queue: Arc<EventQueue>,
    location: RwLock<Option<Geolocation>>,
}

impl Analytics {
    /// Build the service, reloading any events persisted by a previous run.
    pub fn new(context: AnalyticsContext, scheduler: Arc<TaskScheduler>) -> Self {
        let queue = Arc::new(EventQueue::load(Arc::clone(&context.store)));
        Self { context, scheduler, queue, location: RwLock::new(None) }
    }

    pub const fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    /// Enrich, persist and queue `event`, then request a flush.
    ///
    /// Accepted while offline; delivery waits for connectivity.
    ///
    /// # Errors
    /// `MissingParameter` when the event type is blank.
    #[instrument(skip(self, event), fields(event_type = %event.event_type))]
    pub fn track_event(&self, event: AnalyticsEvent) -> Result<()> {
        if event.event_type.trim().is_empty() {
            return Err(IntelligenceError::MissingParameter("event_type".to_string()));
        }

        let queued = QueuedEvent::enrich(event, &self.event_context(), self.context.clock.now());
        self.queue.push(queued);
        debug!(queued = self.queue.len(), "Event queued");

        self.request_flush();
        Ok(())
    }

    /// Track time spent on `screen_name`.
    ///
    /// # Errors
    /// `MissingParameter` when the screen name is blank.
    pub fn track_screen_viewed(&self, screen_name: &str, seconds: f64) -> Result<()> {
        if screen_name.trim().is_empty() {
            return Err(IntelligenceError::MissingParameter("screen_name".to_string()));
        }
        self.track_event(AnalyticsEvent::screen_viewed(screen_name, seconds))
    }

    /// Location stamped on subsequently tracked events.
    pub fn set_last_known_location(&self, location: Option<Geolocation>) {
        *self.location.write() = location;
    }

    pub fn last_known_location(&self) -> Option<Geolocation> {
        *self.location.read()
    }

    /// Submit a flush unless one is already waiting or the device is offline.
    pub fn request_flush(&self) {
        if !self.scheduler.has_connection() {
            debug!("Offline; flush deferred until reconnect");
            return;
        }
        if !self.queue.try_mark_flush_scheduled() {
            return;
        }
        // Outcome is logged by the scheduler.
        drop(self.flush());
    }

    /// Submit a flush unconditionally.
    pub fn flush(&self) -> TaskHandle<FlushReport> {
        let task = FlushTask::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.context.session),
            Arc::clone(&self.context.transport),
            Arc::clone(&self.context.config),
            Arc::clone(&self.context.clock),
        );
        self.scheduler.submit(task)
    }

    fn event_context(&self) -> EventContext {
        let installation_id = self
            .context
            .store
            .get(KEY_INSTALLATION_RECORD)
            .and_then(|raw| serde_json::from_str::<InstallationRecord>(&raw).ok())
            .and_then(|record| record.installation_id);
        let device = &self.context.device;

        EventContext {
            project_id: self.context.config.project_id,
            application_id: self.context.config.application_id,
            user_id: self.context.session.current_user_id(),
            installation_id,
            application_version: Some(device.application_version.clone()),
            device_type: Some(device.device_model.clone()),
            operating_system_version: Some(device.operating_system()),
            location: *self.location.read(),
        }
    }
}
