//! SDK context - wires the services over host-supplied collaborators

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use intelligence_common::{SharedClock, SystemClock};
use intelligence_core::{
    Analytics, AnalyticsContext, AuthSessionManager, Connectivity, DurableStore, FlushReport,
    Identity, IdentityContext, Location, LocationContext, LoginTask, SchedulerConfig,
    SchedulerError, Session, StartupTask, TaskHandle, TaskScheduler, Transport,
};
use intelligence_domain::{
    AnalyticsEvent, ConfigurationErrorKind, Configuration, DeviceInfo, Geofence, GeofenceQuery,
    Geolocation, Identifier, InstallationRecord, IntelligenceError, RequestError, Result, User,
};
use intelligence_infra::{FileStore, HttpTransport, NetworkMonitor};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::watcher::watch_connectivity;

/// Type alias for the watcher handle to avoid complexity warnings
type WatcherHandle = Arc<tokio::sync::Mutex<Option<JoinHandle<()>>>>;

const WATCHER_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Platform services the SDK runs on.
#[derive(Clone)]
pub struct Collaborators {
    pub transport: Arc<dyn Transport>,
    pub store: Arc<dyn DurableStore>,
    pub connectivity: Arc<dyn Connectivity>,
    pub device: DeviceInfo,
    pub clock: SharedClock,
}

impl Collaborators {
    /// Default wiring: `reqwest` transport honouring the configured trust
    /// policy, a JSON file store at `store_path` and `monitor` for
    /// reachability.
    ///
    /// # Errors
    /// `Request(UnhandledError)` when the HTTP client cannot be built and
    /// `Configuration(InvalidFile)` when the store cannot be opened.
    pub fn standard(
        config: &Configuration,
        store_path: impl Into<PathBuf>,
        device: DeviceInfo,
        monitor: Arc<NetworkMonitor>,
    ) -> Result<Self> {
        let transport = HttpTransport::for_configuration(config)?;
        let store = FileStore::open(store_path).map_err(|e| {
            IntelligenceError::configuration(ConfigurationErrorKind::InvalidFile, e.to_string())
        })?;

        Ok(Self {
            transport: Arc::new(transport),
            store: Arc::new(store),
            connectivity: monitor,
            device,
            clock: Arc::new(SystemClock),
        })
    }
}

/// Shared state reachable from both the public handle and the
/// connectivity watcher.
pub(crate) struct SdkInner {
    config: Arc<Configuration>,
    connectivity: Arc<dyn Connectivity>,
    session: Arc<Session>,
    auth: Arc<AuthSessionManager>,
    scheduler: Arc<TaskScheduler>,
    analytics: Analytics,
    identity: Identity,
    location: Location,
    started: AtomicBool,
    start_requested: AtomicBool,
    start_lock: tokio::sync::Mutex<()>,
}

impl SdkInner {
    async fn start(&self) -> Result<()> {
        let _guard = self.start_lock.lock().await;
        if self.started.load(Ordering::SeqCst) {
            return Ok(());
        }

        self.start_requested.store(true, Ordering::SeqCst);
        if !self.connectivity.has_connection() {
            info!("Offline; startup deferred until the network returns");
            return Err(RequestError::Offline.into());
        }

        self.scheduler.submit(StartupTask::new(Arc::clone(&self.auth))).await?;

        // Registered before the first event so it carries the installation id.
        match self.identity.sync_installation().await {
            Ok(sync) => debug!(?sync, "Installation synced"),
            Err(e) => warn!(error = %e, code = ?e.code(), "Installation sync failed"),
        }
        if self.config.use_geofences {
            let query = GeofenceQuery::around(self.analytics.last_known_location());
            if let Err(e) = self.location.refresh_cached_geofences(query).await {
                warn!(error = %e, code = ?e.code(), "Geofence cache refresh failed");
            }
        }

        self.analytics.request_flush();
        self.analytics.track_event(AnalyticsEvent::application_opened(self.config.application_id))?;
        self.started.store(true, Ordering::SeqCst);
        info!("SDK started");
        Ok(())
    }

    /// Connectivity came back.
    pub(crate) async fn on_reconnected(&self) {
        if self.started.load(Ordering::SeqCst) {
            self.analytics.request_flush();
        } else if self.start_requested.load(Ordering::SeqCst) {
            if let Err(e) = self.start().await {
                warn!(error = %e, code = ?e.code(), "Deferred startup failed");
            }
        }
    }
}

/// One SDK instance.
///
/// Dropping it stops the connectivity watcher; call [`shutdown`] to also
/// drain the scheduler.
///
/// [`shutdown`]: Intelligence::shutdown
pub struct Intelligence {
    inner: Arc<SdkInner>,
    cancellation_token: CancellationToken,
    watcher: WatcherHandle,
}

impl Intelligence {
    /// Validate `configuration` and wire the services over `collaborators`.
    ///
    /// The scheduler and the connectivity watcher start immediately; no
    /// network call is made until [`start`].
    ///
    /// # Errors
    /// `Configuration(..)` when the configuration fails validation.
    ///
    /// [`start`]: Intelligence::start
    #[instrument(skip_all, fields(project_id = configuration.project_id))]
    pub async fn new(configuration: Configuration, collaborators: Collaborators) -> Result<Self> {
        configuration.validate()?;
        let config = Arc::new(configuration);
        let Collaborators { transport, store, connectivity, device, clock } = collaborators;

        let session = Arc::new(Session::load(Arc::clone(&store)));
        let auth = Arc::new(AuthSessionManager::new(
            Arc::clone(&config),
            Arc::clone(&transport),
            Arc::clone(&session),
            Arc::clone(&clock),
        ));
        let scheduler = Arc::new(TaskScheduler::new(
            auth.clone(),
            Arc::clone(&connectivity),
            SchedulerConfig::default(),
        ));
        scheduler.start().await.map_err(scheduler_error)?;

        let identity = Identity::new(
            IdentityContext {
                config: Arc::clone(&config),
                device: device.clone(),
                session: Arc::clone(&session),
                store: Arc::clone(&store),
                transport: Arc::clone(&transport),
            },
            Arc::clone(&scheduler),
        );
        let location = Location::new(
            LocationContext {
                config: Arc::clone(&config),
                session: Arc::clone(&session),
                store: Arc::clone(&store),
                transport: Arc::clone(&transport),
            },
            Arc::clone(&scheduler),
        );
        let analytics = Analytics::new(
            AnalyticsContext {
                config: Arc::clone(&config),
                device,
                session: Arc::clone(&session),
                store,
                transport,
                clock,
            },
            Arc::clone(&scheduler),
        );

        let inner = Arc::new(SdkInner {
            config,
            connectivity,
            session,
            auth,
            scheduler,
            analytics,
            identity,
            location,
            started: AtomicBool::new(false),
            start_requested: AtomicBool::new(false),
            start_lock: tokio::sync::Mutex::new(()),
        });

        let cancellation_token = CancellationToken::new();
        let receiver = inner.connectivity.subscribe();
        let handle = tokio::spawn(watch_connectivity(
            Arc::downgrade(&inner),
            receiver,
            cancellation_token.clone(),
        ));

        info!("SDK initialised");
        Ok(Self {
            inner,
            cancellation_token,
            watcher: Arc::new(tokio::sync::Mutex::new(Some(handle))),
        })
    }

    /// Run the startup algorithm once, sync the installation record and,
    /// when geofences are enabled, refresh the geofence cache; then flush
    /// analytics and track the application-opened event.
    ///
    /// Returns immediately once started. While offline the start is
    /// remembered and retried automatically on reconnect.
    ///
    /// # Errors
    /// `Request(Offline)` without connectivity; otherwise the startup
    /// failure.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        self.inner.start().await
    }

    /// Whether startup has completed.
    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    /// Log a real user in.
    ///
    /// # Errors
    /// `InvalidParameter` for blank credentials, `Request(Offline)` without
    /// connectivity, otherwise the login failure.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<User> {
        if username.trim().is_empty() {
            return Err(IntelligenceError::InvalidParameter("username".to_string()));
        }
        if password.is_empty() {
            return Err(IntelligenceError::InvalidParameter("password".to_string()));
        }
        if !self.inner.connectivity.has_connection() {
            return Err(RequestError::Offline.into());
        }

        let task = LoginTask::new(
            Arc::clone(&self.inner.auth),
            username.to_string(),
            password.to_string(),
        );
        self.inner.scheduler.submit(task).await
    }

    /// Forget the real user. The internal user stays signed in.
    pub fn logout(&self) {
        self.inner.auth.logout();
    }

    /// The logged-in real user, if any.
    pub fn current_user(&self) -> Option<User> {
        self.inner.session.user()
    }

    /// Profile of the acting identity: the logged-in user, else the SDK's
    /// internal user.
    ///
    /// # Errors
    /// `Request(Offline)` without connectivity, otherwise the request's
    /// failure.
    pub async fn get_me(&self) -> Result<User> {
        self.inner.identity.get_me().await
    }

    /// # Errors
    /// `InvalidParameter` for a non-positive id, `Request(Offline)` without
    /// connectivity, otherwise the request's failure.
    pub async fn get_user_by_id(&self, user_id: i64) -> Result<User> {
        self.inner.identity.get_user_by_id(user_id).await
    }

    /// Create a user in the configured company and track the user-created
    /// event for it.
    ///
    /// # Errors
    /// `MissingParameter` for an incomplete user, `Identity(WeakPassword)`,
    /// `Request(Offline)` without connectivity, otherwise the request's
    /// failure.
    #[instrument(skip(self, user))]
    pub async fn create_user(&self, user: User) -> Result<User> {
        let created = self.inner.identity.create_user(user).await?;
        if let Some(user_id) = created.id {
            self.inner.analytics.track_event(AnalyticsEvent::user_created(user_id))?;
        }
        Ok(created)
    }

    /// # Errors
    /// `MissingParameter` for an incomplete user, `Request(Offline)` without
    /// connectivity, otherwise the request's failure.
    pub async fn update_user(&self, user: User) -> Result<User> {
        self.inner.identity.update_user(user).await
    }

    /// # Errors
    /// `InvalidParameter` for a non-positive id, `Request(Offline)` without
    /// connectivity, otherwise the request's failure.
    pub async fn assign_role(&self, user_id: i64, role_id: i64) -> Result<()> {
        self.inner.identity.assign_role(user_id, role_id).await
    }

    /// # Errors
    /// As [`assign_role`](Self::assign_role).
    pub async fn revoke_role(&self, user_id: i64, role_id: i64) -> Result<()> {
        self.inner.identity.revoke_role(user_id, role_id).await
    }

    /// Register `identifier` for the acting user, taking it over from any
    /// other user holding the same value.
    ///
    /// # Errors
    /// `MissingParameter` without a value or type, `Request(Offline)`
    /// without connectivity, otherwise the request's failure.
    pub async fn register_identifier(&self, identifier: Identifier) -> Result<Identifier> {
        self.inner.identity.register_identifier(identifier).await
    }

    /// Register a push notification token for the acting user.
    ///
    /// # Errors
    /// As [`register_identifier`](Self::register_identifier).
    pub async fn register_push_token(&self, token: &str) -> Result<Identifier> {
        self.inner.identity.register_push_token(token).await
    }

    /// # Errors
    /// `MissingParameter` without an id, `Request(Offline)` without
    /// connectivity, otherwise the request's failure.
    pub async fn unregister_identifier(&self, identifier: &Identifier) -> Result<()> {
        self.inner.identity.unregister_identifier(identifier).await
    }

    /// # Errors
    /// `MissingParameter` without a value or type, `Request(Offline)`
    /// without connectivity, otherwise the request's failure.
    pub async fn delete_identifier_on_behalf(&self, identifier: &Identifier) -> Result<()> {
        self.inner.identity.delete_identifier_on_behalf(identifier).await
    }

    /// The installation record stored by the last successful sync.
    pub fn installation(&self) -> Option<InstallationRecord> {
        self.inner.identity.installation()
    }

    /// Geofences matching `query`.
    ///
    /// # Errors
    /// `Request(Offline)` without connectivity, otherwise the request's
    /// failure.
    pub async fn geofences(&self, query: GeofenceQuery) -> Result<Vec<Geofence>> {
        self.inner.location.geofences(query).await
    }

    /// Geofences cached at startup, available offline.
    pub fn cached_geofences(&self) -> Vec<Geofence> {
        self.inner.location.cached_geofences()
    }

    /// # Errors
    /// `MissingParameter` when the geofence has no id.
    pub fn track_geofence_entered(&self, geofence: &Geofence) -> Result<()> {
        let id = geofence.id.ok_or_else(|| IntelligenceError::MissingParameter("id".to_string()))?;
        self.inner.analytics.track_event(AnalyticsEvent::geofence_entered(id))
    }

    /// # Errors
    /// `MissingParameter` when the geofence has no id.
    pub fn track_geofence_exited(&self, geofence: &Geofence) -> Result<()> {
        let id = geofence.id.ok_or_else(|| IntelligenceError::MissingParameter("id".to_string()))?;
        self.inner.analytics.track_event(AnalyticsEvent::geofence_exited(id))
    }

    /// Queue an analytics event.
    ///
    /// # Errors
    /// `MissingParameter` when the event type is blank.
    pub fn track_event(&self, event: AnalyticsEvent) -> Result<()> {
        self.inner.analytics.track_event(event)
    }

    /// Queue a screen-viewed event.
    ///
    /// # Errors
    /// `MissingParameter` when the screen name is blank.
    pub fn track_screen_viewed(&self, screen_name: &str, seconds: f64) -> Result<()> {
        self.inner.analytics.track_screen_viewed(screen_name, seconds)
    }

    pub fn set_last_known_location(&self, location: Option<Geolocation>) {
        self.inner.analytics.set_last_known_location(location);
    }

    /// Submit an analytics flush and wait for its outcome.
    pub fn flush(&self) -> TaskHandle<FlushReport> {
        self.inner.analytics.flush()
    }

    /// Events waiting to be delivered.
    pub fn queued_events(&self) -> usize {
        self.inner.analytics.queue().len()
    }

    /// Stop the connectivity watcher, then drain and stop the scheduler.
    ///
    /// # Errors
    /// `ShutDown` when the scheduler worker cannot be joined cleanly.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<()> {
        info!("Shutting down SDK");
        self.cancellation_token.cancel();

        if let Some(handle) = self.watcher.lock().await.take() {
            match tokio::time::timeout(WATCHER_JOIN_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Connectivity watcher panicked: {}", e),
                Err(_) => warn!("Connectivity watcher did not stop within timeout"),
            }
        }

        self.inner.scheduler.shutdown().await.map_err(scheduler_error)?;
        info!("SDK shut down");
        Ok(())
    }
}

impl Drop for Intelligence {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

fn scheduler_error(error: SchedulerError) -> IntelligenceError {
    warn!(error = %error, "Scheduler lifecycle failure");
    IntelligenceError::ShutDown
}
