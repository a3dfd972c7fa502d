//! Integration tests for the persistent analytics queue and batched flush.

mod support;

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Duration;
use intelligence_common::testing::poll_until;
use intelligence_core::testing::{MockReply, MockTransport};
use intelligence_core::{
    Analytics, AnalyticsContext, EventQueue, FlushReport, HttpMethod, HttpRequest, HttpResponse,
    Transport, TransportError,
};
use intelligence_domain::{AnalyticsEvent, Geolocation, IntelligenceError, RequestError};
use serde_json::{json, Value};
use support::{device, token_reply, Harness, INTERNAL_USER_ID};
use tokio::sync::{oneshot, Notify};

const EVENTS: &str = "/analytics/projects/20/events";

/// Holds the first request until the test releases it.
struct GatedTransport {
    inner: MockTransport,
    entered: Notify,
    gate: tokio::sync::Mutex<Option<oneshot::Receiver<()>>>,
}

impl GatedTransport {
    fn new(inner: MockTransport) -> (Arc<Self>, oneshot::Sender<()>) {
        let (release, gate) = oneshot::channel();
        let transport = Arc::new(Self {
            inner,
            entered: Notify::new(),
            gate: tokio::sync::Mutex::new(Some(gate)),
        });
        (transport, release)
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let gate = self.gate.lock().await.take();
        if let Some(gate) = gate {
            self.entered.notify_one();
            let _ = gate.await;
        }
        self.inner.execute(request).await
    }
}

fn event_types(body: Option<&Value>) -> Vec<String> {
    body.and_then(Value::as_array)
        .map(|events| {
            events
                .iter()
                .filter_map(|event| event["EventType"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Harness with a signed-in internal user and a running scheduler, offline so
/// tracking does not trigger flushes on its own.
async fn started() -> Harness {
    let harness = Harness::new();
    harness.seed_internal_session();
    harness.connectivity.set_connected(false);
    harness.scheduler.start().await.unwrap();
    harness
}

/// Events are enriched with session, device and installation context.
#[tokio::test]
async fn test_tracked_events_are_enriched() {
    let harness = started().await;
    harness.store_installation("install-9");
    let analytics = harness.analytics();
    analytics.set_last_known_location(Some(Geolocation { latitude: 1.5, longitude: 2.5 }));

    analytics.track_event(AnalyticsEvent::new("Custom").with_value("3")).unwrap();

    let queued = &analytics.queue().snapshot()[0];
    assert_eq!(queued.event_value, "3");
    assert_eq!(queued.user_id, Some(INTERNAL_USER_ID));
    assert_eq!(queued.application_id, 30);
    assert_eq!(queued.installation_id.as_deref(), Some("install-9"));
    assert_eq!(queued.operating_system_version.as_deref(), Some("Android 14"));
    assert_eq!(queued.geolocation, Some(Geolocation { latitude: 1.5, longitude: 2.5 }));
}

/// Blank event types are rejected before anything is queued.
#[tokio::test]
async fn test_blank_event_type_is_rejected() {
    let harness = started().await;
    let analytics = harness.analytics();

    let err = analytics.track_event(AnalyticsEvent::new("  ")).unwrap_err();

    assert!(matches!(err, IntelligenceError::MissingParameter(_)));
    assert!(analytics.queue().is_empty());
}

/// A successful flush sends batches of at most 100 events.
#[tokio::test]
async fn test_flush_sends_in_batches_of_one_hundred() {
    let harness = started().await;
    let analytics = harness.analytics();
    for i in 0..250 {
        analytics.track_event(AnalyticsEvent::new(format!("E{i}"))).unwrap();
    }
    harness.transport.on(HttpMethod::Post, EVENTS, MockReply::status(200));

    let report = analytics.flush().await.unwrap();

    assert_eq!(report, FlushReport { sent: 250, discarded: 0, expired: 0 });
    let sizes: Vec<usize> = harness
        .transport
        .requests()
        .iter()
        .map(|request| request.body.as_ref().and_then(|b| b.as_array()).map_or(0, Vec::len))
        .collect();
    assert_eq!(sizes, vec![100, 100, 50]);
    assert!(analytics.queue().is_empty());

    let first = &harness.transport.requests()[0];
    assert_eq!(first.header_value("Authorization"), Some("Bearer internal"));
    assert_eq!(first.body.as_ref().unwrap()[0]["EventType"], "E0");
}

/// `invalid_request` rejections drop the batch instead of retrying it.
#[tokio::test]
async fn test_invalid_request_discards_batch() {
    let harness = started().await;
    let analytics = harness.analytics();
    for name in ["A", "B", "C"] {
        analytics.track_event(AnalyticsEvent::new(name)).unwrap();
    }
    harness
        .transport
        .on(HttpMethod::Post, EVENTS, MockReply::json(400, &json!({"error": "invalid_request"})));

    let report = analytics.flush().await.unwrap();

    assert_eq!(report.discarded, 3);
    assert!(analytics.queue().is_empty());
    assert_eq!(harness.transport.count(HttpMethod::Post, EVENTS), 1);
}

/// Server failures keep the events for the next flush.
#[tokio::test]
async fn test_server_error_keeps_events() {
    let harness = started().await;
    let analytics = harness.analytics();
    for name in ["A", "B", "C"] {
        analytics.track_event(AnalyticsEvent::new(name)).unwrap();
    }
    harness.transport.on(
        HttpMethod::Post,
        EVENTS,
        MockReply::json(500, &json!({"error": "server_error", "error_description": "down"})),
    );

    let err = analytics.flush().await.unwrap_err();

    assert_eq!(
        err,
        IntelligenceError::Server {
            status: 500,
            error: "server_error".into(),
            description: Some("down".into()),
        }
    );
    let names: Vec<String> =
        analytics.queue().snapshot().into_iter().map(|event| event.event_type).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
}

/// The batch kept after a server failure is sent unchanged by the next flush.
#[tokio::test]
async fn test_failed_batch_is_resent_unchanged() {
    let harness = started().await;
    let analytics = harness.analytics();
    for name in ["A", "B", "C"] {
        analytics.track_event(AnalyticsEvent::new(name)).unwrap();
    }
    harness
        .transport
        .on(HttpMethod::Post, EVENTS, MockReply::status(500))
        .on(HttpMethod::Post, EVENTS, MockReply::status(200));

    assert!(analytics.flush().await.is_err());
    let report = analytics.flush().await.unwrap();

    assert_eq!(report.sent, 3);
    let posts = harness.transport.requests();
    assert_eq!(posts.len(), 2);
    assert_eq!(event_types(posts[0].body.as_ref()), vec!["A", "B", "C"]);
    assert_eq!(posts[1].body, posts[0].body);
    assert!(analytics.queue().is_empty());
}

/// Expired events are dropped while recent ones in the same queue are sent.
#[tokio::test]
async fn test_expired_events_are_dropped_from_a_mixed_batch() {
    let harness = started().await;
    let analytics = harness.analytics();
    analytics.track_event(AnalyticsEvent::new("Old")).unwrap();
    harness.clock.advance(Duration::hours(25));
    analytics.track_event(AnalyticsEvent::new("Recent1")).unwrap();
    analytics.track_event(AnalyticsEvent::new("Recent2")).unwrap();
    harness.transport.on(HttpMethod::Post, EVENTS, MockReply::status(200));

    let report = analytics.flush().await.unwrap();

    assert_eq!(report, FlushReport { sent: 2, discarded: 0, expired: 1 });
    let posts = harness.transport.requests();
    assert_eq!(posts.len(), 1);
    assert_eq!(event_types(posts[0].body.as_ref()), vec!["Recent1", "Recent2"]);
}

/// Tracking during a running flush queues a follow-up flush behind it.
#[tokio::test]
async fn test_event_tracked_mid_flush_schedules_follow_up() {
    let harness = started().await;
    let mock = MockTransport::new();
    mock.on(HttpMethod::Post, EVENTS, MockReply::status(200));
    let (transport, release) = GatedTransport::new(mock);
    let analytics = Analytics::new(
        AnalyticsContext {
            config: Arc::clone(&harness.config),
            device: device(),
            session: Arc::clone(&harness.session),
            store: harness.store.clone(),
            transport: transport.clone(),
            clock: Arc::new(harness.clock.clone()),
        },
        Arc::clone(&harness.scheduler),
    );
    analytics.track_event(AnalyticsEvent::new("A")).unwrap();
    harness.connectivity.set_connected(true);

    let running = analytics.flush();
    transport.entered.notified().await;
    analytics.track_event(AnalyticsEvent::new("B")).unwrap();

    // The running flush plus the follow-up submitted by tracking.
    assert_eq!(harness.scheduler.pending(), 2);

    release.send(()).unwrap();
    assert_eq!(running.await.unwrap().sent, 2);
    let scheduler = &harness.scheduler;
    assert!(
        poll_until(StdDuration::from_secs(2), StdDuration::from_millis(10), || async move {
            scheduler.pending() == 0
        })
        .await
    );
    assert!(analytics.queue().is_empty());
    assert_eq!(transport.inner.count(HttpMethod::Post, EVENTS), 2);
}

/// Events older than 24 hours are purged without being sent.
#[tokio::test]
async fn test_expired_events_are_purged() {
    let harness = started().await;
    let analytics = harness.analytics();
    analytics.track_event(AnalyticsEvent::new("Old")).unwrap();
    harness.clock.advance(Duration::hours(25));

    let report = analytics.flush().await.unwrap();

    assert_eq!(report, FlushReport { sent: 0, discarded: 0, expired: 1 });
    assert!(harness.transport.requests().is_empty());
    assert!(analytics.queue().is_empty());
}

/// Flushing an empty queue makes no network call.
#[tokio::test]
async fn test_empty_flush_is_a_no_op() {
    let harness = started().await;
    let analytics = harness.analytics();

    assert_eq!(analytics.flush().await.unwrap(), FlushReport::default());
    assert_eq!(analytics.flush().await.unwrap(), FlushReport::default());
    assert!(harness.transport.requests().is_empty());
}

/// A 401 reauthenticates and replays the flush exactly once.
#[tokio::test]
async fn test_unauthorized_flush_reauthenticates_and_replays_once() {
    let harness = started().await;
    let analytics = harness.analytics();
    analytics.track_event(AnalyticsEvent::new("A")).unwrap();
    harness
        .transport
        .on(HttpMethod::Post, EVENTS, MockReply::status(401))
        .on(HttpMethod::Post, EVENTS, MockReply::status(200))
        .on(HttpMethod::Get, "/validate", MockReply::status(401))
        .on_grant("password", token_reply("internal-2"));

    let report = analytics.flush().await.unwrap();

    assert_eq!(report.sent, 1);
    let posts: Vec<_> = harness
        .transport
        .requests()
        .into_iter()
        .filter(|request| request.url.ends_with(EVENTS))
        .collect();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[1].header_value("Authorization"), Some("Bearer internal-2"));
}

/// A second 401 after reauthentication is final.
#[tokio::test]
async fn test_unauthorized_replay_is_final() {
    let harness = started().await;
    let analytics = harness.analytics();
    analytics.track_event(AnalyticsEvent::new("A")).unwrap();
    harness
        .transport
        .on(HttpMethod::Post, EVENTS, MockReply::status(401))
        .on(HttpMethod::Get, "/validate", MockReply::status(200));

    let err = analytics.flush().await.unwrap_err();

    assert_eq!(err, RequestError::Unauthorized.into());
    assert_eq!(harness.transport.count(HttpMethod::Post, EVENTS), 2);
    assert_eq!(analytics.queue().len(), 1);
}

/// Tracking while online schedules a flush on its own.
#[tokio::test]
async fn test_tracking_online_flushes_automatically() {
    let harness = started().await;
    harness.connectivity.set_connected(true);
    harness.transport.on(HttpMethod::Post, EVENTS, MockReply::status(200));
    let analytics = harness.analytics();

    analytics.track_event(AnalyticsEvent::new("A")).unwrap();

    let drained = poll_until(StdDuration::from_secs(2), StdDuration::from_millis(10), || {
        let empty = analytics.queue().is_empty();
        async move { empty }
    })
    .await;
    assert!(drained);
}

/// Queued events survive a restart.
#[tokio::test]
async fn test_queue_reloads_after_restart() {
    let harness = started().await;
    let analytics = harness.analytics();
    for name in ["A", "B"] {
        analytics.track_event(AnalyticsEvent::new(name)).unwrap();
    }

    let reloaded = EventQueue::load(harness.store.clone());

    assert_eq!(reloaded.snapshot(), analytics.queue().snapshot());
}
