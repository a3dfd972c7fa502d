//! Batched delivery of the event queue

use std::sync::Arc;

use async_trait::async_trait;
use intelligence_common::SharedClock;
use intelligence_domain::constants::{ANALYTICS_BATCH_SIZE, ANALYTICS_INVALID_REQUEST};
use intelligence_domain::{Configuration, IntelligenceError, Module, RequestError, Result};
use tracing::{debug, info, instrument, warn};

use super::queue::EventQueue;
use crate::auth::Session;
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::scheduler::Task;

/// Outcome of one flush run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    /// Events accepted by the analytics service.
    pub sent: usize,
    /// Events the service rejected as `invalid_request` and that were dropped.
    pub discarded: usize,
    /// Events dropped for being past the retention window.
    pub expired: usize,
}

/// Sends queued events in batches until the queue is empty or a batch fails.
///
/// Events leave the queue only after the service answered for them: a
/// success, or a definitive `invalid_request` rejection. Any other failure
/// keeps the batch at the head for the next flush.
#[derive(Clone)]
pub struct FlushTask {
    queue: Arc<EventQueue>,
    session: Arc<Session>,
    transport: Arc<dyn Transport>,
    config: Arc<Configuration>,
    clock: SharedClock,
}

impl FlushTask {
    pub fn new(
        queue: Arc<EventQueue>,
        session: Arc<Session>,
        transport: Arc<dyn Transport>,
        config: Arc<Configuration>,
        clock: SharedClock,
    ) -> Self {
        Self { queue, session, transport, config, clock }
    }

    fn events_url(&self) -> String {
        self.config
            .endpoint(Module::Analytics, &format!("projects/{}/events", self.config.project_id))
    }
}

#[async_trait]
impl Task for FlushTask {
    type Output = FlushReport;

    fn name(&self) -> &'static str {
        "analytics_flush"
    }

    #[instrument(skip(self), fields(queued = self.queue.len()))]
    async fn execute(&self) -> Result<FlushReport> {
        self.queue.clear_flush_scheduled();
        let url = self.events_url();
        let mut report = FlushReport::default();

        loop {
            report.expired += self.queue.purge_expired(self.clock.now());

            let batch = self.queue.head(ANALYTICS_BATCH_SIZE);
            if batch.is_empty() {
                if report != FlushReport::default() {
                    info!(
                        sent = report.sent,
                        discarded = report.discarded,
                        expired = report.expired,
                        "Analytics flush complete"
                    );
                }
                return Ok(report);
            }

            let token = self.session.current_token().ok_or(RequestError::Unauthorized)?;
            let body = serde_json::to_value(&batch)
                .map_err(|e| RequestError::ParseError(e.to_string()))?;
            let request = HttpRequest::post(url.as_str()).bearer(token.bearer()).json(body);

            let count = batch.len();
            let response = self.transport.execute(request).await?;

            if response.is_success() {
                self.queue.remove_head(count);
                report.sent += count;
                debug!(count, "Analytics batch delivered");
            } else if is_invalid_request(&response) {
                self.queue.remove_head(count);
                report.discarded += count;
                warn!(count, status = response.status, "Analytics batch rejected; discarding");
            } else if response.status == 401 {
                return Err(RequestError::Unauthorized.into());
            } else {
                let body = response.error_body().unwrap_or_default();
                warn!(count, status = response.status, "Analytics batch failed; keeping events");
                return Err(IntelligenceError::Server {
                    status: response.status,
                    error: body.error.unwrap_or_default(),
                    description: body.error_description,
                });
            }
        }
    }
}

fn is_invalid_request(response: &HttpResponse) -> bool {
    response
        .error_body()
        .and_then(|body| body.error)
        .is_some_and(|error| error.eq_ignore_ascii_case(ANALYTICS_INVALID_REQUEST))
}
