//! Scripted transport double
//!
//! Routes match on method, a URL fragment and optionally the `grant_type`
//! form parameter. Each route replays its replies in order and repeats the
//! last one; unmatched requests get a 404.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};

/// One scripted answer.
#[derive(Debug, Clone)]
pub enum MockReply {
    Response(HttpResponse),
    Failure(TransportError),
}

impl MockReply {
    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        Self::Response(HttpResponse::new(status, body.to_string()))
    }

    #[must_use]
    pub fn status(status: u16) -> Self {
        Self::Response(HttpResponse::new(status, ""))
    }

    #[must_use]
    pub const fn failure(error: TransportError) -> Self {
        Self::Failure(error)
    }
}

#[derive(Debug)]
struct Route {
    method: HttpMethod,
    fragment: String,
    grant_type: Option<String>,
    replies: Vec<MockReply>,
    hits: usize,
}

impl Route {
    fn matches(&self, request: &HttpRequest) -> bool {
        self.method == request.method
            && request.url.contains(&self.fragment)
            && self
                .grant_type
                .as_deref()
                .map_or(true, |grant| request.param_value("grant_type") == Some(grant))
    }

    fn next_reply(&mut self) -> Option<MockReply> {
        let index = self.hits.min(self.replies.len().checked_sub(1)?);
        self.hits += 1;
        self.replies.get(index).cloned()
    }
}

/// Transport double recording every request it receives.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script `reply` for requests with `method` whose URL contains
    /// `fragment`. Repeated calls for the same route queue further replies.
    pub fn on(&self, method: HttpMethod, fragment: &str, reply: MockReply) -> &Self {
        self.add(method, fragment, None, reply)
    }

    /// Script `reply` for token requests with the given `grant_type`.
    pub fn on_grant(&self, grant_type: &str, reply: MockReply) -> &Self {
        self.add(HttpMethod::Post, "/token", Some(grant_type), reply)
    }

    /// Every request received, oldest first.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    /// Requests with `method` whose URL contains `fragment`.
    pub fn count(&self, method: HttpMethod, fragment: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.method == method && request.url.contains(fragment))
            .count()
    }

    /// Token requests carrying `grant_type`.
    pub fn grant_count(&self, grant_type: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|request| request.param_value("grant_type") == Some(grant_type))
            .count()
    }

    fn add(
        &self,
        method: HttpMethod,
        fragment: &str,
        grant_type: Option<&str>,
        reply: MockReply,
    ) -> &Self {
        let mut routes = self.routes.lock();
        let existing = routes.iter_mut().find(|route| {
            route.method == method
                && route.fragment == fragment
                && route.grant_type.as_deref() == grant_type
        });
        match existing {
            Some(route) => route.replies.push(reply),
            None => routes.push(Route {
                method,
                fragment: fragment.to_string(),
                grant_type: grant_type.map(str::to_string),
                replies: vec![reply],
                hits: 0,
            }),
        }
        drop(routes);
        self
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let reply = {
            let mut routes = self.routes.lock();
            // Grant-specific routes win over generic ones for the same URL.
            let index = routes
                .iter()
                .position(|route| route.grant_type.is_some() && route.matches(&request))
                .or_else(|| routes.iter().position(|route| route.matches(&request)));
            index.and_then(|index| routes[index].next_reply())
        };
        self.requests.lock().push(request);

        match reply {
            Some(MockReply::Response(response)) => Ok(response),
            Some(MockReply::Failure(error)) => Err(error),
            None => Ok(HttpResponse::new(404, r#"{"error":"not_found"}"#)),
        }
    }
}
