use std::time::Duration;

use async_trait::async_trait;
use intelligence_core::{HttpMethod, HttpRequest, HttpResponse, Transport, TransportError};
use intelligence_domain::constants::{CONNECT_TIMEOUT, READ_TIMEOUT};
use intelligence_domain::Configuration;
use reqwest::{Client as ReqwestClient, Method};
use tracing::debug;

use crate::errors::transport_error;

/// `reqwest` implementation of the [`Transport`] port.
///
/// Performs exactly one exchange per call. Retries belong to the task
/// scheduler, so unlike a general-purpose client there is no backoff here.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: ReqwestClient,
}

impl HttpTransport {
    /// Start building a new transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    /// Transport honouring the configuration's certificate trust policy.
    ///
    /// # Errors
    /// `InvalidRequest` when the TLS backend cannot be initialised.
    pub fn for_configuration(config: &Configuration) -> Result<Self, TransportError> {
        Self::builder().accept_invalid_certs(config.accepts_invalid_certificates()).build()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        };
        debug!(%method, url = %request.url, "sending HTTP request");

        let mut builder = self.client.request(method.clone(), request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if !request.params.is_empty() {
            builder = builder.form(&request.params);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|err| {
            debug!(%method, url = %request.url, error = %err, "HTTP request failed");
            transport_error(&err)
        })?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|err| transport_error(&err))?;
        debug!(%method, url = %request.url, status, "received HTTP response");

        Ok(HttpResponse::new(status, body))
    }
}

/// Builder for [`HttpTransport`].
#[derive(Debug)]
pub struct HttpTransportBuilder {
    connect_timeout: Duration,
    read_timeout: Duration,
    user_agent: Option<String>,
    accept_invalid_certs: bool,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
            read_timeout: READ_TIMEOUT,
            user_agent: None,
            accept_invalid_certs: false,
        }
    }
}

impl HttpTransportBuilder {
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Skip certificate chain validation.
    #[must_use]
    pub const fn accept_invalid_certs(mut self, enabled: bool) -> Self {
        self.accept_invalid_certs = enabled;
        self
    }

    /// # Errors
    /// `InvalidRequest` when the underlying client cannot be built.
    pub fn build(self) -> Result<HttpTransport, TransportError> {
        let mut builder = ReqwestClient::builder()
            .connect_timeout(self.connect_timeout)
            .read_timeout(self.read_timeout)
            .no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if self.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client =
            builder.build().map_err(|err| TransportError::InvalidRequest(err.to_string()))?;
        Ok(HttpTransport { client })
    }
}
