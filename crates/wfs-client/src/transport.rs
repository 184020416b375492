//! Capabilities transport: one GetCapabilities exchange per call.
//!
//! The negotiator only sees [`CapabilitiesTransport`]. [`HttpTransport`] is the
//! reqwest implementation with:
//! - a client built once per configuration (pooling, keep-alive, User-Agent)
//! - a semaphore capping in-flight requests
//! - retry with exponential backoff on connection errors, timeouts and 5xx

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::counter;
use reqwest::{Client, Url};
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use wfs_common::{ConfigError, ProtocolVersion, TransportError};
use wfs_protocol::{service_exception, CapabilitiesDocument, GetCapabilitiesRequest};

use crate::config::TransportOptions;

/// Default `User-Agent` when none is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("wfs-client/", env!("CARGO_PKG_VERSION"));

/// Fetches and parses a capabilities document for a candidate version.
#[async_trait]
pub trait CapabilitiesTransport: Send + Sync {
    async fn fetch_capabilities(
        &self,
        version: ProtocolVersion,
    ) -> Result<CapabilitiesDocument, TransportError>;
}

#[async_trait]
impl<T: CapabilitiesTransport + ?Sized> CapabilitiesTransport for Arc<T> {
    async fn fetch_capabilities(
        &self,
        version: ProtocolVersion,
    ) -> Result<CapabilitiesDocument, TransportError> {
        (**self).fetch_capabilities(version).await
    }
}

/// Retry schedule for transient transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts after the first one
    pub max_retries: u32,
    /// Delay before the first retry (doubles each retry)
    pub initial_delay: Duration,
    /// Maximum retry delay
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        std::cmp::min(self.initial_delay.saturating_mul(factor), self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
        }
    }
}

/// reqwest-backed transport. Cheap to clone; clones share the connection pool
/// and the in-flight limit.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    url: Url,
    retry: RetryPolicy,
    limiter: Option<Arc<Semaphore>>,
}

impl HttpTransport {
    /// Build the HTTP client for `url` with the given options.
    pub fn new(url: &str, options: &TransportOptions) -> Result<Self, ConfigError> {
        let url = Url::parse(url).map_err(|e| ConfigError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let user_agent = options
            .user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let mut builder = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(30))
            .tcp_nodelay(true);

        if let Some(secs) = options.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        if options.keep_alive {
            builder = builder.tcp_keepalive(Duration::from_secs(60));
            if let Some(max) = options.max_connections {
                builder = builder.pool_max_idle_per_host(max);
            }
        } else {
            builder = builder.pool_max_idle_per_host(0);
        }

        let client = builder.build().map_err(|e| ConfigError::InvalidOption {
            option: "transport".to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            client,
            url,
            retry: RetryPolicy::new(options.retry_count),
            limiter: options
                .max_connections
                .map(|max| Arc::new(Semaphore::new(max))),
        })
    }

    /// Override the retry schedule.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// One HTTP exchange. Returns the response body on a 2xx status.
    async fn fetch_once(&self, request: &GetCapabilitiesRequest) -> Result<String, TransportError> {
        let _permit = match &self.limiter {
            Some(limiter) => Some(limiter.acquire().await.map_err(|e| TransportError::Request {
                url: self.url.to_string(),
                message: e.to_string(),
            })?),
            None => None,
        };

        counter!("wfs_capabilities_requests_total").increment(1);
        let started = Instant::now();

        let response = self
            .client
            .get(self.url.clone())
            .query(&request.query_pairs())
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            // Servers often pair 4xx/5xx with an OGC exception report
            let body = response.text().await.unwrap_or_default();
            if let Ok(doc) = CapabilitiesDocument::parse(&body) {
                if let Some(exception) = service_exception(&doc) {
                    return Err(TransportError::ServiceException {
                        code: exception.code,
                        message: exception.message,
                    });
                }
            }
            return Err(TransportError::Status {
                url: self.url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| self.request_error(e))?;

        debug!(
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Capabilities response received"
        );

        Ok(body)
    }

    fn request_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                url: self.url.to_string(),
            }
        } else {
            TransportError::Request {
                url: self.url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl CapabilitiesTransport for HttpTransport {
    #[instrument(skip_all, fields(url = %self.url, version = %version))]
    async fn fetch_capabilities(
        &self,
        version: ProtocolVersion,
    ) -> Result<CapabilitiesDocument, TransportError> {
        let request = GetCapabilitiesRequest::new(version);
        let mut retry = 0;

        loop {
            match self.fetch_once(&request).await {
                Ok(body) => return parse_capabilities(self.url.as_str(), &body),
                Err(e) if e.is_retryable() && retry < self.retry.max_retries => {
                    retry += 1;
                    let delay = self.retry.delay_for(retry);
                    counter!("wfs_transport_retries_total").increment(1);

                    warn!(
                        error = %e,
                        retry = retry,
                        max_retries = self.retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "Capabilities request failed, retrying"
                    );

                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Turn a response body into a capabilities document.
///
/// Rejects empty bodies, malformed XML and OGC exception reports.
pub fn parse_capabilities(url: &str, body: &str) -> Result<CapabilitiesDocument, TransportError> {
    if body.trim().is_empty() {
        return Err(TransportError::EmptyBody {
            url: url.to_string(),
        });
    }

    let doc = CapabilitiesDocument::parse(body)
        .map_err(|e| TransportError::InvalidXml(e.to_string()))?;

    if let Some(exception) = service_exception(&doc) {
        return Err(TransportError::ServiceException {
            code: exception.code,
            message: exception.message,
        });
    }

    Ok(doc)
}
