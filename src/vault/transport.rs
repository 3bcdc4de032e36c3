//! HTTP capability used by the store client, the AWS credential providers
//! and the metadata probe.
//!
//! Everything above this module talks to [`HttpTransport`] so it can be
//! exercised against a mock server or a scripted fake. [`ReqwestTransport`]
//! is the production implementation.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, StatusCode};
use reqwest::{Certificate, Client, Identity};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::TlsMaterial;
use crate::errors::{Error, Result, TlsError};

/// Retries applied after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 5;
/// Base delay; attempt `n` waits `n` times this.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Instance metadata root used for autodetection.
pub const METADATA_PROBE_URL: &str = "http://169.254.169.254/latest/meta-data/";
pub const METADATA_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// An outgoing request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self { method, url: url.into(), headers: Vec::new(), body: None }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `payload` as the body and sets the JSON content headers.
    pub fn json<T: Serialize + ?Sized>(self, payload: &T) -> Result<Self> {
        let body = serde_json::to_vec(payload)?;
        Ok(self
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .body(body))
    }
}

/// A received response. Bodies are fully buffered.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self { status, body: body.into() }
    }

    /// Body parsed as JSON, or `None` when it is empty or not JSON.
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Sends HTTP requests. Implementations decide on retries; a returned
/// response may carry any status.
#[async_trait]
pub trait HttpTransport: Send + Sync + fmt::Debug {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// `reqwest`-backed transport with bounded linear-backoff retries.
///
/// Connection failures are retried for every method; 5xx responses only for
/// idempotent methods. Timeouts are returned immediately.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug, Clone)]
pub struct ReqwestTransportBuilder {
    timeout: Duration,
    tls: TlsMaterial,
    allow_untrusted: bool,
    max_retries: u32,
    retry_delay: Duration,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(super::locator::DEFAULT_TIMEOUT_MS),
            tls: TlsMaterial::default(),
            allow_untrusted: false,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl ReqwestTransportBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn tls(mut self, tls: TlsMaterial) -> Self {
        self.tls = tls;
        self
    }

    /// Accept certificates that do not chain to a trusted root.
    pub fn allow_untrusted(mut self, allow: bool) -> Self {
        self.allow_untrusted = allow;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn build(self) -> Result<ReqwestTransport> {
        let mut builder = Client::builder().use_rustls_tls().timeout(self.timeout);

        if let Some(ca) = &self.tls.ca_cert {
            let cert = Certificate::from_pem(ca)
                .map_err(|source| TlsError::InvalidPem { what: "CA certificate", source })?;
            builder = builder.add_root_certificate(cert);
        }
        if let Some(pem) = &self.tls.identity {
            let identity = Identity::from_pem(pem)
                .map_err(|source| TlsError::InvalidPem { what: "client certificate", source })?;
            builder = builder.identity(identity);
        }
        if self.allow_untrusted {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| Error::transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(ReqwestTransport {
            client,
            max_retries: self.max_retries,
            retry_delay: self.retry_delay,
        })
    }
}

impl ReqwestTransport {
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    async fn execute(&self, request: &HttpRequest) -> reqwest::Result<HttpResponse> {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok(HttpResponse { status, body })
    }
}

fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::PUT | Method::DELETE | Method::TRACE
    )
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut attempt = 0;
        loop {
            let result = self.execute(&request).await;

            let retryable = match &result {
                Ok(response) => response.status.is_server_error() && is_idempotent(&request.method),
                Err(e) => e.is_connect() && !e.is_timeout(),
            };

            if !retryable || attempt >= self.max_retries {
                return result.map_err(|e| {
                    if e.is_timeout() {
                        Error::transport(format!("request to {} timed out", request.url))
                    } else {
                        Error::transport(e.to_string())
                    }
                });
            }

            attempt += 1;
            warn!(
                method = %request.method,
                url = %request.url,
                attempt = attempt,
                "Request failed, retrying"
            );
            tokio::time::sleep(self.retry_delay * attempt).await;
        }
    }
}

/// Best-effort check for a cloud instance metadata service.
#[async_trait]
pub trait MetadataProbe: Send + Sync + fmt::Debug {
    /// `true` when the endpoint produced any HTTP response at all.
    async fn is_reachable(&self) -> bool;
}

/// Probes the EC2 instance metadata endpoint with a short timeout and no
/// retries.
#[derive(Debug, Clone)]
pub struct ImdsProbe {
    url: String,
    timeout: Duration,
}

impl Default for ImdsProbe {
    fn default() -> Self {
        Self { url: METADATA_PROBE_URL.to_string(), timeout: METADATA_PROBE_TIMEOUT }
    }
}

impl ImdsProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self { url: url.into(), timeout }
    }
}

#[async_trait]
impl MetadataProbe for ImdsProbe {
    async fn is_reachable(&self) -> bool {
        let client = match Client::builder().timeout(self.timeout).build() {
            Ok(client) => client,
            Err(e) => {
                debug!(error = %e, "Unable to build metadata probe client");
                return false;
            }
        };

        match client.get(&self.url).send().await {
            Ok(response) => {
                debug!(status = response.status().as_u16(), "Metadata service answered");
                true
            }
            Err(e) => {
                debug!(error = %e, "Metadata service not reachable");
                false
            }
        }
    }
}
