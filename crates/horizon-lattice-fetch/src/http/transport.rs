//! The transport seam between request building and the network.
//!
//! A [`Transport`] receives a fully-formed [`TransportRequest`] and answers
//! with a raw [`TransportResponse`] or an error. Connection setup, TLS,
//! redirects, and timeout enforcement all live behind this trait.
//! [`ReqwestTransport`] is the default implementation.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use reqwest::redirect::Policy;

use super::request::HttpMethod;
use crate::error::{NetworkError, Result};

const TARGET: &str = "horizon_lattice_fetch::transport";

/// A request ready to go on the wire.
#[derive(Clone, Debug)]
pub struct TransportRequest {
    /// The HTTP method.
    pub method: HttpMethod,
    /// The absolute URL, query string included.
    pub url: String,
    /// Request headers.
    pub headers: http::HeaderMap,
    /// The serialized body, if any.
    pub body: Option<Bytes>,
    /// How long the transport may take before failing with a timeout.
    pub timeout: Duration,
}

/// The raw outcome of a request, before classification.
#[derive(Clone, Debug)]
pub struct TransportResponse {
    /// Status code as reported by the server.
    pub status: u16,
    /// Response headers.
    pub headers: http::HeaderMap,
    /// The full response body.
    pub body: Bytes,
}

/// Something that can execute HTTP requests.
pub trait Transport: Send + Sync {
    /// Execute a request. The returned future must not borrow `self`.
    fn execute(&self, request: TransportRequest) -> BoxFuture<'static, Result<TransportResponse>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: TransportRequest) -> BoxFuture<'static, Result<TransportResponse>> {
        (**self).execute(request)
    }
}

/// Configuration for [`ReqwestTransport`].
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Ceiling applied to every request on top of the per-request timeout.
    /// Unset by default, leaving each request's own timeout in charge.
    pub timeout: Option<Duration>,
    /// Connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Whether to follow redirects.
    pub follow_redirects: bool,
    /// Maximum number of redirects to follow.
    pub max_redirects: usize,
    /// Whether to enable cookie storage.
    pub cookies_enabled: bool,
    /// Default user agent.
    pub user_agent: Option<String>,
    /// Proxy URL.
    pub proxy: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: Some(Duration::from_secs(10)),
            follow_redirects: true,
            max_redirects: 10,
            cookies_enabled: true,
            user_agent: Some(format!(
                "HorizonLattice-Fetch/{} (Rust)",
                env!("CARGO_PKG_VERSION")
            )),
            proxy: None,
        }
    }
}

/// Builder for a [`ReqwestTransport`] with custom configuration.
#[derive(Debug, Default)]
pub struct ReqwestTransportBuilder {
    config: TransportConfig,
}

impl ReqwestTransportBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the transport-wide timeout ceiling.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Remove the transport-wide timeout ceiling.
    pub fn no_timeout(mut self) -> Self {
        self.config.timeout = None;
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Disable redirect following.
    pub fn no_redirects(mut self) -> Self {
        self.config.follow_redirects = false;
        self
    }

    /// Set the maximum number of redirects to follow.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Disable cookie storage.
    pub fn no_cookies(mut self) -> Self {
        self.config.cookies_enabled = false;
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Set a proxy URL.
    pub fn proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy_url.into());
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<ReqwestTransport> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = self.config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        if self.config.follow_redirects {
            builder = builder.redirect(Policy::limited(self.config.max_redirects));
        } else {
            builder = builder.redirect(Policy::none());
        }

        if self.config.cookies_enabled {
            builder = builder.cookie_store(true);
        }

        if let Some(ref ua) = self.config.user_agent {
            builder = builder.user_agent(ua);
        }

        if let Some(ref proxy_url) = self.config.proxy {
            let proxy =
                reqwest::Proxy::all(proxy_url).map_err(|e| NetworkError::Proxy(e.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| NetworkError::Client(e.to_string()))?;

        Ok(ReqwestTransport {
            client,
            config: self.config,
        })
    }
}

/// The default transport, backed by a shared `reqwest` client.
///
/// Clones share the same connection pool.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: TransportConfig,
}

impl ReqwestTransport {
    /// Create a transport with default configuration.
    pub fn new() -> Result<Self> {
        ReqwestTransportBuilder::new().build()
    }

    /// Create a builder for configuring a new transport.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::new()
    }

    /// Get the transport's configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: TransportRequest) -> BoxFuture<'static, Result<TransportResponse>> {
        let client = self.client.clone();
        Box::pin(async move {
            let url = url::Url::parse(&request.url)?;

            let mut req_builder = client
                .request(request.method.to_reqwest(), url)
                .headers(request.headers)
                .timeout(request.timeout);

            if let Some(body) = request.body {
                req_builder = req_builder.body(body);
            }

            let response = req_builder.send().await?;
            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response.bytes().await?;

            tracing::trace!(target: TARGET, status, bytes = body.len(), "Transport finished");

            Ok(TransportResponse {
                status,
                headers,
                body,
            })
        })
    }
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("config", &self.config)
            .finish()
    }
}
