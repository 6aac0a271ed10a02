//! The request factory.

use std::fmt;
use std::sync::Arc;

use super::request::{ErrorHandler, HttpMethod, Middleware, Request, Transformer};
use super::response::Response;
use super::transport::{ReqwestTransport, Transport};
use crate::error::NetworkError;

const TARGET: &str = "horizon_lattice_fetch::client";

/// Creates [`Request`]s that share middleware, response transformers, an
/// error handler, and a transport.
///
/// Middleware and transformers run in the order they were registered. A
/// client holds no per-request state; cloning it is cheap and clones share
/// the transport's connection pool.
///
/// # Example
///
/// ```ignore
/// use horizon_lattice_fetch::http::Client;
///
/// let client = Client::new()
///     .base_url("https://api.example.com")
///     .middleware(|request| request.set("accept", "application/json"));
///
/// client.get("/users").end(|response| {
///     println!("{}", response.status_code());
/// });
/// ```
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    middleware: Vec<Middleware>,
    transformers: Vec<Transformer>,
    error_handler: ErrorHandler,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a client with the default [`ReqwestTransport`].
    ///
    /// # Panics
    ///
    /// Panics if the default transport cannot be built. Use
    /// [`Client::with_transport`] to handle that case.
    pub fn new() -> Self {
        Self::with_transport(ReqwestTransport::new().expect("Failed to create HTTP transport"))
    }

    /// Create a client that sends requests through `transport`.
    pub fn with_transport<T>(transport: T) -> Self
    where
        T: Transport + 'static,
    {
        Self {
            transport: Arc::new(transport),
            middleware: Vec::new(),
            transformers: Vec::new(),
            error_handler: Arc::new(default_error_handler),
        }
    }

    /// Add middleware applied to every request this client creates.
    pub fn middleware<F>(mut self, middleware: F) -> Self
    where
        F: Fn(Request) -> Request + Send + Sync + 'static,
    {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Prefix URLs that start with `/` with `base`. The two are concatenated
    /// as is.
    pub fn base_url(self, base: impl Into<String>) -> Self {
        let base: String = base.into();
        self.middleware(move |request| {
            if request.url().starts_with('/') {
                let url = format!("{base}{}", request.url());
                request.with_url(url)
            } else {
                request
            }
        })
    }

    /// Add a transformer applied to every response, before any
    /// request-level transformers.
    pub fn transform<F>(mut self, transformer: F) -> Self
    where
        F: Fn(Response) -> Response + Send + Sync + 'static,
    {
        self.transformers.push(Arc::new(transformer));
        self
    }

    /// Set the handler for transport failures not handled at request level.
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(NetworkError) + Send + Sync + 'static,
    {
        self.error_handler = Arc::new(handler);
        self
    }

    /// Create a request with an arbitrary method.
    pub fn request(&self, method: HttpMethod, url: impl Into<String>) -> Request {
        let request = Request::new(
            method,
            url.into(),
            Arc::clone(&self.transport),
            Arc::clone(&self.error_handler),
            self.transformers.clone(),
        );
        self.middleware
            .iter()
            .fold(request, |request, middleware| middleware(request))
    }

    /// Create a GET request.
    pub fn get(&self, url: impl Into<String>) -> Request {
        self.request(HttpMethod::Get, url)
    }

    /// Create a HEAD request.
    pub fn head(&self, url: impl Into<String>) -> Request {
        self.request(HttpMethod::Head, url)
    }

    /// Create a PATCH request.
    pub fn patch(&self, url: impl Into<String>) -> Request {
        self.request(HttpMethod::Patch, url)
    }

    /// Create a POST request.
    pub fn post(&self, url: impl Into<String>) -> Request {
        self.request(HttpMethod::Post, url)
    }

    /// Create a PUT request.
    pub fn put(&self, url: impl Into<String>) -> Request {
        self.request(HttpMethod::Put, url)
    }

    /// Create a DELETE request.
    pub fn delete(&self, url: impl Into<String>) -> Request {
        self.request(HttpMethod::Delete, url)
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("middleware", &self.middleware.len())
            .field("transformers", &self.transformers.len())
            .finish()
    }
}

fn default_error_handler(err: NetworkError) {
    tracing::debug!(target: TARGET, error = %err, "Unhandled request error");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::http::transport::{TransportRequest, TransportResponse};
    use futures_util::future::BoxFuture;

    struct Unreachable;

    impl Transport for Unreachable {
        fn execute(&self, _: TransportRequest) -> BoxFuture<'static, Result<TransportResponse>> {
            Box::pin(async { Err(NetworkError::Connection("unreachable".into())) })
        }
    }

    #[test]
    fn test_verbs_set_method() {
        let client = Client::with_transport(Unreachable);
        assert_eq!(client.get("/").method(), HttpMethod::Get);
        assert_eq!(client.head("/").method(), HttpMethod::Head);
        assert_eq!(client.patch("/").method(), HttpMethod::Patch);
        assert_eq!(client.post("/").method(), HttpMethod::Post);
        assert_eq!(client.put("/").method(), HttpMethod::Put);
        assert_eq!(client.delete("/").method(), HttpMethod::Delete);
    }

    #[test]
    fn test_middleware_runs_in_registration_order() {
        let client = Client::with_transport(Unreachable)
            .middleware(|r| r.set("x-order", "first"))
            .middleware(|r| {
                let seen = r.header("x-order").unwrap_or_default().to_string();
                r.set("x-order", format!("{seen},second"))
            });
        assert_eq!(client.get("/").header("x-order"), Some("first,second"));
    }

    #[test]
    fn test_base_url_prefixes_relative_paths() {
        let client = Client::with_transport(Unreachable).base_url("http://example.com");
        assert_eq!(client.get("/get").url(), "http://example.com/get");
        assert_eq!(client.get("http://other.com/x").url(), "http://other.com/x");
    }

    #[test]
    fn test_base_url_concatenates_verbatim() {
        let client = Client::with_transport(Unreachable).base_url("http://example.com/api/");
        assert_eq!(client.get("/users").url(), "http://example.com/api//users");
    }

    #[test]
    fn test_requests_are_independent() {
        let client = Client::with_transport(Unreachable);
        let first = client.get("/").set("x-first", "1");
        let second = client.get("/");
        assert_eq!(first.header("x-first"), Some("1"));
        assert_eq!(second.header("x-first"), None);
    }
}
