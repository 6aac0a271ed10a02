//! HTTP request builder.
//!
//! A [`Request`] is created by a [`Client`](super::Client) verb method,
//! configured through chained calls, and consumed by [`Request::end`] (or
//! [`Request::dispatch`] for the future-based form).
//!
//! # Body assembly
//!
//! - [`send`](Request::send) appends text. Without a content type it
//!   defaults to a form; form bodies escape each fragment and join them with
//!   `&`, anything else is concatenated verbatim.
//! - [`send_json`](Request::send_json) merges objects into the current body
//!   (defaulting the content type to JSON) and replaces it with anything else.
//! - [`send_bytes`](Request::send_bytes) sets a raw payload that is sent as is.
//! - [`field`](Request::field) and [`attach`](Request::attach) build a
//!   multipart body, which takes precedence over all of the above.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use bytes::Bytes;
use serde::Serialize;
use serde_json::{Map, Value};

use super::codec::{self, mime};
use super::multipart::FormData;
use super::response::{RequestInfo, Response};
use super::runtime;
use super::transport::{Transport, TransportRequest};
use crate::error::{NetworkError, Result};

const TARGET: &str = "horizon_lattice_fetch::request";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A function applied to every request a client creates.
pub type Middleware = Arc<dyn Fn(Request) -> Request + Send + Sync>;

/// A function applied to every response before it reaches the caller.
pub type Transformer = Arc<dyn Fn(Response) -> Response + Send + Sync>;

/// A function receiving transport-level failures.
pub type ErrorHandler = Arc<dyn Fn(NetworkError) + Send + Sync>;

/// HTTP request methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP GET method.
    Get,
    /// HTTP HEAD method.
    Head,
    /// HTTP PATCH method.
    Patch,
    /// HTTP POST method.
    Post,
    /// HTTP PUT method.
    Put,
    /// HTTP DELETE method.
    Delete,
}

impl HttpMethod {
    /// Convert to reqwest method.
    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Head => reqwest::Method::HEAD,
            Self::Patch => reqwest::Method::PATCH,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
        }
    }

    /// Whether a non-multipart body is serialized for this method.
    pub fn sends_body(self) -> bool {
        !matches!(self, Self::Get | Self::Head)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Head => write!(f, "HEAD"),
            Self::Patch => write!(f, "PATCH"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// The body of an HTTP request.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RequestBody {
    /// No body.
    #[default]
    None,
    /// Raw binary body, sent without serialization.
    Bytes(Bytes),
    /// Text accumulated by [`Request::send`].
    Text(String),
    /// An object accumulated by [`Request::send_json`].
    Map(Map<String, Value>),
    /// Any other structured value.
    Other(Value),
}

impl RequestBody {
    /// Whether there is no body.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    fn to_value(&self) -> Option<Value> {
        match self {
            Self::None | Self::Bytes(_) => None,
            Self::Text(text) => Some(Value::String(text.clone())),
            Self::Map(map) => Some(Value::Object(map.clone())),
            Self::Other(value) => Some(value.clone()),
        }
    }
}

/// Builder for a single HTTP request.
pub struct Request {
    method: HttpMethod,
    url: String,
    headers: Vec<(String, String)>,
    query: Vec<String>,
    body: RequestBody,
    form_data: Option<FormData>,
    error: Option<NetworkError>,
    timeout: Duration,
    transformers: Vec<Transformer>,
    error_handler: ErrorHandler,
    transport: Arc<dyn Transport>,
}

impl Request {
    pub(crate) fn new(
        method: HttpMethod,
        url: String,
        transport: Arc<dyn Transport>,
        error_handler: ErrorHandler,
        transformers: Vec<Transformer>,
    ) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            query: Vec::new(),
            body: RequestBody::None,
            form_data: None,
            error: None,
            timeout: DEFAULT_TIMEOUT,
            transformers,
            error_handler,
            transport,
        }
    }

    /// The request method.
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The request URL, without pending query fragments.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Replace the request URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// The current body.
    pub fn body(&self) -> &RequestBody {
        &self.body
    }

    /// Headers in the order they were first set, with their written case.
    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Get a header value. The lookup ignores case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Set a header, replacing any existing header with the same name.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        upsert_header(&mut self.headers, name.into(), value.into());
        self
    }

    /// Set several headers.
    pub fn set_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in headers {
            upsert_header(&mut self.headers, name.into(), value.into());
        }
        self
    }

    /// Set the content type. Accepts a shorthand (`json`, `form`, `html`,
    /// `xml`, `urlencoded`, `form-data`) or a literal MIME string.
    pub fn content_type(self, kind: &str) -> Self {
        let resolved = codec::registry().resolve_type(kind);
        self.set("content-type", resolved)
    }

    fn default_to_type(self, kind: &str) -> Self {
        if self.header("content-type").is_none() {
            self.content_type(kind)
        } else {
            self
        }
    }

    /// Add query parameters. Keys and values are escaped separately.
    pub fn query<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in pairs {
            self.query
                .push(codec::query_pair(key.as_ref(), value.as_ref()));
        }
        self
    }

    /// Add a raw query fragment. The whole fragment is escaped as one token,
    /// `=` included.
    pub fn query_raw(mut self, fragment: &str) -> Self {
        self.query.push(codec::uri_encode(fragment));
        self
    }

    /// Append text to the body.
    pub fn send(self, data: &str) -> Self {
        let mut this = self.default_to_type("form");
        let is_form = this.header("content-type") == Some(mime::FORM);

        this.body = match std::mem::take(&mut this.body) {
            RequestBody::Text(existing) if is_form => {
                RequestBody::Text(format!("{existing}&{}", codec::uri_encode(data)))
            }
            _ if is_form => RequestBody::Text(codec::uri_encode(data)),
            RequestBody::Text(existing) => RequestBody::Text(existing + data),
            _ => RequestBody::Text(data.to_string()),
        };
        this
    }

    /// Send a structured value.
    ///
    /// Objects are merged key by key into the current body, overwriting
    /// collisions; anything else replaces the body. A value that cannot be
    /// serialized fails the request when it is sent.
    pub fn send_json<T: Serialize + ?Sized>(mut self, data: &T) -> Self {
        match serde_json::to_value(data) {
            Ok(Value::Object(entries)) => {
                self = self.default_to_type("json");
                match &mut self.body {
                    RequestBody::Map(map) => map.extend(entries),
                    body => *body = RequestBody::Map(entries),
                }
            }
            Ok(other) => self.body = RequestBody::Other(other),
            Err(e) => {
                tracing::error!(target: TARGET, "Failed to serialize JSON body: {}", e);
                self.error.get_or_insert(NetworkError::from(e));
            }
        }
        self
    }

    /// Set a raw binary body.
    pub fn send_bytes(mut self, data: impl Into<Bytes>) -> Self {
        self.body = RequestBody::Bytes(data.into());
        self
    }

    /// Set the timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set HTTP Basic authentication.
    pub fn auth(self, username: &str, password: &str) -> Self {
        let credentials =
            base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
        self.set("authorization", format!("Basic {credentials}"))
    }

    /// Set bearer token authentication.
    pub fn bearer_auth(self, token: &str) -> Self {
        self.set("authorization", format!("Bearer {token}"))
    }

    /// Run a function over this request right away.
    pub fn apply<F>(self, middleware: F) -> Self
    where
        F: FnOnce(Request) -> Request,
    {
        middleware(self)
    }

    /// Add a response transformer. Transformers run in the order they were
    /// added, after those registered on the client.
    pub fn transform<F>(mut self, transformer: F) -> Self
    where
        F: Fn(Response) -> Response + Send + Sync + 'static,
    {
        self.transformers.push(Arc::new(transformer));
        self
    }

    /// Replace the client's error handler for this request.
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(NetworkError) + Send + Sync + 'static,
    {
        self.error_handler = Arc::new(handler);
        self
    }

    /// Use a different transport for this request only.
    pub fn transport<T>(mut self, transport: T) -> Self
    where
        T: Transport + 'static,
    {
        self.transport = Arc::new(transport);
        self
    }

    fn form_data(&mut self) -> &mut FormData {
        self.form_data.get_or_insert_with(FormData::new)
    }

    /// Add a multipart text field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_data().append_field(name, value);
        self
    }

    /// Attach file data to a multipart body. The MIME type is guessed from
    /// `filename` when omitted.
    pub fn attach(
        mut self,
        name: impl Into<String>,
        data: impl Into<Bytes>,
        filename: impl Into<String>,
        mime_type: Option<&str>,
    ) -> Self {
        self.form_data()
            .append_file(name, data, filename, mime_type.map(str::to_string));
        self
    }

    /// Attach a file from disk. The file is read immediately.
    ///
    /// `filename` defaults to the last segment of `path`, and the MIME type
    /// is guessed from the filename when omitted.
    pub fn attach_path(
        self,
        name: impl Into<String>,
        path: impl AsRef<Path>,
        filename: Option<&str>,
        mime_type: Option<&str>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| NetworkError::io(path, &e))?;
        let filename = match filename {
            Some(filename) => filename.to_string(),
            None => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        Ok(self.attach(name, data, filename, mime_type))
    }

    /// Resolve the final URL, headers, and body without sending anything.
    pub fn prepare(&self) -> Result<TransportRequest> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }

        let mut url = self.url.clone();
        if !self.query.is_empty() {
            url.push(if url.contains('?') { '&' } else { '?' });
            url.push_str(&self.query.join("&"));
        }

        let mut headers = self.headers.clone();
        let multipart = self
            .form_data
            .as_ref()
            .and_then(|form| form.serialize().map(|bytes| (form.content_type(), bytes)));

        let body = if let Some((content_type, bytes)) = multipart {
            upsert_header(&mut headers, "content-type".into(), content_type);
            upsert_header(&mut headers, "Content-Length".into(), bytes.len().to_string());
            Some(bytes)
        } else if self.method.sends_body() {
            self.serialize_body()
        } else {
            None
        };

        let mut header_map = http::HeaderMap::with_capacity(headers.len());
        for (name, value) in &headers {
            let converted = http::HeaderName::try_from(name.as_str())
                .map_err(NetworkError::from)
                .and_then(|key| {
                    let value = http::HeaderValue::try_from(value.as_str())?;
                    Ok((key, value))
                });
            match converted {
                Ok((key, value)) => {
                    header_map.insert(key, value);
                }
                Err(err) => {
                    tracing::warn!(target: TARGET, header = %name, "Rejected request header");
                    return Err(err);
                }
            }
        }

        Ok(TransportRequest {
            method: self.method,
            url,
            headers: header_map,
            body,
            timeout: self.timeout,
        })
    }

    fn serialize_body(&self) -> Option<Bytes> {
        if let RequestBody::Bytes(bytes) = &self.body {
            return Some(bytes.clone());
        }
        let value = self.body.to_value()?;
        let serializer = self
            .header("content-type")
            .and_then(|content_type| codec::registry().serializer(content_type));
        match serializer {
            Some(serialize) => serialize(&value),
            None => Some(Bytes::from(codec::value_to_text(&value))),
        }
    }

    /// Send the request and resolve to the transformed response.
    ///
    /// Unlike [`end`](Self::end), failures are returned instead of being
    /// routed to an error handler.
    pub async fn dispatch(self) -> Result<Response> {
        let prepared = self.prepare()?;
        let info = Arc::new(RequestInfo::new(
            prepared.method,
            prepared.url.clone(),
            prepared.headers.clone(),
        ));

        tracing::debug!(
            target: TARGET,
            method = %prepared.method,
            url = %prepared.url,
            body_len = prepared.body.as_ref().map_or(0, Bytes::len),
            "Dispatching request"
        );

        let raw = self.transport.execute(prepared).await?;
        let response = Response::from_transport(raw, info)?;

        Ok(self
            .transformers
            .iter()
            .fold(response, |response, transform| transform(response)))
    }

    /// Send the request in the background.
    ///
    /// `done` receives the response. Transport failures go to the handler set
    /// with [`on_error`](Self::on_error), or else the client's handler.
    pub fn end<F>(self, done: F)
    where
        F: FnOnce(Response) + Send + 'static,
    {
        self.finish(done, None);
    }

    /// Like [`end`](Self::end), with an error handler that takes priority
    /// over both the request's and the client's.
    pub fn end_with<F, E>(self, done: F, on_error: E)
    where
        F: FnOnce(Response) + Send + 'static,
        E: Fn(NetworkError) + Send + Sync + 'static,
    {
        self.finish(done, Some(Arc::new(on_error)));
    }

    fn finish<F>(self, done: F, on_error: Option<ErrorHandler>)
    where
        F: FnOnce(Response) + Send + 'static,
    {
        let handler = on_error.unwrap_or_else(|| self.error_handler.clone());
        runtime::spawn(async move {
            match self.dispatch().await {
                Ok(response) => done(response),
                Err(err) => {
                    tracing::debug!(target: TARGET, error = %err, "Request failed");
                    handler(err);
                }
            }
        });
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("query", &self.query)
            .field("body", &self.body)
            .field("form_data", &self.form_data)
            .field("error", &self.error)
            .field("timeout", &self.timeout)
            .field("transformers", &self.transformers.len())
            .finish()
    }
}

fn upsert_header(headers: &mut Vec<(String, String)>, name: String, value: String) {
    match headers
        .iter_mut()
        .find(|(key, _)| key.eq_ignore_ascii_case(&name))
    {
        Some(entry) => *entry = (name, value),
        None => headers.push((name, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::transport::TransportResponse;
    use futures_util::future::BoxFuture;
    use serde_json::json;

    struct Unreachable;

    impl Transport for Unreachable {
        fn execute(&self, _: TransportRequest) -> BoxFuture<'static, Result<TransportResponse>> {
            Box::pin(async { Err(NetworkError::Connection("unreachable".into())) })
        }
    }

    fn request(method: HttpMethod, url: &str) -> Request {
        Request::new(
            method,
            url.to_string(),
            Arc::new(Unreachable),
            Arc::new(|_| {}),
            Vec::new(),
        )
    }

    fn body_text(request: &Request) -> String {
        let prepared = request.prepare().unwrap();
        String::from_utf8(prepared.body.unwrap().to_vec()).unwrap()
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let r = request(HttpMethod::Get, "http://example.com").content_type("json");
        assert_eq!(r.header("Content-TYPE"), Some("application/json"));
    }

    #[test]
    fn test_header_last_write_wins() {
        let r = request(HttpMethod::Get, "http://example.com")
            .set("X-Token", "one")
            .set("x-token", "two");
        assert_eq!(r.headers().count(), 1);
        assert_eq!(r.header("X-TOKEN"), Some("two"));
        assert_eq!(r.headers().next(), Some(("x-token", "two")));
    }

    #[test]
    fn test_set_headers_from_map() {
        let r = request(HttpMethod::Get, "http://example.com")
            .set("x-header-key", "headerValue")
            .set_headers([("x-header-key2", "headerValue2")]);
        assert_eq!(r.header("x-header-key"), Some("headerValue"));
        assert_eq!(r.header("x-header-key2"), Some("headerValue2"));
    }

    #[test]
    fn test_literal_content_type() {
        let r = request(HttpMethod::Post, "http://example.com").content_type("text/csv");
        assert_eq!(r.header("content-type"), Some("text/csv"));
    }

    #[test]
    fn test_query_appended_with_question_mark() {
        let r = request(HttpMethod::Get, "http://example.com/get")
            .query([("this has some spaces", "this does too")]);
        assert_eq!(
            r.prepare().unwrap().url,
            "http://example.com/get?this%20has%20some%20spaces=this%20does%20too"
        );
    }

    #[test]
    fn test_query_appended_with_ampersand() {
        let r = request(HttpMethod::Get, "http://example.com/get?withParam=5")
            .query_raw("key=value")
            .query([("a", "b")]);
        assert_eq!(
            r.prepare().unwrap().url,
            "http://example.com/get?withParam=5&key%3Dvalue&a=b"
        );
    }

    #[test]
    fn test_send_strings_default_to_form() {
        let r = request(HttpMethod::Post, "http://example.com")
            .send("key=value")
            .send("key2=value2");
        assert_eq!(r.header("content-type"), Some(mime::FORM));
        assert_eq!(
            r.body(),
            &RequestBody::Text("key%3Dvalue&key2%3Dvalue2".to_string())
        );
        assert_eq!(body_text(&r), "key%3Dvalue&key2%3Dvalue2");
    }

    #[test]
    fn test_send_strings_concatenate_without_form() {
        let r = request(HttpMethod::Post, "http://example.com")
            .content_type("html")
            .send("<html>")
            .send("</html>");
        assert_eq!(r.body(), &RequestBody::Text("<html></html>".to_string()));
    }

    #[test]
    fn test_send_json_merges_objects() {
        let r = request(HttpMethod::Post, "http://example.com")
            .send_json(&json!({"key": "value", "shared": 1}))
            .send_json(&json!({"key2": "value2", "shared": 2}));
        assert_eq!(r.header("content-type"), Some(mime::JSON));

        let body: Value = serde_json::from_str(&body_text(&r)).unwrap();
        assert_eq!(body, json!({"key": "value", "key2": "value2", "shared": 2}));
    }

    #[test]
    fn test_send_json_non_object_replaces_body() {
        let r = request(HttpMethod::Post, "http://example.com")
            .content_type("json")
            .send_json(&json!({"discarded": true}))
            .send_json(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(r.body(), &RequestBody::Other(json!([1, 2, 3, 4, 5, 6])));
        assert_eq!(body_text(&r), "[1,2,3,4,5,6]");
    }

    #[test]
    fn test_send_json_object_replaces_text() {
        let r = request(HttpMethod::Post, "http://example.com")
            .content_type("json")
            .send("raw")
            .send_json(&json!({"key": "value"}));
        let expected = json!({"key": "value"}).as_object().unwrap().clone();
        assert_eq!(r.body(), &RequestBody::Map(expected));
    }

    #[test]
    fn test_unregistered_type_falls_back_to_text() {
        let r = request(HttpMethod::Put, "http://example.com")
            .content_type("text/csv")
            .send_json(&json!({"a": 1}));
        assert_eq!(body_text(&r), "{\"a\":1}");
    }

    #[test]
    fn test_raw_bytes_sent_as_is() {
        let r = request(HttpMethod::Post, "http://example.com")
            .content_type("json")
            .send_bytes(vec![0u8, 159, 146, 150]);
        let prepared = r.prepare().unwrap();
        assert_eq!(prepared.body.unwrap().as_ref(), &[0u8, 159, 146, 150]);
        assert_eq!(prepared.headers["content-type"], "application/json");
    }

    #[test]
    fn test_get_and_head_skip_body() {
        for method in [HttpMethod::Get, HttpMethod::Head] {
            let r = request(method, "http://example.com").send_json(&json!({"a": 1}));
            assert!(r.prepare().unwrap().body.is_none());
        }
    }

    #[test]
    fn test_absent_body_sends_nothing() {
        let r = request(HttpMethod::Delete, "http://example.com");
        assert!(r.prepare().unwrap().body.is_none());
    }

    #[test]
    fn test_multipart_takes_precedence() {
        let r = request(HttpMethod::Post, "http://example.com")
            .send_json(&json!({"ignored": true}))
            .field("key", "value")
            .attach("file1", "<html></html>", "file1.html", None);
        let prepared = r.prepare().unwrap();
        let body = prepared.body.unwrap();

        let content_type = prepared.headers["content-type"].to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary=BOUNDARY-"));
        assert_eq!(
            prepared.headers["content-length"].to_str().unwrap(),
            body.len().to_string()
        );
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains("name=\"key\"\r\n\r\nvalue\r\n"));
        assert!(!text.contains("ignored"));
    }

    #[test]
    fn test_basic_auth_header() {
        let r = request(HttpMethod::Get, "http://example.com").auth("username", "password");
        assert_eq!(
            r.header("Authorization"),
            Some("Basic dXNlcm5hbWU6cGFzc3dvcmQ=")
        );
    }

    #[test]
    fn test_attach_path_missing_file_fails_immediately() {
        let result = request(HttpMethod::Post, "http://example.com").attach_path(
            "file",
            "/definitely/not/here.txt",
            None,
            None,
        );
        assert!(matches!(result, Err(NetworkError::Io { .. })));
    }

    #[test]
    fn test_invalid_header_fails_prepare() {
        let r = request(HttpMethod::Get, "http://example.com").set("bad header", "x");
        assert!(matches!(r.prepare(), Err(NetworkError::InvalidHeader(_))));
    }

    #[test]
    fn test_unserializable_json_fails_prepare() {
        let mut bad = std::collections::BTreeMap::new();
        bad.insert((1, 2), 3);
        let r = request(HttpMethod::Post, "http://example.com")
            .send_json(&json!({"kept": true}))
            .send_json(&bad);
        assert!(matches!(r.prepare(), Err(NetworkError::Json(_))));
    }

    #[test]
    fn test_timeout_defaults_to_sixty_seconds() {
        let r = request(HttpMethod::Get, "http://example.com");
        assert_eq!(r.prepare().unwrap().timeout, Duration::from_secs(60));
        let r = r.timeout(Duration::from_secs(5));
        assert_eq!(r.prepare().unwrap().timeout, Duration::from_secs(5));
    }
}
