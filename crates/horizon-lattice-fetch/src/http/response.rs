//! HTTP response snapshot.
//!
//! A [`Response`] is built once per dispatch from what the transport
//! returned. Status classification, header normalization, and body decoding
//! all happen up front, so every accessor is a plain read.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::body::Body;
use super::codec;
use super::request::HttpMethod;
use super::status::{Status, StatusFamily};
use super::transport::TransportResponse;
use crate::error::{NetworkError, Result};

const TARGET: &str = "horizon_lattice_fetch::response";

/// Read-only description of the request a response answers.
#[derive(Clone, Debug)]
pub struct RequestInfo {
    /// The request method.
    pub method: HttpMethod,
    /// The final URL, query string included.
    pub url: String,
    /// The headers that went on the wire.
    pub headers: http::HeaderMap,
}

impl RequestInfo {
    /// Describe a request.
    pub fn new(method: HttpMethod, url: impl Into<String>, headers: http::HeaderMap) -> Self {
        Self {
            method,
            url: url.into(),
            headers,
        }
    }
}

/// The decoded response body.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ResponseBody {
    /// No body, or a body whose registered parser rejected it.
    #[default]
    Absent,
    /// Bytes with no parser registered for their content type.
    Raw(Bytes),
    /// A value produced by the parser registered for the content type.
    Parsed(Value),
}

impl ResponseBody {
    /// The parsed value, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Parsed(value) => Some(value),
            _ => None,
        }
    }

    /// Whether no body is available.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// An HTTP response.
#[derive(Clone)]
pub struct Response {
    status_code: u16,
    family: StatusFamily,
    status: Status,
    headers: HashMap<String, String>,
    content_type: Option<String>,
    charset: Option<String>,
    raw: Bytes,
    text: String,
    body: ResponseBody,
    request: Arc<RequestInfo>,
}

impl Response {
    /// Build a response from its parts.
    ///
    /// Header names are lower-cased; repeated headers are joined with `, `.
    pub fn new<I, K, V>(
        status_code: u16,
        headers: I,
        raw: impl Into<Bytes>,
        request: Arc<RequestInfo>,
    ) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut normalized: HashMap<String, String> = HashMap::new();
        for (name, value) in headers {
            let value = value.as_ref();
            normalized
                .entry(name.as_ref().to_ascii_lowercase())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }

        let (content_type, charset) = normalized
            .get("content-type")
            .map(|header| parse_content_type(header))
            .unwrap_or_default();

        let raw = raw.into();
        let text = String::from_utf8_lossy(&raw).into_owned();
        let body = decode_body(content_type.as_deref(), &raw);

        let family = StatusFamily::from_code(status_code);
        let status = Status::from_code(status_code);

        tracing::debug!(
            target: TARGET,
            status = status_code,
            family = %family,
            content_type = content_type.as_deref().unwrap_or(""),
            bytes = raw.len(),
            "Response received"
        );
        if family == StatusFamily::Unknown {
            tracing::warn!(
                target: TARGET,
                status = status_code,
                "Status code outside any known family"
            );
        }

        Self {
            status_code,
            family,
            status,
            headers: normalized,
            content_type,
            charset,
            raw,
            text,
            body,
            request,
        }
    }

    /// Build a response from raw transport output.
    ///
    /// Fails with [`NetworkError::MalformedResponse`] when the status is not a
    /// valid HTTP status code.
    pub(crate) fn from_transport(
        raw: TransportResponse,
        request: Arc<RequestInfo>,
    ) -> Result<Self> {
        http::StatusCode::from_u16(raw.status).map_err(|_| {
            NetworkError::MalformedResponse(format!("invalid status code {}", raw.status))
        })?;

        let headers = raw.headers.iter().map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        });
        Ok(Self::new(raw.status, headers, raw.body, request))
    }

    /// The numeric status code.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// The status family.
    pub fn family(&self) -> StatusFamily {
        self.family
    }

    /// The named status, or [`Status::Unknown`].
    pub fn status(&self) -> Status {
        self.status
    }

    /// Whether the status is a client or server error.
    pub fn is_error(&self) -> bool {
        self.family.is_error()
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        self.family == StatusFamily::Ok
    }

    /// All headers, keyed by lower-cased name.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Get a header value. The lookup ignores case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The MIME type from the `Content-Type` header, without parameters.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The `charset` parameter of the `Content-Type` header.
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// The raw body bytes.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// The body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The decoded body.
    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    /// A navigable view over the parsed body. Absent unless a parser
    /// accepted the body.
    pub fn json(&self) -> Body<'_> {
        self.body.value().map(Body::new).unwrap_or_default()
    }

    /// Deserialize the raw body as JSON into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.raw)?)
    }

    /// The request this response answers.
    pub fn request(&self) -> &RequestInfo {
        &self.request
    }

    /// Replace the decoded body. Intended for transformers.
    pub fn with_body(mut self, body: ResponseBody) -> Self {
        self.body = body;
        self
    }

    /// Set a header. Intended for transformers.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status_code", &self.status_code)
            .field("family", &self.family)
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .field("bytes", &self.raw.len())
            .field("url", &self.request.url)
            .finish()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} -> {}",
            self.request.method, self.request.url, self.status_code
        )
    }
}

fn parse_content_type(header: &str) -> (Option<String>, Option<String>) {
    let mut segments = header.split(';');
    let content_type = segments
        .next()
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string);

    let charset = segments.find_map(|param| {
        let parts: Vec<&str> = param.split('=').collect();
        match parts.as_slice() {
            [key, value] if key.trim().eq_ignore_ascii_case("charset") => {
                Some(value.trim().trim_matches('"').to_string())
            }
            _ => None,
        }
    });

    (content_type, charset)
}

fn decode_body(content_type: Option<&str>, raw: &Bytes) -> ResponseBody {
    let parser = content_type.and_then(|content_type| codec::registry().parser(content_type));
    match parser {
        Some(_) if raw.is_empty() => ResponseBody::Absent,
        Some(parse) => match parse(raw) {
            Some(value) => ResponseBody::Parsed(value),
            None => {
                tracing::warn!(
                    target: TARGET,
                    content_type = content_type.unwrap_or(""),
                    "Response body rejected by its parser"
                );
                ResponseBody::Absent
            }
        },
        None if raw.is_empty() => ResponseBody::Absent,
        None => ResponseBody::Raw(raw.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn info() -> Arc<RequestInfo> {
        Arc::new(RequestInfo::new(
            HttpMethod::Get,
            "http://example.com/get",
            http::HeaderMap::new(),
        ))
    }

    fn response(status: u16, headers: &[(&str, &str)], body: &'static str) -> Response {
        Response::new(status, headers.iter().copied(), body, info())
    }

    #[test]
    fn test_not_found_classification() {
        let r = response(404, &[], "");
        assert_eq!(r.family(), StatusFamily::ClientError);
        assert_eq!(r.status(), Status::NotFound);
        assert!(r.is_error());
    }

    #[test]
    fn test_created_classification() {
        let r = response(201, &[], "");
        assert_eq!(r.family(), StatusFamily::Ok);
        assert_eq!(r.status(), Status::Created);
        assert!(!r.is_error());
        assert!(r.is_success());
    }

    #[test]
    fn test_unnamed_server_error() {
        let r = response(599, &[], "");
        assert_eq!(r.family(), StatusFamily::ServerError);
        assert_eq!(r.status(), Status::Unknown);
        assert!(r.is_error());
    }

    #[test]
    fn test_headers_lowercased() {
        let r = response(200, &[("X-Header-Key", "headerValue")], "");
        assert_eq!(r.headers().get("x-header-key").map(String::as_str), Some("headerValue"));
        assert_eq!(r.header("X-HEADER-KEY"), Some("headerValue"));
    }

    #[test]
    fn test_repeated_headers_joined() {
        let r = response(200, &[("Vary", "Accept"), ("vary", "Origin")], "");
        assert_eq!(r.header("vary"), Some("Accept, Origin"));
    }

    #[test]
    fn test_content_type_and_charset() {
        let r = response(
            200,
            &[("Content-Type", "application/json; charset=utf-8")],
            "{\"a\": 1}",
        );
        assert_eq!(r.content_type(), Some("application/json"));
        assert_eq!(r.charset(), Some("utf-8"));
        assert_eq!(r.json().get("a").as_i64(), Some(1));
    }

    #[test]
    fn test_form_body_parsed() {
        let r = response(
            200,
            &[("content-type", "application/x-www-form-urlencoded")],
            "key=a%20b&flag",
        );
        assert_eq!(r.body(), &ResponseBody::Parsed(json!({"key": "a b", "flag": ""})));
    }

    #[test]
    fn test_unregistered_type_keeps_raw_bytes() {
        let r = response(200, &[("content-type", "text/html")], "<html></html>");
        assert_eq!(r.body(), &ResponseBody::Raw(Bytes::from_static(b"<html></html>")));
        assert_eq!(r.text(), "<html></html>");
        assert!(r.json().is_absent());
    }

    #[test]
    fn test_malformed_json_is_absent() {
        let r = response(200, &[("content-type", "application/json")], "{not json");
        assert!(r.body().is_absent());
        assert_eq!(r.text(), "{not json");
    }

    #[test]
    fn test_empty_body_is_absent() {
        let r = response(204, &[("content-type", "application/json")], "");
        assert!(r.body().is_absent());
        let r = response(204, &[], "");
        assert!(r.body().is_absent());
    }

    #[test]
    fn test_invalid_status_is_malformed() {
        let raw = TransportResponse {
            status: 42,
            headers: http::HeaderMap::new(),
            body: Bytes::new(),
        };
        let err = Response::from_transport(raw, info()).unwrap_err();
        assert!(matches!(err, NetworkError::MalformedResponse(_)));
    }

    #[test]
    fn test_deserialize_typed() {
        #[derive(serde::Deserialize)]
        struct Payload {
            name: String,
        }
        let r = response(200, &[("content-type", "application/json")], "{\"name\":\"lattice\"}");
        let payload: Payload = r.deserialize().unwrap();
        assert_eq!(payload.name, "lattice");
    }

    #[test]
    fn test_display() {
        let r = response(404, &[], "");
        assert_eq!(r.to_string(), "GET http://example.com/get -> 404");
    }
}
