//! Error types for the fetch client.

use std::path::PathBuf;

/// Errors delivered through the error-handler chain, or returned from
/// synchronous builder calls such as [`attach_path`].
///
/// [`attach_path`]: crate::http::Request::attach_path
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    /// The transport failed to complete the request.
    #[error("HTTP request error: {0}")]
    Request(String),

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// Connection refused or failed, including DNS failures.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Redirect limit exceeded.
    #[error("Too many redirects")]
    TooManyRedirects,

    /// Proxy configuration error.
    #[error("Proxy error: {0}")]
    Proxy(String),

    /// Invalid header name or value.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),

    /// A file attached by path could not be read.
    #[error("Failed to read '{}': {message}", path.display())]
    Io {
        /// The path that was read.
        path: PathBuf,
        /// The underlying I/O error message.
        message: String,
    },

    /// The transport answered with something that is not an HTTP status response.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The transport could not be constructed.
    #[error("Failed to build HTTP transport: {0}")]
    Client(String),
}

impl NetworkError {
    /// Create an I/O error for the given path.
    pub fn io(path: impl Into<PathBuf>, source: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_redirect() {
            Self::TooManyRedirects
        } else if err.is_builder() {
            Self::InvalidUrl(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

impl From<url::ParseError> for NetworkError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for NetworkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<http::header::InvalidHeaderName> for NetworkError {
    fn from(err: http::header::InvalidHeaderName) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for NetworkError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

/// A specialized Result type for fetch operations.
pub type Result<T> = std::result::Result<T, NetworkError>;
