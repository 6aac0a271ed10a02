//! Fluent HTTP client.
//!
//! A [`Client`] creates one [`Request`] per verb call. The request is
//! configured through chained calls and handed off with [`Request::end`],
//! which returns immediately; the completion callback or an error handler
//! fires later on a runtime worker.
//!
//! # Example
//!
//! ```ignore
//! use horizon_lattice_fetch::http::Client;
//!
//! let client = Client::new()
//!     .transform(|response| response.with_header("x-seen", "1"));
//!
//! client
//!     .post("https://api.example.com/users")
//!     .send_json(&serde_json::json!({"name": "John"}))
//!     .end(|response| {
//!         println!("{}: {:?}", response.status(), response.json().get("id"));
//!     });
//! ```
//!
//! # Error Handling
//!
//! Transport failures never reach the completion callback. Exactly one
//! handler runs, in this order of preference:
//!
//! 1. the handler passed to [`Request::end_with`]
//! 2. the handler set with [`Request::on_error`]
//! 3. the handler set with [`Client::on_error`]
//!
//! ```ignore
//! client
//!     .get("http://unreachable.invalid")
//!     .on_error(|err| eprintln!("request failed: {err}"))
//!     .end(|_| unreachable!());
//! ```
//!
//! # Futures
//!
//! [`Request::dispatch`] returns the same result as a future instead:
//!
//! ```ignore
//! let response = client.get("https://api.example.com/data").dispatch().await?;
//! ```

mod body;
mod client;
pub mod codec;
mod multipart;
mod request;
mod response;
pub mod runtime;
mod status;
mod transport;

pub use body::{Body, IndexOutOfBounds};
pub use client::Client;
pub use codec::{CodecRegistry, registry};
pub use multipart::{FormData, mime_type_for};
pub use request::{
    DEFAULT_TIMEOUT, ErrorHandler, HttpMethod, Middleware, Request, RequestBody, Transformer,
};
pub use response::{RequestInfo, Response, ResponseBody};
pub use status::{Status, StatusFamily};
pub use transport::{
    ReqwestTransport, ReqwestTransportBuilder, Transport, TransportConfig, TransportRequest,
    TransportResponse,
};
