//! Fluent HTTP client for Horizon Lattice.
//!
//! Requests are built through chained calls on a [`Request`] and sent with a
//! completion callback. Bodies are serialized and responses decoded through a
//! shared codec registry keyed by MIME type.
//!
//! ```ignore
//! use horizon_lattice_fetch::Client;
//!
//! let client = Client::new().base_url("https://api.example.com");
//!
//! client
//!     .get("/search")
//!     .query([("q", "lattice"), ("page", "1")])
//!     .set("Accept", "application/json")
//!     .end(|response| {
//!         if response.is_error() {
//!             eprintln!("search failed: {}", response.status());
//!             return;
//!         }
//!         let first = response.json().get("results").at(0);
//!         println!("{:?}", first);
//!     });
//! ```
//!
//! ## Request Bodies
//!
//! ```ignore
//! // Form text, escaped and joined with `&`
//! client.post("/login").send("user=john").send("remember=1");
//!
//! // JSON objects, merged key by key
//! client.post("/users").send_json(&json!({"name": "John"}));
//!
//! // Multipart
//! client
//!     .post("/upload")
//!     .field("title", "Avatar")
//!     .attach_path("avatar", "avatar.png", None, None)?;
//! ```
//!
//! ## Configuration
//!
//! ```ignore
//! let transport = ReqwestTransport::builder()
//!     .connect_timeout(Duration::from_secs(5))
//!     .user_agent("MyApp/1.0")
//!     .no_cookies()
//!     .build()?;
//! let client = Client::with_transport(transport);
//! ```

mod error;
pub mod http;

pub use error::{NetworkError, Result};

// Re-export commonly used types at the crate root
pub use http::{
    Body, Client, FormData, HttpMethod, IndexOutOfBounds, ReqwestTransport, Request, RequestBody,
    Response, ResponseBody, Status, StatusFamily, Transport,
};
