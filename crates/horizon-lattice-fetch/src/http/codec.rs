//! Content-type registry: shorthand names, serializers, and parsers.
//!
//! The registry is built once per process and never mutated afterwards.
//! Requests consult it to resolve `type("json")` style shorthands and to
//! serialize their body; responses consult it to parse theirs.
//!
//! # Example
//!
//! ```
//! use horizon_lattice_fetch::http::codec::{self, mime};
//!
//! let registry = codec::registry();
//! assert_eq!(registry.resolve_type("json"), mime::JSON);
//! assert_eq!(registry.resolve_type("text/plain"), "text/plain");
//! assert!(registry.parser(mime::FORM).is_some());
//! ```

use std::collections::HashMap;
use std::sync::OnceLock;

use bytes::Bytes;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use serde_json::{Map, Value};

const TARGET: &str = "horizon_lattice_fetch::codec";

/// Well-known MIME strings.
pub mod mime {
    /// `text/html`
    pub const HTML: &str = "text/html";
    /// `application/json`
    pub const JSON: &str = "application/json";
    /// `application/xml`
    pub const XML: &str = "application/xml";
    /// `application/x-www-form-urlencoded`
    pub const FORM: &str = "application/x-www-form-urlencoded";
    /// `application/octet-stream`
    pub const OCTET_STREAM: &str = "application/octet-stream";
    /// `multipart/form-data`
    pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";
}

/// Characters escaped by [`uri_encode`], on top of controls and non-ASCII.
const URI_RESERVED: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'[')
    .add(b']')
    .add(b'|')
    .add(b'&')
    .add(b'+')
    .add(b'=');

/// Turns a body value into wire bytes. `None` means "no payload".
pub type Serializer = fn(&Value) -> Option<Bytes>;

/// Turns wire bytes into a body value. `None` means the bytes did not decode.
pub type Parser = fn(&[u8]) -> Option<Value>;

/// Process-wide codec tables.
pub struct CodecRegistry {
    types: HashMap<&'static str, &'static str>,
    serializers: HashMap<&'static str, Serializer>,
    parsers: HashMap<&'static str, Parser>,
}

impl CodecRegistry {
    fn new() -> Self {
        let types = HashMap::from([
            ("html", mime::HTML),
            ("json", mime::JSON),
            ("xml", mime::XML),
            ("urlencoded", mime::FORM),
            ("form", mime::FORM),
            ("form-data", mime::FORM),
        ]);

        let serializers = HashMap::from([
            (mime::FORM, serialize_form as Serializer),
            (mime::JSON, serialize_json as Serializer),
        ]);

        let parsers = HashMap::from([
            (mime::FORM, parse_form as Parser),
            (mime::JSON, parse_json as Parser),
        ]);

        Self {
            types,
            serializers,
            parsers,
        }
    }

    /// Resolve a shorthand (`json`, `form`, ...) to its MIME string.
    ///
    /// Anything that is not a registered shorthand is returned unchanged, so
    /// full content-type strings pass straight through.
    pub fn resolve_type(&self, shorthand: &str) -> String {
        self.types
            .get(shorthand)
            .map_or_else(|| shorthand.to_string(), |mime| (*mime).to_string())
    }

    /// Look up the serializer registered for an exact MIME string.
    pub fn serializer(&self, mime: &str) -> Option<Serializer> {
        self.serializers.get(mime).copied()
    }

    /// Look up the parser registered for an exact MIME string.
    pub fn parser(&self, mime: &str) -> Option<Parser> {
        self.parsers.get(mime).copied()
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("types", &self.types)
            .field("serializers", &self.serializers.keys().collect::<Vec<_>>())
            .field("parsers", &self.parsers.keys().collect::<Vec<_>>())
            .finish()
    }
}

static REGISTRY: OnceLock<CodecRegistry> = OnceLock::new();

/// Get the process-wide codec registry.
pub fn registry() -> &'static CodecRegistry {
    REGISTRY.get_or_init(CodecRegistry::new)
}

/// Percent-encode a string for use in a query string or form body.
pub fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_RESERVED).to_string()
}

/// Decode a percent-encoded string. Invalid UTF-8 is replaced lossily.
pub fn uri_decode(input: &str) -> String {
    percent_decode_str(input).decode_utf8_lossy().into_owned()
}

/// Encode a single `key=value` pair, escaping the key and value separately.
pub fn query_pair(key: &str, value: &str) -> String {
    format!("{}={}", uri_encode(key), uri_encode(value))
}

/// Render a value as plain text: strings verbatim, everything else as JSON.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn serialize_form(value: &Value) -> Option<Bytes> {
    let text = match value {
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| query_pair(key, &value_to_text(value)))
            .collect::<Vec<_>>()
            .join("&"),
        Value::Array(items) => items.iter().map(value_to_text).collect::<Vec<_>>().join("&"),
        other => value_to_text(other),
    };
    Some(Bytes::from(text))
}

fn serialize_json(value: &Value) -> Option<Bytes> {
    if let Value::String(s) = value {
        return Some(Bytes::from(s.clone()));
    }
    match serde_json::to_vec(value) {
        Ok(bytes) => Some(Bytes::from(bytes)),
        Err(e) => {
            tracing::warn!(target: TARGET, "Failed to serialize JSON body: {}", e);
            None
        }
    }
}

fn parse_json(data: &[u8]) -> Option<Value> {
    match serde_json::from_slice(data) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(target: TARGET, "Failed to parse JSON body: {}", e);
            None
        }
    }
}

fn parse_form(data: &[u8]) -> Option<Value> {
    let text = String::from_utf8_lossy(data);
    let mut form = Map::new();
    for pair in text.split('&').filter(|pair| !pair.is_empty()) {
        // Everything after the first `=` belongs to the value.
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        form.insert(uri_decode(key), Value::String(uri_decode(value)));
    }
    Some(Value::Object(form))
}
