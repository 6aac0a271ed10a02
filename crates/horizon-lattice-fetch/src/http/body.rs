//! Navigable view over decoded JSON or form data.
//!
//! [`Body`] lets callers walk decoded data of unknown shape without matching
//! on every level. Lookups by key and by index behave differently on a miss:
//!
//! - [`Body::get`] never fails. A missing key, or a value that is not an
//!   object, yields an absent `Body`.
//! - [`Body::at`] returns [`IndexOutOfBounds`] when the value is an array and
//!   the index is past its end. A value that is not an array yields an absent
//!   `Body`, the same as a key miss.
//!
//! # Example
//!
//! ```
//! use horizon_lattice_fetch::http::Body;
//! use serde_json::json;
//!
//! let data = json!({"users": [{"name": "Ada"}]});
//! let body = Body::new(&data);
//!
//! assert_eq!(body.get("users").at(0).unwrap().get("name").as_str(), Some("Ada"));
//! assert!(body.get("missing").get("deeper").is_absent());
//! assert!(body.get("users").at(3).is_err());
//! ```

use std::fmt;

use serde_json::Value;

/// An array index past the end of the array it was applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("index {index} out of bounds for array of length {len}")]
pub struct IndexOutOfBounds {
    /// The requested index.
    pub index: usize,
    /// The length of the array.
    pub len: usize,
}

/// A borrowed, possibly-absent handle into a decoded value.
#[derive(Clone, Copy, Default, PartialEq)]
pub struct Body<'a> {
    value: Option<&'a Value>,
}

impl<'a> Body<'a> {
    /// Wrap a decoded value.
    pub fn new(value: &'a Value) -> Self {
        Self { value: Some(value) }
    }

    /// An absent value.
    pub fn absent() -> Self {
        Self { value: None }
    }

    /// Look up `key` in an object.
    pub fn get(&self, key: &str) -> Body<'a> {
        match self.value {
            Some(Value::Object(map)) => Body {
                value: map.get(key),
            },
            _ => Body::absent(),
        }
    }

    /// Look up `index` in an array.
    ///
    /// Fails when the value is an array and `index` is out of range.
    pub fn at(&self, index: usize) -> Result<Body<'a>, IndexOutOfBounds> {
        match self.value {
            Some(Value::Array(items)) => items
                .get(index)
                .map(Body::new)
                .ok_or(IndexOutOfBounds {
                    index,
                    len: items.len(),
                }),
            _ => Ok(Body::absent()),
        }
    }

    /// The underlying value, if present. JSON `null` counts as present.
    pub fn value(&self) -> Option<&'a Value> {
        self.value
    }

    /// Whether there is no underlying value.
    pub fn is_absent(&self) -> bool {
        self.value.is_none()
    }

    /// The value as a string slice, if it is a string.
    pub fn as_str(&self) -> Option<&'a str> {
        self.value.and_then(Value::as_str)
    }

    /// The value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        self.value.and_then(Value::as_bool)
    }

    /// The value as a signed integer, if it fits.
    pub fn as_i64(&self) -> Option<i64> {
        self.value.and_then(Value::as_i64)
    }

    /// The value as a float, if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        self.value.and_then(Value::as_f64)
    }

    /// Number of entries for arrays and objects, `None` otherwise.
    pub fn len(&self) -> Option<usize> {
        match self.value {
            Some(Value::Array(items)) => Some(items.len()),
            Some(Value::Object(map)) => Some(map.len()),
            _ => None,
        }
    }
}

impl fmt::Debug for Body<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(value) => write!(f, "Body({value})"),
            None => write!(f, "Body(<absent>)"),
        }
    }
}

impl<'a> From<&'a Value> for Body<'a> {
    fn from(value: &'a Value) -> Self {
        Body::new(value)
    }
}
