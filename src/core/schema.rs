//! core::schema
//!
//! Index mapping values and structural comparison.
//!
//! # Representations
//!
//! The same logical mapping shows up twice:
//!
//! - **Desired**: a [`Schema`] parsed from the mapping file on a branch tip.
//!   A missing file is [`Schema::empty`].
//! - **Actual**: an [`ActualMapping`] reported by the search engine. A branch
//!   without any index is [`ActualMapping::Absent`], which is never equal to
//!   any schema, `{}` included.
//!
//! # Equality
//!
//! Schemas compare structurally: object key order is irrelevant, arrays are
//! ordered, and numbers compare by value (`1 == 1.0`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Errors from parsing a mapping document.
#[derive(Debug, Error)]
pub enum MappingError {
    /// The bytes are not valid JSON.
    #[error("invalid JSON: {0}")]
    Syntax(#[from] serde_json::Error),

    /// Valid JSON, but not an object.
    #[error("expected a JSON object, found {found}")]
    NotAnObject {
        /// JSON type that was found instead
        found: &'static str,
    },
}

/// An index mapping: a JSON object of field names to field definitions.
///
/// # Example
///
/// ```
/// use mapsync::core::schema::Schema;
///
/// let a = Schema::from_slice(br#"{"a": 1, "b": {"c": [1, 2]}}"#).unwrap();
/// let b = Schema::from_slice(br#"{"b": {"c": [1, 2.0]}, "a": 1}"#).unwrap();
/// assert_eq!(a, b);
/// assert_ne!(a, Schema::empty());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema(Map<String, Value>);

impl Schema {
    /// The empty mapping `{}`.
    pub fn empty() -> Self {
        Self(Map::new())
    }

    /// Parse a schema from raw JSON bytes.
    ///
    /// # Errors
    ///
    /// - [`MappingError::Syntax`] if the bytes are not JSON
    /// - [`MappingError::NotAnObject`] if the document is not a JSON object
    pub fn from_slice(bytes: &[u8]) -> Result<Self, MappingError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    /// Wrap an already-parsed JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::NotAnObject`] for anything but an object.
    pub fn from_value(value: Value) -> Result<Self, MappingError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(MappingError::NotAnObject {
                found: json_type(&other),
            }),
        }
    }

    /// Whether this is the empty mapping.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying JSON object.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Convert into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        objects_eq(&self.0, &other.0)
    }
}

impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(&self.0) {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(std::fmt::Error),
        }
    }
}

/// The mapping a search engine currently enforces for a branch.
#[derive(Debug, Clone, PartialEq)]
pub enum ActualMapping {
    /// No index exists for the branch.
    Absent,
    /// The active index for the branch and its mapping.
    Present {
        /// Concrete index name reported by the engine
        index: String,
        /// The index mapping
        mapping: Schema,
    },
}

impl ActualMapping {
    /// Whether the engine state already matches `desired`.
    ///
    /// `Absent` never matches, even when `desired` is empty.
    ///
    /// # Example
    ///
    /// ```
    /// use mapsync::core::schema::{ActualMapping, Schema};
    ///
    /// assert!(!ActualMapping::Absent.matches(&Schema::empty()));
    ///
    /// let present = ActualMapping::Present {
    ///     index: "master_1".to_string(),
    ///     mapping: Schema::empty(),
    /// };
    /// assert!(present.matches(&Schema::empty()));
    /// ```
    pub fn matches(&self, desired: &Schema) -> bool {
        match self {
            ActualMapping::Absent => false,
            ActualMapping::Present { mapping, .. } => mapping == desired,
        }
    }

    /// The concrete index name, if any.
    pub fn index(&self) -> Option<&str> {
        match self {
            ActualMapping::Absent => None,
            ActualMapping::Present { index, .. } => Some(index),
        }
    }
}

/// Structural deep equality over JSON values.
pub fn structural_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_eq(x, y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| structural_eq(a, b))
        }
        (Value::Object(x), Value::Object(y)) => objects_eq(x, y),
        _ => false,
    }
}

fn objects_eq(a: &Map<String, Value>, b: &Map<String, Value>) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(key, value)| b.get(key).is_some_and(|other| structural_eq(value, other)))
}

fn numbers_eq(a: &Number, b: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), b.as_u64()) {
        return x == y;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
