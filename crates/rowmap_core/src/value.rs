//! Dynamic value type for column binds and row input.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A row as returned by a driver select or fed into entity construction:
/// a mapping from field/column alias to raw value.
pub type Row = BTreeMap<String, Value>;

/// A dynamic value.
///
/// Scalar variants (`Null`, `Bool`, `Integer`, `Float`, `Text`, `Timestamp`)
/// are what flows to the driver as statement binds. `Array` and `Map` only
/// appear in row-shaped input to entity construction, where they describe
/// nested entities and collections of nested entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean value. Drivers bind booleans as 0/1 integers.
    Bool(bool),
    /// Signed integer.
    Integer(i64),
    /// Floating point value.
    Float(f64),
    /// Text string (UTF-8).
    Text(String),
    /// Point in time as seconds since the Unix epoch.
    ///
    /// Timestamps bind as their integer representation.
    Timestamp(i64),
    /// A collection of row-shaped values (nested entities).
    Array(Vec<Value>),
    /// A row-shaped value (one nested entity).
    Map(Row),
}

impl Value {
    /// Returns true if the value is `Null` or an empty text string.
    ///
    /// Empty values are skipped during entity construction so the entity
    /// keeps its default for that field.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Returns true if the value is a scalar suitable for a statement bind.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        !matches!(self, Value::Array(_) | Value::Map(_))
    }

    /// Returns the integer content, coercing booleans and timestamps.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) | Value::Timestamp(n) => Some(*n),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Returns the text content, if any.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean content, coercing 0/1 integers.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Integer(0) => Some(false),
            Value::Integer(1) => Some(true),
            _ => None,
        }
    }

    /// Converts the value into the scalar form the driver binds:
    /// booleans become integers, timestamps become their integer seconds.
    #[must_use]
    pub fn into_bind(self) -> Value {
        match self {
            Value::Bool(b) => Value::Integer(i64::from(b)),
            Value::Timestamp(n) => Value::Integer(n),
            other => other,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", i64::from(*b)),
            Value::Integer(n) | Value::Timestamp(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Array(items) => write!(f, "[{} values]", items.len()),
            Value::Map(row) => write!(f, "{{{} fields}}", row.len()),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(i64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}
