//! Scalar cell values.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::field::FieldKind;

/// A single table cell. Every column of a fetched table is a sequence of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(NaiveDateTime),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Timestamp(_) => "timestamp",
            Value::String(_) => "string",
        }
    }

    /// Whether a non-null value of this variant may be compared against a
    /// column of `kind`. Integers and floats are mutually comparable.
    pub fn is_compatible_with(&self, kind: FieldKind) -> bool {
        matches!(
            (self, kind),
            (Value::Null, _)
                | (Value::Integer(_) | Value::Float(_), FieldKind::Integer | FieldKind::Float)
                | (Value::Boolean(_), FieldKind::Boolean)
                | (Value::Timestamp(_), FieldKind::DateTime)
                | (Value::String(_), FieldKind::String)
        )
    }

    /// Compare two non-null values of compatible variants.
    ///
    /// Returns `None` when either side is null, the variants cannot be
    /// compared, or a float is NaN.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Ordering used for sorting: nulls (and NaN) go after every other value.
    pub(crate) fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self.is_sortable_null(), other.is_sortable_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => self.compare(other).unwrap_or(Ordering::Equal),
        }
    }

    pub(crate) fn is_sortable_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Read this value as `T`, failing on a variant mismatch.
    pub fn try_as<T: FromValue>(&self) -> Result<T, CoreError> {
        T::from_value(self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Timestamp(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Parse an ISO-8601 date or datetime. Offsets are normalized to UTC.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    let text = text.trim();
    for format in FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.naive_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Typed extraction from a [`Value`]. Mismatched variants are an error,
/// never a coercion.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self, CoreError>;
}

fn mismatch(expected: &'static str, value: &Value) -> CoreError {
    CoreError::TypeMismatch {
        expected: expected.to_string(),
        found: value.kind_name().to_string(),
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, CoreError> {
        match value {
            Value::Integer(v) => Ok(*v),
            other => Err(mismatch("integer", other)),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, CoreError> {
        match value {
            Value::Float(v) => Ok(*v),
            other => Err(mismatch("float", other)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, CoreError> {
        match value {
            Value::Boolean(v) => Ok(*v),
            other => Err(mismatch("boolean", other)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, CoreError> {
        match value {
            Value::String(v) => Ok(v.clone()),
            other => Err(mismatch("string", other)),
        }
    }
}

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> Result<Self, CoreError> {
        match value {
            Value::Timestamp(v) => Ok(*v),
            other => Err(mismatch("timestamp", other)),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, CoreError> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
