use std::fmt;

use chrono::{DateTime, Utc};

/// Driver-level bind value. This is what actually travels to the database;
/// every builder-level [`Value`] lowers to one of these during extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    BigInt(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
    BigIntArray(Vec<i64>),
    TextArray(Vec<String>),
}

impl SqlValue {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::BigInt(_) => "bigint",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamptz",
            Self::BigIntArray(_) => "bigint[]",
            Self::TextArray(_) => "text[]",
        }
    }
}

/// Structured bind values the driver cannot accept as-is (JSON payloads,
/// string-coded enums). Implementors produce the raw scalar that is bound
/// in their place.
pub trait RawBind: fmt::Debug + Send + Sync {
    fn raw(&self) -> SqlValue;
}

/// JSON payload bound as its raw text rendering.
#[derive(Debug, Clone)]
pub struct Json(pub serde_json::Value);

impl RawBind for Json {
    fn raw(&self) -> SqlValue {
        SqlValue::Text(self.0.to_string())
    }
}

/// Builder-level bind value carried inside a query description. Scalars map
/// straight through to [`SqlValue`]; `Structured` values are unwrapped via
/// [`RawBind`] when the query is extracted.
#[derive(Debug)]
pub enum Value {
    Null,
    Bool(bool),
    BigInt(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
    BigIntArray(Vec<i64>),
    TextArray(Vec<String>),
    Structured(Box<dyn RawBind>),
}

impl Value {
    pub fn structured(value: impl RawBind + 'static) -> Self {
        Self::Structured(Box::new(value))
    }

    /// Array-typed values are rendered with an explicit cast suffix so the
    /// SQL text is self-describing; the extractor strips it again because
    /// the driver infers array typing from the bound value itself.
    pub(crate) fn array_cast(&self) -> Option<&'static str> {
        match self {
            Self::BigIntArray(_) => Some("bigint"),
            Self::TextArray(_) => Some("text"),
            _ => None,
        }
    }

    pub fn into_bind(self) -> SqlValue {
        match self {
            Self::Null => SqlValue::Null,
            Self::Bool(b) => SqlValue::Bool(b),
            Self::BigInt(i) => SqlValue::BigInt(i),
            Self::Text(s) => SqlValue::Text(s),
            Self::Timestamp(t) => SqlValue::Timestamp(t),
            Self::BigIntArray(v) => SqlValue::BigIntArray(v),
            Self::TextArray(v) => SqlValue::TextArray(v),
            Self::Structured(s) => s.raw(),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::BigInt(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Self::BigIntArray(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Self::TextArray(v)
    }
}
