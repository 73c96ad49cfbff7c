//! Per-call options and parsed response values.

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::abort::AbortSignal;
use crate::headers::Headers;
use crate::http::{HttpMethod, RequestBody, TransportOptions};

/// A primitive query-string value, rendered in its natural textual form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryValue::Bool(b) => write!(f, "{b}"),
            QueryValue::Int(n) => write!(f, "{n}"),
            QueryValue::Float(n) => write_number(f, *n),
            QueryValue::Str(s) => f.write_str(s),
        }
    }
}

/// Renders a float the way a JavaScript number prints: `NaN`, `Infinity`,
/// and exponent notation outside `1e-6..1e21`.
fn write_number(f: &mut fmt::Formatter<'_>, n: f64) -> fmt::Result {
    if n.is_nan() {
        return f.write_str("NaN");
    }
    if n.is_infinite() {
        return f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" });
    }
    if n == 0.0 {
        return f.write_str("0");
    }
    let magnitude = n.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return write!(f, "{n}");
    }
    let exp = format!("{n:e}");
    match exp.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => write!(f, "{mantissa}e+{power}"),
        _ => f.write_str(&exp),
    }
}

impl From<bool> for QueryValue {
    fn from(b: bool) -> Self {
        QueryValue::Bool(b)
    }
}

impl From<i32> for QueryValue {
    fn from(n: i32) -> Self {
        QueryValue::Int(n.into())
    }
}

impl From<i64> for QueryValue {
    fn from(n: i64) -> Self {
        QueryValue::Int(n)
    }
}

impl From<u32> for QueryValue {
    fn from(n: u32) -> Self {
        QueryValue::Int(n.into())
    }
}

impl From<u64> for QueryValue {
    fn from(n: u64) -> Self {
        match i64::try_from(n) {
            Ok(n) => QueryValue::Int(n),
            Err(_) => QueryValue::Str(n.to_string()),
        }
    }
}

impl From<usize> for QueryValue {
    fn from(n: usize) -> Self {
        match i64::try_from(n) {
            Ok(n) => QueryValue::Int(n),
            Err(_) => QueryValue::Str(n.to_string()),
        }
    }
}

impl From<f64> for QueryValue {
    fn from(n: f64) -> Self {
        QueryValue::Float(n)
    }
}

impl From<&str> for QueryValue {
    fn from(s: &str) -> Self {
        QueryValue::Str(s.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(s: String) -> Self {
        QueryValue::Str(s)
    }
}

/// How a successful response body is parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    #[default]
    Json,
    Text,
    /// Raw bytes tagged with the response's content type.
    Blob,
    Bytes,
}

/// A parsed response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(serde_json::Value),
    Text(String),
    Blob {
        content_type: Option<String>,
        data: Bytes,
    },
    Bytes(Bytes),
}

impl ResponseBody {
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            ResponseBody::Blob { data, .. } | ResponseBody::Bytes(data) => Some(data),
            _ => None,
        }
    }
}

/// Options for a single `execute` call.
///
/// ```
/// use std::time::Duration;
/// use fetch_core::RequestOptions;
///
/// let options = RequestOptions {
///     retries: 2,
///     timeout: Some(Duration::from_millis(500)),
///     ..Default::default()
/// }
/// .query("page", 1);
/// assert_eq!(options.query.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Appended to the URL in insertion order. Empty means no query string.
    pub query: Vec<(String, QueryValue)>,
    /// Per-attempt deadline.
    pub timeout: Option<Duration>,
    /// Extra attempts after the first one fails.
    pub retries: u32,
    pub response_type: ResponseType,
    pub method: Option<HttpMethod>,
    pub headers: Option<Headers>,
    pub body: Option<RequestBody>,
    pub signal: Option<AbortSignal>,
}

impl RequestOptions {
    pub fn query(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.get_or_insert_with(Headers::new).insert(name, value);
        self
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(value));
        self
    }

    /// Transport fields of these options, for merging over global defaults.
    pub(crate) fn transport(&self) -> TransportOptions {
        TransportOptions {
            method: self.method,
            body: self.body.clone(),
        }
    }
}
