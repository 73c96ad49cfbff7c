//! HTTP types shared by the executor and its transports.
//!
//! # Design
//! Requests and responses are plain data. The executor assembles a
//! `RequestConfig` (the shape interceptors see), normalizes its body into an
//! `HttpRequest`, and hands that to a `Transport`. The transport returns an
//! `HttpResponse` with the body already read into memory.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::headers::Headers;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// Request payload before normalization.
///
/// `Json` is the only structured variant; it is serialized and forces a JSON
/// content type. The others are already serialized and pass through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestBody {
    Json(serde_json::Value),
    Text(String),
    Bytes(Bytes),
    Form(Vec<(String, String)>),
}

impl From<serde_json::Value> for RequestBody {
    fn from(value: serde_json::Value) -> Self {
        RequestBody::Json(value)
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_string())
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        RequestBody::Bytes(bytes)
    }
}

/// Transport-level fields that can be set globally as defaults or per call.
///
/// Merging is field by field: a `Some` on the overriding side wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportOptions {
    pub method: Option<HttpMethod>,
    pub body: Option<RequestBody>,
}

impl TransportOptions {
    pub fn merge(&mut self, other: TransportOptions) {
        if other.method.is_some() {
            self.method = other.method;
        }
        if other.body.is_some() {
            self.body = other.body;
        }
    }
}

/// The assembled request as seen by the `on_request` interceptor.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestConfig {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body: Option<RequestBody>,
}

/// Replacement fields returned by an `on_request` interceptor.
///
/// Each `Some` field replaces the assembled value wholesale; `None` keeps it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestPatch {
    pub method: Option<HttpMethod>,
    pub url: Option<String>,
    pub headers: Option<Headers>,
    pub body: Option<RequestBody>,
}

impl RequestConfig {
    pub fn apply(&mut self, patch: RequestPatch) {
        if let Some(method) = patch.method {
            self.method = method;
        }
        if let Some(url) = patch.url {
            self.url = url;
        }
        if let Some(headers) = patch.headers {
            self.headers = headers;
        }
        if let Some(body) = patch.body {
            self.body = Some(body);
        }
    }
}

/// A fully normalized request, ready for a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Bytes>,
}

/// A response with its body read into memory.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Headers,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
