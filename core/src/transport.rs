//! The I/O seam between the executor and the network.
//!
//! # Design
//! The executor never talks to the network directly. It hands a normalized
//! `HttpRequest` to a `Transport` and gets back an `HttpResponse` whose body
//! has been read in full. `HttpTransport` does this with `reqwest`; tests
//! plug in scripted transports.
//!
//! Dropping the future returned by `send` cancels the request. The executor
//! relies on this to enforce timeouts and abort signals.

use std::future::Future;

use bytes::Bytes;

use crate::error::{FetchError, BODY_UNAVAILABLE};
use crate::headers::Headers;
use crate::http::{HttpRequest, HttpResponse};

pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, FetchError>> + Send;
}

/// `reqwest`-backed transport. Cloning shares the connection pool.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
        let mut builder = self.client.request(request.method.into(), &request.url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let headers = Headers::from(response.headers());
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(err) if status.is_success() => return Err(classify(err)),
            Err(err) => {
                tracing::debug!(error = %err, "could not read error response body");
                Bytes::from_static(BODY_UNAVAILABLE.as_bytes())
            }
        };

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            body,
        })
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::aborted(err.to_string())
    } else {
        FetchError::network(err.to_string())
    }
}
