//! The request executor.
//!
//! # Design
//! `Client` pairs a shared `ConfigStore` with a `Transport`. One call to
//! `execute` runs:
//!
//! ```text
//! Building ──▶ Sent ──▶ Succeeded
//!               ▲  │
//!               │  ▼
//!           Retrying ──▶ Failed   (attempt == retries)
//! ```
//!
//! Building happens once per call: URL, merged headers, transport fields,
//! the `on_request` patch, then body normalization. The resulting
//! `HttpRequest` is resent unchanged on every retry. Each attempt gets its
//! own deadline. Between attempts the executor sleeps `2^n * 100ms`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tracing::Instrument;
use uuid::Uuid;

use crate::abort::AbortSignal;
use crate::backoff::backoff_delay;
use crate::config::{ConfigPartial, ConfigStore};
use crate::error::FetchError;
use crate::http::{HttpRequest, HttpResponse, RequestBody, RequestConfig};
use crate::query::build_url;
use crate::transport::{HttpTransport, Transport};
use crate::types::{RequestOptions, ResponseBody, ResponseType};

const CONTENT_TYPE: &str = "content-type";
const JSON_CONTENT_TYPE: &str = "application/json";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

#[derive(Debug, Clone)]
pub struct Client<T = HttpTransport> {
    config: Arc<ConfigStore>,
    transport: T,
}

impl Default for Client<HttpTransport> {
    fn default() -> Self {
        Self::new()
    }
}

impl Client<HttpTransport> {
    /// A client with an empty configuration and a fresh `reqwest` pool.
    pub fn new() -> Self {
        Self::with_transport(HttpTransport::new())
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(transport: T) -> Self {
        Self::with_store(Arc::new(ConfigStore::new()), transport)
    }

    pub fn with_store(config: Arc<ConfigStore>, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    pub fn configure(&self, partial: ConfigPartial) {
        self.config.configure(partial);
    }

    /// Send a request to `path` and parse the response per `options.response_type`.
    pub async fn execute(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<ResponseBody, FetchError> {
        self.run(path, options, Ok).await
    }

    /// Send a request and decode the JSON response into `R`.
    ///
    /// Decoding happens inside the attempt, so a body that does not match
    /// `R` counts as a failed attempt and is retried like any other failure.
    pub async fn execute_json<R: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<R, FetchError> {
        let options = RequestOptions {
            response_type: ResponseType::Json,
            ..options
        };
        self.run(path, options, |body| match body {
            ResponseBody::Json(value) => serde_json::from_value(value).map_err(FetchError::parse),
            _ => Err(FetchError::parse("expected a JSON body")),
        })
        .await
    }

    async fn run<R, D>(&self, path: &str, options: RequestOptions, decode: D) -> Result<R, FetchError>
    where
        D: Fn(ResponseBody) -> Result<R, FetchError>,
    {
        let request = self.build(path, &options)?;
        let span = tracing::info_span!(
            "fetch",
            request_id = %Uuid::new_v4(),
            method = %request.method,
            url = %request.url,
        );
        self.retry_loop(request, &options, decode)
            .instrument(span)
            .await
    }

    /// Assemble the request that every attempt of this call will send.
    pub fn build(&self, path: &str, options: &RequestOptions) -> Result<HttpRequest, FetchError> {
        let url = build_url(self.config.base_url().as_deref(), path, &options.query);

        let mut headers = self.config.default_headers();
        if let Some(local) = &options.headers {
            headers.merge(local);
        }

        let mut transport = self.config.transport_defaults();
        transport.merge(options.transport());

        let mut config = RequestConfig {
            method: transport.method.unwrap_or_default(),
            url,
            headers,
            body: transport.body,
        };

        if let Some(on_request) = self.config.interceptors().and_then(|i| i.on_request) {
            config.apply(on_request(&config));
        }

        normalize(config)
    }

    async fn retry_loop<R, D>(
        &self,
        request: HttpRequest,
        options: &RequestOptions,
        decode: D,
    ) -> Result<R, FetchError>
    where
        D: Fn(ResponseBody) -> Result<R, FetchError>,
    {
        let max_retries = options.retries;
        let mut attempt = 0u32;
        loop {
            tracing::debug!(attempt, max_retries, "sending request");
            match self.attempt(&request, options, &decode).await {
                Ok(value) => {
                    tracing::debug!(attempt, "request succeeded");
                    return Ok(value);
                }
                Err(err) => {
                    if let Some(on_error) = self.config.interceptors().and_then(|i| i.on_error) {
                        on_error(&err);
                    }
                    if attempt >= max_retries {
                        tracing::warn!(attempt, error = %err, "request failed");
                        return Err(err);
                    }
                    attempt += 1;
                    let delay = backoff_delay(attempt);
                    tracing::warn!(
                        attempt,
                        max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn attempt<R, D>(
        &self,
        request: &HttpRequest,
        options: &RequestOptions,
        decode: &D,
    ) -> Result<R, FetchError>
    where
        D: Fn(ResponseBody) -> Result<R, FetchError>,
    {
        let response = with_deadline(
            self.transport.send(request.clone()),
            options.timeout,
            options.signal.as_ref(),
        )
        .await?;

        if !response.is_success() {
            return Err(FetchError::Http {
                status: response.status,
                status_text: response.status_text,
                body: String::from_utf8_lossy(&response.body).into_owned(),
            });
        }

        let mut body = parse_body(response, options.response_type)?;
        if let Some(on_response) = self.config.interceptors().and_then(|i| i.on_response) {
            body = on_response(body).await?;
        }
        decode(body)
    }
}

/// Race `send` against this attempt's timeout and the caller's abort signal.
///
/// The send branch is polled first, so a response that is already complete
/// wins over a deadline expiring in the same poll.
async fn with_deadline<F>(
    send: F,
    timeout: Option<Duration>,
    signal: Option<&AbortSignal>,
) -> Result<HttpResponse, FetchError>
where
    F: Future<Output = Result<HttpResponse, FetchError>>,
{
    if signal.is_some_and(AbortSignal::is_aborted) {
        return Err(FetchError::aborted("request aborted"));
    }

    let deadline = async {
        match timeout {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    let cancelled = async {
        match signal {
            Some(signal) => signal.aborted().await,
            None => std::future::pending().await,
        }
    };

    tokio::select! {
        biased;
        res = send => res,
        _ = deadline => Err(FetchError::aborted(format!(
            "request timed out after {}ms",
            timeout.unwrap_or_default().as_millis()
        ))),
        _ = cancelled => Err(FetchError::aborted("request aborted")),
    }
}

/// Serialize the body and fix up the content type.
fn normalize(config: RequestConfig) -> Result<HttpRequest, FetchError> {
    let RequestConfig {
        method,
        url,
        mut headers,
        body,
    } = config;

    let body = match body {
        None => None,
        Some(RequestBody::Json(value)) => {
            let text = serde_json::to_string(&value)
                .map_err(|e| FetchError::network(format!("failed to serialize request body: {e}")))?;
            headers.insert(CONTENT_TYPE, JSON_CONTENT_TYPE);
            Some(Bytes::from(text))
        }
        Some(RequestBody::Form(pairs)) => {
            if !headers.contains(CONTENT_TYPE) {
                headers.insert(CONTENT_TYPE, FORM_CONTENT_TYPE);
            }
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(pairs)
                .finish();
            Some(Bytes::from(encoded))
        }
        Some(RequestBody::Text(text)) => Some(Bytes::from(text)),
        Some(RequestBody::Bytes(bytes)) => Some(bytes),
    };

    Ok(HttpRequest {
        method,
        url,
        headers,
        body,
    })
}

fn parse_body(response: HttpResponse, response_type: ResponseType) -> Result<ResponseBody, FetchError> {
    match response_type {
        ResponseType::Json => serde_json::from_slice(&response.body)
            .map(ResponseBody::Json)
            .map_err(FetchError::parse),
        ResponseType::Text => Ok(ResponseBody::Text(
            String::from_utf8_lossy(&response.body).into_owned(),
        )),
        ResponseType::Blob => Ok(ResponseBody::Blob {
            content_type: response.headers.get(CONTENT_TYPE).map(str::to_string),
            data: response.body,
        }),
        ResponseType::Bytes => Ok(ResponseBody::Bytes(response.body)),
    }
}
