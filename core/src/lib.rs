//! Retrying, timeout-aware HTTP request utility.
//!
//! # Overview
//! A `ConfigStore` holds the settings every request reads at call time: base
//! URL, default headers, interceptors, and transport defaults. A `Client`
//! combines that store with a `Transport` and turns a path plus
//! `RequestOptions` into a parsed `ResponseBody` or a `FetchError`.
//!
//! # Design
//! - Configuration is an explicit `Arc<ConfigStore>` owned by each `Client`.
//!   A process-wide default client backs the free functions `configure`,
//!   `execute`, and `execute_json` for "configure once" use.
//! - The network sits behind the `Transport` trait. `HttpTransport` uses
//!   `reqwest`; tests substitute scripted transports.
//! - Interceptors are three optional callbacks. They can rewrite the
//!   request, transform the parsed body, and observe failures.
//!
//! ```no_run
//! use fetch_core::{configure, execute, ConfigPartial, RequestOptions};
//!
//! # async fn run() -> Result<(), fetch_core::FetchError> {
//! configure(ConfigPartial {
//!     base_url: Some("https://api.example.com".to_string()),
//!     ..Default::default()
//! });
//! let user = execute("/users/1", RequestOptions { retries: 2, ..Default::default() }).await?;
//! println!("{:?}", user.as_json());
//! # Ok(())
//! # }
//! ```

pub mod abort;
pub mod backoff;
pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod http;
pub mod interceptor;
pub mod query;
pub mod transport;
pub mod types;

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;

pub use abort::{AbortController, AbortSignal};
pub use client::Client;
pub use config::{ConfigPartial, ConfigStore, GlobalConfig};
pub use error::FetchError;
pub use headers::Headers;
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestBody, RequestConfig, RequestPatch, TransportOptions};
pub use interceptor::Interceptors;
pub use transport::{HttpTransport, Transport};
pub use types::{QueryValue, RequestOptions, ResponseBody, ResponseType};

static DEFAULT_CLIENT: Lazy<Client> = Lazy::new(Client::new);

/// The process-wide client used by the free functions.
///
/// Its `reqwest` connection pool is bound to the tokio runtime that first
/// drives a request through it. Code that runs several runtimes in one
/// process (one per `#[tokio::test]`, for instance) should build its own
/// `Client` per runtime; reusing pooled connections across runtimes can fail
/// with "runtime dropped the dispatch task".
pub fn default_client() -> &'static Client {
    &DEFAULT_CLIENT
}

/// Shallow-merge `partial` into the process-wide configuration.
pub fn configure(partial: ConfigPartial) {
    DEFAULT_CLIENT.configure(partial);
}

/// Execute a request with the process-wide client.
pub async fn execute(path: &str, options: RequestOptions) -> Result<ResponseBody, FetchError> {
    DEFAULT_CLIENT.execute(path, options).await
}

/// Execute a request with the process-wide client and decode the JSON body.
pub async fn execute_json<R: DeserializeOwned>(
    path: &str,
    options: RequestOptions,
) -> Result<R, FetchError> {
    DEFAULT_CLIENT.execute_json(path, options).await
}
