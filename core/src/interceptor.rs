//! Interceptor callbacks run at fixed points of a request.
//!
//! # Design
//! Three independent optional slots:
//! - `on_request` sees the assembled `RequestConfig` before the body is
//!   normalized and returns a `RequestPatch` of fields to replace.
//! - `on_response` receives the parsed body of a successful response and
//!   returns the value handed to the caller. It may be sync or async; both
//!   are stored as a boxed future.
//! - `on_error` is told about every failed attempt, including ones that are
//!   retried. It cannot change what happens next.
//!
//! Slots are `Arc`s so a configured set can be cloned into every call.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{self, BoxFuture, FutureExt};

use crate::error::FetchError;
use crate::http::{RequestConfig, RequestPatch};
use crate::types::ResponseBody;

pub type OnRequest = Arc<dyn Fn(&RequestConfig) -> RequestPatch + Send + Sync>;
pub type OnResponse =
    Arc<dyn Fn(ResponseBody) -> BoxFuture<'static, Result<ResponseBody, FetchError>> + Send + Sync>;
pub type OnError = Arc<dyn Fn(&FetchError) + Send + Sync>;

#[derive(Clone, Default)]
pub struct Interceptors {
    pub on_request: Option<OnRequest>,
    pub on_response: Option<OnResponse>,
    pub on_error: Option<OnError>,
}

impl fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptors")
            .field("on_request", &self.on_request.is_some())
            .field("on_response", &self.on_response.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl Interceptors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_request<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestConfig) -> RequestPatch + Send + Sync + 'static,
    {
        self.on_request = Some(Arc::new(f));
        self
    }

    pub fn on_response<F>(mut self, f: F) -> Self
    where
        F: Fn(ResponseBody) -> Result<ResponseBody, FetchError> + Send + Sync + 'static,
    {
        self.on_response = Some(Arc::new(move |body| future::ready(f(body)).boxed()));
        self
    }

    pub fn on_response_async<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(ResponseBody) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ResponseBody, FetchError>> + Send + 'static,
    {
        self.on_response = Some(Arc::new(move |body| f(body).boxed()));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&FetchError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(f));
        self
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn sync_and_async_on_response_share_a_shape() {
        let sync = Interceptors::new().on_response(|body| match body {
            ResponseBody::Json(v) => Ok(ResponseBody::Json(v["data"].clone())),
            other => Ok(other),
        });
        let asynchronous = Interceptors::new().on_response_async(|body| async move {
            tokio::task::yield_now().await;
            match body {
                ResponseBody::Json(v) => Ok(ResponseBody::Json(v["data"].clone())),
                other => Ok(other),
            }
        });

        for interceptors in [sync, asynchronous] {
            let hook = interceptors.on_response.unwrap();
            let out = hook(ResponseBody::Json(json!({"data": [1, 2]}))).await.unwrap();
            assert_eq!(out, ResponseBody::Json(json!([1, 2])));
        }
    }

    #[test]
    fn on_error_is_a_plain_callback() {
        let calls = Arc::new(AtomicUsize::new(0));
        let interceptors = Interceptors::new().on_error({
            let calls = calls.clone();
            move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            }
        });
        let hook = interceptors.on_error.unwrap();
        hook(&FetchError::network("reset"));
        hook(&FetchError::network("reset"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn debug_shows_which_slots_are_set() {
        let interceptors = Interceptors::new().on_request(|_| RequestPatch::default());
        let rendered = format!("{interceptors:?}");
        assert!(rendered.contains("on_request: true"));
        assert!(rendered.contains("on_error: false"));
    }
}
