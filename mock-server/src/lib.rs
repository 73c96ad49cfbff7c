use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

/// What `/echo` saw of the incoming request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: HashMap<String, String>,
    pub body: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Attempts {
    pub attempts: u32,
}

/// Hit counters keyed by the caller-chosen name in `/flaky/{key}/..`.
pub type Counters = Arc<RwLock<HashMap<String, u32>>>;

pub fn app() -> Router {
    let counters: Counters = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/echo", any(echo))
        .route("/status/{code}", any(status))
        .route("/delay/{ms}", get(delay))
        .route("/flaky/{key}/{failures}", get(flaky))
        .route("/attempts/{key}", get(attempts))
        .route("/text", get(text))
        .route("/bytes", get(bytes))
        .with_state(counters)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    tracing::debug!(%status, "serving fixed status");
    Ok((status, format!("status {code}")))
}

async fn delay(Path(ms): Path<u64>) -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(serde_json::json!({ "delayed_ms": ms }))
}

async fn flaky(
    State(counters): State<Counters>,
    Path((key, failures)): Path<(String, u32)>,
) -> Result<Json<Attempts>, (StatusCode, String)> {
    let mut counters = counters.write().await;
    let hits = counters.entry(key).or_insert(0);
    *hits += 1;
    if *hits <= failures {
        return Err((StatusCode::SERVICE_UNAVAILABLE, format!("failure {hits} of {failures}")));
    }
    Ok(Json(Attempts { attempts: *hits }))
}

async fn attempts(State(counters): State<Counters>, Path(key): Path<String>) -> Json<Attempts> {
    let counters = counters.read().await;
    Json(Attempts {
        attempts: counters.get(&key).copied().unwrap_or(0),
    })
}

async fn text() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], "hello world")
}

async fn bytes() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        Bytes::from_static(&[0, 1, 2, 3]),
    )
}
