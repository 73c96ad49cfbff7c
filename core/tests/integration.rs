//! End-to-end tests against the live mock server.
//!
//! # Design
//! Each test starts the mock server on a random port and drives a real
//! `Client` (reqwest transport) at it. Covers URL building, header merging,
//! body normalization, response parsing, retries against real status codes,
//! and timeouts against a server that answers too slowly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fetch_core::error::BODY_UNAVAILABLE;
use fetch_core::{
    AbortController, Client, ConfigPartial, FetchError, Headers, HttpMethod, Interceptors, RequestOptions,
    ResponseBody, ResponseType,
};
use mock_server::{Attempts, Echo};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

async fn start_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run(listener));
    format!("http://{addr}")
}

async fn client() -> Client {
    let base_url = start_server().await;
    let client = Client::new();
    client.configure(ConfigPartial {
        base_url: Some(base_url),
        ..Default::default()
    });
    client
}

#[tokio::test]
async fn get_with_query_reaches_server_encoded() {
    let client = client().await;
    let options = RequestOptions::default().query("page", 1).query("q", "a b");
    let echo: Echo = client.execute_json("/echo", options).await.unwrap();

    assert_eq!(echo.method, "GET");
    assert_eq!(echo.path, "/echo");
    assert_eq!(echo.query.as_deref(), Some("page=1&q=a%20b"));
}

#[tokio::test]
async fn json_post_merges_headers_and_sets_content_type() {
    let client = client().await;
    client.configure(ConfigPartial {
        default_headers: Some(Headers::from([("Authorization", "Bearer global"), ("X-App", "tests")])),
        ..Default::default()
    });

    let options = RequestOptions {
        method: Some(HttpMethod::Post),
        ..Default::default()
    }
    .header("authorization", "Bearer local")
    .header("content-type", "text/plain")
    .json(json!({"title": "Buy milk", "done": false}));
    let echo: Echo = client.execute_json("/echo", options).await.unwrap();

    assert_eq!(echo.method, "POST");
    assert_eq!(echo.headers["authorization"], "Bearer local");
    assert_eq!(echo.headers["x-app"], "tests");
    assert_eq!(echo.headers["content-type"], "application/json");
    let sent: serde_json::Value = serde_json::from_str(&echo.body).unwrap();
    assert_eq!(sent, json!({"title": "Buy milk", "done": false}));
}

#[tokio::test]
async fn text_blob_and_bytes_modes() {
    let client = client().await;

    let text = client
        .execute(
            "/text",
            RequestOptions {
                response_type: ResponseType::Text,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(text, ResponseBody::Text("hello world".to_string()));

    let blob = client
        .execute(
            "/bytes",
            RequestOptions {
                response_type: ResponseType::Blob,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    match blob {
        ResponseBody::Blob { content_type, data } => {
            assert_eq!(content_type.as_deref(), Some("application/octet-stream"));
            assert_eq!(data.as_ref(), &[0u8, 1, 2, 3]);
        }
        other => panic!("expected blob, got {other:?}"),
    }

    let raw = client
        .execute(
            "/bytes",
            RequestOptions {
                response_type: ResponseType::Bytes,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(raw.as_bytes().map(|b| b.to_vec()), Some(vec![0, 1, 2, 3]));
}

#[tokio::test]
async fn server_error_is_retried_then_surfaced() {
    let client = client().await;
    let errors = Arc::new(AtomicUsize::new(0));
    client.configure(ConfigPartial {
        interceptors: Some(Interceptors::new().on_error({
            let errors = errors.clone();
            move |_| {
                errors.fetch_add(1, Ordering::SeqCst);
            }
        })),
        ..Default::default()
    });

    let err = client
        .execute("/status/500", RequestOptions { retries: 2, ..Default::default() })
        .await
        .unwrap_err();

    match err {
        FetchError::Http { status, status_text, body } => {
            assert_eq!(status, 500);
            assert_eq!(status_text, "Internal Server Error");
            assert_eq!(body, "status 500");
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
    assert_eq!(errors.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn always_failing_endpoint_sees_retries_plus_one_attempts() {
    let client = client().await;
    let err = client
        .execute("/flaky/exhaust/100", RequestOptions { retries: 2, ..Default::default() })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));

    let seen: Attempts = client
        .execute_json("/attempts/exhaust", RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(seen.attempts, 3);
}

#[tokio::test]
async fn flaky_endpoint_recovers_within_budget() {
    let client = client().await;
    let result: Attempts = client
        .execute_json("/flaky/recover/1", RequestOptions { retries: 3, ..Default::default() })
        .await
        .unwrap();
    assert_eq!(result.attempts, 2);

    // success stops the loop: no further hits were made
    let seen: Attempts = client
        .execute_json("/attempts/recover", RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(seen.attempts, 2);
}

#[tokio::test]
async fn timeout_against_slow_server_is_an_abort() {
    let client = client().await;
    let err = client
        .execute(
            "/delay/10000",
            RequestOptions {
                timeout: Some(Duration::from_millis(50)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

    assert!(err.is_aborted(), "expected abort, got {err:?}");
    assert!(matches!(err, FetchError::Network { .. }));
}

#[tokio::test]
async fn timeout_longer_than_response_is_a_no_op() {
    let client = client().await;
    let body = client
        .execute(
            "/delay/10",
            RequestOptions {
                timeout: Some(Duration::from_secs(5)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(body.as_json().unwrap()["delayed_ms"], 10);
}

#[tokio::test]
async fn caller_abort_cancels_in_flight_request() {
    let client = client().await;
    let controller = AbortController::new();
    let options = RequestOptions {
        signal: Some(controller.signal()),
        ..Default::default()
    };

    tokio::spawn({
        let controller = controller.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            controller.abort();
        }
    });

    let err = client.execute("/delay/10000", options).await.unwrap_err();
    assert!(err.is_aborted());
}

#[tokio::test]
async fn connection_refused_is_a_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = Client::new();
    let err = client
        .execute(&format!("http://{addr}/nothing"), RequestOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Network { aborted: false, .. }));
}

#[tokio::test]
async fn on_response_transforms_what_the_caller_receives() {
    let client = client().await;
    client.configure(ConfigPartial {
        interceptors: Some(Interceptors::new().on_response_async(|body| async move {
            match body {
                ResponseBody::Json(value) => Ok(ResponseBody::Json(value["method"].clone())),
                other => Ok(other),
            }
        })),
        ..Default::default()
    });

    let method: String = client.execute_json("/echo", RequestOptions::default()).await.unwrap();
    assert_eq!(method, "GET");
}

#[tokio::test]
async fn unreadable_error_body_becomes_placeholder() {
    // promises 100 body bytes, sends 3, then hangs up
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = socket.read(&mut buf).await;
        socket
            .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\nabc")
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
    });

    let errors = Arc::new(AtomicUsize::new(0));
    let client = Client::new();
    client.configure(ConfigPartial {
        base_url: Some(format!("http://{addr}")),
        interceptors: Some(Interceptors::new().on_error({
            let errors = errors.clone();
            move |_| {
                errors.fetch_add(1, Ordering::SeqCst);
            }
        })),
        ..Default::default()
    });

    let err = client
        .execute("/broken", RequestOptions::default())
        .await
        .unwrap_err();

    match err {
        FetchError::Http { status, body, .. } => {
            assert_eq!(status, 500);
            assert_eq!(body, BODY_UNAVAILABLE);
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
    assert_eq!(errors.load(Ordering::SeqCst), 1);
}
