// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Liveness under load and graceful shutdown against a real listener.

use super::common::{app_with_model, get_json, post_json, state_with_model, SlowEmbedder};
use axum::http::StatusCode;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use text_embedding_service::{api::serve, config::RequestLimits};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_health_responsive_while_workers_busy() {
    // 2 workers, 6 requests of 800ms each: the pool stays saturated for ~2.4s
    let app = app_with_model(
        Arc::new(SlowEmbedder::new(Duration::from_millis(800))),
        RequestLimits::default(),
    );

    let in_flight: Vec<_> = (0..6)
        .map(|i| {
            let app = app.clone();
            tokio::spawn(async move {
                post_json(&app, "/embed", &json!({"texts": [format!("busy {}", i)]}))
                    .await
                    .0
            })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(100)).await;

    let (status, body) = tokio::time::timeout(Duration::from_millis(200), get_json(&app, "/health"))
        .await
        .expect("/health waited behind inference");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    for handle in in_flight {
        assert_eq!(handle.await.unwrap(), StatusCode::OK);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_shutdown_drains_in_flight_request() {
    let state = state_with_model(
        Arc::new(SlowEmbedder::new(Duration::from_millis(300))),
        RequestLimits::default(),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server = tokio::spawn(serve(listener, state, async move {
        shutdown_rx.await.ok();
    }));

    let body = r#"{"texts": ["in flight"]}"#;
    let request = format!(
        "POST /embed HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        addr,
        body.len(),
        body
    );
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();

    // signal while the embedding is still running
    tokio::time::sleep(Duration::from_millis(100)).await;
    shutdown_tx.send(()).unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let response = String::from_utf8_lossy(&raw);
    assert!(
        response.starts_with("HTTP/1.1 200 OK"),
        "in-flight request was not drained: {}",
        response
    );
    assert!(response.contains("\"count\":1"));

    let result = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop after draining")
        .unwrap();
    assert!(result.is_ok());

    // listener is closed once serve returns
    assert!(TcpStream::connect(addr).await.is_err());
}
