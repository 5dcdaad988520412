//! Failure injection tests for the edge proxy.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, StatusCode};
use serde_json::Value;

mod common;

use common::{client, config_for, refused_origin, reply, start_backend, start_proxy};

#[tokio::test]
async fn test_api_connection_refused_is_500() {
    let proxy = start_proxy(config_for(&refused_origin().await)).await;

    let res = client()
        .post(proxy.url("/api/proxy/generate"))
        .header("Content-Type", "application/json")
        .body("{}")
        .send()
        .await
        .expect("Proxy unreachable");

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let json: Value = res.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().starts_with("Proxy error: "));
    let timestamp = json["timestamp"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
}

#[tokio::test]
async fn test_audio_connection_refused_is_404() {
    let proxy = start_proxy(config_for(&refused_origin().await)).await;

    let res = client()
        .get(proxy.url("/api/audio-proxy/abc/voice.mp3"))
        .header("Range", "bytes=0-")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["error"], "Audio file not found");
    assert_eq!(json["path"], "/abc/voice.mp3");
}

#[tokio::test]
async fn test_upstream_timeout_maps_through_error_policy() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept connections but never answer.
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let mut config = config_for(&format!("http://{addr}"));
    config.timeouts.upstream_secs = Some(1);
    let proxy = start_proxy(config).await;
    let client = client();

    let res = client.get(proxy.url("/api/proxy/voices")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = res.json().await.unwrap();
    assert_eq!(json["error"], "Proxy error: upstream did not respond within 1s");

    let res = client.get(proxy.url("/api/audio-proxy/a.mp3")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_no_retries_on_failure() {
    let calls = Arc::new(AtomicU32::new(0));
    let counted = calls.clone();
    let backend = start_backend(move |_| {
        counted.fetch_add(1, Ordering::SeqCst);
        reply(503, &[], "Service Unavailable")
    })
    .await;
    let proxy = start_proxy(config_for(&backend.origin())).await;

    let res = client().get(proxy.url("/api/proxy/voices")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);

    let res = client().get(proxy.url("/api/audio-proxy/a.mp3")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    assert_eq!(calls.load(Ordering::SeqCst), 2, "each request hits the backend exactly once");
}

#[tokio::test]
async fn test_config_update_switches_backend() {
    let old = start_backend(|_| reply(200, &[], "old")).await;
    let new = start_backend(|_| reply(200, &[], "new")).await;
    let proxy = start_proxy(config_for(&old.origin())).await;
    let client = client();

    let body = client
        .get(proxy.url("/api/proxy/voices"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, "old");

    proxy.config_updates.send(config_for(&new.origin())).unwrap();

    let mut switched = false;
    for _ in 0..50 {
        let body = client
            .get(proxy.url("/api/proxy/voices"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        if body == "new" {
            switched = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(switched, "proxy should forward to the new origin after reload");
    assert_eq!(new.last().target, "/api/voices");
}
