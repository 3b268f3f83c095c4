use std::io::Write;
use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use flate2::Compression;
use flate2::write::GzEncoder;
use metrio_common::sign;
use metrio_server::router::router;
use metrio_server::state::AppState;
use metrio_storage::{FileStore, MemoryStore, MetricStore};
use serde_json::{Value, json};
use tower::util::ServiceExt;

fn app(key: Option<&str>) -> axum::Router {
    router(AppState {
        store: Arc::new(MemoryStore::new()),
        key: key.map(String::from),
    })
}

async fn send(
    app: &axum::Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Vec<u8>,
) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

fn gzip(body: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body).unwrap();
    encoder.finish().unwrap()
}

#[tokio::test]
async fn counter_accumulates_over_path_updates() {
    let app = app(None);
    for _ in 0..3 {
        let (status, _) = send(&app, "POST", "/update/counter/PollCount/1", &[], vec![]).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = send(&app, "GET", "/value/counter/PollCount", &[], vec![]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"3");
}

#[tokio::test]
async fn gauge_takes_the_last_written_value() {
    let app = app(None);
    send(&app, "POST", "/update/gauge/Alloc/100.0", &[], vec![]).await;
    let (status, _) = send(&app, "POST", "/update/gauge/Alloc/250.5", &[], vec![]).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/value/gauge/Alloc", &[], vec![]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"250.5");
}

#[tokio::test]
async fn unknown_metric_type_is_a_bad_request() {
    let app = app(None);
    let (status, _) = send(&app, "POST", "/update/histogram/X/1", &[], vec![]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unparsable_value_is_a_bad_request() {
    let app = app(None);
    let (status, _) = send(&app, "POST", "/update/counter/PollCount/1.5", &[], vec![]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = send(&app, "POST", "/update/gauge/Alloc/abc", &[], vec![]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_metric_reads_as_not_found_with_empty_body() {
    let app = app(None);
    let (status, body) = send(&app, "GET", "/value/gauge/DoesNotExist", &[], vec![]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.is_empty());
}

#[tokio::test]
async fn body_update_echoes_the_merged_value() {
    let app = app(None);
    send(&app, "POST", "/update/counter/PollCount/2", &[], vec![]).await;

    let payload = json!({"id": "PollCount", "type": "counter", "delta": 3})
        .to_string()
        .into_bytes();
    let (status, body) = send(
        &app,
        "POST",
        "/update/",
        &[("Content-Type", "application/json")],
        payload,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let echoed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(echoed["delta"], 5);
}

#[tokio::test]
async fn gzip_encoded_update_body_is_decoded() {
    let app = app(None);
    let payload = json!({"id": "Alloc", "type": "gauge", "value": 42.5}).to_string();
    let (status, body) = send(
        &app,
        "POST",
        "/update/",
        &[
            ("Content-Type", "application/json"),
            ("Content-Encoding", "gzip"),
        ],
        gzip(payload.as_bytes()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let echoed: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(echoed["value"], 42.5);
}

#[tokio::test]
async fn malformed_json_body_is_a_server_error() {
    let app = app(None);
    let (status, _) = send(
        &app,
        "POST",
        "/update/",
        &[("Content-Type", "application/json")],
        b"{not json".to_vec(),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn batch_applies_every_metric() {
    let app = app(None);
    let payload = json!([
        {"id": "Alloc", "type": "gauge", "value": 1.5},
        {"id": "PollCount", "type": "counter", "delta": 2},
        {"id": "PollCount", "type": "counter", "delta": 3},
    ])
    .to_string()
    .into_bytes();
    let (status, _) = send(
        &app,
        "POST",
        "/updates/",
        &[("Content-Type", "application/json")],
        payload,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", "/value/counter/PollCount", &[], vec![]).await;
    assert_eq!(body, b"5");
    let (_, body) = send(&app, "GET", "/value/gauge/Alloc", &[], vec![]).await;
    assert_eq!(body, b"1.5");
}

#[tokio::test]
async fn signed_batch_is_verified_over_the_uncompressed_body() {
    let app = app(Some("secret"));
    let payload = json!([{"id": "Alloc", "type": "gauge", "value": 1.0}]).to_string();
    let signature = sign::sign("secret", payload.as_bytes());

    let (status, _) = send(
        &app,
        "POST",
        "/updates/",
        &[
            ("Content-Type", "application/json"),
            ("Content-Encoding", "gzip"),
            (sign::SIGNATURE_HEADER, signature.as_str()),
        ],
        gzip(payload.as_bytes()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn wrong_or_missing_signature_is_rejected() {
    let app = app(Some("secret"));
    let payload = json!([{"id": "Alloc", "type": "gauge", "value": 1.0}]).to_string();
    let forged = sign::sign("other", payload.as_bytes());

    let (status, _) = send(
        &app,
        "POST",
        "/updates/",
        &[(sign::SIGNATURE_HEADER, forged.as_str())],
        payload.clone().into_bytes(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "POST", "/updates/", &[], payload.into_bytes()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn value_body_fills_in_the_current_value() {
    let app = app(None);
    send(&app, "POST", "/update/gauge/HeapSys/7.25", &[], vec![]).await;

    let query = json!({"id": "HeapSys", "type": "gauge"}).to_string().into_bytes();
    let (status, body) = send(
        &app,
        "POST",
        "/value/",
        &[("Content-Type", "application/json")],
        query,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let filled: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(filled["value"], 7.25);

    let unknown = json!({"id": "Nope", "type": "counter"}).to_string().into_bytes();
    let (status, _) = send(
        &app,
        "POST",
        "/value/",
        &[("Content-Type", "application/json")],
        unknown,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn index_lists_gauges_and_counters() {
    let app = app(None);
    send(&app, "POST", "/update/gauge/Alloc/1.5", &[], vec![]).await;
    send(&app, "POST", "/update/counter/PollCount/4", &[], vec![]).await;

    let (status, body) = send(&app, "GET", "/", &[], vec![]).await;
    assert_eq!(status, StatusCode::OK);
    let page = String::from_utf8(body).unwrap();
    assert!(page.contains("Alloc: 1.5"));
    assert!(page.contains("PollCount: 4"));
}

#[tokio::test]
async fn ping_without_a_database_is_a_server_error() {
    let app = app(None);
    let (status, _) = send(&app, "GET", "/ping", &[], vec![]).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn restored_image_is_served_before_any_update() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("metrics.json");

    let seed = FileStore::new(path.clone());
    seed.set_gauge("Alloc", 1.5).await.unwrap();
    seed.add_counter("PollCount", 5).await.unwrap();
    seed.persist().await.unwrap();

    let store = FileStore::new(path);
    store.restore().await.unwrap();
    let app = router(AppState {
        store: Arc::new(store),
        key: None,
    });

    let (_, body) = send(&app, "GET", "/value/gauge/Alloc", &[], vec![]).await;
    assert_eq!(body, b"1.5");
    let (_, body) = send(&app, "GET", "/value/counter/PollCount", &[], vec![]).await;
    assert_eq!(body, b"5");
}
