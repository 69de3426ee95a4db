//! ---
//! fcp_section: "03-observability"
//! fcp_subsection: "tests"
//! fcp_type: "source"
//! fcp_scope: "test"
//! fcp_description: "Telemetry layer behaviour inside an axum router."
//! fcp_version: "v0.1.0"
//! fcp_owner: "reliability"
//! ---
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use fcp_telemetry::{RequestSampler, RequestTelemetryLayer};
use tower::ServiceExt;

#[derive(Debug, Clone, PartialEq)]
struct UpgradeMarker(&'static str);

fn router(sampler: Arc<RequestSampler>) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/version", get(|| async { "0.1.0" }))
        .route(
            "/api/v1/broken",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
        )
        .route(
            "/api/v1/missing",
            get(|| async { (StatusCode::NOT_FOUND, "nope") }),
        )
        .route(
            "/api/v1/stream",
            get(|| async {
                let chunks = futures::stream::iter(vec![
                    Ok::<_, Infallible>("chunk-1 "),
                    Ok("chunk-2"),
                ]);
                Body::from_stream(chunks)
            }),
        )
        .route(
            "/api/v1/upgrade",
            get(|| async {
                let mut response = (StatusCode::SWITCHING_PROTOCOLS, "").into_response();
                response.extensions_mut().insert(UpgradeMarker("ws"));
                response
            }),
        )
        .route("/assets/app.js", get(|| async { "console.log(1)" }))
        .route("/", get(|| async { "index" }))
        .layer(RequestTelemetryLayer::new(sampler))
}

async fn send(app: &Router, path: &str) -> Response {
    app.clone()
        .oneshot(Request::get(path).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn only_control_plane_paths_are_sampled() {
    let sampler = Arc::new(RequestSampler::default());
    let app = router(sampler.clone());

    for path in ["/assets/app.js", "/", "/assets/app.js"] {
        assert_eq!(send(&app, path).await.status(), StatusCode::OK);
    }
    assert!(sampler.is_empty());

    send(&app, "/healthz").await;
    send(&app, "/version").await;
    send(&app, "/api/v1/missing").await;
    send(&app, "/api/v1/broken").await;

    let snapshot = sampler.snapshot(Duration::from_secs(60), None);
    assert_eq!(snapshot.total, 4);
    assert_eq!(snapshot.successes, 3);
    assert_eq!(snapshot.server_errors, 1);
}

#[tokio::test]
async fn handler_without_explicit_status_records_ok() {
    let sampler = Arc::new(RequestSampler::default());
    let app = router(sampler.clone());
    send(&app, "/healthz").await;
    let snapshot = sampler.snapshot(Duration::from_secs(60), None);
    assert_eq!(snapshot.successes, 1);
    assert_eq!(snapshot.server_errors, 0);
}

#[tokio::test]
async fn streaming_body_passes_through_untouched() {
    let sampler = Arc::new(RequestSampler::default());
    let app = router(sampler.clone());
    let response = send(&app, "/api/v1/stream").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"chunk-1 chunk-2");
    assert_eq!(sampler.len(), 1);
}

#[tokio::test]
async fn response_extensions_survive_the_layer() {
    let sampler = Arc::new(RequestSampler::default());
    let app = router(sampler.clone());
    let response = send(&app, "/api/v1/upgrade").await;
    assert_eq!(response.status(), StatusCode::SWITCHING_PROTOCOLS);
    assert_eq!(
        response.extensions().get::<UpgradeMarker>(),
        Some(&UpgradeMarker("ws"))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_respect_capacity() {
    let sampler = Arc::new(RequestSampler::new(None, 16));
    let app = router(sampler.clone());
    let mut tasks = Vec::new();
    for _ in 0..64 {
        let app = app.clone();
        tasks.push(tokio::spawn(async move {
            send(&app, "/healthz").await.status()
        }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }
    assert_eq!(sampler.len(), 16);
    let snapshot = sampler.snapshot(Duration::from_secs(60), None);
    assert_eq!(snapshot.total, 16);
}
