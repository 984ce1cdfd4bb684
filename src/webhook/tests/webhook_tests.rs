//! Webhook endpoint tests
//!
//! Exercises `/mutate` through the full router, middleware included.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use mutate_nodeselector::{InMemoryScopeLookup, ScopeConfig, ANNOTATION};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt as _;
use webhook::{routes::create_router, AppState, HealthResponse, ServerConfig};

fn build_app() -> Router {
    let lookup = InMemoryScopeLookup::with_scopes([
        ScopeConfig::new("ns1").with_annotation(ANNOTATION, "disk=ssd"),
        ScopeConfig::new("ns2"),
    ]);
    let state = AppState::with_lookup(Arc::new(lookup)).unwrap();
    create_router(Arc::new(state), &ServerConfig::default())
}

fn admission_review(uid: &str, object: Value) -> Value {
    json!({
        "apiVersion": "admission.k8s.io/v1",
        "kind": "AdmissionReview",
        "request": {
            "uid": uid,
            "kind": { "group": "", "version": "v1", "kind": "Pod" },
            "resource": { "group": "", "version": "v1", "resource": "pods" },
            "namespace": "default",
            "operation": "CREATE",
            "object": object
        }
    })
}

fn pod_in(namespace: &str) -> Value {
    json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": { "name": "test", "namespace": namespace },
        "spec": { "containers": [{ "name": "test", "image": "busybox" }] }
    })
}

async fn post_mutate(app: Router, body: impl Into<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/mutate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, content_type, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_mutate_annotated_namespace() {
    let body = admission_review("12345", pod_in("ns1")).to_string();
    let (status, content_type, reply) = post_mutate(build_app(), body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(reply["apiVersion"], "admission.k8s.io/v1");
    assert_eq!(reply["kind"], "AdmissionReview");
    assert_eq!(reply["response"]["uid"], "12345");
    assert_eq!(reply["response"]["allowed"], true);
    assert_eq!(reply["response"]["patchType"], "JSONPatch");

    let patch = STANDARD
        .decode(reply["response"]["patch"].as_str().unwrap())
        .unwrap();
    let patch: Value = serde_json::from_slice(&patch).unwrap();
    assert_eq!(
        patch,
        json!([{ "op": "add", "path": "/spec/nodeSelector", "value": { "disk": "ssd" } }])
    );
}

#[tokio::test]
async fn test_mutate_plain_namespace() {
    let body = admission_review("67890", pod_in("ns2")).to_string();
    let (status, _, reply) = post_mutate(build_app(), body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        reply["response"],
        json!({ "uid": "67890", "allowed": true })
    );
}

#[tokio::test]
async fn test_mutate_unknown_namespace_is_bad_request() {
    let body = admission_review("1", pod_in("missing")).to_string();
    let (status, _, reply) = post_mutate(build_app(), body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(reply["status"], 400);
    assert!(reply["error"].as_str().unwrap().contains("missing"));
    assert!(reply.get("response").is_none());
}

#[tokio::test]
async fn test_mutate_invalid_object_is_bad_request() {
    let body = admission_review("2", json!({ "metadata": "not an object" })).to_string();
    let (status, _, reply) = post_mutate(build_app(), body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(reply["error"]
        .as_str()
        .unwrap()
        .starts_with("failed to unmarshal pod"));
}

#[tokio::test]
async fn test_mutate_invalid_json_is_bad_request() {
    let (status, _, reply) = post_mutate(build_app(), "{not json").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(reply["error"]
        .as_str()
        .unwrap()
        .starts_with("failed to decode admission review"));
}

#[tokio::test]
async fn test_metrics_reflect_decisions() {
    let app = build_app();

    let body = admission_review("1", pod_in("ns1")).to_string();
    let (status, _, _) = post_mutate(app.clone(), body).await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("nodeselector_admission_requests_total{outcome=\"patched\"} 1"));
}

#[tokio::test]
async fn test_health_check() {
    let response = build_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let health: HealthResponse = serde_json::from_slice(&body).unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_request_id_is_returned() {
    let response = build_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(response.headers().contains_key(webhook::middleware::X_REQUEST_ID));
}
