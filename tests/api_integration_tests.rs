//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use session_cache::{api::create_router, AppState};
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app(dir: &TempDir) -> Router {
    let state = AppState::open(dir.path().join("cache.json"), 300).unwrap();
    create_router(state)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn put_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri("/cache")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(key: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(format!("/cache/{}", key))
        .body(Body::empty())
        .unwrap()
}

fn delete_request(key: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(format!("/cache/{}", key))
        .body(Body::empty())
        .unwrap()
}

// == SET Endpoint Tests ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(&dir);

    let response = app
        .oneshot(put_request(r#"{"key":"u1","value":{"name":"alice"}}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("u1"));
    assert_eq!(json["ttl"], 300);
}

#[tokio::test]
async fn test_set_endpoint_with_ttl() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(&dir);

    let response = app
        .oneshot(put_request(r#"{"key":"ttl_key","value":"ttl_value","ttl":60}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["ttl"], 60);
}

#[tokio::test]
async fn test_set_endpoint_rejects_zero_ttl() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(&dir);

    let response = app
        .oneshot(put_request(r#"{"key":"u1","value":1,"ttl":0}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("TTL"));
}

#[tokio::test]
async fn test_set_endpoint_rejects_empty_key() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(&dir);

    let response = app
        .oneshot(put_request(r#"{"key":"","value":1}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_set_endpoint_malformed_body_is_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(&dir);

    let bodies = [
        r#"{"key":"u1","value":"#,
        r#"{"value":1}"#,
        r#"{"key":"u1","value":1,"ttl":"soon"}"#,
    ];
    for body in bodies {
        let response = app.clone().oneshot(put_request(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_to_json(response.into_body()).await;
        assert!(json["error"].as_str().unwrap().starts_with("Invalid request"));
    }
}

#[tokio::test]
async fn test_set_endpoint_without_json_content_type() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(&dir);

    let request = Request::builder()
        .method("PUT")
        .uri("/cache")
        .body(Body::from(r#"{"key":"u1","value":1}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

// == GET Endpoint Tests ==

#[tokio::test]
async fn test_get_endpoint_success() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(&dir);

    let set_response = app
        .clone()
        .oneshot(put_request(r#"{"key":"u1","value":{"name":"alice"},"ttl":60}"#))
        .await
        .unwrap();
    assert_eq!(set_response.status(), StatusCode::OK);

    let get_response = app.oneshot(get_request("u1")).await.unwrap();

    assert_eq!(get_response.status(), StatusCode::OK);
    let json = body_to_json(get_response.into_body()).await;
    assert_eq!(json["key"], "u1");
    assert_eq!(json["value"], json!({"name": "alice"}));
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(&dir);

    let response = app.oneshot(get_request("nonexistent_key")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert!(json.get("error").is_some());
}

#[tokio::test]
async fn test_get_endpoint_expired_key() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(&dir);

    app.clone()
        .oneshot(put_request(r#"{"key":"u2","value":{"name":"bob"},"ttl":1}"#))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let response = app.clone().oneshot(get_request("u2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let stats = app
        .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = body_to_json(stats.into_body()).await;
    assert_eq!(json["expired"], 1);
    assert_eq!(json["total_entries"], 0);
}

// == DELETE Endpoint Tests ==

#[tokio::test]
async fn test_delete_endpoint_success() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(&dir);

    app.clone()
        .oneshot(put_request(r#"{"key":"u3","value":"v"}"#))
        .await
        .unwrap();

    let response = app.clone().oneshot(delete_request("u3")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.oneshot(get_request("u3")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_endpoint_absent_key() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(&dir);

    let response = app.oneshot(delete_request("never_set")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

// == Stats and Health Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint_counts() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(&dir);

    app.clone()
        .oneshot(put_request(r#"{"key":"u1","value":1}"#))
        .await
        .unwrap();
    app.clone().oneshot(get_request("u1")).await.unwrap();
    app.clone().oneshot(get_request("missing")).await.unwrap();

    let response = app
        .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["hits"], 1);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["writes"], 1);
    assert_eq!(json["total_entries"], 1);
    assert_eq!(json["hit_rate"], 0.5);
}

#[tokio::test]
async fn test_health_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let app = create_test_app(&dir);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}

// == Restart Tests ==

#[tokio::test]
async fn test_values_survive_router_restart() {
    let dir = tempfile::tempdir().unwrap();

    create_test_app(&dir)
        .oneshot(put_request(r#"{"key":"u1","value":{"name":"alice"},"ttl":60}"#))
        .await
        .unwrap();

    // A fresh state re-reads the snapshot
    let response = create_test_app(&dir)
        .oneshot(get_request("u1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["value"]["name"], "alice");
}
