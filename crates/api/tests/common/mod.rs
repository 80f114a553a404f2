//! Common test utilities for integration tests.
//!
//! The router runs on the in-memory stores, so no database is required.

// Not every helper is used by every test binary.
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use blogcms_api::{
    app::{create_app, Stores},
    config::Config,
};
use tower::ServiceExt;

/// Token set by [`test_app_with_admin`].
pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Any non-empty value passes the CSRF check.
pub const CSRF_TOKEN: &str = "test-csrf-token";

pub fn test_config(overrides: &[(&str, &str)]) -> Config {
    Config::load_for_test(overrides).expect("Failed to build test config")
}

/// Router over fresh in-memory stores with the given config overrides.
pub fn test_app(overrides: &[(&str, &str)]) -> Router {
    create_app(test_config(overrides), Stores::in_memory())
}

pub fn test_app_with_admin() -> Router {
    test_app(&[("security.admin_token", ADMIN_TOKEN)])
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// JSON request carrying a CSRF header and no admin token.
pub fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-CSRF-Token", CSRF_TOKEN)
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

pub fn json_request_with_auth(
    method: Method,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header("X-CSRF-Token", CSRF_TOKEN)
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn parse_response_body(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
}

/// Writes `entries` through the batch endpoint and returns the response body.
pub async fn batch_update(app: &Router, entries: serde_json::Value) -> serde_json::Value {
    let response = send(
        app,
        json_request(Method::POST, "/api/v1/settings/batch", entries),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    parse_response_body(response).await
}
