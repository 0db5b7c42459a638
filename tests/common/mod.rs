#![allow(dead_code)]

use axum::{
    body::{Body, Bytes},
    http::{header, Method, Request, StatusCode},
    Router,
};
use blog_admin::{app, config::Config, generate_truncated_uuid, seed, store::Store, AppState};
use chrono::Utc;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

pub const PASSWORD: &str = "secret";

/// Admin account, seed categories and tags, no articles.
pub fn state_with(require_auth: bool) -> AppState {
    let mut store = Store::new();
    store.users.push(seed::admin_user(PASSWORD, Utc::now()));
    store.categories = seed::categories();
    store.tags = seed::tags();

    let config = Config {
        require_auth,
        upload_dir: std::env::temp_dir().join(format!("blog-admin-it-{}", generate_truncated_uuid())),
        ..Config::default()
    };
    AppState::new(store, config)
}

pub fn state() -> AppState {
    state_with(false)
}

pub async fn send(router: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Status and raw body bytes, for responses that are not JSON.
pub async fn fetch(router: &Router, method: Method, uri: &str) -> (StatusCode, Bytes) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, bytes)
}

pub const BOUNDARY: &str = "blog-admin-test-boundary";

/// Bytes that sniff as PNG, padded to `len`.
pub fn png(len: usize) -> Vec<u8> {
    let mut bytes = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec();
    bytes.resize(len, 0);
    bytes
}

/// `multipart/form-data` body with a single `file` field.
pub fn multipart_body(filename: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub async fn upload(router: &Router, uri: &str, token: Option<&str>, content_type: &str, bytes: &[u8]) -> Value {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        );
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = builder
        .body(Body::from(multipart_body("upload.png", content_type, bytes)))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

pub async fn get(router: &Router, uri: &str) -> Value {
    send(router, Method::GET, uri, None, None).await.1
}

pub async fn post(router: &Router, uri: &str, body: Value) -> Value {
    send(router, Method::POST, uri, None, Some(body)).await.1
}

pub async fn put(router: &Router, uri: &str, body: Value) -> Value {
    send(router, Method::PUT, uri, None, Some(body)).await.1
}

pub async fn delete(router: &Router, uri: &str) -> Value {
    send(router, Method::DELETE, uri, None, None).await.1
}

pub async fn login(router: &Router) -> String {
    let body = serde_json::json!({ "username": "admin", "password": PASSWORD });
    let value = post(router, "/api/auth/login", body).await;
    value["data"]["token"].as_str().unwrap().to_string()
}

pub fn router(state: &AppState) -> Router {
    app(state.clone())
}
