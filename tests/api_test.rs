use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tower::ServiceExt;

use volunteer_server::config::Settings;
use volunteer_server::routes::create_routes;
use volunteer_server::state::AppState;

/// Router backed by a pool that can never connect. Only paths that are
/// settled before touching the database behave normally.
fn app() -> Router {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(500))
        .connect_lazy("postgres://volunteer@127.0.0.1:1/unreachable")
        .unwrap();
    create_routes(AppState::new(pool, Settings::default()))
}

async fn send(request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    for uri in [
        "/api/auth/me",
        "/api/events/mine",
        "/api/registrations/me",
        "/api/admin/users",
        "/api/admin/reports/summary",
    ] {
        let (status, _, body) = send(get(uri)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(body["code"], "AUTH_ERROR");
        assert_eq!(body["statusCode"], 401);
    }
}

#[tokio::test]
async fn test_malformed_token_is_rejected() {
    let request = Request::builder()
        .uri("/api/auth/me")
        .header(header::AUTHORIZATION, "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();

    let (status, _, body) = send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "AUTH_ERROR");
}

#[tokio::test]
async fn test_register_reports_field_errors() {
    let (status, _, body) = send(post_json(
        "/api/auth/register",
        serde_json::json!({ "name": "", "email": "nope", "password": "short" }),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["errors"]["email"][0], "Email is not a valid address");
    assert!(body["errors"]["name"].is_array());
    assert!(body["errors"]["password"].is_array());
}

#[tokio::test]
async fn test_malformed_json_is_a_validation_error() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\":"))
        .unwrap();

    let (status, _, body) = send(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_bad_path_id_is_a_validation_error() {
    let (status, _, body) = send(get("/api/events/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_unknown_route_uses_error_envelope_with_trace_id() {
    let request = Request::builder()
        .uri("/api/nothing-here")
        .header("x-request-id", "trace-abc")
        .body(Body::empty())
        .unwrap();

    let (status, headers, body) = send(request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(body["traceId"], "trace-abc");
    assert_eq!(headers.get("x-request-id").unwrap(), "trace-abc");
}

#[tokio::test]
async fn test_request_id_is_generated_when_missing() {
    let (_, headers, body) = send(get("/api/auth/me")).await;
    let generated = headers.get("x-request-id").unwrap().to_str().unwrap();
    assert!(!generated.is_empty());
    assert_eq!(body["traceId"], generated);
}

#[tokio::test]
async fn test_security_headers_present() {
    let (_, headers, _) = send(get("/api/auth/me")).await;
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("strict-transport-security").is_none());
}

#[tokio::test]
async fn test_health_reports_degraded_without_database() {
    let (status, _, body) = send(get("/api/health")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "down");
}
