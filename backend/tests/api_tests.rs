//! HTTP surface tests that never reach the database
//!
//! The pool is created lazily, so every request here must be answered by
//! routing, authentication or request validation.

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use marketplace_orders::auth::{generate_access_token, Claims};
use marketplace_orders::config::{Config, Environment};
use marketplace_orders::models::UserRole;
use marketplace_orders::routes::build_router;
use marketplace_orders::state::AppState;

const SECRET: &str = "api-test-secret";

fn test_config() -> Config {
    Config {
        database_url: "postgresql://postgres@localhost/marketplace_orders_unused".to_string(),
        environment: Environment::Development,
        port: 0,
        db_max_connections: 1,
        cors_allowed_origins: None,
        log_level: "warn".to_string(),
        jwt_secret: SECRET.to_string(),
        otp_ttl_hours: 24,
        estimated_delivery_days: 3,
    }
}

fn app() -> Router {
    let config = test_config();
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .expect("lazy pool");
    build_router(AppState::from_pool(pool, &config), None)
}

fn token(role: UserRole) -> String {
    generate_access_token(Uuid::new_v4(), role, SECRET, 3600).unwrap()
}

fn request(method: &str, uri: &str, bearer: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(req: Request<Body>) -> (StatusCode, Value) {
    let response = app().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_root_banner() {
    let response = app().oneshot(request("GET", "/", None, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let req = Request::builder()
        .uri("/")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(req).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-123");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (status, body) = send(request("GET", "/user/orders", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "MISSING_TOKEN");
}

#[tokio::test]
async fn test_tampered_token_is_unauthorized() {
    let forged = generate_access_token(Uuid::new_v4(), UserRole::Admin, "other-secret", 3600).unwrap();
    let (status, body) = send(request("GET", "/admin/orders/unsettled", Some(&forged), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_expired_token_is_unauthorized() {
    let expired = generate_access_token(Uuid::new_v4(), UserRole::User, SECRET, -3600).unwrap();
    let (status, body) = send(request("GET", "/user/orders", Some(&expired), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "TOKEN_EXPIRED");
}

#[tokio::test]
async fn test_unknown_role_is_unauthorized() {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: Uuid::new_v4().to_string(),
        role: "superuser".to_string(),
        iat: now,
        exp: now + 3600,
    };
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();

    let (status, _) = send(request("GET", "/user/orders", Some(&token), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_role_is_forbidden() {
    let cases = [
        ("GET", "/user/orders", UserRole::Shop),
        ("GET", "/shop/orders", UserRole::User),
        ("GET", "/delivery/orders/open", UserRole::DeliveryHead),
        ("GET", "/delivery-head/boys/available", UserRole::Delivery),
        ("GET", "/admin/orders/unsettled", UserRole::Shop),
    ];

    for (method, uri, role) in cases {
        let (status, body) = send(request(method, uri, Some(&token(role)), None)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{} {} as {}", method, uri, role);
        assert_eq!(body["error"]["code"], "FORBIDDEN");
    }
}

#[tokio::test]
async fn test_settlement_requires_admin() {
    let uri = format!("/admin/orders/{}/settle-shop", Uuid::new_v4());
    let (status, _) = send(request("PUT", &uri, Some(&token(UserRole::Shop)), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_empty_checkout_is_rejected() {
    let body = json!({
        "items": [],
        "shippingDetails": null,
        "paymentMethod": "cod",
        "subtotal": 0,
        "deliveryFee": 0,
        "total": 0
    });
    let (status, body) = send(request(
        "POST",
        "/user/orders",
        Some(&token(UserRole::User)),
        Some(body),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_confirm_delivery_requires_otp() {
    let uri = format!("/delivery/orders/{}/confirm", Uuid::new_v4());
    let (status, body) = send(request(
        "POST",
        &uri,
        Some(&token(UserRole::Delivery)),
        Some(json!({ "otp": "   " })),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_checkout_missing_items_uses_error_envelope() {
    let body = json!({
        "paymentMethod": "cod",
        "subtotal": 500,
        "deliveryFee": 50,
        "total": 550
    });
    let (status, body) = send(request(
        "POST",
        "/user/orders",
        Some(&token(UserRole::User)),
        Some(body),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("items"));
}

#[tokio::test]
async fn test_unknown_status_update_uses_error_envelope() {
    let uri = format!("/shop/orders/{}/status", Uuid::new_v4());
    let (status, body) = send(request(
        "PUT",
        &uri,
        Some(&token(UserRole::Shop)),
        Some(json!({ "status": "archived" })),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_body_without_json_content_type_is_rejected() {
    let req = Request::builder()
        .method("POST")
        .uri("/delivery-head/boys")
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", token(UserRole::DeliveryHead)),
        )
        .body(Body::from(r#"{"externalId":"DB001","name":"Ravi"}"#))
        .unwrap();
    let (status, body) = send(req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_malformed_path_and_query_use_error_envelope() {
    let (status, body) = send(request(
        "GET",
        "/user/orders/not-an-order-id",
        Some(&token(UserRole::User)),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = send(request(
        "GET",
        "/shop/orders?status=archived",
        Some(&token(UserRole::Shop)),
        None,
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_realtime_feed_requires_token() {
    let (status, body) = send(request("GET", "/ws", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "MISSING_TOKEN");

    let (status, body) = send(request("GET", "/ws?token=not-a-jwt", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_realtime_feed_accepts_query_token() {
    let uri = format!("/ws?token={}", token(UserRole::User));
    let (status, _) = send(request("GET", &uri, None, None)).await;

    // Authenticated, but a plain request cannot be upgraded
    assert_ne!(status, StatusCode::UNAUTHORIZED);
    assert!(status.is_client_error());
}
