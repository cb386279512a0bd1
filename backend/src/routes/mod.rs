//! Route definitions for the order API

mod admin;
mod delivery;
mod shop;
mod user;

pub use admin::admin_routes;
pub use delivery::{delivery_head_routes, delivery_routes};
pub use shop::shop_routes;
pub use user::user_routes;

use axum::{
    extract::State,
    http::{HeaderValue, Method},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware;
use crate::state::AppState;
use crate::websocket;

/// Assemble the full application router
pub fn build_router(state: AppState, cors_allowed_origins: Option<&str>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/ws", get(websocket::ws_handler))
        .merge(user_routes())
        .merge(shop_routes())
        .merge(delivery_routes())
        .merge(delivery_head_routes())
        .merge(admin_routes())
        .with_state(state)
        .layer(axum::middleware::from_fn(middleware::request_tracing))
        .layer(TraceLayer::new_for_http())
        .layer(configure_cors(cors_allowed_origins))
}

async fn root() -> &'static str {
    "Marketplace Orders API Server"
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    database: String,
    #[serde(rename = "latencyMs", skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
    version: String,
}

async fn health_check(State(pool): State<PgPool>) -> Json<HealthResponse> {
    let (status, database, latency_ms) = match crate::db::check_health(&pool).await {
        Ok(health) => ("healthy", "connected".to_string(), Some(health.latency_ms)),
        Err(e) => ("unhealthy", format!("error: {}", e), None),
    };

    Json(HealthResponse {
        status: status.to_string(),
        database,
        latency_ms,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn configure_cors(allowed_origins: Option<&str>) -> CorsLayer {
    let allowed_origins = allowed_origins.unwrap_or_default().trim();

    if allowed_origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (permissive)");
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}
