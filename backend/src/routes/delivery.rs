//! Delivery agent and delivery head route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{delivery, delivery_head};
use crate::state::AppState;

pub fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route("/delivery/orders/open", get(delivery::list_open_orders))
        .route("/delivery/orders/mine", get(delivery::list_my_orders))
        .route("/delivery/orders/:order_id/take", post(delivery::take_order))
        .route(
            "/delivery/orders/:order_id/confirm",
            post(delivery::confirm_delivery),
        )
}

pub fn delivery_head_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/delivery-head/orders/assign",
            post(delivery_head::assign_order),
        )
        .route("/delivery-head/boys", post(delivery_head::register_agent))
        .route(
            "/delivery-head/boys/available",
            get(delivery_head::list_available_agents),
        )
        .route(
            "/delivery-head/boys/:boy_id",
            axum::routing::delete(delivery_head::deactivate_agent),
        )
        .route(
            "/delivery-head/boys/:boy_id/release",
            post(delivery_head::release_agent),
        )
}
