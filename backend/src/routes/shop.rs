//! Shop route definitions

use axum::{
    routing::{get, put},
    Router,
};

use crate::handlers::shop::*;
use crate::state::AppState;

pub fn shop_routes() -> Router<AppState> {
    Router::new()
        .route("/shop/orders", get(list_orders))
        .route("/shop/orders/:order_id/confirm", put(confirm_order))
        .route("/shop/orders/:order_id/notify-delivery", put(notify_delivery))
        .route("/shop/orders/:order_id/deliver", put(deliver_order))
        .route("/shop/orders/:order_id/status", put(update_status))
}
