//! Customer route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::user::*;
use crate::state::AppState;

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user/orders", post(create_order).get(list_orders))
        .route("/user/orders/:order_id", get(get_order))
        .route("/user/orders/:order_id/cancel", post(cancel_order))
        .route("/user/orders/:order_id/otp", post(regenerate_otp))
}
