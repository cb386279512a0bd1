//! Admin route definitions

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers::admin::*;
use crate::state::AppState;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/orders/unsettled", get(list_unsettled))
        .route("/admin/orders/:order_id/settle-shop", put(settle_shop))
        .route("/admin/orders/:order_id/settle-admin", put(settle_admin))
        .route("/admin/orders/:order_id/cancel", post(cancel_order))
}
