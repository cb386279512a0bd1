//! Shop order handlers
//!
//! The token subject of a shop caller is its shop id. Responses never carry
//! delivery secrets.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::handlers::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::ShopUser;
use crate::models::ApiResponse;
use crate::order::{ListOrdersQuery, Order, OrderEvent, UpdateStatusRequest};
use crate::state::AppState;

pub async fn list_orders(
    State(state): State<AppState>,
    ShopUser(shop): ShopUser,
    WithRejection(Query(query), _): ApiQuery<ListOrdersQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Order>>>> {
    let orders = state
        .order_service
        .list_shop_orders(shop.user_id, &query)
        .await?
        .into_iter()
        .map(Order::redacted)
        .collect();
    Ok(Json(ApiResponse::ok(orders)))
}

pub async fn confirm_order(
    State(state): State<AppState>,
    ShopUser(shop): ShopUser,
    WithRejection(Path(order_id), _): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Order>>> {
    let order = state.order_service.shop_confirm(shop.user_id, order_id).await?;
    Ok(published(&state, order))
}

pub async fn notify_delivery(
    State(state): State<AppState>,
    ShopUser(shop): ShopUser,
    WithRejection(Path(order_id), _): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Order>>> {
    let order = state
        .order_service
        .shop_notify_delivery(shop.user_id, order_id)
        .await?;
    Ok(published(&state, order))
}

/// Shop-run delivery of an order no agent holds
pub async fn deliver_order(
    State(state): State<AppState>,
    ShopUser(shop): ShopUser,
    WithRejection(Path(order_id), _): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Order>>> {
    let order = state.order_service.shop_deliver(shop.user_id, order_id).await?;
    Ok(published(&state, order))
}

pub async fn update_status(
    State(state): State<AppState>,
    ShopUser(shop): ShopUser,
    WithRejection(Path(order_id), _): ApiPath<Uuid>,
    WithRejection(Json(request), _): ApiJson<UpdateStatusRequest>,
) -> ApiResult<Json<ApiResponse<Order>>> {
    let order = state
        .order_service
        .shop_update_status(shop.user_id, order_id, request.status)
        .await?;
    Ok(published(&state, order))
}

fn published(state: &AppState, order: Order) -> Json<ApiResponse<Order>> {
    state.ws_state.publish(&order, OrderEvent::status_of(&order));
    Json(ApiResponse::ok(order.redacted()))
}
