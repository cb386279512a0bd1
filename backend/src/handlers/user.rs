//! Customer order handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::handlers::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::CustomerUser;
use crate::models::ApiResponse;
use crate::order::{CreateOrderRequest, ListOrdersQuery, Order, OrderEvent};
use crate::state::AppState;

/// Place an order; the response carries the delivery OTP and QR token
pub async fn create_order(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    WithRejection(Json(request), _): ApiJson<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Order>>)> {
    let order = state
        .order_service
        .create_order(user.user_id, request)
        .await?;

    state.ws_state.publish(
        &order,
        OrderEvent::Created {
            order_id: order.id,
            user_id: order.user_id,
        },
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(order))))
}

pub async fn list_orders(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    WithRejection(Query(query), _): ApiQuery<ListOrdersQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Order>>>> {
    let orders = state
        .order_service
        .list_customer_orders(user.user_id, &query)
        .await?;
    Ok(Json(ApiResponse::ok(orders)))
}

pub async fn get_order(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    WithRejection(Path(order_id), _): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Order>>> {
    let order = state
        .order_service
        .get_customer_order(user.user_id, order_id)
        .await?;
    Ok(Json(ApiResponse::ok(order)))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    WithRejection(Path(order_id), _): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Order>>> {
    let order = state
        .order_service
        .cancel_by_customer(user.user_id, order_id)
        .await?;
    state.ws_state.publish(&order, OrderEvent::status_of(&order));
    Ok(Json(ApiResponse::ok(order)))
}

/// Replace an expired or lost OTP / QR token
pub async fn regenerate_otp(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    WithRejection(Path(order_id), _): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Order>>> {
    let order = state
        .order_service
        .regenerate_secret(user.user_id, order_id)
        .await?;
    Ok(Json(ApiResponse::ok(order)))
}
