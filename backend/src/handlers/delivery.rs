//! Delivery agent handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use crate::delivery::ConfirmDeliveryRequest;
use crate::error::ApiResult;
use crate::handlers::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::DeliveryUser;
use crate::models::ApiResponse;
use crate::order::{ListOrdersQuery, Order, OrderEvent};
use crate::state::AppState;

/// Unassigned orders waiting for an agent
pub async fn list_open_orders(
    State(state): State<AppState>,
    DeliveryUser(_agent): DeliveryUser,
    WithRejection(Query(query), _): ApiQuery<ListOrdersQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Order>>>> {
    let orders = state.delivery_service.list_open_orders(&query).await?;
    Ok(Json(ApiResponse::ok(redact_all(orders))))
}

pub async fn list_my_orders(
    State(state): State<AppState>,
    DeliveryUser(agent): DeliveryUser,
    WithRejection(Query(query), _): ApiQuery<ListOrdersQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Order>>>> {
    let orders = state
        .delivery_service
        .list_agent_orders(agent.user_id, &query)
        .await?;
    Ok(Json(ApiResponse::ok(redact_all(orders))))
}

pub async fn take_order(
    State(state): State<AppState>,
    DeliveryUser(agent): DeliveryUser,
    WithRejection(Path(order_id), _): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Order>>> {
    let order = state
        .delivery_service
        .take_order(order_id, agent.user_id)
        .await?;

    state.ws_state.publish(
        &order,
        OrderEvent::Assigned {
            order_id: order.id,
            agent_id: agent.user_id,
        },
    );

    Ok(Json(ApiResponse::ok(order.redacted())))
}

/// Hand-off: the agent submits the OTP or QR token shown by the customer
pub async fn confirm_delivery(
    State(state): State<AppState>,
    DeliveryUser(agent): DeliveryUser,
    WithRejection(Path(order_id), _): ApiPath<Uuid>,
    WithRejection(Json(request), _): ApiJson<ConfirmDeliveryRequest>,
) -> ApiResult<Json<ApiResponse<Order>>> {
    let code = request.code()?;
    let order = state
        .delivery_service
        .confirm_delivery(order_id, agent.user_id, code)
        .await?;

    state.ws_state.publish(&order, OrderEvent::Delivered { order_id: order.id });

    Ok(Json(ApiResponse::ok(order.redacted())))
}

fn redact_all(orders: Vec<Order>) -> Vec<Order> {
    orders.into_iter().map(Order::redacted).collect()
}
