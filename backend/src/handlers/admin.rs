//! Admin handlers: payout settlement and forced cancellation

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::handlers::{ApiPath, ApiQuery};
use crate::middleware::AdminUser;
use crate::models::ApiResponse;
use crate::order::{ListOrdersQuery, Order, OrderEvent};
use crate::settlement::Payee;
use crate::state::AppState;

pub async fn settle_shop(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    WithRejection(Path(order_id), _): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Order>>> {
    settle(&state, order_id, Payee::Shop).await
}

pub async fn settle_admin(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    WithRejection(Path(order_id), _): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Order>>> {
    settle(&state, order_id, Payee::Admin).await
}

async fn settle(
    state: &AppState,
    order_id: Uuid,
    payee: Payee,
) -> ApiResult<Json<ApiResponse<Order>>> {
    let order = state.settlement_service.settle(order_id, payee).await?;
    state.ws_state.publish(
        &order,
        OrderEvent::Settled {
            order_id: order.id,
            paid_to_shop: order.settlement.paid_to_shop,
            paid_to_admin: order.settlement.paid_to_admin,
        },
    );
    Ok(Json(ApiResponse::ok(order.redacted())))
}

pub async fn list_unsettled(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    WithRejection(Query(query), _): ApiQuery<ListOrdersQuery>,
) -> ApiResult<Json<ApiResponse<Vec<Order>>>> {
    let orders = state
        .settlement_service
        .list_unsettled(&query)
        .await?
        .into_iter()
        .map(Order::redacted)
        .collect();
    Ok(Json(ApiResponse::ok(orders)))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    WithRejection(Path(order_id), _): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<Order>>> {
    let order = state.order_service.cancel_by_admin(order_id).await?;
    state.ws_state.publish(&order, OrderEvent::status_of(&order));
    Ok(Json(ApiResponse::ok(order.redacted())))
}
