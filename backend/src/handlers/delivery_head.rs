//! Delivery head handlers: agent roster and assignment

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use crate::delivery::{AssignOrderRequest, AssignmentResponse, DeliveryAgent, RegisterAgentRequest};
use crate::error::ApiResult;
use crate::handlers::{ApiJson, ApiPath};
use crate::middleware::DeliveryHeadUser;
use crate::models::ApiResponse;
use crate::order::OrderEvent;
use crate::state::AppState;

pub async fn assign_order(
    State(state): State<AppState>,
    DeliveryHeadUser(head): DeliveryHeadUser,
    WithRejection(Json(request), _): ApiJson<AssignOrderRequest>,
) -> ApiResult<Json<ApiResponse<AssignmentResponse>>> {
    let (order, agent) = state
        .delivery_service
        .assign_order(request.order_id, request.boy_id)
        .await?;

    tracing::debug!(head_id = %head.user_id, order_id = %order.id, "Assignment made by delivery head");
    state.ws_state.publish(
        &order,
        OrderEvent::Assigned {
            order_id: order.id,
            agent_id: agent.id,
        },
    );

    Ok(Json(ApiResponse::ok(AssignmentResponse {
        order: order.redacted(),
        delivery_boy: agent,
    })))
}

pub async fn register_agent(
    State(state): State<AppState>,
    DeliveryHeadUser(_head): DeliveryHeadUser,
    WithRejection(Json(request), _): ApiJson<RegisterAgentRequest>,
) -> ApiResult<(StatusCode, Json<ApiResponse<DeliveryAgent>>)> {
    let agent = state.delivery_service.register_agent(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(agent))))
}

pub async fn list_available_agents(
    State(state): State<AppState>,
    DeliveryHeadUser(_head): DeliveryHeadUser,
) -> ApiResult<Json<ApiResponse<Vec<DeliveryAgent>>>> {
    let agents = state.delivery_service.list_available_agents().await?;
    Ok(Json(ApiResponse::ok(agents)))
}

pub async fn release_agent(
    State(state): State<AppState>,
    DeliveryHeadUser(_head): DeliveryHeadUser,
    WithRejection(Path(agent_id), _): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<DeliveryAgent>>> {
    let agent = state.delivery_service.release_agent(agent_id).await?;
    Ok(Json(ApiResponse::ok(agent)))
}

pub async fn deactivate_agent(
    State(state): State<AppState>,
    DeliveryHeadUser(_head): DeliveryHeadUser,
    WithRejection(Path(agent_id), _): ApiPath<Uuid>,
) -> ApiResult<Json<ApiResponse<DeliveryAgent>>> {
    let agent = state.delivery_service.deactivate_agent(agent_id).await?;
    Ok(Json(ApiResponse::ok(agent)))
}
