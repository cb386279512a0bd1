//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::auth::AuthKeys;
use crate::delivery::DeliveryService;
use crate::order::OrderService;
use crate::settlement::SettlementService;
use crate::websocket::WsState;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub order_service: Arc<OrderService>,
    pub delivery_service: Arc<DeliveryService>,
    pub settlement_service: Arc<SettlementService>,
    pub auth_keys: Arc<AuthKeys>,
    pub ws_state: WsState,
    pub db_pool: PgPool,
}

impl AppState {
    pub fn new(
        order_service: Arc<OrderService>,
        delivery_service: Arc<DeliveryService>,
        settlement_service: Arc<SettlementService>,
        auth_keys: Arc<AuthKeys>,
        ws_state: WsState,
        db_pool: PgPool,
    ) -> Self {
        Self {
            order_service,
            delivery_service,
            settlement_service,
            auth_keys,
            ws_state,
            db_pool,
        }
    }

    /// Build every service over one pool
    pub fn from_pool(db_pool: PgPool, config: &crate::config::Config) -> Self {
        Self::new(
            Arc::new(OrderService::new(db_pool.clone(), config.workflow_settings())),
            Arc::new(DeliveryService::new(db_pool.clone())),
            Arc::new(SettlementService::new(db_pool.clone())),
            Arc::new(AuthKeys::new(config.jwt_secret.clone())),
            WsState::new(),
            db_pool,
        )
    }
}

impl FromRef<AppState> for WsState {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.ws_state.clone()
    }
}

impl FromRef<AppState> for Arc<OrderService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.order_service.clone()
    }
}

impl FromRef<AppState> for Arc<DeliveryService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.delivery_service.clone()
    }
}

impl FromRef<AppState> for Arc<SettlementService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.settlement_service.clone()
    }
}

impl FromRef<AppState> for Arc<AuthKeys> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_keys.clone()
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db_pool.clone()
    }
}
