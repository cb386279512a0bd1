//! WebSocket server for real-time order updates
//!
//! Connections authenticate with the same bearer token as the REST API,
//! either in the `Authorization` header or as a `token` query parameter.
//! Every event is published with the audience of its order, and a client
//! only receives events for orders its caller may see.

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use uuid::Uuid;

use crate::auth::AuthKeys;
use crate::middleware::{authenticate_token, AuthenticatedUser};
use crate::models::UserRole;
use crate::order::{Order, OrderEvent};

/// Callers allowed to see events of one order
#[derive(Debug, Clone, PartialEq)]
pub struct OrderAudience {
    pub customer_id: Uuid,
    pub shop_ids: Vec<Uuid>,
    pub agent_id: Option<Uuid>,
}

impl OrderAudience {
    pub fn of(order: &Order) -> Self {
        let mut shop_ids: Vec<Uuid> = order.items.iter().map(|item| item.shop_id).collect();
        shop_ids.sort();
        shop_ids.dedup();
        Self {
            customer_id: order.user_id,
            shop_ids,
            agent_id: order.assigned_to,
        }
    }

    pub fn admits(&self, viewer: &AuthenticatedUser) -> bool {
        match viewer.role {
            UserRole::Admin | UserRole::DeliveryHead => true,
            UserRole::User => self.customer_id == viewer.user_id,
            UserRole::Shop => self.shop_ids.contains(&viewer.user_id),
            UserRole::Delivery => self.agent_id == Some(viewer.user_id),
        }
    }
}

/// An event on the broadcast channel, tagged with who may see it
#[derive(Debug, Clone)]
pub struct Published {
    pub event: OrderEvent,
    pub audience: Arc<OrderAudience>,
}

/// WebSocket server state
#[derive(Clone)]
pub struct WsState {
    /// Broadcast channel for order events
    pub tx: broadcast::Sender<Published>,
    /// Connected clients registry
    pub clients: Arc<RwLock<HashMap<String, ClientInfo>>>,
}

/// Client connection information
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub client_id: String,
    pub viewer: AuthenticatedUser,
    /// Empty means every order the viewer may see
    pub subscribed_orders: Vec<Uuid>,
}

impl ClientInfo {
    fn wants(&self, published: &Published) -> bool {
        published.audience.admits(&self.viewer)
            && (self.subscribed_orders.is_empty()
                || self.subscribed_orders.contains(&published.event.order_id()))
    }
}

#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    Subscribe { order_ids: Vec<Uuid> },
    #[serde(rename_all = "camelCase")]
    Unsubscribe { order_ids: Vec<Uuid> },
    Ping,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ServerMessage {
    Event { event: OrderEvent },
    #[serde(rename_all = "camelCase")]
    Subscribed { order_ids: Vec<Uuid> },
    #[serde(rename_all = "camelCase")]
    Unsubscribed { order_ids: Vec<Uuid> },
    Pong,
}

impl Default for WsState {
    fn default() -> Self {
        Self::new()
    }
}

impl WsState {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(100);
        Self {
            tx,
            clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Broadcast an event about `order` to the clients allowed to see it.
    ///
    /// Having no listeners is normal and not logged as an error.
    pub fn publish(&self, order: &Order, event: OrderEvent) {
        if self.tx.receiver_count() == 0 {
            return;
        }
        let published = Published {
            event,
            audience: Arc::new(OrderAudience::of(order)),
        };
        if let Err(e) = self.tx.send(published) {
            tracing::warn!("Failed to broadcast order event: {}", e);
        }
    }

    async fn register_client(&self, client_id: String, viewer: AuthenticatedUser) {
        tracing::info!(user_id = %viewer.user_id, role = %viewer.role, "Client {} connected", client_id);
        let mut clients = self.clients.write().await;
        clients.insert(
            client_id.clone(),
            ClientInfo {
                client_id,
                viewer,
                subscribed_orders: vec![],
            },
        );
    }

    async fn unregister_client(&self, client_id: &str) {
        let mut clients = self.clients.write().await;
        clients.remove(client_id);
        tracing::info!("Client {} disconnected", client_id);
    }

    async fn subscribe(&self, client_id: &str, order_ids: &[Uuid]) {
        let mut clients = self.clients.write().await;
        if let Some(client) = clients.get_mut(client_id) {
            for id in order_ids {
                if !client.subscribed_orders.contains(id) {
                    client.subscribed_orders.push(*id);
                }
            }
        }
    }

    async fn unsubscribe(&self, client_id: &str, order_ids: &[Uuid]) {
        let mut clients = self.clients.write().await;
        if let Some(client) = clients.get_mut(client_id) {
            client.subscribed_orders.retain(|id| !order_ids.contains(id));
        }
    }
}

/// WebSocket handler - authenticates, then upgrades HTTP connection to WebSocket
pub async fn ws_handler(
    State(state): State<WsState>,
    State(keys): State<Arc<AuthKeys>>,
    Query(query): Query<WsAuthQuery>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let token = match &bearer {
        Some(TypedHeader(Authorization(bearer))) => Some(bearer.token()),
        None => query.token.as_deref(),
    };
    let viewer = match authenticate_token(token, &keys) {
        Ok(viewer) => viewer,
        Err(rejection) => return rejection,
    };

    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, state, viewer)),
        Err(rejection) => rejection.into_response(),
    }
}

async fn handle_socket(socket: WebSocket, state: WsState, viewer: AuthenticatedUser) {
    let client_id = Uuid::new_v4().to_string();
    state.register_client(client_id.clone(), viewer).await;

    let (mut sender, mut receiver) = socket.split();

    // Replies to client messages are funnelled through the send task
    let (internal_tx, mut internal_rx) = mpsc::channel::<ServerMessage>(32);

    let mut rx = state.tx.subscribe();
    let client_id_send = client_id.clone();
    let state_send = state.clone();

    let mut send_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                event = rx.recv() => match event {
                    Ok(published) => {
                        let clients = state_send.clients.read().await;
                        match clients.get(&client_id_send) {
                            Some(client) if client.wants(&published) => ServerMessage::Event {
                                event: published.event,
                            },
                            _ => continue,
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Client {} lagged, {} events skipped", client_id_send, skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                Some(msg) = internal_rx.recv() => msg,
                else => break,
            };

            if let Ok(text) = serde_json::to_string(&msg) {
                if sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    });

    let state_recv = state.clone();
    let client_id_recv = client_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    let Ok(client_msg) = serde_json::from_str::<ClientMessage>(&text) else {
                        tracing::debug!("Ignoring malformed message from client {}", client_id_recv);
                        continue;
                    };
                    let reply = match client_msg {
                        ClientMessage::Subscribe { order_ids } => {
                            state_recv.subscribe(&client_id_recv, &order_ids).await;
                            tracing::info!("Client {} subscribed", client_id_recv);
                            ServerMessage::Subscribed { order_ids }
                        }
                        ClientMessage::Unsubscribe { order_ids } => {
                            state_recv.unsubscribe(&client_id_recv, &order_ids).await;
                            tracing::info!("Client {} unsubscribed", client_id_recv);
                            ServerMessage::Unsubscribed { order_ids }
                        }
                        ClientMessage::Ping => ServerMessage::Pong,
                    };
                    if internal_tx.send(reply).await.is_err() {
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    }

    state.unregister_client(&client_id).await;
}
