//! Order models and request/response DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;
use validator::Validate;

use super::status::OrderStatus;

/// Order document
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Line items, fixed at creation
    pub items: Json<Vec<OrderItem>>,
    pub shipping_details: Json<ShippingDetails>,
    pub payment_method: PaymentMethod,
    pub paid: bool,
    pub order_notes: Option<String>,
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub total: f64,
    pub status: OrderStatus,
    /// Delivery agent holding the order, set only by assignment
    pub assigned_to: Option<Uuid>,
    pub delivery_otp: String,
    pub qr_token: String,
    pub otp_expires_at: DateTime<Utc>,
    #[sqlx(flatten)]
    pub settlement: Settlement,
    pub cancelled_by: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    /// Order date plus the configured delivery window, written once
    pub estimated_delivery: DateTime<Utc>,
    /// Optimistic concurrency token
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line item as stored on the order
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: Uuid,
    /// Shop owning the product, resolved at creation
    pub shop_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub quantity: i32,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_color: Option<String>,
}

/// Shipping address captured at checkout
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShippingDetails {
    #[validate(length(min = 1, message = "Full name is required"))]
    pub full_name: String,
    #[validate(length(min = 5, max = 20, message = "Phone number is invalid"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    #[validate(length(min = 1, message = "Postal code is required"))]
    pub postal_code: String,
}

/// Payment method chosen at checkout
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cod,
    Online,
}

/// Payout flags, changed only by admin settlement
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub paid_to_shop: bool,
    pub paid_to_admin: bool,
    pub settled_at: Option<DateTime<Utc>>,
}

/// Request DTO for creating an order
#[derive(Debug, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, message = "Order must contain at least one item"))]
    pub items: Vec<OrderItemRequest>,
    pub shipping_details: Option<ShippingDetails>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub paid: bool,
    #[serde(default)]
    pub order_notes: Option<String>,
    #[validate(range(min = 0.0, message = "Subtotal cannot be negative"))]
    pub subtotal: f64,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "Delivery fee cannot be negative"))]
    pub delivery_fee: f64,
    #[validate(range(min = 0.0, message = "Total cannot be negative"))]
    pub total: f64,
}

/// A line item as submitted by the client
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRequest {
    pub product_id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,
    #[serde(default)]
    pub selected_size: Option<String>,
    #[serde(default)]
    pub selected_color: Option<String>,
}

/// Request DTO for a shop status update
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

/// Query parameters for order listings
#[derive(Debug, Deserialize, Default)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}

impl ListOrdersQuery {
    /// Normalized `(limit, offset)` for SQL paging
    pub fn limit_offset(&self) -> (i64, i64) {
        let page = self.page.unwrap_or(1).max(1) as i64;
        let limit = self.limit.unwrap_or(20).clamp(1, 100) as i64;
        (limit, (page - 1) * limit)
    }
}

/// Order lifecycle events pushed to realtime subscribers
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OrderEvent {
    #[serde(rename_all = "camelCase")]
    Created { order_id: Uuid, user_id: Uuid },
    #[serde(rename_all = "camelCase")]
    StatusChanged { order_id: Uuid, status: OrderStatus },
    #[serde(rename_all = "camelCase")]
    Assigned { order_id: Uuid, agent_id: Uuid },
    #[serde(rename_all = "camelCase")]
    Delivered { order_id: Uuid },
    #[serde(rename_all = "camelCase")]
    Cancelled { order_id: Uuid, cancelled_by: String },
    #[serde(rename_all = "camelCase")]
    Settled {
        order_id: Uuid,
        paid_to_shop: bool,
        paid_to_admin: bool,
    },
}

impl OrderEvent {
    pub fn order_id(&self) -> Uuid {
        match self {
            OrderEvent::Created { order_id, .. }
            | OrderEvent::StatusChanged { order_id, .. }
            | OrderEvent::Assigned { order_id, .. }
            | OrderEvent::Delivered { order_id }
            | OrderEvent::Cancelled { order_id, .. }
            | OrderEvent::Settled { order_id, .. } => *order_id,
        }
    }

    /// Event describing the order's current status
    pub fn status_of(order: &Order) -> Self {
        match order.status {
            OrderStatus::Delivered => OrderEvent::Delivered { order_id: order.id },
            OrderStatus::Cancelled => OrderEvent::Cancelled {
                order_id: order.id,
                cancelled_by: order.cancelled_by.clone().unwrap_or_default(),
            },
            status => OrderEvent::StatusChanged {
                order_id: order.id,
                status,
            },
        }
    }
}
