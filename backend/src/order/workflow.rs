//! Order lifecycle transitions
//!
//! Every trigger is a method on [`Order`] that checks its guard, mutates the
//! in-memory document and touches `updated_at`. Persistence is handled by
//! [`super::store`], which applies the result with a version check.

use chrono::{DateTime, Duration, Utc};
use sqlx::types::Json;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use super::error::OrderError;
use super::model::{CreateOrderRequest, Order, OrderItem, PaymentMethod, Settlement};
use super::secret::{self, DeliverySecret};
use super::status::OrderStatus;

/// Timing rules for new orders
#[derive(Debug, Clone, Copy)]
pub struct WorkflowSettings {
    pub otp_ttl: Duration,
    pub estimated_delivery: Duration,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            otp_ttl: Duration::hours(24),
            estimated_delivery: Duration::days(3),
        }
    }
}

/// Status a new order starts in
pub fn initial_status(payment_method: PaymentMethod, paid: bool) -> OrderStatus {
    match (payment_method, paid) {
        (PaymentMethod::Online, true) => OrderStatus::Confirmed,
        _ => OrderStatus::Pending,
    }
}

impl Order {
    /// Build a new order from a checkout request.
    ///
    /// `product_shops` maps every known product id to its owning shop.
    pub fn place(
        user_id: Uuid,
        request: CreateOrderRequest,
        product_shops: &HashMap<Uuid, Uuid>,
        secret: DeliverySecret,
        settings: &WorkflowSettings,
        now: DateTime<Utc>,
    ) -> Result<Order, OrderError> {
        request.validate()?;

        let shipping_details = request
            .shipping_details
            .ok_or_else(|| OrderError::Validation("Shipping details are required".to_string()))?;
        shipping_details.validate()?;

        let mut items = Vec::with_capacity(request.items.len());
        for item in request.items {
            item.validate()?;
            let shop_id = *product_shops.get(&item.product_id).ok_or_else(|| {
                OrderError::Validation(format!("Unknown product {}", item.product_id))
            })?;
            items.push(OrderItem {
                product_id: item.product_id,
                shop_id,
                name: item.name,
                quantity: item.quantity,
                price: item.price,
                selected_size: item.selected_size,
                selected_color: item.selected_color,
            });
        }

        Ok(Order {
            id: Uuid::new_v4(),
            user_id,
            items: Json(items),
            shipping_details: Json(shipping_details),
            payment_method: request.payment_method,
            paid: request.paid,
            order_notes: request.order_notes,
            subtotal: request.subtotal,
            delivery_fee: request.delivery_fee,
            total: request.total,
            status: initial_status(request.payment_method, request.paid),
            assigned_to: None,
            delivery_otp: secret.otp,
            qr_token: secret.qr_token,
            otp_expires_at: now + settings.otp_ttl,
            settlement: Settlement::default(),
            cancelled_by: None,
            delivered_at: None,
            estimated_delivery: now + settings.estimated_delivery,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Whether any line item belongs to `shop_id`
    pub fn contains_shop(&self, shop_id: Uuid) -> bool {
        self.items.iter().any(|item| item.shop_id == shop_id)
    }

    pub fn ensure_owned_by(&self, user_id: Uuid) -> Result<(), OrderError> {
        if self.user_id != user_id {
            return Err(OrderError::Forbidden(
                "You can only access your own orders".to_string(),
            ));
        }
        Ok(())
    }

    pub fn ensure_shop(&self, shop_id: Uuid) -> Result<(), OrderError> {
        if !self.contains_shop(shop_id) {
            return Err(OrderError::Forbidden(
                "Order does not contain products from this shop".to_string(),
            ));
        }
        Ok(())
    }

    /// Copy with the hand-off secrets blanked, for non-customer viewers
    pub fn redacted(mut self) -> Order {
        self.delivery_otp.clear();
        self.qr_token.clear();
        self
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    fn move_to(&mut self, target: OrderStatus, now: DateTime<Utc>) -> Result<(), OrderError> {
        if !self.status.can_transition_to(target) {
            return Err(OrderError::Conflict(format!(
                "Cannot move order from {} to {}",
                self.status, target
            )));
        }
        self.status = target;
        self.touch(now);
        Ok(())
    }

    fn expect_status(&self, expected: OrderStatus, action: &str) -> Result<(), OrderError> {
        if self.status != expected {
            return Err(OrderError::Conflict(format!(
                "Cannot {} an order that is {}",
                action, self.status
            )));
        }
        Ok(())
    }

    /// Shop accepts a pending order
    pub fn confirm_by_shop(&mut self, shop_id: Uuid, now: DateTime<Utc>) -> Result<(), OrderError> {
        self.ensure_shop(shop_id)?;
        self.expect_status(OrderStatus::Pending, "confirm")?;
        self.move_to(OrderStatus::Confirmed, now)
    }

    /// Shop signals the order is ready for a delivery agent
    pub fn notify_delivery(&mut self, shop_id: Uuid, now: DateTime<Utc>) -> Result<(), OrderError> {
        self.ensure_shop(shop_id)?;
        self.expect_status(OrderStatus::Confirmed, "notify delivery for")?;
        self.move_to(OrderStatus::NotifyDelivery, now)
    }

    /// Shop moves the order one step along the forward path.
    ///
    /// Shops never cancel; `delivered` goes through [`Order::deliver_by_shop`].
    pub fn advance_by_shop(
        &mut self,
        shop_id: Uuid,
        target: OrderStatus,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        match target {
            OrderStatus::Cancelled => Err(OrderError::Validation(
                "Shops cannot cancel orders".to_string(),
            )),
            OrderStatus::Delivered => self.deliver_by_shop(shop_id, now),
            target => {
                self.ensure_shop(shop_id)?;
                if self.status.next() != Some(target) {
                    return Err(OrderError::Conflict(format!(
                        "Cannot move order from {} to {}",
                        self.status, target
                    )));
                }
                self.move_to(target, now)
            }
        }
    }

    /// Shop records the drop-off for an order it delivers itself
    pub fn deliver_by_shop(&mut self, shop_id: Uuid, now: DateTime<Utc>) -> Result<(), OrderError> {
        self.ensure_shop(shop_id)?;
        self.expect_status(OrderStatus::OutForDelivery, "deliver")?;
        if self.assigned_to.is_some() {
            return Err(OrderError::Conflict(
                "Order is held by a delivery agent and must be confirmed with its OTP".to_string(),
            ));
        }
        self.move_to(OrderStatus::Delivered, now)?;
        self.delivered_at = Some(now);
        Ok(())
    }

    /// Hand the order to a delivery agent
    pub fn assign(&mut self, agent_id: Uuid, now: DateTime<Utc>) -> Result<(), OrderError> {
        if self.assigned_to.is_some() {
            return Err(OrderError::Conflict(
                "Order is already assigned to a delivery agent".to_string(),
            ));
        }
        if !self.status.is_assignable() {
            return Err(OrderError::Conflict(format!(
                "Cannot assign an order that is {}",
                self.status
            )));
        }
        self.move_to(OrderStatus::OutForDelivery, now)?;
        self.assigned_to = Some(agent_id);
        Ok(())
    }

    /// Agent confirms the drop-off with the customer's OTP or QR token
    pub fn confirm_delivery(
        &mut self,
        agent_id: Uuid,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        if self.assigned_to != Some(agent_id) {
            return Err(OrderError::Forbidden(
                "Order is not assigned to you".to_string(),
            ));
        }
        self.expect_status(OrderStatus::OutForDelivery, "confirm delivery of")?;
        if !secret::code_matches(code, &self.delivery_otp, &self.qr_token) {
            return Err(OrderError::Validation("Invalid OTP".to_string()));
        }
        if now > self.otp_expires_at {
            return Err(OrderError::Expired("OTP has expired".to_string()));
        }
        self.move_to(OrderStatus::Delivered, now)?;
        self.delivered_at = Some(now);
        Ok(())
    }

    /// Ordering customer cancels while the order is still early
    pub fn cancel_by_customer(&mut self, user_id: Uuid, now: DateTime<Utc>) -> Result<(), OrderError> {
        self.ensure_owned_by(user_id)?;
        if !self.status.is_customer_cancellable() {
            return Err(OrderError::Conflict(format!(
                "Order cannot be cancelled once it is {}",
                self.status
            )));
        }
        self.move_to(OrderStatus::Cancelled, now)?;
        self.cancelled_by = Some("customer".to_string());
        Ok(())
    }

    /// Operator cancels any non-terminal order
    pub fn cancel_by_admin(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        self.move_to(OrderStatus::Cancelled, now)?;
        self.cancelled_by = Some("admin".to_string());
        Ok(())
    }

    /// Replace the hand-off secret and restart its validity window
    pub fn regenerate_secret(
        &mut self,
        user_id: Uuid,
        secret: DeliverySecret,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        self.ensure_owned_by(user_id)?;
        if self.status.is_terminal() {
            return Err(OrderError::Conflict(format!(
                "Cannot issue a new OTP for an order that is {}",
                self.status
            )));
        }
        self.delivery_otp = secret.otp;
        self.qr_token = secret.qr_token;
        self.otp_expires_at = now + ttl;
        self.touch(now);
        Ok(())
    }

    /// Record the shop payout for a delivered order
    pub fn settle_shop(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        self.expect_status(OrderStatus::Delivered, "settle")?;
        if self.settlement.paid_to_shop {
            return Err(OrderError::Conflict(
                "Order is already settled with the shop".to_string(),
            ));
        }
        self.settlement.paid_to_shop = true;
        self.settlement.settled_at = Some(now);
        self.touch(now);
        Ok(())
    }

    /// Record the platform's share for a delivered order
    pub fn settle_admin(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        self.expect_status(OrderStatus::Delivered, "settle")?;
        if self.settlement.paid_to_admin {
            return Err(OrderError::Conflict(
                "Order is already settled with the admin".to_string(),
            ));
        }
        self.settlement.paid_to_admin = true;
        self.settlement.settled_at = Some(now);
        self.touch(now);
        Ok(())
    }
}
