//! Order service layer - creation, customer and shop operations

use chrono::Utc;
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use super::error::OrderError;
use super::inventory::{self, Reservation, VariantStock};
use super::model::{CreateOrderRequest, ListOrdersQuery, Order, OrderItem};
use super::secret::DeliverySecret;
use super::status::OrderStatus;
use super::store;
use super::workflow::WorkflowSettings;

/// Order service for customer, shop and admin order operations
pub struct OrderService {
    db_pool: PgPool,
    settings: WorkflowSettings,
}

impl OrderService {
    pub fn new(db_pool: PgPool, settings: WorkflowSettings) -> Self {
        Self { db_pool, settings }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    /// Place an order for `user_id` and reserve variant stock.
    ///
    /// Stock reservation runs after the order is stored and never fails the
    /// call; per-item errors are logged.
    pub async fn create_order(
        &self,
        user_id: Uuid,
        request: CreateOrderRequest,
    ) -> Result<Order, OrderError> {
        request.validate()?;

        let product_ids: Vec<Uuid> = request.items.iter().map(|i| i.product_id).collect();
        let product_shops: HashMap<Uuid, Uuid> =
            sqlx::query_as::<_, (Uuid, Uuid)>("SELECT id, shop_id FROM products WHERE id = ANY($1)")
                .bind(&product_ids)
                .fetch_all(&self.db_pool)
                .await?
                .into_iter()
                .collect();

        let order = Order::place(
            user_id,
            request,
            &product_shops,
            DeliverySecret::generate(),
            &self.settings,
            Utc::now(),
        )?;

        let order = store::insert_order(&self.db_pool, &order).await?;
        tracing::info!(
            order_id = %order.id,
            user_id = %user_id,
            status = %order.status,
            items = order.items.len(),
            "Order created"
        );

        self.reserve_inventory(&order).await;

        Ok(order)
    }

    async fn reserve_inventory(&self, order: &Order) {
        for item in order.items.iter() {
            match self.reserve_item(item).await {
                Ok(Reservation::Decremented { previous, remaining }) => {
                    tracing::debug!(
                        order_id = %order.id,
                        product_id = %item.product_id,
                        previous,
                        remaining,
                        "Variant stock reserved"
                    );
                }
                Ok(Reservation::NoMatchingVariant) => {
                    tracing::debug!(
                        order_id = %order.id,
                        product_id = %item.product_id,
                        "No stock entry for ordered variant"
                    );
                }
                Ok(Reservation::Untracked) => {}
                Err(e) => {
                    tracing::warn!(
                        order_id = %order.id,
                        product_id = %item.product_id,
                        error = %e,
                        "Failed to reserve variant stock"
                    );
                }
            }
        }
    }

    /// Row-locked read/modify/write of one product's variant stock
    async fn reserve_item(&self, item: &OrderItem) -> Result<Reservation, sqlx::Error> {
        let mut tx = self.db_pool.begin().await?;

        let row = sqlx::query_as::<_, (Option<Json<Vec<VariantStock>>>,)>(
            "SELECT variants FROM products WHERE id = $1 FOR UPDATE",
        )
        .bind(item.product_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((variants,)) = row else {
            return Ok(Reservation::Untracked);
        };
        let mut variants = variants.map(|Json(v)| v);

        let outcome = inventory::reserve(variants.as_mut(), item);
        if let (Reservation::Decremented { .. }, Some(variants)) = (outcome, variants) {
            sqlx::query("UPDATE products SET variants = $1, updated_at = $2 WHERE id = $3")
                .bind(Json(variants))
                .bind(Utc::now())
                .bind(item.product_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(outcome)
    }

    pub async fn get_order(&self, id: Uuid) -> Result<Order, OrderError> {
        store::fetch_order(&self.db_pool, id).await
    }

    /// Load an order on behalf of its customer
    pub async fn get_customer_order(&self, user_id: Uuid, id: Uuid) -> Result<Order, OrderError> {
        let order = self.get_order(id).await?;
        order.ensure_owned_by(user_id)?;
        Ok(order)
    }

    pub async fn list_customer_orders(
        &self,
        user_id: Uuid,
        query: &ListOrdersQuery,
    ) -> Result<Vec<Order>, OrderError> {
        let (limit, offset) = query.limit_offset();
        let mut builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM orders WHERE user_id = ");
        builder.push_bind(user_id);
        if let Some(status) = query.status {
            builder.push(" AND status = ");
            builder.push_bind(status);
        }
        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let orders = builder
            .build_query_as::<Order>()
            .fetch_all(&self.db_pool)
            .await?;
        Ok(orders)
    }

    /// Orders containing at least one product from `shop_id`
    pub async fn list_shop_orders(
        &self,
        shop_id: Uuid,
        query: &ListOrdersQuery,
    ) -> Result<Vec<Order>, OrderError> {
        let (limit, offset) = query.limit_offset();
        let containment = serde_json::json!([{ "shopId": shop_id }]);

        let mut builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM orders WHERE items @> ");
        builder.push_bind(containment);
        if let Some(status) = query.status {
            builder.push(" AND status = ");
            builder.push_bind(status);
        }
        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let orders = builder
            .build_query_as::<Order>()
            .fetch_all(&self.db_pool)
            .await?;
        Ok(orders)
    }

    pub async fn cancel_by_customer(&self, user_id: Uuid, id: Uuid) -> Result<Order, OrderError> {
        let order = store::update_order(&self.db_pool, id, |order| {
            order.cancel_by_customer(user_id, Utc::now())
        })
        .await?;
        tracing::info!(order_id = %id, user_id = %user_id, "Order cancelled by customer");
        Ok(order)
    }

    pub async fn cancel_by_admin(&self, id: Uuid) -> Result<Order, OrderError> {
        let order =
            store::update_order(&self.db_pool, id, |order| order.cancel_by_admin(Utc::now()))
                .await?;
        if let Some(agent_id) = order.assigned_to {
            tracing::warn!(
                order_id = %id,
                agent_id = %agent_id,
                "Cancelled order was held by a delivery agent; agent stays unavailable until released"
            );
        }
        tracing::info!(order_id = %id, "Order cancelled by admin");
        Ok(order)
    }

    /// Issue a fresh OTP / QR token for the customer's order
    pub async fn regenerate_secret(&self, user_id: Uuid, id: Uuid) -> Result<Order, OrderError> {
        let ttl = self.settings.otp_ttl;
        let order = store::update_order(&self.db_pool, id, |order| {
            order.regenerate_secret(user_id, DeliverySecret::generate(), ttl, Utc::now())
        })
        .await?;
        tracing::info!(order_id = %id, "Delivery OTP regenerated");
        Ok(order)
    }

    pub async fn shop_confirm(&self, shop_id: Uuid, id: Uuid) -> Result<Order, OrderError> {
        self.shop_transition(id, |order| order.confirm_by_shop(shop_id, Utc::now()))
            .await
    }

    pub async fn shop_notify_delivery(&self, shop_id: Uuid, id: Uuid) -> Result<Order, OrderError> {
        self.shop_transition(id, |order| order.notify_delivery(shop_id, Utc::now()))
            .await
    }

    pub async fn shop_deliver(&self, shop_id: Uuid, id: Uuid) -> Result<Order, OrderError> {
        self.shop_transition(id, |order| order.deliver_by_shop(shop_id, Utc::now()))
            .await
    }

    pub async fn shop_update_status(
        &self,
        shop_id: Uuid,
        id: Uuid,
        status: OrderStatus,
    ) -> Result<Order, OrderError> {
        self.shop_transition(id, |order| {
            order.advance_by_shop(shop_id, status, Utc::now())
        })
        .await
    }

    async fn shop_transition<F>(&self, id: Uuid, apply: F) -> Result<Order, OrderError>
    where
        F: FnOnce(&mut Order) -> Result<(), OrderError>,
    {
        let order = store::update_order(&self.db_pool, id, apply).await?;
        tracing::info!(order_id = %id, status = %order.status, "Order status updated by shop");
        Ok(order)
    }
}
