//! Settlement service layer

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::order::{store, ListOrdersQuery, Order, OrderError};

/// Which side of a delivered order is being paid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payee {
    Shop,
    Admin,
}

impl Payee {
    pub fn as_str(&self) -> &'static str {
        match self {
            Payee::Shop => "shop",
            Payee::Admin => "admin",
        }
    }
}

/// Settlement service for admin payout flags
pub struct SettlementService {
    db_pool: PgPool,
}

impl SettlementService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    /// Mark `payee` as paid for a delivered order; a second call always fails
    pub async fn settle(&self, order_id: Uuid, payee: Payee) -> Result<Order, OrderError> {
        let order = store::update_order(&self.db_pool, order_id, |order| {
            let now = Utc::now();
            match payee {
                Payee::Shop => order.settle_shop(now),
                Payee::Admin => order.settle_admin(now),
            }
        })
        .await?;

        tracing::info!(order_id = %order_id, payee = payee.as_str(), "Order settled");
        Ok(order)
    }

    /// Delivered orders with an outstanding shop or admin payout, oldest first
    pub async fn list_unsettled(&self, query: &ListOrdersQuery) -> Result<Vec<Order>, OrderError> {
        let (limit, offset) = query.limit_offset();
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE status = 'delivered' AND (NOT paid_to_shop OR NOT paid_to_admin)
            ORDER BY delivered_at ASC NULLS FIRST
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(orders)
    }
}
