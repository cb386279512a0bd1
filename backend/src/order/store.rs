//! Order persistence helpers
//!
//! Writes are conditional on the `version` the caller read, so two requests
//! racing on the same order cannot both win.

use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use super::error::OrderError;
use super::model::Order;

/// Load an order or fail with `NotFound`
pub async fn fetch_order<'e, E>(executor: E, id: Uuid) -> Result<Order, OrderError>
where
    E: PgExecutor<'e>,
{
    sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| OrderError::order_not_found(id))
}

/// Insert a newly placed order
pub async fn insert_order<'e, E>(executor: E, order: &Order) -> Result<Order, OrderError>
where
    E: PgExecutor<'e>,
{
    let order = sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (
            id, user_id, items, shipping_details, payment_method, paid, order_notes,
            subtotal, delivery_fee, total, status, assigned_to, delivery_otp, qr_token,
            otp_expires_at, paid_to_shop, paid_to_admin, settled_at, cancelled_by,
            delivered_at, estimated_delivery, version, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20, $21, $22, $23, $24)
        RETURNING *
        "#,
    )
    .bind(order.id)
    .bind(order.user_id)
    .bind(&order.items)
    .bind(&order.shipping_details)
    .bind(order.payment_method)
    .bind(order.paid)
    .bind(&order.order_notes)
    .bind(order.subtotal)
    .bind(order.delivery_fee)
    .bind(order.total)
    .bind(order.status)
    .bind(order.assigned_to)
    .bind(&order.delivery_otp)
    .bind(&order.qr_token)
    .bind(order.otp_expires_at)
    .bind(order.settlement.paid_to_shop)
    .bind(order.settlement.paid_to_admin)
    .bind(order.settlement.settled_at)
    .bind(&order.cancelled_by)
    .bind(order.delivered_at)
    .bind(order.estimated_delivery)
    .bind(order.version)
    .bind(order.created_at)
    .bind(order.updated_at)
    .fetch_one(executor)
    .await?;

    Ok(order)
}

/// Write the mutable fields of `order` if the stored version still equals
/// `expected_version`.
///
/// Items, totals, the customer and `estimated_delivery` are never rewritten.
pub async fn save_order<'e, E>(
    executor: E,
    order: &Order,
    expected_version: i64,
) -> Result<Order, OrderError>
where
    E: PgExecutor<'e>,
{
    let saved = sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders
        SET status = $1,
            assigned_to = $2,
            delivery_otp = $3,
            qr_token = $4,
            otp_expires_at = $5,
            paid_to_shop = $6,
            paid_to_admin = $7,
            settled_at = $8,
            cancelled_by = $9,
            delivered_at = $10,
            updated_at = $11,
            version = version + 1
        WHERE id = $12 AND version = $13
        RETURNING *
        "#,
    )
    .bind(order.status)
    .bind(order.assigned_to)
    .bind(&order.delivery_otp)
    .bind(&order.qr_token)
    .bind(order.otp_expires_at)
    .bind(order.settlement.paid_to_shop)
    .bind(order.settlement.paid_to_admin)
    .bind(order.settlement.settled_at)
    .bind(&order.cancelled_by)
    .bind(order.delivered_at)
    .bind(order.updated_at)
    .bind(order.id)
    .bind(expected_version)
    .fetch_optional(executor)
    .await?;

    saved.ok_or_else(|| {
        tracing::warn!(order_id = %order.id, expected_version, "Stale order write rejected");
        OrderError::Conflict("Order was modified concurrently, reload and retry".to_string())
    })
}

/// Load, mutate with `apply`, and save under a version check
pub async fn update_order<F>(pool: &PgPool, id: Uuid, apply: F) -> Result<Order, OrderError>
where
    F: FnOnce(&mut Order) -> Result<(), OrderError>,
{
    let mut order = fetch_order(pool, id).await?;
    let expected_version = order.version;
    apply(&mut order)?;
    save_order(pool, &order, expected_version).await
}
