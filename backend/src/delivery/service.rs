//! Delivery service layer - agents, assignment and drop-off confirmation

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::model::{DeliveryAgent, RegisterAgentRequest};
use crate::order::{store, ListOrdersQuery, Order, OrderError, OrderStatus};

/// Delivery service for agent management and the assignment workflow
pub struct DeliveryService {
    db_pool: PgPool,
}

impl DeliveryService {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    pub async fn register_agent(
        &self,
        request: RegisterAgentRequest,
    ) -> Result<DeliveryAgent, OrderError> {
        request.validate()?;

        let now = Utc::now();
        let result = sqlx::query_as::<_, DeliveryAgent>(
            r#"
            INSERT INTO delivery_agents (
                id, external_id, name, phone, is_available, is_active, assigned_orders,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, TRUE, TRUE, '{}', $5, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&request.external_id)
        .bind(&request.name)
        .bind(&request.phone)
        .bind(now)
        .fetch_one(&self.db_pool)
        .await;

        match result {
            Ok(agent) => {
                tracing::info!(agent_id = %agent.id, external_id = %agent.external_id, "Delivery agent registered");
                Ok(agent)
            }
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(OrderError::Conflict(
                format!("Delivery agent id {} is already taken", request.external_id),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_agent(&self, id: Uuid) -> Result<DeliveryAgent, OrderError> {
        sqlx::query_as::<_, DeliveryAgent>("SELECT * FROM delivery_agents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| OrderError::NotFound(format!("Delivery agent {} not found", id)))
    }

    pub async fn list_available_agents(&self) -> Result<Vec<DeliveryAgent>, OrderError> {
        let agents = sqlx::query_as::<_, DeliveryAgent>(
            r#"
            SELECT * FROM delivery_agents
            WHERE is_active AND is_available
            ORDER BY external_id
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?;
        Ok(agents)
    }

    /// Exclusively assign `order_id` to `agent_id`.
    ///
    /// The agent row is locked for the duration; the order write is version
    /// checked. Either both the order and the agent change, or neither does.
    pub async fn assign_order(
        &self,
        order_id: Uuid,
        agent_id: Uuid,
    ) -> Result<(Order, DeliveryAgent), OrderError> {
        let mut tx = self.db_pool.begin().await?;

        let agent = sqlx::query_as::<_, DeliveryAgent>(
            "SELECT * FROM delivery_agents WHERE id = $1 FOR UPDATE",
        )
        .bind(agent_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| OrderError::NotFound(format!("Delivery agent {} not found", agent_id)))?;
        agent.ensure_assignable()?;

        let mut order = store::fetch_order(&mut *tx, order_id).await?;
        let expected_version = order.version;
        let now = Utc::now();
        order.assign(agent.id, now)?;
        let order = store::save_order(&mut *tx, &order, expected_version).await?;

        let agent = sqlx::query_as::<_, DeliveryAgent>(
            r#"
            UPDATE delivery_agents
            SET is_available = FALSE,
                assigned_orders = array_append(assigned_orders, $1),
                updated_at = $2
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(order.id)
        .bind(now)
        .bind(agent.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order.id, agent_id = %agent.id, "Order assigned to delivery agent");
        Ok((order, agent))
    }

    /// Self-serve assignment by the calling agent
    pub async fn take_order(&self, order_id: Uuid, agent_id: Uuid) -> Result<Order, OrderError> {
        let (order, _) = self.assign_order(order_id, agent_id).await?;
        Ok(order)
    }

    /// Mark an order delivered after checking the customer's code.
    ///
    /// The agent stays unavailable; a delivery head frees it with
    /// [`DeliveryService::release_agent`].
    pub async fn confirm_delivery(
        &self,
        order_id: Uuid,
        agent_id: Uuid,
        code: &str,
    ) -> Result<Order, OrderError> {
        let result = store::update_order(&self.db_pool, order_id, |order| {
            order.confirm_delivery(agent_id, code, Utc::now())
        })
        .await;

        match &result {
            Ok(_) => tracing::info!(order_id = %order_id, agent_id = %agent_id, "Delivery confirmed"),
            Err(OrderError::Validation(_)) | Err(OrderError::Expired(_)) => {
                tracing::warn!(order_id = %order_id, agent_id = %agent_id, "Delivery confirmation rejected")
            }
            Err(_) => {}
        }
        result
    }

    /// Unassigned orders an agent may take, oldest first
    pub async fn list_open_orders(&self, query: &ListOrdersQuery) -> Result<Vec<Order>, OrderError> {
        let (limit, offset) = query.limit_offset();
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE assigned_to IS NULL AND status = ANY($1::order_status[])
            ORDER BY created_at ASC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(assignable_statuses())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db_pool)
        .await?;
        Ok(orders)
    }

    /// Orders ever assigned to `agent_id`, newest first
    pub async fn list_agent_orders(
        &self,
        agent_id: Uuid,
        query: &ListOrdersQuery,
    ) -> Result<Vec<Order>, OrderError> {
        let (limit, offset) = query.limit_offset();
        let mut builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM orders WHERE assigned_to = ");
        builder.push_bind(agent_id);
        if let Some(status) = query.status {
            builder.push(" AND status = ");
            builder.push_bind(status);
        }
        builder.push(" ORDER BY updated_at DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let orders = builder
            .build_query_as::<Order>()
            .fetch_all(&self.db_pool)
            .await?;
        Ok(orders)
    }

    /// Make an agent available again once it holds no active order
    pub async fn release_agent(&self, agent_id: Uuid) -> Result<DeliveryAgent, OrderError> {
        let mut tx = self.db_pool.begin().await?;

        let agent = sqlx::query_as::<_, DeliveryAgent>(
            "SELECT * FROM delivery_agents WHERE id = $1 FOR UPDATE",
        )
        .bind(agent_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| OrderError::NotFound(format!("Delivery agent {} not found", agent_id)))?;

        if !agent.is_active {
            return Err(OrderError::Conflict(format!(
                "Delivery agent {} is not active",
                agent.external_id
            )));
        }
        self.ensure_no_active_order(&mut tx, &agent).await?;

        let agent = sqlx::query_as::<_, DeliveryAgent>(
            r#"
            UPDATE delivery_agents
            SET is_available = TRUE, updated_at = $1
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(Utc::now())
        .bind(agent_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(agent_id = %agent_id, "Delivery agent released");
        Ok(agent)
    }

    /// Soft-delete an agent that holds no active order
    pub async fn deactivate_agent(&self, agent_id: Uuid) -> Result<DeliveryAgent, OrderError> {
        let mut tx = self.db_pool.begin().await?;

        let agent = sqlx::query_as::<_, DeliveryAgent>(
            "SELECT * FROM delivery_agents WHERE id = $1 FOR UPDATE",
        )
        .bind(agent_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| OrderError::NotFound(format!("Delivery agent {} not found", agent_id)))?;

        self.ensure_no_active_order(&mut tx, &agent).await?;

        let agent = sqlx::query_as::<_, DeliveryAgent>(
            r#"
            UPDATE delivery_agents
            SET is_active = FALSE, is_available = FALSE, updated_at = $1
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(Utc::now())
        .bind(agent_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(agent_id = %agent_id, "Delivery agent deactivated");
        Ok(agent)
    }

    async fn ensure_no_active_order(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        agent: &DeliveryAgent,
    ) -> Result<(), OrderError> {
        let (active,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM orders
                WHERE assigned_to = $1 AND status NOT IN ('delivered', 'cancelled')
            )
            "#,
        )
        .bind(agent.id)
        .fetch_one(&mut **tx)
        .await?;

        if active {
            return Err(OrderError::Conflict(format!(
                "Delivery agent {} still holds an active order",
                agent.external_id
            )));
        }
        Ok(())
    }
}

fn assignable_statuses() -> Vec<String> {
    OrderStatus::ALL
        .into_iter()
        .filter(OrderStatus::is_assignable)
        .map(|status| status.as_str().to_string())
        .collect()
}
