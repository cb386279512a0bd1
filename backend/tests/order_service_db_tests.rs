//! Service tests against a real Postgres database
//!
//! Run with `TEST_DATABASE_URL` pointing at a scratch database and
//! `cargo test -- --ignored`.

#[cfg(test)]
mod tests {
    use serde_json::json;
    use sqlx::PgPool;
    use uuid::Uuid;

    use marketplace_orders::delivery::{DeliveryAgent, DeliveryService, RegisterAgentRequest};
    use marketplace_orders::order::{
        store, CreateOrderRequest, ListOrdersQuery, Order, OrderError, OrderItemRequest,
        OrderService, OrderStatus, PaymentMethod, ShippingDetails, WorkflowSettings,
    };
    use marketplace_orders::settlement::{Payee, SettlementService};

    async fn setup_test_db() -> PgPool {
        let database_url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/marketplace_orders_test".to_string());

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database");

        marketplace_orders::db::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        pool
    }

    async fn insert_product(pool: &PgPool, shop_id: Uuid, stock: i32) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO products (id, shop_id, name, variants) VALUES ($1, $2, $3, $4)")
            .bind(id)
            .bind(shop_id)
            .bind("Linen shirt")
            .bind(json!([
                { "size": "M", "color": "Red", "quantity": stock },
                { "size": "L", "color": "Red", "quantity": stock }
            ]))
            .execute(pool)
            .await
            .expect("Failed to insert product");
        id
    }

    async fn variant_stock(pool: &PgPool, product_id: Uuid, size: &str) -> i64 {
        let (quantity,): (i64,) = sqlx::query_as(
            r#"
            SELECT (v->>'quantity')::BIGINT
            FROM products, jsonb_array_elements(variants) v
            WHERE id = $1 AND v->>'size' = $2 AND v->>'color' = 'Red'
            "#,
        )
        .bind(product_id)
        .bind(size)
        .fetch_one(pool)
        .await
        .expect("Failed to read stock");
        quantity
    }

    fn checkout(product_id: Uuid, quantity: i32) -> CreateOrderRequest {
        CreateOrderRequest {
            items: vec![OrderItemRequest {
                product_id,
                name: None,
                quantity,
                price: 500.0,
                selected_size: Some("M".to_string()),
                selected_color: Some("Red".to_string()),
            }],
            shipping_details: Some(ShippingDetails {
                full_name: "Asha Rao".to_string(),
                phone: "9876543210".to_string(),
                address: "12 MG Road".to_string(),
                city: "Pune".to_string(),
                state: None,
                postal_code: "411001".to_string(),
            }),
            payment_method: PaymentMethod::Cod,
            paid: false,
            order_notes: None,
            subtotal: 500.0 * quantity as f64,
            delivery_fee: 50.0,
            total: 500.0 * quantity as f64 + 50.0,
        }
    }

    async fn register_agent(service: &DeliveryService) -> DeliveryAgent {
        let suffix = Uuid::new_v4().simple().to_string();
        service
            .register_agent(RegisterAgentRequest {
                external_id: format!("DB{}", &suffix[..8]),
                name: "Ravi".to_string(),
                phone: None,
            })
            .await
            .expect("Failed to register agent")
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_create_order_reserves_variant_stock() {
        let pool = setup_test_db().await;
        let orders = OrderService::new(pool.clone(), WorkflowSettings::default());
        let shop_id = Uuid::new_v4();
        let product_id = insert_product(&pool, shop_id, 3).await;

        let order = orders
            .create_order(Uuid::new_v4(), checkout(product_id, 2))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.items[0].shop_id, shop_id);
        assert_eq!(variant_stock(&pool, product_id, "M").await, 1);
        assert_eq!(variant_stock(&pool, product_id, "L").await, 3);

        orders
            .create_order(Uuid::new_v4(), checkout(product_id, 5))
            .await
            .unwrap();
        assert_eq!(variant_stock(&pool, product_id, "M").await, 0);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_create_order_rejects_unknown_product() {
        let pool = setup_test_db().await;
        let orders = OrderService::new(pool, WorkflowSettings::default());

        let result = orders
            .create_order(Uuid::new_v4(), checkout(Uuid::new_v4(), 1))
            .await;

        assert!(matches!(result, Err(OrderError::Validation(_))));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_assignment_and_delivery_flow() {
        let pool = setup_test_db().await;
        let orders = OrderService::new(pool.clone(), WorkflowSettings::default());
        let delivery = DeliveryService::new(pool.clone());
        let settlement = SettlementService::new(pool.clone());

        let product_id = insert_product(&pool, Uuid::new_v4(), 10).await;
        let order = orders
            .create_order(Uuid::new_v4(), checkout(product_id, 1))
            .await
            .unwrap();
        let agent = register_agent(&delivery).await;

        let (assigned, agent) = delivery.assign_order(order.id, agent.id).await.unwrap();
        assert_eq!(assigned.status, OrderStatus::OutForDelivery);
        assert_eq!(assigned.assigned_to, Some(agent.id));
        assert!(!agent.is_available);
        assert_eq!(agent.assigned_orders, vec![order.id]);

        let open = delivery
            .list_open_orders(&ListOrdersQuery::default())
            .await
            .unwrap();
        assert!(open.iter().all(|o| o.id != order.id));

        let delivered = delivery
            .confirm_delivery(order.id, agent.id, &order.delivery_otp)
            .await
            .unwrap();
        assert_eq!(delivered.status, OrderStatus::Delivered);

        // Delivery does not free the agent; a delivery head does
        assert!(!delivery.get_agent(agent.id).await.unwrap().is_available);
        let released = delivery.release_agent(agent.id).await.unwrap();
        assert!(released.is_available);

        settlement.settle(order.id, Payee::Shop).await.unwrap();
        let again = settlement.settle(order.id, Payee::Shop).await;
        assert!(matches!(again, Err(OrderError::Conflict(_))));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_busy_agent_cannot_take_second_order() {
        let pool = setup_test_db().await;
        let orders = OrderService::new(pool.clone(), WorkflowSettings::default());
        let delivery = DeliveryService::new(pool.clone());

        let product_id = insert_product(&pool, Uuid::new_v4(), 10).await;
        let first = orders
            .create_order(Uuid::new_v4(), checkout(product_id, 1))
            .await
            .unwrap();
        let second = orders
            .create_order(Uuid::new_v4(), checkout(product_id, 1))
            .await
            .unwrap();
        let agent = register_agent(&delivery).await;

        delivery.take_order(first.id, agent.id).await.unwrap();
        let result = delivery.take_order(second.id, agent.id).await;
        assert!(matches!(result, Err(OrderError::Conflict(_))));

        let untouched = orders.get_order(second.id).await.unwrap();
        assert_eq!(untouched.assigned_to, None);
        assert!(matches!(
            delivery.release_agent(agent.id).await,
            Err(OrderError::Conflict(_))
        ));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_concurrent_assignment_has_one_winner() {
        let pool = setup_test_db().await;
        let orders = OrderService::new(pool.clone(), WorkflowSettings::default());
        let delivery = DeliveryService::new(pool.clone());

        let product_id = insert_product(&pool, Uuid::new_v4(), 10).await;
        let order = orders
            .create_order(Uuid::new_v4(), checkout(product_id, 1))
            .await
            .unwrap();
        let a = register_agent(&delivery).await;
        let b = register_agent(&delivery).await;

        let (ra, rb) = tokio::join!(
            delivery.assign_order(order.id, a.id),
            delivery.assign_order(order.id, b.id)
        );
        assert_eq!(ra.is_ok() as u8 + rb.is_ok() as u8, 1);

        let loser = if ra.is_ok() { b.id } else { a.id };
        let loser = delivery.get_agent(loser).await.unwrap();
        assert!(loser.is_available);
        assert!(loser.assigned_orders.is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_stale_write_is_rejected() {
        let pool = setup_test_db().await;
        let orders = OrderService::new(pool.clone(), WorkflowSettings::default());

        let product_id = insert_product(&pool, Uuid::new_v4(), 10).await;
        let user_id = Uuid::new_v4();
        let order = orders
            .create_order(user_id, checkout(product_id, 1))
            .await
            .unwrap();

        let mut stale: Order = order.clone();
        orders.cancel_by_customer(user_id, order.id).await.unwrap();

        stale.cancel_by_admin(chrono::Utc::now()).unwrap();
        let result = store::save_order(&pool, &stale, order.version).await;
        assert!(matches!(result, Err(OrderError::Conflict(_))));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_health_check_sees_order_schema() {
        let pool = setup_test_db().await;

        let health = marketplace_orders::db::check_health(&pool).await;
        assert!(health.is_ok());
    }
}
