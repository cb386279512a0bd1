//! Order store connection pool, migrations and health

use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::{Duration, Instant};

use crate::config::Config;

/// Tables the order workflow cannot run without
pub const REQUIRED_TABLES: [&str; 3] = ["orders", "products", "delivery_agents"];

/// Database connection error
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Failed to connect to database: {0}")]
    ConnectionError(String),

    #[error("Failed to run migrations: {0}")]
    MigrationError(String),

    #[error("Database health check failed: {0}")]
    HealthCheckError(String),
}

/// Reachable store with the order schema in place
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreHealth {
    pub latency_ms: u64,
}

pub async fn create_pool(config: &Config) -> Result<PgPool, DbError> {
    tracing::info!(
        max_connections = config.db_max_connections,
        environment = config.environment.as_str(),
        "Connecting to order store at {}",
        config.database_url_masked()
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .connect(&config.database_url)
        .await
        .map_err(|e| DbError::ConnectionError(e.to_string()))?;

    Ok(pool)
}

/// Apply the schema under `backend/migrations`
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    tracing::info!("Running order store migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DbError::MigrationError(e.to_string()))?;

    Ok(())
}

/// Round-trip the store and confirm the workflow tables exist
pub async fn check_health(pool: &PgPool) -> Result<StoreHealth, DbError> {
    let started = Instant::now();
    let required: Vec<String> = REQUIRED_TABLES.iter().map(|t| t.to_string()).collect();

    let present: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT table_name::TEXT
        FROM information_schema.tables
        WHERE table_schema = current_schema() AND table_name::TEXT = ANY($1)
        "#,
    )
    .bind(&required)
    .fetch_all(pool)
    .await
    .map_err(|e| DbError::HealthCheckError(e.to_string()))?;

    let missing = missing_tables(&present);
    if !missing.is_empty() {
        return Err(DbError::HealthCheckError(format!(
            "migrations not applied, missing tables: {}",
            missing.join(", ")
        )));
    }

    Ok(StoreHealth {
        latency_ms: started.elapsed().as_millis() as u64,
    })
}

fn missing_tables(present: &[String]) -> Vec<&'static str> {
    REQUIRED_TABLES
        .into_iter()
        .filter(|table| !present.iter().any(|p| p == table))
        .collect()
}
