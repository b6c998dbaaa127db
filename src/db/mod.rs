//! Database connection management

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Tables used by the Users and Order services.
///
/// Each service only touches its own tables; they share one schema file so
/// a single database can host both in small deployments.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS accounts_tb (
        user_id     TEXT PRIMARY KEY,
        username    TEXT NOT NULL,
        account     TEXT NOT NULL,
        balance     BIGINT NOT NULL DEFAULT 0 CHECK (balance >= 0),
        created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    // Op ledger is kept forever: a VOIDED row is what fences a late debit
    r#"
    CREATE TABLE IF NOT EXISTS balance_ops_tb (
        user_id     TEXT NOT NULL REFERENCES accounts_tb (user_id),
        op_id       TEXT NOT NULL,
        delta       BIGINT NOT NULL,
        status      SMALLINT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        PRIMARY KEY (user_id, op_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS orders_tb (
        order_id      UUID PRIMARY KEY,
        user_id       TEXT NOT NULL,
        account       TEXT NOT NULL,
        product_name  TEXT NOT NULL,
        price         BIGINT NOT NULL CHECK (price > 0),
        status        SMALLINT NOT NULL,
        error_message TEXT,
        retry_count   INT NOT NULL DEFAULT 0,
        created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_orders_status_updated ON orders_tb (status, updated_at)",
];

/// PostgreSQL database connection pool
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        tracing::info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist yet
    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!(statements = SCHEMA.len(), "Database schema ensured");
        Ok(())
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
