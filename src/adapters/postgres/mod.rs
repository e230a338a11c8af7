//! PostgreSQL adapters - Database implementations for store ports.
//!
//! - `PostgresEventLog` - Domain event log tailed by the relay
//! - `PostgresSubscriptionRepository`, `PostgresEntitlementRepository`,
//!   `PostgresBillingEventRepository`, `PostgresAlertRepository` - Billing tables

mod billing_repositories;
mod event_log;

pub use billing_repositories::{
    PostgresAlertRepository, PostgresBillingEventRepository, PostgresEntitlementRepository,
    PostgresSubscriptionRepository,
};
pub use event_log::PostgresEventLog;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;
use crate::domain::foundation::{DomainError, ErrorCode};

/// Opens a pool from configuration and optionally applies pending migrations.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DomainError> {
    let pool = PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .max_lifetime(config.max_lifetime())
        .connect(&config.url)
        .await
        .map_err(|e| DomainError::database("Failed to connect to database", e))?;

    if config.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Migration failed: {}", e))
        })?;
        tracing::info!("Database migrations applied");
    }

    Ok(pool)
}
