//! Database connection and pool management
//!
//! Builds the pool from `[database]` settings, applies the embedded
//! migrations, and answers the readiness ping. The table check that follows
//! migrations lives in [`crate::schema`].

use crate::config::DatabaseConfig;
use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};

/// Connections kept warm while idle, never more than the pool maximum
const WARM_CONNECTIONS: u32 = 2;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Name reported in `pg_stat_activity`
const APPLICATION_NAME: &str = "fitlog";

/// Pool sizing for a database section
pub fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.max_connections.min(WARM_CONNECTIONS))
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .test_before_acquire(true)
}

/// Open the pool the Postgres store runs on
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let connect_options = PgConnectOptions::from_str(&config.url)
        .context("database.url is not a valid Postgres URL")?
        .application_name(APPLICATION_NAME);

    let pool = pool_options(config)
        .connect_with(connect_options)
        .await
        .context("failed to connect to database")?;

    info!(
        max_connections = config.max_connections,
        "Database pool created"
    );
    Ok(pool)
}

/// Apply the users, refresh_tokens and workout_routines migrations
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    let migrator = sqlx::migrate!("./migrations");
    let known = migrator.iter().count();
    migrator
        .run(pool)
        .await
        .context("failed to apply migrations")?;
    info!(known_migrations = known, "Migrations applied");
    Ok(())
}

/// Round trip used by the store's readiness ping
pub async fn health_check(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(|e| {
            warn!(error = %e, "Database ping failed");
            e
        })
}
