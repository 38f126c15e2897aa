use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::info;

use super::StoreError;
use crate::config;

/// Connect to the database named by `DATABASE_URL` and bring the schema up
/// to date.
pub async fn connect() -> Result<PgPool, StoreError> {
    let url =
        std::env::var("DATABASE_URL").map_err(|_| StoreError::ConfigMissing("DATABASE_URL"))?;

    let database = &config::config().database;
    let pool = PgPoolOptions::new()
        .max_connections(database.max_connections)
        .acquire_timeout(Duration::from_secs(database.connect_timeout_secs))
        .connect(&url)
        .await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| StoreError::MigrationError(e.to_string()))?;

    info!("Connected to database and applied migrations");
    Ok(pool)
}

/// Pings the pool to ensure connectivity.
pub async fn health_check(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
