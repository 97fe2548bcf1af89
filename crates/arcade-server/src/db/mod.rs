//! Connection pool bootstrap and migrations

use crate::config::DatabaseConfig;
use arcade_common::retry::RetryPolicy;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Database configuration error: {0}. Check DATABASE_URL and connection settings.")]
    Config(String),
}

pub type DbResult<T> = Result<T, DbError>;

pub async fn create_pool(config: &DatabaseConfig) -> DbResult<PgPool> {
    if config.url.is_empty() {
        return Err(DbError::Config("DATABASE_URL is empty".to_string()));
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await?;

    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

/// Create the pool, retrying under `policy` while the database comes up
pub async fn connect_with_retry(config: &DatabaseConfig, policy: &RetryPolicy) -> DbResult<PgPool> {
    policy
        .run("database connection", |_attempt| create_pool(config))
        .await
}

pub async fn run_migrations(pool: &PgPool) -> DbResult<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    info!("Database migrations completed");
    Ok(())
}

pub async fn health_check(pool: &PgPool) -> DbResult<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(DbError::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn test_empty_url_is_config_error() {
        let mut config = Config::default().database;
        config.url = String::new();

        let err = create_pool(&config).await.unwrap_err();
        assert!(matches!(err, DbError::Config(_)));
    }

    #[tokio::test]
    async fn test_connect_with_retry_gives_up() {
        let mut config = Config::default().database;
        // nothing listens on port 1
        config.url = "postgresql://localhost:1/arcade".to_string();
        config.min_connections = 0;
        config.connect_timeout_secs = 1;

        let result = connect_with_retry(&config, &RetryPolicy::no_retry()).await;
        assert!(matches!(result, Err(DbError::Sqlx(_))));
    }
}
