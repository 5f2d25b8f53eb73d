//! PostgreSQL reachability checks for the scraper's database.
//!
//! The scraper owns its schema; this crate only verifies that the
//! configured database accepts connections, bounded by
//! [`DatabaseConfig::connect_timeout`] so a bad host fails fast.

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use hespress_core::config::DatabaseConfig;

pub type DbPool = sqlx::PgPool;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Cannot connect to database {name} at {host}:{port}: {source}")]
    Connect {
        host: String,
        port: u16,
        name: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Database connection timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Database health check failed: {0}")]
    HealthCheck(#[source] sqlx::Error),
}

/// Connection options built from the environment-sourced config.
pub fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.name)
        .username(&config.user)
        .password(config.password())
        .application_name("hespress-supervisor")
}

/// Create a small pool; the attempt is abandoned after `connect_timeout`.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool, DbError> {
    let connect = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(config.connect_timeout)
        .connect_with(connect_options(config));

    match tokio::time::timeout(config.connect_timeout, connect).await {
        Ok(Ok(pool)) => Ok(pool),
        Ok(Err(sqlx::Error::PoolTimedOut)) | Err(_) => {
            Err(DbError::Timeout(config.connect_timeout))
        }
        Ok(Err(source)) => Err(DbError::Connect {
            host: config.host.clone(),
            port: config.port,
            name: config.name.clone(),
            source,
        }),
    }
}

/// Run a trivial query against the pool.
pub async fn health_check(pool: &DbPool) -> Result<(), DbError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map(|_| ())
        .map_err(DbError::HealthCheck)
}

/// Connect, run the health check and close the pool again.
pub async fn probe(config: &DatabaseConfig) -> Result<(), DbError> {
    tracing::info!(
        host = %config.host,
        port = config.port,
        database = %config.name,
        timeout_secs = config.connect_timeout.as_secs(),
        "Probing database",
    );
    let pool = create_pool(config).await?;
    let result = health_check(&pool).await;
    pool.close().await;
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
