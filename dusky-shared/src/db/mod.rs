/// Database layer for Dusky
///
/// # Modules
///
/// - `pool`: Connecting, pool sizing and health checks
/// - `migrations`: Embedded migration runner
///
/// Every storage operation in the crate runs through [`Database::run`], which
/// bounds it by the configured per-operation timeout. When the timeout fires
/// the operation's future is dropped; an open `sqlx::Transaction` inside it is
/// rolled back on drop.

use std::future::Future;
use std::time::Duration;

use sqlx::PgPool;

use crate::error::DomainError;

pub mod migrations;
pub mod pool;

/// Default upper bound for a single storage operation (including whole transactions)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection pool paired with the per-operation timeout
///
/// Cheap to clone; clones share the underlying pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: PgPool,
    query_timeout: Duration,
}

impl Database {
    pub fn new(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Waits for checked-out connections to return, then closes the pool
    pub async fn close(&self) {
        tracing::info!("Closing database connection pool");
        self.pool.close().await;
        tracing::info!("Database connection pool closed");
    }

    /// Runs a storage future under this handle's timeout
    pub async fn run<T, E, F>(&self, fut: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<DomainError>,
    {
        with_timeout(self.query_timeout, fut).await
    }
}

/// Runs a storage future under `timeout`
///
/// Errors from the future are translated into [`DomainError`]; an elapsed
/// timeout becomes `DomainError::Internal`.
pub async fn with_timeout<T, E, F>(timeout: Duration, fut: F) -> Result<T, DomainError>
where
    F: Future<Output = Result<T, E>>,
    E: Into<DomainError>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(elapsed) => {
            tracing::warn!(
                timeout_ms = timeout.as_millis() as u64,
                "Storage operation timed out"
            );
            Err(elapsed.into())
        }
    }
}
