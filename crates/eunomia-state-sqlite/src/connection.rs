use eunomia_core::CoreError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::SqliteConfig;

/// Connection pool manager for SQLite
#[derive(Clone)]
pub struct SqliteDatabase {
    pub(crate) pool: SqlitePool,
}

impl SqliteDatabase {
    /// Open a connection pool, creating the database file if needed
    pub async fn connect(config: &SqliteConfig) -> Result<Self, CoreError> {
        let options = SqliteConnectOptions::from_str(&config.connection_string)
            .map_err(|e| {
                CoreError::StateStoreError(format!(
                    "Invalid SQLite connection string '{}': {}",
                    config.connection_string, e
                ))
            })?
            .create_if_missing(true)
            .foreign_keys(true);

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs));

        // Every connection to `:memory:` is a separate database, so keep exactly one alive
        if is_memory_url(&config.connection_string) {
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options.connect_with(options).await.map_err(|e| {
            CoreError::StateStoreError(format!("Failed to connect to database: {}", e))
        })?;

        debug!(url = %config.connection_string, "Connected to SQLite database");
        Ok(Self { pool })
    }

    /// Get a reference to the database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}
