//! SQLite graph store for the Eunomia engine
//!
//! This crate provides a SQLite implementation of the `GraphStore`
//! interface defined in the eunomia-core crate. Each cascade or edit runs
//! in one database transaction.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::SqliteDatabase;
pub use repositories::SqliteGraphTransaction;

use async_trait::async_trait;
use eunomia_core::{CoreError, GraphStore, GraphTransaction};

/// Configuration for the SQLite connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Database connection string, e.g. `sqlite://system.db` or `sqlite::memory:`
    pub connection_string: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Timeout for acquiring a connection from the pool (in seconds)
    pub acquire_timeout_secs: u64,

    /// Whether to run migrations on startup
    pub run_migrations: bool,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            connection_string: "sqlite://system.db".to_string(),
            max_connections: 5,
            acquire_timeout_secs: 30,
            run_migrations: true,
        }
    }
}

/// Graph store persisted in SQLite
#[derive(Clone)]
pub struct SqliteGraphStore {
    db: SqliteDatabase,
}

impl SqliteGraphStore {
    /// Open a store with default configuration
    pub async fn new(connection_string: &str) -> Result<Self, CoreError> {
        let config = SqliteConfig {
            connection_string: connection_string.to_string(),
            ..Default::default()
        };

        Self::with_config(config).await
    }

    /// Open a store with custom configuration
    pub async fn with_config(config: SqliteConfig) -> Result<Self, CoreError> {
        let db = SqliteDatabase::connect(&config).await?;

        if config.run_migrations {
            migrations::run_migrations(db.pool()).await?;
        }

        info!(url = %config.connection_string, "SQLite graph store ready");
        Ok(Self { db })
    }

    /// Wrap an already opened database
    pub fn from_database(db: SqliteDatabase) -> Self {
        Self { db }
    }

    /// The underlying database
    pub fn database(&self) -> &SqliteDatabase {
        &self.db
    }

    /// Share the store behind the engine's store trait
    pub fn into_shared(self) -> Arc<dyn GraphStore> {
        Arc::new(self)
    }
}

#[async_trait]
impl GraphStore for SqliteGraphStore {
    async fn begin(&self) -> Result<Box<dyn GraphTransaction>, CoreError> {
        let tx = self
            .db
            .pool()
            .begin()
            .await
            .map_err(|e| CoreError::StateStoreError(format!("Failed to begin transaction: {}", e)))?;
        Ok(Box::new(SqliteGraphTransaction::new(tx)))
    }
}

#[cfg(test)]
mod tests;
