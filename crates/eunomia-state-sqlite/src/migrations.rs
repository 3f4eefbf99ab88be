use eunomia_core::CoreError;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

/// SQL migrations for the SQLite graph store
///
/// Each migration is a name and the statements it runs, applied in order.
/// Applied names are recorded in `schema_migrations`.
pub fn generate_migrations() -> Vec<(&'static str, Vec<&'static str>)> {
    vec![
        // Initial migration - Create graph tables
        (
            "20250101000000_initial_schema",
            vec![
                r#"
                CREATE TABLE IF NOT EXISTS node_types (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL UNIQUE
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS nodes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    node_type_id INTEGER NOT NULL REFERENCES node_types(id),
                    pos_x INTEGER NOT NULL DEFAULT 50,
                    pos_y INTEGER NOT NULL DEFAULT 50
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS ports (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    node_id INTEGER NOT NULL REFERENCES nodes(id) ON DELETE CASCADE,
                    port_name TEXT NOT NULL,
                    port_type TEXT NOT NULL CHECK (port_type IN ('input', 'output')),
                    UNIQUE (node_id, port_name, port_type)
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS port_parameters (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    port_id INTEGER NOT NULL REFERENCES ports(id) ON DELETE CASCADE,
                    key TEXT NOT NULL,
                    value TEXT NOT NULL,
                    UNIQUE (port_id, key)
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS connections (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    from_port_id INTEGER NOT NULL REFERENCES ports(id) ON DELETE CASCADE,
                    to_port_id INTEGER NOT NULL REFERENCES ports(id) ON DELETE CASCADE,
                    protocol TEXT NOT NULL DEFAULT 'MQTT'
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS node_callbacks (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    node_id INTEGER NOT NULL UNIQUE REFERENCES nodes(id) ON DELETE CASCADE,
                    callback_name TEXT NOT NULL
                )
                "#,
            ],
        ),
        // Lookup indexes used by the node executor
        (
            "20250102000000_lookup_indexes",
            vec![
                "CREATE INDEX IF NOT EXISTS idx_ports_node_id ON ports(node_id)",
                "CREATE INDEX IF NOT EXISTS idx_connections_from_port_id ON connections(from_port_id)",
                "CREATE INDEX IF NOT EXISTS idx_connections_to_port_id ON connections(to_port_id)",
            ],
        ),
    ]
}

/// Apply every migration not yet recorded in `schema_migrations`
pub async fn run_migrations(pool: &SqlitePool) -> Result<usize, CoreError> {
    debug!("Running SQLite migrations...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| CoreError::StateStoreError(format!("Failed to create migrations table: {}", e)))?;

    let mut applied = 0;
    for (migration_name, statements) in generate_migrations() {
        let already = sqlx::query("SELECT COUNT(*) AS n FROM schema_migrations WHERE name = ?")
            .bind(migration_name)
            .fetch_one(pool)
            .await
            .and_then(|row| row.try_get::<i64, _>("n"))
            .map_err(|e| CoreError::StateStoreError(format!("Failed to read migrations: {}", e)))?;
        if already > 0 {
            continue;
        }

        debug!("Applying migration: {}", migration_name);
        let mut tx = pool
            .begin()
            .await
            .map_err(|e| CoreError::StateStoreError(e.to_string()))?;

        for statement in statements {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    CoreError::StateStoreError(format!(
                        "Migration '{}' failed: {}",
                        migration_name, e
                    ))
                })?;
        }

        sqlx::query("INSERT INTO schema_migrations (name) VALUES (?)")
            .bind(migration_name)
            .execute(&mut *tx)
            .await
            .map_err(|e| CoreError::StateStoreError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| CoreError::StateStoreError(e.to_string()))?;
        applied += 1;
    }

    info!(applied, "SQLite migrations completed successfully");
    Ok(applied)
}
