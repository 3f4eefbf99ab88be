use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};
use tracing::{debug, trace};

use eunomia_core::{
    validate_connection, validate_new_port, Connection, ConnectionId, CoreError, GraphTransaction,
    NewNode, Node, NodeCallback, NodeCallbackId, NodeId, NodeType, NodeTypeId, Port,
    PortDirection, PortId, PortParameter, PortParameterId,
};

const NODE_COLUMNS: &str = "id, name, node_type_id, pos_x, pos_y";
const PORT_COLUMNS: &str = "id, node_id, port_name, port_type";
const CONNECTION_COLUMNS: &str = "id, from_port_id, to_port_id, protocol";

fn store_error(action: &'static str) -> impl Fn(sqlx::Error) -> CoreError {
    move |e| CoreError::StateStoreError(format!("Failed to {}: {}", action, e))
}

fn node_type_from_row(row: &SqliteRow) -> Result<NodeType, sqlx::Error> {
    Ok(NodeType {
        id: NodeTypeId(row.try_get("id")?),
        name: row.try_get("name")?,
    })
}

fn node_from_row(row: &SqliteRow) -> Result<Node, sqlx::Error> {
    Ok(Node {
        id: NodeId(row.try_get("id")?),
        name: row.try_get("name")?,
        type_id: NodeTypeId(row.try_get("node_type_id")?),
        position_x: row.try_get("pos_x")?,
        position_y: row.try_get("pos_y")?,
    })
}

fn port_from_row(row: &SqliteRow) -> Result<Port, CoreError> {
    let direction: String = row
        .try_get("port_type")
        .map_err(store_error("read port"))?;
    Ok(Port {
        id: PortId(row.try_get("id").map_err(store_error("read port"))?),
        node_id: NodeId(row.try_get("node_id").map_err(store_error("read port"))?),
        name: row.try_get("port_name").map_err(store_error("read port"))?,
        direction: direction.parse()?,
    })
}

fn parameter_from_row(row: &SqliteRow) -> Result<PortParameter, sqlx::Error> {
    Ok(PortParameter {
        id: PortParameterId(row.try_get("id")?),
        port_id: PortId(row.try_get("port_id")?),
        key: row.try_get("key")?,
        value: row.try_get("value")?,
    })
}

fn connection_from_row(row: &SqliteRow) -> Result<Connection, sqlx::Error> {
    Ok(Connection {
        id: ConnectionId(row.try_get("id")?),
        from_port_id: PortId(row.try_get("from_port_id")?),
        to_port_id: PortId(row.try_get("to_port_id")?),
        protocol: row.try_get("protocol")?,
    })
}

fn callback_from_row(row: &SqliteRow) -> Result<NodeCallback, sqlx::Error> {
    Ok(NodeCallback {
        id: NodeCallbackId(row.try_get("id")?),
        node_id: NodeId(row.try_get("node_id")?),
        callback_name: row.try_get("callback_name")?,
    })
}

/// A transaction over a [`crate::SqliteGraphStore`].
///
/// Dropping it without calling `commit` rolls the database transaction back.
pub struct SqliteGraphTransaction {
    tx: Transaction<'static, Sqlite>,
}

impl SqliteGraphTransaction {
    /// Wrap an open database transaction
    pub fn new(tx: Transaction<'static, Sqlite>) -> Self {
        trace!("SQLite transaction started");
        Self { tx }
    }

    async fn require_node(&mut self, id: NodeId) -> Result<Node, CoreError> {
        self.find_node(id)
            .await?
            .ok_or_else(|| CoreError::NodeNotFound(id.to_string()))
    }

    async fn require_port(&mut self, id: PortId) -> Result<Port, CoreError> {
        self.find_port(id)
            .await?
            .ok_or_else(|| CoreError::PortNotFound(id.to_string()))
    }
}

#[async_trait]
impl GraphTransaction for SqliteGraphTransaction {
    async fn ensure_node_type(&mut self, name: &str) -> Result<NodeType, CoreError> {
        // DO UPDATE so RETURNING also yields the existing row
        let row = sqlx::query(
            "INSERT INTO node_types (name) VALUES (?)
             ON CONFLICT (name) DO UPDATE SET name = excluded.name
             RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(store_error("ensure node type"))?;

        node_type_from_row(&row).map_err(store_error("read node type"))
    }

    async fn find_node_type(&mut self, name: &str) -> Result<Option<NodeType>, CoreError> {
        let row = sqlx::query("SELECT id, name FROM node_types WHERE name = ?")
            .bind(name)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_error("find node type"))?;

        row.as_ref()
            .map(node_type_from_row)
            .transpose()
            .map_err(store_error("read node type"))
    }

    async fn list_node_types(&mut self) -> Result<Vec<NodeType>, CoreError> {
        let rows = sqlx::query("SELECT id, name FROM node_types ORDER BY id")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_error("list node types"))?;

        rows.iter()
            .map(node_type_from_row)
            .collect::<Result<_, _>>()
            .map_err(store_error("read node type"))
    }

    async fn create_node(&mut self, node: NewNode) -> Result<Node, CoreError> {
        let type_exists = sqlx::query("SELECT 1 FROM node_types WHERE id = ?")
            .bind(node.type_id.0)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_error("look up node type"))?
            .is_some();
        if !type_exists {
            return Err(CoreError::NodeTypeNotFound(node.type_id.to_string()));
        }

        let row = sqlx::query(&format!(
            "INSERT INTO nodes (name, node_type_id, pos_x, pos_y) VALUES (?, ?, ?, ?)
             RETURNING {}",
            NODE_COLUMNS
        ))
        .bind(&node.name)
        .bind(node.type_id.0)
        .bind(node.position_x)
        .bind(node.position_y)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(store_error("create node"))?;

        node_from_row(&row).map_err(store_error("read node"))
    }

    async fn find_node(&mut self, id: NodeId) -> Result<Option<Node>, CoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM nodes WHERE id = ?", NODE_COLUMNS))
            .bind(id.0)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_error("find node"))?;

        row.as_ref()
            .map(node_from_row)
            .transpose()
            .map_err(store_error("read node"))
    }

    async fn find_node_by_name(&mut self, name: &str) -> Result<Option<Node>, CoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM nodes WHERE name = ? ORDER BY id LIMIT 1",
            NODE_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(store_error("find node"))?;

        row.as_ref()
            .map(node_from_row)
            .transpose()
            .map_err(store_error("read node"))
    }

    async fn list_nodes(&mut self) -> Result<Vec<Node>, CoreError> {
        let rows = sqlx::query(&format!("SELECT {} FROM nodes ORDER BY id", NODE_COLUMNS))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_error("list nodes"))?;

        rows.iter()
            .map(node_from_row)
            .collect::<Result<_, _>>()
            .map_err(store_error("read node"))
    }

    async fn move_node(&mut self, id: NodeId, x: i64, y: i64) -> Result<(), CoreError> {
        let result = sqlx::query("UPDATE nodes SET pos_x = ?, pos_y = ? WHERE id = ?")
            .bind(x)
            .bind(y)
            .bind(id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(store_error("move node"))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NodeNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn delete_node(&mut self, id: NodeId) -> Result<(), CoreError> {
        // Ports, parameters, connections and the callback binding go via ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM nodes WHERE id = ?")
            .bind(id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(store_error("delete node"))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NodeNotFound(id.to_string()));
        }
        debug!(node = %id, "Deleted node");
        Ok(())
    }

    async fn create_port(
        &mut self,
        node_id: NodeId,
        name: &str,
        direction: PortDirection,
    ) -> Result<Port, CoreError> {
        self.require_node(node_id).await?;
        let existing = self.node_ports(node_id, Some(direction)).await?;
        validate_new_port(&existing, node_id, name, direction)?;

        let row = sqlx::query(&format!(
            "INSERT INTO ports (node_id, port_name, port_type) VALUES (?, ?, ?)
             RETURNING {}",
            PORT_COLUMNS
        ))
        .bind(node_id.0)
        .bind(name)
        .bind(direction.as_str())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(store_error("create port"))?;

        port_from_row(&row)
    }

    async fn find_port(&mut self, id: PortId) -> Result<Option<Port>, CoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM ports WHERE id = ?", PORT_COLUMNS))
            .bind(id.0)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_error("find port"))?;

        row.as_ref().map(port_from_row).transpose()
    }

    async fn find_port_by_name(
        &mut self,
        node_id: NodeId,
        name: &str,
        direction: PortDirection,
    ) -> Result<Option<Port>, CoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM ports WHERE node_id = ? AND port_name = ? AND port_type = ?",
            PORT_COLUMNS
        ))
        .bind(node_id.0)
        .bind(name)
        .bind(direction.as_str())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(store_error("find port"))?;

        row.as_ref().map(port_from_row).transpose()
    }

    async fn node_ports(
        &mut self,
        node_id: NodeId,
        direction: Option<PortDirection>,
    ) -> Result<Vec<Port>, CoreError> {
        let rows = match direction {
            Some(direction) => {
                let sql = format!(
                    "SELECT {} FROM ports WHERE node_id = ? AND port_type = ? ORDER BY id",
                    PORT_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(node_id.0)
                    .bind(direction.as_str())
                    .fetch_all(&mut *self.tx)
                    .await
            }
            None => {
                let sql = format!("SELECT {} FROM ports WHERE node_id = ? ORDER BY id", PORT_COLUMNS);
                sqlx::query(&sql)
                    .bind(node_id.0)
                    .fetch_all(&mut *self.tx)
                    .await
            }
        }
        .map_err(store_error("list ports"))?;

        rows.iter().map(port_from_row).collect()
    }

    async fn port_parameters(&mut self, port_id: PortId) -> Result<Vec<PortParameter>, CoreError> {
        let rows = sqlx::query(
            "SELECT id, port_id, key, value FROM port_parameters WHERE port_id = ? ORDER BY key",
        )
        .bind(port_id.0)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(store_error("list port parameters"))?;

        rows.iter()
            .map(parameter_from_row)
            .collect::<Result<_, _>>()
            .map_err(store_error("read port parameter"))
    }

    async fn upsert_parameter(
        &mut self,
        port_id: PortId,
        key: &str,
        value: &str,
    ) -> Result<PortParameter, CoreError> {
        self.require_port(port_id).await?;

        let row = sqlx::query(
            "INSERT INTO port_parameters (port_id, key, value) VALUES (?, ?, ?)
             ON CONFLICT (port_id, key) DO UPDATE SET value = excluded.value
             RETURNING id, port_id, key, value",
        )
        .bind(port_id.0)
        .bind(key)
        .bind(value)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(store_error("upsert port parameter"))?;

        parameter_from_row(&row).map_err(store_error("read port parameter"))
    }

    async fn create_connection(
        &mut self,
        from_port_id: PortId,
        to_port_id: PortId,
        protocol: &str,
    ) -> Result<Connection, CoreError> {
        let from = self.require_port(from_port_id).await?;
        let to = self.require_port(to_port_id).await?;
        validate_connection(&from, &to)?;

        let row = sqlx::query(&format!(
            "INSERT INTO connections (from_port_id, to_port_id, protocol) VALUES (?, ?, ?)
             RETURNING {}",
            CONNECTION_COLUMNS
        ))
        .bind(from_port_id.0)
        .bind(to_port_id.0)
        .bind(protocol)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(store_error("create connection"))?;

        connection_from_row(&row).map_err(store_error("read connection"))
    }

    async fn find_connection(
        &mut self,
        from_port_id: PortId,
        to_port_id: PortId,
    ) -> Result<Option<Connection>, CoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM connections WHERE from_port_id = ? AND to_port_id = ?
             ORDER BY id LIMIT 1",
            CONNECTION_COLUMNS
        ))
        .bind(from_port_id.0)
        .bind(to_port_id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(store_error("find connection"))?;

        row.as_ref()
            .map(connection_from_row)
            .transpose()
            .map_err(store_error("read connection"))
    }

    async fn outgoing_connections(
        &mut self,
        port_id: PortId,
    ) -> Result<Vec<Connection>, CoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM connections WHERE from_port_id = ? ORDER BY id",
            CONNECTION_COLUMNS
        ))
        .bind(port_id.0)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(store_error("list outgoing connections"))?;

        rows.iter()
            .map(connection_from_row)
            .collect::<Result<_, _>>()
            .map_err(store_error("read connection"))
    }

    async fn list_connections(&mut self) -> Result<Vec<Connection>, CoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM connections ORDER BY id",
            CONNECTION_COLUMNS
        ))
        .fetch_all(&mut *self.tx)
        .await
        .map_err(store_error("list connections"))?;

        rows.iter()
            .map(connection_from_row)
            .collect::<Result<_, _>>()
            .map_err(store_error("read connection"))
    }

    async fn delete_connection(&mut self, id: ConnectionId) -> Result<(), CoreError> {
        let result = sqlx::query("DELETE FROM connections WHERE id = ?")
            .bind(id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(store_error("delete connection"))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ConnectionNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn bind_callback(
        &mut self,
        node_id: NodeId,
        callback_name: &str,
    ) -> Result<NodeCallback, CoreError> {
        self.require_node(node_id).await?;

        let row = sqlx::query(
            "INSERT INTO node_callbacks (node_id, callback_name) VALUES (?, ?)
             ON CONFLICT (node_id) DO UPDATE SET callback_name = excluded.callback_name
             RETURNING id, node_id, callback_name",
        )
        .bind(node_id.0)
        .bind(callback_name)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(store_error("bind callback"))?;

        callback_from_row(&row).map_err(store_error("read callback binding"))
    }

    async fn unbind_callback(&mut self, node_id: NodeId) -> Result<(), CoreError> {
        sqlx::query("DELETE FROM node_callbacks WHERE node_id = ?")
            .bind(node_id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(store_error("unbind callback"))?;
        Ok(())
    }

    async fn node_callback(&mut self, node_id: NodeId) -> Result<Option<NodeCallback>, CoreError> {
        let row = sqlx::query(
            "SELECT id, node_id, callback_name FROM node_callbacks WHERE node_id = ?",
        )
        .bind(node_id.0)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(store_error("find callback binding"))?;

        row.as_ref()
            .map(callback_from_row)
            .transpose()
            .map_err(store_error("read callback binding"))
    }

    async fn list_callbacks(&mut self) -> Result<Vec<NodeCallback>, CoreError> {
        let rows = sqlx::query("SELECT id, node_id, callback_name FROM node_callbacks ORDER BY id")
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_error("list callback bindings"))?;

        rows.iter()
            .map(callback_from_row)
            .collect::<Result<_, _>>()
            .map_err(store_error("read callback binding"))
    }

    async fn commit(self: Box<Self>) -> Result<(), CoreError> {
        self.tx
            .commit()
            .await
            .map_err(store_error("commit transaction"))?;
        trace!("SQLite transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), CoreError> {
        self.tx
            .rollback()
            .await
            .map_err(store_error("roll back transaction"))?;
        trace!("SQLite transaction rolled back");
        Ok(())
    }
}
