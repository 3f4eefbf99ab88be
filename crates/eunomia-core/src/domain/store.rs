//! Graph store traits for the Eunomia engine
//!
//! This module defines the storage boundary used by the engine and by
//! whatever edits the graph. External crates implement these traits to
//! provide different persistence mechanisms.
//!
//! Every read and write goes through a [`GraphTransaction`]. Nothing a
//! transaction writes is visible to other transactions until `commit`, and
//! `rollback` (or dropping the transaction) discards it.

use async_trait::async_trait;

use super::graph::{
    Connection, ConnectionId, NewNode, Node, NodeCallback, NodeId, NodeType, Port, PortDirection,
    PortId, PortParameter,
};
use crate::CoreError;

/// Entry point to a graph store
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Open a new atomic unit of work
    async fn begin(&self) -> Result<Box<dyn GraphTransaction>, CoreError>;
}

/// One atomic unit of work against the graph
#[async_trait]
pub trait GraphTransaction: Send {
    // Node types

    /// Return the node type with this name, creating it if missing
    async fn ensure_node_type(&mut self, name: &str) -> Result<NodeType, CoreError>;

    /// Find a node type by name
    async fn find_node_type(&mut self, name: &str) -> Result<Option<NodeType>, CoreError>;

    /// List all node types
    async fn list_node_types(&mut self) -> Result<Vec<NodeType>, CoreError>;

    // Nodes

    /// Create a node
    async fn create_node(&mut self, node: NewNode) -> Result<Node, CoreError>;

    /// Find a node by ID
    async fn find_node(&mut self, id: NodeId) -> Result<Option<Node>, CoreError>;

    /// Find the first node with this name
    async fn find_node_by_name(&mut self, name: &str) -> Result<Option<Node>, CoreError>;

    /// List all nodes ordered by ID
    async fn list_nodes(&mut self) -> Result<Vec<Node>, CoreError>;

    /// Update a node's editor position
    async fn move_node(&mut self, id: NodeId, x: i64, y: i64) -> Result<(), CoreError>;

    /// Delete a node together with its ports, their parameters and connections,
    /// and its callback binding
    async fn delete_node(&mut self, id: NodeId) -> Result<(), CoreError>;

    // Ports

    /// Create a port. Fails if the node already has a port with the same
    /// name and direction.
    async fn create_port(
        &mut self,
        node_id: NodeId,
        name: &str,
        direction: PortDirection,
    ) -> Result<Port, CoreError>;

    /// Find a port by ID
    async fn find_port(&mut self, id: PortId) -> Result<Option<Port>, CoreError>;

    /// Find a node's port by name and direction
    async fn find_port_by_name(
        &mut self,
        node_id: NodeId,
        name: &str,
        direction: PortDirection,
    ) -> Result<Option<Port>, CoreError>;

    /// List a node's ports, optionally filtered by direction, ordered by ID
    async fn node_ports(
        &mut self,
        node_id: NodeId,
        direction: Option<PortDirection>,
    ) -> Result<Vec<Port>, CoreError>;

    // Parameters

    /// List a port's parameters ordered by key
    async fn port_parameters(&mut self, port_id: PortId) -> Result<Vec<PortParameter>, CoreError>;

    /// Insert or replace the value stored under `(port, key)`
    async fn upsert_parameter(
        &mut self,
        port_id: PortId,
        key: &str,
        value: &str,
    ) -> Result<PortParameter, CoreError>;

    // Connections

    /// Create a connection from an output port to an input port
    async fn create_connection(
        &mut self,
        from_port_id: PortId,
        to_port_id: PortId,
        protocol: &str,
    ) -> Result<Connection, CoreError>;

    /// Find the first connection between two ports
    async fn find_connection(
        &mut self,
        from_port_id: PortId,
        to_port_id: PortId,
    ) -> Result<Option<Connection>, CoreError>;

    /// Connections leaving a port, ordered by ID
    async fn outgoing_connections(&mut self, port_id: PortId)
        -> Result<Vec<Connection>, CoreError>;

    /// List all connections ordered by ID
    async fn list_connections(&mut self) -> Result<Vec<Connection>, CoreError>;

    /// Delete a connection
    async fn delete_connection(&mut self, id: ConnectionId) -> Result<(), CoreError>;

    // Callback bindings

    /// Bind a node to a callback name, replacing any existing binding
    async fn bind_callback(
        &mut self,
        node_id: NodeId,
        callback_name: &str,
    ) -> Result<NodeCallback, CoreError>;

    /// Remove a node's callback binding, if any
    async fn unbind_callback(&mut self, node_id: NodeId) -> Result<(), CoreError>;

    /// The callback bound to a node
    async fn node_callback(&mut self, node_id: NodeId) -> Result<Option<NodeCallback>, CoreError>;

    /// List every callback binding
    async fn list_callbacks(&mut self) -> Result<Vec<NodeCallback>, CoreError>;

    // Transaction control

    /// Make every write of this transaction durable
    async fn commit(self: Box<Self>) -> Result<(), CoreError>;

    /// Discard every write of this transaction
    async fn rollback(self: Box<Self>) -> Result<(), CoreError>;
}
