use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, trace};

use eunomia_core::{
    validate_connection, validate_new_port, Connection, ConnectionId, CoreError, GraphStore,
    GraphTransaction, NewNode, Node, NodeCallback, NodeCallbackId, NodeId, NodeType, NodeTypeId,
    Port, PortDirection, PortId, PortParameter, PortParameterId,
};

/// Full contents of an in-memory graph
#[derive(Debug, Clone, Default)]
pub struct GraphSnapshot {
    node_types: BTreeMap<NodeTypeId, NodeType>,
    nodes: BTreeMap<NodeId, Node>,
    ports: BTreeMap<PortId, Port>,
    parameters: BTreeMap<PortParameterId, PortParameter>,
    connections: BTreeMap<ConnectionId, Connection>,
    callbacks: BTreeMap<NodeCallbackId, NodeCallback>,
}

impl GraphSnapshot {
    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of parameter rows across all ports
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Parameters of a port as `(key, value)` pairs ordered by key
    pub fn parameters_of(&self, port_id: PortId) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = self
            .parameters
            .values()
            .filter(|p| p.port_id == port_id)
            .map(|p| (p.key.clone(), p.value.clone()))
            .collect();
        params.sort();
        params
    }

    /// Value stored under `(port, key)`
    pub fn parameter(&self, port_id: PortId, key: &str) -> Option<&str> {
        self.parameters
            .values()
            .find(|p| p.port_id == port_id && p.key == key)
            .map(|p| p.value.as_str())
    }

    fn ports_of(&self, node_id: NodeId) -> impl Iterator<Item = &Port> {
        self.ports.values().filter(move |p| p.node_id == node_id)
    }
}

/// Graph store keeping everything in process memory
#[derive(Clone)]
pub struct InMemoryGraphStore {
    state: Arc<Mutex<GraphSnapshot>>,
    ids: Arc<AtomicI64>,
}

impl InMemoryGraphStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(GraphSnapshot::default())),
            ids: Arc::new(AtomicI64::new(1)),
        }
    }

    /// Copy of the committed graph. Waits for any open transaction to finish.
    pub async fn snapshot(&self) -> GraphSnapshot {
        self.state.lock().await.clone()
    }
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn begin(&self) -> Result<Box<dyn GraphTransaction>, CoreError> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        trace!("In-memory transaction started");
        Ok(Box::new(InMemoryTransaction {
            guard,
            working,
            ids: self.ids.clone(),
        }))
    }
}

/// A transaction over an [`InMemoryGraphStore`].
///
/// Holds the store lock for its whole life and applies its working copy on commit.
pub struct InMemoryTransaction {
    guard: OwnedMutexGuard<GraphSnapshot>,
    working: GraphSnapshot,
    ids: Arc<AtomicI64>,
}

impl InMemoryTransaction {
    fn next_id(&self) -> i64 {
        self.ids.fetch_add(1, Ordering::Relaxed)
    }

    fn require_node(&self, id: NodeId) -> Result<&Node, CoreError> {
        self.working
            .nodes
            .get(&id)
            .ok_or_else(|| CoreError::NodeNotFound(id.to_string()))
    }

    fn require_port(&self, id: PortId) -> Result<&Port, CoreError> {
        self.working
            .ports
            .get(&id)
            .ok_or_else(|| CoreError::PortNotFound(id.to_string()))
    }
}

#[async_trait]
impl GraphTransaction for InMemoryTransaction {
    async fn ensure_node_type(&mut self, name: &str) -> Result<NodeType, CoreError> {
        if let Some(existing) = self.working.node_types.values().find(|t| t.name == name) {
            return Ok(existing.clone());
        }
        let node_type = NodeType {
            id: NodeTypeId(self.next_id()),
            name: name.to_string(),
        };
        self.working
            .node_types
            .insert(node_type.id, node_type.clone());
        Ok(node_type)
    }

    async fn find_node_type(&mut self, name: &str) -> Result<Option<NodeType>, CoreError> {
        Ok(self
            .working
            .node_types
            .values()
            .find(|t| t.name == name)
            .cloned())
    }

    async fn list_node_types(&mut self) -> Result<Vec<NodeType>, CoreError> {
        Ok(self.working.node_types.values().cloned().collect())
    }

    async fn create_node(&mut self, node: NewNode) -> Result<Node, CoreError> {
        if !self.working.node_types.contains_key(&node.type_id) {
            return Err(CoreError::NodeTypeNotFound(node.type_id.to_string()));
        }
        let node = Node {
            id: NodeId(self.next_id()),
            name: node.name,
            type_id: node.type_id,
            position_x: node.position_x,
            position_y: node.position_y,
        };
        self.working.nodes.insert(node.id, node.clone());
        Ok(node)
    }

    async fn find_node(&mut self, id: NodeId) -> Result<Option<Node>, CoreError> {
        Ok(self.working.nodes.get(&id).cloned())
    }

    async fn find_node_by_name(&mut self, name: &str) -> Result<Option<Node>, CoreError> {
        Ok(self
            .working
            .nodes
            .values()
            .find(|n| n.name == name)
            .cloned())
    }

    async fn list_nodes(&mut self) -> Result<Vec<Node>, CoreError> {
        Ok(self.working.nodes.values().cloned().collect())
    }

    async fn move_node(&mut self, id: NodeId, x: i64, y: i64) -> Result<(), CoreError> {
        let node = self
            .working
            .nodes
            .get_mut(&id)
            .ok_or_else(|| CoreError::NodeNotFound(id.to_string()))?;
        node.position_x = x;
        node.position_y = y;
        Ok(())
    }

    async fn delete_node(&mut self, id: NodeId) -> Result<(), CoreError> {
        self.require_node(id)?;

        let ports: Vec<PortId> = self.working.ports_of(id).map(|p| p.id).collect();
        let graph = &mut self.working;

        graph.parameters.retain(|_, p| !ports.contains(&p.port_id));
        graph
            .connections
            .retain(|_, c| !ports.contains(&c.from_port_id) && !ports.contains(&c.to_port_id));
        graph.ports.retain(|_, p| p.node_id != id);
        graph.callbacks.retain(|_, cb| cb.node_id != id);
        graph.nodes.remove(&id);

        debug!(node = %id, ports = ports.len(), "Deleted node");
        Ok(())
    }

    async fn create_port(
        &mut self,
        node_id: NodeId,
        name: &str,
        direction: PortDirection,
    ) -> Result<Port, CoreError> {
        self.require_node(node_id)?;
        let existing: Vec<Port> = self.working.ports_of(node_id).cloned().collect();
        validate_new_port(&existing, node_id, name, direction)?;

        let port = Port {
            id: PortId(self.next_id()),
            node_id,
            name: name.to_string(),
            direction,
        };
        self.working.ports.insert(port.id, port.clone());
        Ok(port)
    }

    async fn find_port(&mut self, id: PortId) -> Result<Option<Port>, CoreError> {
        Ok(self.working.ports.get(&id).cloned())
    }

    async fn find_port_by_name(
        &mut self,
        node_id: NodeId,
        name: &str,
        direction: PortDirection,
    ) -> Result<Option<Port>, CoreError> {
        Ok(self
            .working
            .ports_of(node_id)
            .find(|p| p.name == name && p.direction == direction)
            .cloned())
    }

    async fn node_ports(
        &mut self,
        node_id: NodeId,
        direction: Option<PortDirection>,
    ) -> Result<Vec<Port>, CoreError> {
        Ok(self
            .working
            .ports_of(node_id)
            .filter(|p| direction.map_or(true, |d| p.direction == d))
            .cloned()
            .collect())
    }

    async fn port_parameters(&mut self, port_id: PortId) -> Result<Vec<PortParameter>, CoreError> {
        let mut params: Vec<PortParameter> = self
            .working
            .parameters
            .values()
            .filter(|p| p.port_id == port_id)
            .cloned()
            .collect();
        params.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(params)
    }

    async fn upsert_parameter(
        &mut self,
        port_id: PortId,
        key: &str,
        value: &str,
    ) -> Result<PortParameter, CoreError> {
        self.require_port(port_id)?;

        if let Some(existing) = self
            .working
            .parameters
            .values_mut()
            .find(|p| p.port_id == port_id && p.key == key)
        {
            existing.value = value.to_string();
            return Ok(existing.clone());
        }

        let param = PortParameter {
            id: PortParameterId(self.next_id()),
            port_id,
            key: key.to_string(),
            value: value.to_string(),
        };
        self.working.parameters.insert(param.id, param.clone());
        Ok(param)
    }

    async fn create_connection(
        &mut self,
        from_port_id: PortId,
        to_port_id: PortId,
        protocol: &str,
    ) -> Result<Connection, CoreError> {
        let from = self.require_port(from_port_id)?;
        let to = self.require_port(to_port_id)?;
        validate_connection(from, to)?;

        let connection = Connection {
            id: ConnectionId(self.next_id()),
            from_port_id,
            to_port_id,
            protocol: protocol.to_string(),
        };
        self.working
            .connections
            .insert(connection.id, connection.clone());
        Ok(connection)
    }

    async fn find_connection(
        &mut self,
        from_port_id: PortId,
        to_port_id: PortId,
    ) -> Result<Option<Connection>, CoreError> {
        Ok(self
            .working
            .connections
            .values()
            .find(|c| c.from_port_id == from_port_id && c.to_port_id == to_port_id)
            .cloned())
    }

    async fn outgoing_connections(
        &mut self,
        port_id: PortId,
    ) -> Result<Vec<Connection>, CoreError> {
        Ok(self
            .working
            .connections
            .values()
            .filter(|c| c.from_port_id == port_id)
            .cloned()
            .collect())
    }

    async fn list_connections(&mut self) -> Result<Vec<Connection>, CoreError> {
        Ok(self.working.connections.values().cloned().collect())
    }

    async fn delete_connection(&mut self, id: ConnectionId) -> Result<(), CoreError> {
        self.working
            .connections
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| CoreError::ConnectionNotFound(id.to_string()))
    }

    async fn bind_callback(
        &mut self,
        node_id: NodeId,
        callback_name: &str,
    ) -> Result<NodeCallback, CoreError> {
        self.require_node(node_id)?;

        if let Some(existing) = self
            .working
            .callbacks
            .values_mut()
            .find(|cb| cb.node_id == node_id)
        {
            existing.callback_name = callback_name.to_string();
            return Ok(existing.clone());
        }

        let binding = NodeCallback {
            id: NodeCallbackId(self.next_id()),
            node_id,
            callback_name: callback_name.to_string(),
        };
        self.working.callbacks.insert(binding.id, binding.clone());
        Ok(binding)
    }

    async fn unbind_callback(&mut self, node_id: NodeId) -> Result<(), CoreError> {
        self.working.callbacks.retain(|_, cb| cb.node_id != node_id);
        Ok(())
    }

    async fn node_callback(&mut self, node_id: NodeId) -> Result<Option<NodeCallback>, CoreError> {
        Ok(self
            .working
            .callbacks
            .values()
            .find(|cb| cb.node_id == node_id)
            .cloned())
    }

    async fn list_callbacks(&mut self) -> Result<Vec<NodeCallback>, CoreError> {
        Ok(self.working.callbacks.values().cloned().collect())
    }

    async fn commit(self: Box<Self>) -> Result<(), CoreError> {
        let InMemoryTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;
        trace!("In-memory transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), CoreError> {
        trace!("In-memory transaction rolled back");
        Ok(())
    }
}
