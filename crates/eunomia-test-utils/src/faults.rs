//! Fault injection for graph stores.
//!
//! [`FaultyGraphStore`] wraps a real store and fails selected operations so
//! tests can check that a failed cascade leaves the graph untouched.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use eunomia_core::{
    Connection, ConnectionId, CoreError, GraphStore, GraphTransaction, NewNode, Node,
    NodeCallback, NodeId, NodeType, Port, PortDirection, PortId, PortParameter,
};

/// Which operations a [`FaultyGraphStore`] should fail
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultPlan {
    /// Fail the n-th parameter upsert (1-based), counted across transactions
    pub fail_upsert_at: Option<usize>,
    /// Fail every commit
    pub fail_commit: bool,
}

#[derive(Debug, Default)]
struct FaultState {
    upserts: usize,
    commits: usize,
    rollbacks: usize,
}

/// A store that delegates to another store and injects failures
#[derive(Clone)]
pub struct FaultyGraphStore {
    inner: Arc<dyn GraphStore>,
    plan: FaultPlan,
    state: Arc<Mutex<FaultState>>,
}

impl FaultyGraphStore {
    /// Wrap `inner` with the given plan
    pub fn new(inner: Arc<dyn GraphStore>, plan: FaultPlan) -> Self {
        Self {
            inner,
            plan,
            state: Arc::new(Mutex::new(FaultState::default())),
        }
    }

    /// Parameter upserts attempted so far, including the failed one
    pub fn upserts(&self) -> usize {
        self.state.lock().upserts
    }

    /// Successful commits so far
    pub fn commits(&self) -> usize {
        self.state.lock().commits
    }

    /// Rollbacks requested so far
    pub fn rollbacks(&self) -> usize {
        self.state.lock().rollbacks
    }
}

#[async_trait]
impl GraphStore for FaultyGraphStore {
    async fn begin(&self) -> Result<Box<dyn GraphTransaction>, CoreError> {
        let inner = self.inner.begin().await?;
        Ok(Box::new(FaultyTransaction {
            inner,
            plan: self.plan,
            state: self.state.clone(),
        }))
    }
}

struct FaultyTransaction {
    inner: Box<dyn GraphTransaction>,
    plan: FaultPlan,
    state: Arc<Mutex<FaultState>>,
}

#[async_trait]
impl GraphTransaction for FaultyTransaction {
    async fn ensure_node_type(&mut self, name: &str) -> Result<NodeType, CoreError> {
        self.inner.ensure_node_type(name).await
    }

    async fn find_node_type(&mut self, name: &str) -> Result<Option<NodeType>, CoreError> {
        self.inner.find_node_type(name).await
    }

    async fn list_node_types(&mut self) -> Result<Vec<NodeType>, CoreError> {
        self.inner.list_node_types().await
    }

    async fn create_node(&mut self, node: NewNode) -> Result<Node, CoreError> {
        self.inner.create_node(node).await
    }

    async fn find_node(&mut self, id: NodeId) -> Result<Option<Node>, CoreError> {
        self.inner.find_node(id).await
    }

    async fn find_node_by_name(&mut self, name: &str) -> Result<Option<Node>, CoreError> {
        self.inner.find_node_by_name(name).await
    }

    async fn list_nodes(&mut self) -> Result<Vec<Node>, CoreError> {
        self.inner.list_nodes().await
    }

    async fn move_node(&mut self, id: NodeId, x: i64, y: i64) -> Result<(), CoreError> {
        self.inner.move_node(id, x, y).await
    }

    async fn delete_node(&mut self, id: NodeId) -> Result<(), CoreError> {
        self.inner.delete_node(id).await
    }

    async fn create_port(
        &mut self,
        node_id: NodeId,
        name: &str,
        direction: PortDirection,
    ) -> Result<Port, CoreError> {
        self.inner.create_port(node_id, name, direction).await
    }

    async fn find_port(&mut self, id: PortId) -> Result<Option<Port>, CoreError> {
        self.inner.find_port(id).await
    }

    async fn find_port_by_name(
        &mut self,
        node_id: NodeId,
        name: &str,
        direction: PortDirection,
    ) -> Result<Option<Port>, CoreError> {
        self.inner.find_port_by_name(node_id, name, direction).await
    }

    async fn node_ports(
        &mut self,
        node_id: NodeId,
        direction: Option<PortDirection>,
    ) -> Result<Vec<Port>, CoreError> {
        self.inner.node_ports(node_id, direction).await
    }

    async fn port_parameters(&mut self, port_id: PortId) -> Result<Vec<PortParameter>, CoreError> {
        self.inner.port_parameters(port_id).await
    }

    async fn upsert_parameter(
        &mut self,
        port_id: PortId,
        key: &str,
        value: &str,
    ) -> Result<PortParameter, CoreError> {
        let attempt = {
            let mut state = self.state.lock();
            state.upserts += 1;
            state.upserts
        };
        if self.plan.fail_upsert_at == Some(attempt) {
            debug!(attempt, port = %port_id, key, "Injecting upsert failure");
            return Err(CoreError::StateStoreError(format!(
                "injected failure on upsert #{}",
                attempt
            )));
        }
        self.inner.upsert_parameter(port_id, key, value).await
    }

    async fn create_connection(
        &mut self,
        from_port_id: PortId,
        to_port_id: PortId,
        protocol: &str,
    ) -> Result<Connection, CoreError> {
        self.inner
            .create_connection(from_port_id, to_port_id, protocol)
            .await
    }

    async fn find_connection(
        &mut self,
        from_port_id: PortId,
        to_port_id: PortId,
    ) -> Result<Option<Connection>, CoreError> {
        self.inner.find_connection(from_port_id, to_port_id).await
    }

    async fn outgoing_connections(
        &mut self,
        port_id: PortId,
    ) -> Result<Vec<Connection>, CoreError> {
        self.inner.outgoing_connections(port_id).await
    }

    async fn list_connections(&mut self) -> Result<Vec<Connection>, CoreError> {
        self.inner.list_connections().await
    }

    async fn delete_connection(&mut self, id: ConnectionId) -> Result<(), CoreError> {
        self.inner.delete_connection(id).await
    }

    async fn bind_callback(
        &mut self,
        node_id: NodeId,
        callback_name: &str,
    ) -> Result<NodeCallback, CoreError> {
        self.inner.bind_callback(node_id, callback_name).await
    }

    async fn unbind_callback(&mut self, node_id: NodeId) -> Result<(), CoreError> {
        self.inner.unbind_callback(node_id).await
    }

    async fn node_callback(&mut self, node_id: NodeId) -> Result<Option<NodeCallback>, CoreError> {
        self.inner.node_callback(node_id).await
    }

    async fn list_callbacks(&mut self) -> Result<Vec<NodeCallback>, CoreError> {
        self.inner.list_callbacks().await
    }

    async fn commit(self: Box<Self>) -> Result<(), CoreError> {
        if self.plan.fail_commit {
            // The inner transaction is dropped, which discards its writes
            return Err(CoreError::StateStoreError(
                "injected failure on commit".to_string(),
            ));
        }
        let FaultyTransaction { inner, state, .. } = *self;
        inner.commit().await?;
        state.lock().commits += 1;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), CoreError> {
        let FaultyTransaction { inner, state, .. } = *self;
        state.lock().rollbacks += 1;
        inner.rollback().await
    }
}
