//! Operator-facing entry points over a graph store.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};

use eunomia_core::{
    CallbackRegistry, CascadeReport, CascadeScheduler, Connection, CoreError, ExecutorOptions,
    GraphStore, GraphTransaction, Node, NodeExecutor, NodeId, NodeType, Port, PortDirection,
};
use eunomia_state_inmemory::InMemoryGraphStore;
use eunomia_state_sqlite::SqliteGraphStore;

use crate::config::EngineConfig;
use crate::seed::{self, SeedReport};

/// A node given either by ID or by name.
///
/// Parsed from text as `#<id>` or a bare integer for an ID, and `name:<name>`
/// or any other text for a name. The prefix is how a node whose name is all
/// digits is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRef {
    /// Numeric node ID
    Id(NodeId),
    /// First node with this name
    Name(String),
}

impl FromStr for NodeRef {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(name) = s.strip_prefix("name:") {
            return Ok(NodeRef::Name(name.to_string()));
        }
        let id = s.strip_prefix('#').unwrap_or(s);
        Ok(match id.parse::<i64>() {
            Ok(id) => NodeRef::Id(NodeId(id)),
            Err(_) => NodeRef::Name(s.to_string()),
        })
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Id(id) => write!(f, "#{}", id),
            NodeRef::Name(name) => write!(f, "'{}'", name),
        }
    }
}

/// A port and its stored parameters
#[derive(Debug, Clone, Serialize)]
pub struct PortDump {
    /// The port
    #[serde(flatten)]
    pub port: Port,
    /// Raw parameter values by key
    pub parameters: BTreeMap<String, String>,
}

/// A node with its ports and callback binding
#[derive(Debug, Clone, Serialize)]
pub struct NodeDump {
    /// The node
    #[serde(flatten)]
    pub node: Node,
    /// Bound callback name
    pub callback: Option<String>,
    /// Ports ordered by ID
    pub ports: Vec<PortDump>,
}

/// Whole-graph view for display
#[derive(Debug, Clone, Serialize)]
pub struct GraphDump {
    /// Every node type
    pub node_types: Vec<NodeType>,
    /// Every node
    pub nodes: Vec<NodeDump>,
    /// Every connection
    pub connections: Vec<Connection>,
}

/// Store, registry and scheduler wired together
pub struct Engine {
    scheduler: CascadeScheduler,
}

impl Engine {
    /// Wire an engine over an existing store
    pub fn new(
        store: Arc<dyn GraphStore>,
        registry: CallbackRegistry,
        options: ExecutorOptions,
    ) -> Self {
        let executor = NodeExecutor::with_options(registry, options);
        Self {
            scheduler: CascadeScheduler::new(store, executor),
        }
    }

    /// Open the store named by `config` and wire an engine over it
    pub async fn open(config: &EngineConfig, registry: CallbackRegistry) -> Result<Self, CoreError> {
        let store: Arc<dyn GraphStore> = if config.uses_memory_store() {
            info!("Using in-memory graph store");
            Arc::new(InMemoryGraphStore::new())
        } else {
            SqliteGraphStore::with_config(config.sqlite_config())
                .await?
                .into_shared()
        };
        Ok(Self::new(store, registry, config.executor_options()))
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn GraphStore> {
        self.scheduler.store()
    }

    /// The callback registry
    pub fn registry(&self) -> &CallbackRegistry {
        self.scheduler.executor().registry()
    }

    /// Seed the default graph
    pub async fn seed(&self) -> Result<SeedReport, CoreError> {
        seed::seed_store(self.store().as_ref()).await
    }

    /// Check that every callback binding names a registered transformation
    pub async fn validate(&self) -> Result<(), CoreError> {
        self.registry().validate_store(self.store().as_ref()).await
    }

    /// Run a cascade from a node
    pub async fn run(&self, node: &NodeRef) -> Result<CascadeReport, CoreError> {
        let id = match node {
            NodeRef::Id(id) => *id,
            NodeRef::Name(_) => {
                let mut tx = self.store().begin().await?;
                let found = resolve_node(tx.as_mut(), node).await;
                tx.rollback().await?;
                found?.id
            }
        };
        self.scheduler.run_cascade(id).await
    }

    /// Store `value` under `key` on a node's input port and cascade from that
    /// node. The write and the cascade commit together.
    pub async fn set_input_parameter(
        &self,
        node: &NodeRef,
        port: &str,
        key: &str,
        value: &str,
    ) -> Result<CascadeReport, CoreError> {
        let mut tx = self.store().begin().await?;
        let result = self.set_and_traverse(tx.as_mut(), node, port, key, value).await;
        settle(tx, result).await
    }

    async fn set_and_traverse(
        &self,
        tx: &mut dyn GraphTransaction,
        node: &NodeRef,
        port: &str,
        key: &str,
        value: &str,
    ) -> Result<CascadeReport, CoreError> {
        let node = resolve_node(tx, node).await?;
        let input = tx
            .find_port_by_name(node.id, port, PortDirection::Input)
            .await?
            .ok_or_else(|| {
                CoreError::PortNotFound(format!("input port '{}' on node {}", port, node.id))
            })?;

        tx.upsert_parameter(input.id, key, value).await?;
        info!(node = %node.id, port = %port, key = %key, "Input parameter updated");

        self.scheduler.traverse(tx, node.id).await
    }

    /// Read the whole graph
    pub async fn dump(&self) -> Result<GraphDump, CoreError> {
        let mut tx = self.store().begin().await?;
        let result = dump_graph(tx.as_mut()).await;
        settle(tx, result).await
    }
}

/// Look a node up by ID or name
pub async fn resolve_node(tx: &mut dyn GraphTransaction, node: &NodeRef) -> Result<Node, CoreError> {
    let found = match node {
        NodeRef::Id(id) => tx.find_node(*id).await?,
        NodeRef::Name(name) => tx.find_node_by_name(name).await?,
    };
    found.ok_or_else(|| CoreError::NodeNotFound(node.to_string()))
}

async fn dump_graph(tx: &mut dyn GraphTransaction) -> Result<GraphDump, CoreError> {
    let node_types = tx.list_node_types().await?;
    let connections = tx.list_connections().await?;

    let mut nodes = Vec::new();
    for node in tx.list_nodes().await? {
        let callback = tx.node_callback(node.id).await?.map(|cb| cb.callback_name);

        let mut ports = Vec::new();
        for port in tx.node_ports(node.id, None).await? {
            let parameters = tx
                .port_parameters(port.id)
                .await?
                .into_iter()
                .map(|p| (p.key, p.value))
                .collect();
            ports.push(PortDump { port, parameters });
        }

        nodes.push(NodeDump {
            node,
            callback,
            ports,
        });
    }

    Ok(GraphDump {
        node_types,
        nodes,
        connections,
    })
}

async fn settle<T>(
    tx: Box<dyn GraphTransaction>,
    result: Result<T, CoreError>,
) -> Result<T, CoreError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                error!(error = %rollback_err, "Rollback failed");
            }
            Err(e)
        }
    }
}
