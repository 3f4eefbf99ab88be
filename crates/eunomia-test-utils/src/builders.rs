//! Declarative graph fixtures.
//!
//! ```ignore
//! let graph = GraphBuilder::new()
//!     .node("Sensor", "SIM")
//!     .output("Sensor", "out")
//!     .callback("Sensor", "emit_ten")
//!     .node("Display", "SIM")
//!     .input("Display", "in")
//!     .connect(("Sensor", "out"), ("Display", "in"))
//!     .build(&store)
//!     .await?;
//! ```

use std::collections::HashMap;

use eunomia_core::{
    CoreError, GraphStore, GraphTransaction, NewNode, NodeId, PortDirection, PortId,
    DEFAULT_PROTOCOL,
};

#[derive(Debug, Clone)]
enum Step {
    Node { name: String, node_type: String },
    Port { node: String, port: String, direction: PortDirection },
    Connect { from: (String, String), to: (String, String) },
    Param { node: String, port: String, direction: PortDirection, key: String, value: String },
    Callback { node: String, callback: String },
}

/// Builds a graph in one committed transaction
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    steps: Vec<Step>,
}

impl GraphBuilder {
    /// Start an empty fixture
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node of the given type. Types are created on demand.
    pub fn node(mut self, name: &str, node_type: &str) -> Self {
        self.steps.push(Step::Node {
            name: name.to_string(),
            node_type: node_type.to_string(),
        });
        self
    }

    /// Add an input port to a node added earlier
    pub fn input(mut self, node: &str, port: &str) -> Self {
        self.steps.push(Step::Port {
            node: node.to_string(),
            port: port.to_string(),
            direction: PortDirection::Input,
        });
        self
    }

    /// Add an output port to a node added earlier
    pub fn output(mut self, node: &str, port: &str) -> Self {
        self.steps.push(Step::Port {
            node: node.to_string(),
            port: port.to_string(),
            direction: PortDirection::Output,
        });
        self
    }

    /// Connect `(node, output port)` to `(node, input port)`
    pub fn connect(mut self, from: (&str, &str), to: (&str, &str)) -> Self {
        self.steps.push(Step::Connect {
            from: (from.0.to_string(), from.1.to_string()),
            to: (to.0.to_string(), to.1.to_string()),
        });
        self
    }

    /// Seed a parameter on an input port
    pub fn input_param(mut self, at: (&str, &str), key: &str, value: &str) -> Self {
        self.steps.push(Step::Param {
            node: at.0.to_string(),
            port: at.1.to_string(),
            direction: PortDirection::Input,
            key: key.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// Bind a node to a callback name
    pub fn callback(mut self, node: &str, callback: &str) -> Self {
        self.steps.push(Step::Callback {
            node: node.to_string(),
            callback: callback.to_string(),
        });
        self
    }

    /// Create everything in `store` and commit
    pub async fn build(self, store: &dyn GraphStore) -> Result<GraphHandles, CoreError> {
        let mut tx = store.begin().await?;
        let handles = self.apply(tx.as_mut()).await?;
        tx.commit().await?;
        Ok(handles)
    }

    /// Create everything inside an open transaction
    pub async fn apply(self, tx: &mut dyn GraphTransaction) -> Result<GraphHandles, CoreError> {
        let mut handles = GraphHandles::default();

        for step in self.steps {
            match step {
                Step::Node { name, node_type } => {
                    let kind = tx.ensure_node_type(&node_type).await?;
                    let node = tx.create_node(NewNode::new(name.clone(), kind.id)).await?;
                    handles.nodes.insert(name, node.id);
                }
                Step::Port { node, port, direction } => {
                    let node_id = handles.lookup_node(&node)?;
                    let created = tx.create_port(node_id, &port, direction).await?;
                    handles.ports.insert((node, port, direction), created.id);
                }
                Step::Connect { from, to } => {
                    let from_port = handles.lookup_port(&from.0, &from.1, PortDirection::Output)?;
                    let to_port = handles.lookup_port(&to.0, &to.1, PortDirection::Input)?;
                    tx.create_connection(from_port, to_port, DEFAULT_PROTOCOL)
                        .await?;
                }
                Step::Param { node, port, direction, key, value } => {
                    let port_id = handles.lookup_port(&node, &port, direction)?;
                    tx.upsert_parameter(port_id, &key, &value).await?;
                }
                Step::Callback { node, callback } => {
                    let node_id = handles.lookup_node(&node)?;
                    tx.bind_callback(node_id, &callback).await?;
                }
            }
        }

        Ok(handles)
    }
}

/// Identifiers of everything a [`GraphBuilder`] created, by name
#[derive(Debug, Clone, Default)]
pub struct GraphHandles {
    nodes: HashMap<String, NodeId>,
    ports: HashMap<(String, String, PortDirection), PortId>,
}

impl GraphHandles {
    fn lookup_node(&self, name: &str) -> Result<NodeId, CoreError> {
        self.nodes
            .get(name)
            .copied()
            .ok_or_else(|| CoreError::NodeNotFound(format!("fixture node '{}'", name)))
    }

    fn lookup_port(
        &self,
        node: &str,
        port: &str,
        direction: PortDirection,
    ) -> Result<PortId, CoreError> {
        self.ports
            .get(&(node.to_string(), port.to_string(), direction))
            .copied()
            .ok_or_else(|| {
                CoreError::PortNotFound(format!("fixture {} port '{}.{}'", direction, node, port))
            })
    }

    /// ID of a fixture node. Panics if the fixture never created it.
    pub fn node(&self, name: &str) -> NodeId {
        self.lookup_node(name).unwrap_or_else(|e| panic!("{}", e))
    }

    /// ID of a fixture input port. Panics if the fixture never created it.
    pub fn input(&self, node: &str, port: &str) -> PortId {
        self.lookup_port(node, port, PortDirection::Input)
            .unwrap_or_else(|e| panic!("{}", e))
    }

    /// ID of a fixture output port. Panics if the fixture never created it.
    pub fn output(&self, node: &str, port: &str) -> PortId {
        self.lookup_port(node, port, PortDirection::Output)
            .unwrap_or_else(|e| panic!("{}", e))
    }
}
