use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CoreError;

/// Default protocol recorded on new connections
pub const DEFAULT_PROTOCOL: &str = "MQTT";

/// Default editor coordinate for newly placed nodes
pub const DEFAULT_POSITION: i64 = 50;

macro_rules! graph_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

graph_id!(
    /// Identifier of a node type
    NodeTypeId
);
graph_id!(
    /// Identifier of a node
    NodeId
);
graph_id!(
    /// Identifier of a port
    PortId
);
graph_id!(
    /// Identifier of a port parameter row
    PortParameterId
);
graph_id!(
    /// Identifier of a connection
    ConnectionId
);
graph_id!(
    /// Identifier of a node-to-callback binding
    NodeCallbackId
);

/// Classifies a node, e.g. physical, simulated or virtual
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeType {
    /// Unique identifier
    pub id: NodeTypeId,
    /// Unique name
    pub name: String,
}

/// A unit in the graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Unique identifier
    pub id: NodeId,
    /// Display name
    pub name: String,
    /// Node type
    pub type_id: NodeTypeId,
    /// Editor X coordinate, never read by the engine
    pub position_x: i64,
    /// Editor Y coordinate, never read by the engine
    pub position_y: i64,
}

/// Fields required to create a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNode {
    /// Display name
    pub name: String,
    /// Node type
    pub type_id: NodeTypeId,
    /// Editor X coordinate
    pub position_x: i64,
    /// Editor Y coordinate
    pub position_y: i64,
}

impl NewNode {
    /// A node placed at the default editor position
    pub fn new(name: impl Into<String>, type_id: NodeTypeId) -> Self {
        Self {
            name: name.into(),
            type_id,
            position_x: DEFAULT_POSITION,
            position_y: DEFAULT_POSITION,
        }
    }

    /// Place the node at the given editor coordinates
    pub fn at(mut self, x: i64, y: i64) -> Self {
        self.position_x = x;
        self.position_y = y;
        self
    }
}

/// Direction of a port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    /// Receives values from upstream connections
    Input,
    /// Publishes values to downstream connections
    Output,
}

impl PortDirection {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            PortDirection::Input => "input",
            PortDirection::Output => "output",
        }
    }
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PortDirection {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "input" => Ok(PortDirection::Input),
            "output" => Ok(PortDirection::Output),
            other => Err(CoreError::ValidationError(format!(
                "Unknown port direction: {}",
                other
            ))),
        }
    }
}

/// A directed attachment point on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Unique identifier
    pub id: PortId,
    /// Owning node
    pub node_id: NodeId,
    /// Name, unique per node and direction
    pub name: String,
    /// Input or output
    pub direction: PortDirection,
}

/// Key/value payload attached to a port, stored as a string
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortParameter {
    /// Unique identifier
    pub id: PortParameterId,
    /// Owning port
    pub port_id: PortId,
    /// Key, unique per port
    pub key: String,
    /// Raw stored value
    pub value: String,
}

/// Directed edge from an output port to an input port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    /// Unique identifier
    pub id: ConnectionId,
    /// Source port, always an output
    pub from_port_id: PortId,
    /// Destination port, always an input
    pub to_port_id: PortId,
    /// Transport protocol label
    pub protocol: String,
}

/// Binding of a node to a registered transformation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCallback {
    /// Unique identifier
    pub id: NodeCallbackId,
    /// Bound node
    pub node_id: NodeId,
    /// Name looked up in the callback registry
    pub callback_name: String,
}

/// Check that a connection runs from an output port to an input port.
///
/// Every store calls this before persisting a connection.
pub fn validate_connection(from: &Port, to: &Port) -> Result<(), CoreError> {
    if from.direction != PortDirection::Output {
        return Err(CoreError::ValidationError(format!(
            "Connection source port {} ({}) must be an output port",
            from.id, from.name
        )));
    }
    if to.direction != PortDirection::Input {
        return Err(CoreError::ValidationError(format!(
            "Connection destination port {} ({}) must be an input port",
            to.id, to.name
        )));
    }
    Ok(())
}

/// Reject a port whose `(name, direction)` already exists on the node
pub fn validate_new_port(
    existing: &[Port],
    node_id: NodeId,
    name: &str,
    direction: PortDirection,
) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::ValidationError(
            "Port name must not be empty".to_string(),
        ));
    }
    let duplicate = existing
        .iter()
        .any(|p| p.node_id == node_id && p.name == name && p.direction == direction);
    if duplicate {
        return Err(CoreError::ValidationError(format!(
            "Node {} already has an {} port named '{}'",
            node_id, direction, name
        )));
    }
    Ok(())
}
