//!
//! Eunomia Core - propagation engine for node graphs
//!
//! This crate defines the graph model (node types, nodes, ports, port
//! parameters, connections and callback bindings), the storage boundary
//! a graph store implements, and the engine that re-evaluates nodes:
//! the callback registry, the node executor and the cascade scheduler.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Domain layer - graph entities, values and storage interfaces
pub mod domain;

/// Application services - callback registry, node execution and cascades
pub mod application;

/// Error types
pub mod error;

// Re-export key types
pub use error::CoreError;

pub use domain::graph::{
    validate_connection, validate_new_port, Connection, ConnectionId, NewNode, Node, NodeCallback,
    NodeCallbackId, NodeId, NodeType, NodeTypeId, Port, PortDirection, PortId, PortParameter,
    PortParameterId, DEFAULT_POSITION, DEFAULT_PROTOCOL,
};
pub use domain::store::{GraphStore, GraphTransaction};
pub use domain::value::{cast, Scalar};

pub use application::callback_registry::{
    CallbackRegistry, CallbackRegistryBuilder, ParameterMap, PortInputs, PortOutputs,
    Transformation,
};
pub use application::cascade_scheduler::{CascadeReport, CascadeScheduler};
pub use application::node_executor::{ExecutorOptions, NodeExecutor, NodeOutcome};

/// Build a parameter map from `(key, value)` pairs
pub fn params<K, V, I>(pairs: I) -> ParameterMap
where
    K: Into<String>,
    V: Into<Scalar>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
