//! Default graph for a fresh installation.
//!
//! Seeding is idempotent: every entity is looked up first and only created
//! when missing, so `init` can run against an existing database.

use serde::Serialize;
use tracing::{debug, info};

use eunomia_core::{
    CoreError, GraphStore, GraphTransaction, NewNode, Node, NodeTypeId, Port, PortDirection,
    DEFAULT_PROTOCOL,
};

/// Node type for hardware-backed nodes
pub const PHYSICAL: &str = "PHYSICAL";
/// Node type for simulated nodes
pub const SIM: &str = "SIM";
/// Node type for purely computed nodes
pub const VIRTUAL: &str = "VIRTUAL";

/// Central controller node
pub const CONTROL_SYSTEM: &str = "Central Autonomous Control System";
/// Primary generation node
pub const SOLAR_PLANT: &str = "Main Solar Generation Plant";
/// Backup generation node
pub const THERMAL_PLANT: &str = "Backup Thermal Power Plant";

const CONTROL_PORT: &str = "CTRL #1";
const CONTROL_INPUTS: [&str; 3] = ["CTRL #1", "CTRL #2", "CTRL #3"];

/// What a seeding run created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    /// Node types created
    pub node_types: usize,
    /// Nodes created
    pub nodes: usize,
    /// Ports created
    pub ports: usize,
    /// Connections created
    pub connections: usize,
}

impl SeedReport {
    /// Whether nothing had to be created
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// Seed the default graph in its own transaction
pub async fn seed_store(store: &dyn GraphStore) -> Result<SeedReport, CoreError> {
    let mut tx = store.begin().await?;
    match seed_defaults(tx.as_mut()).await {
        Ok(report) => {
            tx.commit().await?;
            info!(?report, "Default graph seeded");
            Ok(report)
        }
        Err(e) => {
            tx.rollback().await?;
            Err(e)
        }
    }
}

/// Seed the default graph inside an open transaction
pub async fn seed_defaults(tx: &mut dyn GraphTransaction) -> Result<SeedReport, CoreError> {
    let mut report = SeedReport::default();

    let mut physical = None;
    for name in [PHYSICAL, SIM, VIRTUAL] {
        if tx.find_node_type(name).await?.is_none() {
            report.node_types += 1;
        }
        let node_type = tx.ensure_node_type(name).await?;
        if name == PHYSICAL {
            physical = Some(node_type.id);
        }
    }
    let physical = physical.ok_or_else(|| CoreError::NodeTypeNotFound(PHYSICAL.to_string()))?;

    let control = ensure_node(tx, CONTROL_SYSTEM, physical, &mut report).await?;
    let solar = ensure_node(tx, SOLAR_PLANT, physical, &mut report).await?;
    let thermal = ensure_node(tx, THERMAL_PLANT, physical, &mut report).await?;

    let solar_out = ensure_port(tx, &solar, CONTROL_PORT, PortDirection::Output, &mut report).await?;
    for name in CONTROL_INPUTS {
        ensure_port(tx, &control, name, PortDirection::Input, &mut report).await?;
    }
    ensure_port(tx, &thermal, CONTROL_PORT, PortDirection::Output, &mut report).await?;

    let control_in = tx
        .find_port_by_name(control.id, CONTROL_PORT, PortDirection::Input)
        .await?
        .ok_or_else(|| CoreError::PortNotFound(format!("{} on {}", CONTROL_PORT, CONTROL_SYSTEM)))?;

    if tx.find_connection(solar_out.id, control_in.id).await?.is_none() {
        tx.create_connection(solar_out.id, control_in.id, DEFAULT_PROTOCOL)
            .await?;
        report.connections += 1;
    }

    Ok(report)
}

async fn ensure_node(
    tx: &mut dyn GraphTransaction,
    name: &str,
    type_id: NodeTypeId,
    report: &mut SeedReport,
) -> Result<Node, CoreError> {
    if let Some(node) = tx.find_node_by_name(name).await? {
        return Ok(node);
    }
    let node = tx.create_node(NewNode::new(name, type_id)).await?;
    debug!(node = %node.id, name, "Seeded node");
    report.nodes += 1;
    Ok(node)
}

async fn ensure_port(
    tx: &mut dyn GraphTransaction,
    node: &Node,
    name: &str,
    direction: PortDirection,
    report: &mut SeedReport,
) -> Result<Port, CoreError> {
    if let Some(port) = tx.find_port_by_name(node.id, name, direction).await? {
        return Ok(port);
    }
    let port = tx.create_port(node.id, name, direction).await?;
    report.ports += 1;
    Ok(port)
}
