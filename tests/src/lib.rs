//! Shared fixtures for the cross-crate tests.

use std::sync::Arc;

use eunomia_core::{
    params, CallbackRegistry, CascadeScheduler, CoreError, ExecutorOptions, GraphStore,
    NodeExecutor, PortInputs, PortOutputs, Scalar,
};
use eunomia_state_inmemory::InMemoryGraphStore;
use eunomia_state_sqlite::SqliteGraphStore;
use eunomia_test_utils::{single_output, GraphBuilder};

/// Publishes the string `reading.value = "10"` regardless of inputs
pub fn emit_ten(_: &PortInputs) -> Result<Option<PortOutputs>, CoreError> {
    Ok(Some(single_output("reading", params([("value", "10")]))))
}

/// Adds one to `in.value` and publishes it on `out`
pub fn increment(inputs: &PortInputs) -> Result<Option<PortOutputs>, CoreError> {
    let current = inputs
        .get("in")
        .and_then(|p| p.get("value"))
        .and_then(Scalar::as_i64)
        .unwrap_or(0);
    Ok(Some(single_output("out", params([("value", current + 1)]))))
}

/// Always fails
pub fn explode(_: &PortInputs) -> Result<Option<PortOutputs>, CoreError> {
    Err(CoreError::CallbackError("sensor offline".to_string()))
}

/// Both store back ends, each empty and ready
pub async fn stores() -> Result<Vec<(&'static str, Arc<dyn GraphStore>)>, CoreError> {
    let sqlite = SqliteGraphStore::new("sqlite::memory:").await?;
    Ok(vec![
        ("in-memory", Arc::new(InMemoryGraphStore::new()) as Arc<dyn GraphStore>),
        ("sqlite", sqlite.into_shared()),
    ])
}

/// A scheduler over `store` with default options
pub fn scheduler(store: Arc<dyn GraphStore>, registry: CallbackRegistry) -> CascadeScheduler {
    CascadeScheduler::new(
        store,
        NodeExecutor::with_options(registry, ExecutorOptions::default()),
    )
}

/// Sensor (SIM, output `reading`, bound to `emit_ten`) wired to Display (SIM, input `in`)
pub fn sensor_display() -> GraphBuilder {
    GraphBuilder::new()
        .node("Sensor", "SIM")
        .output("Sensor", "reading")
        .callback("Sensor", "emit_ten")
        .node("Display", "SIM")
        .input("Display", "in")
        .connect(("Sensor", "reading"), ("Display", "in"))
}

/// Value stored under `(port, key)`, read in a throwaway transaction
pub async fn stored_value(
    store: &dyn GraphStore,
    port: eunomia_core::PortId,
    key: &str,
) -> Result<Option<String>, CoreError> {
    let mut tx = store.begin().await?;
    let value = tx
        .port_parameters(port)
        .await?
        .into_iter()
        .find(|p| p.key == key)
        .map(|p| p.value);
    tx.rollback().await?;
    Ok(value)
}
