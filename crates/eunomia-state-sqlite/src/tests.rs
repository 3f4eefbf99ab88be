use crate::{migrations, SqliteConfig, SqliteGraphStore};
use eunomia_core::{CoreError, GraphStore, NewNode, PortDirection, DEFAULT_PROTOCOL};
use tempfile::TempDir;

async fn memory_store() -> SqliteGraphStore {
    SqliteGraphStore::new("sqlite::memory:")
        .await
        .expect("in-memory SQLite store")
}

#[tokio::test]
async fn test_migrations_are_idempotent() -> Result<(), CoreError> {
    let store = memory_store().await;
    // Already applied by `new`
    let applied = migrations::run_migrations(store.database().pool()).await?;
    assert_eq!(applied, 0);
    Ok(())
}

#[tokio::test]
async fn test_graph_round_trip() -> Result<(), CoreError> {
    let store = memory_store().await;
    let mut tx = store.begin().await?;

    let sim = tx.ensure_node_type("SIM").await?;
    assert_eq!(tx.ensure_node_type("SIM").await?, sim);
    assert_eq!(tx.find_node_type("SIM").await?, Some(sim.clone()));

    let sensor = tx.create_node(NewNode::new("Sensor", sim.id).at(10, 20)).await?;
    let display = tx.create_node(NewNode::new("Display", sim.id)).await?;
    assert_eq!((display.position_x, display.position_y), (50, 50));

    let out = tx.create_port(sensor.id, "out", PortDirection::Output).await?;
    let inp = tx.create_port(display.id, "in", PortDirection::Input).await?;
    let connection = tx.create_connection(out.id, inp.id, DEFAULT_PROTOCOL).await?;
    tx.bind_callback(sensor.id, "emit_ten").await?;
    tx.commit().await?;

    let mut tx = store.begin().await?;
    assert_eq!(tx.find_node_by_name("Sensor").await?, Some(sensor.clone()));
    assert_eq!(tx.list_nodes().await?.len(), 2);
    assert_eq!(
        tx.find_port_by_name(display.id, "in", PortDirection::Input).await?,
        Some(inp.clone())
    );
    assert_eq!(tx.outgoing_connections(out.id).await?, vec![connection.clone()]);
    assert_eq!(tx.find_connection(out.id, inp.id).await?, Some(connection));
    assert_eq!(
        tx.node_callback(sensor.id).await?.map(|cb| cb.callback_name),
        Some("emit_ten".to_string())
    );
    tx.rollback().await?;
    Ok(())
}

#[tokio::test]
async fn test_port_and_connection_rules() -> Result<(), CoreError> {
    let store = memory_store().await;
    let mut tx = store.begin().await?;
    let kind = tx.ensure_node_type("VIRTUAL").await?;
    let a = tx.create_node(NewNode::new("A", kind.id)).await?;
    let b = tx.create_node(NewNode::new("B", kind.id)).await?;

    let a_out = tx.create_port(a.id, "x", PortDirection::Output).await?;
    // Same name in the other direction is a distinct port
    let a_in = tx.create_port(a.id, "x", PortDirection::Input).await?;
    assert_ne!(a_out.id, a_in.id);
    assert!(matches!(
        tx.create_port(a.id, "x", PortDirection::Output).await,
        Err(CoreError::ValidationError(_))
    ));

    let b_in = tx.create_port(b.id, "in", PortDirection::Input).await?;
    assert!(matches!(
        tx.create_connection(b_in.id, a_out.id, DEFAULT_PROTOCOL).await,
        Err(CoreError::ValidationError(_))
    ));
    assert!(matches!(
        tx.create_connection(a_in.id, b_in.id, DEFAULT_PROTOCOL).await,
        Err(CoreError::ValidationError(_))
    ));
    assert!(tx.list_connections().await?.is_empty());

    assert_eq!(tx.node_ports(a.id, None).await?.len(), 2);
    assert_eq!(
        tx.node_ports(a.id, Some(PortDirection::Output)).await?,
        vec![a_out]
    );
    Ok(())
}

#[tokio::test]
async fn test_upsert_parameter_replaces_value() -> Result<(), CoreError> {
    let store = memory_store().await;
    let mut tx = store.begin().await?;
    let kind = tx.ensure_node_type("SIM").await?;
    let node = tx.create_node(NewNode::new("Display", kind.id)).await?;
    let port = tx.create_port(node.id, "in", PortDirection::Input).await?;

    let first = tx.upsert_parameter(port.id, "value", "10").await?;
    let second = tx.upsert_parameter(port.id, "value", "12.5").await?;
    tx.upsert_parameter(port.id, "unit", "kW").await?;
    assert_eq!(first.id, second.id);

    let params = tx.port_parameters(port.id).await?;
    let pairs: Vec<(&str, &str)> = params
        .iter()
        .map(|p| (p.key.as_str(), p.value.as_str()))
        .collect();
    assert_eq!(pairs, vec![("unit", "kW"), ("value", "12.5")]);

    assert!(matches!(
        tx.upsert_parameter(eunomia_core::PortId(404), "value", "1").await,
        Err(CoreError::PortNotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_rollback_and_drop_discard_writes() -> Result<(), CoreError> {
    let store = memory_store().await;

    let mut tx = store.begin().await?;
    let kind = tx.ensure_node_type("SIM").await?;
    tx.create_node(NewNode::new("Kept", kind.id)).await?;
    tx.commit().await?;

    let mut tx = store.begin().await?;
    tx.create_node(NewNode::new("Discarded", kind.id)).await?;
    tx.rollback().await?;

    {
        let mut tx = store.begin().await?;
        tx.create_node(NewNode::new("Dropped", kind.id)).await?;
    }

    let mut tx = store.begin().await?;
    let names: Vec<String> = tx.list_nodes().await?.into_iter().map(|n| n.name).collect();
    assert_eq!(names, vec!["Kept".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_delete_node_cascades() -> Result<(), CoreError> {
    let store = memory_store().await;
    let mut tx = store.begin().await?;
    let kind = tx.ensure_node_type("PHYSICAL").await?;
    let a = tx.create_node(NewNode::new("A", kind.id)).await?;
    let b = tx.create_node(NewNode::new("B", kind.id)).await?;
    let a_out = tx.create_port(a.id, "out", PortDirection::Output).await?;
    let b_in = tx.create_port(b.id, "in", PortDirection::Input).await?;
    tx.create_connection(a_out.id, b_in.id, DEFAULT_PROTOCOL).await?;
    tx.upsert_parameter(b_in.id, "value", "1").await?;
    tx.bind_callback(b.id, "passthrough").await?;

    tx.delete_node(b.id).await?;

    assert!(tx.find_port(b_in.id).await?.is_none());
    assert!(tx.port_parameters(b_in.id).await?.is_empty());
    assert!(tx.list_connections().await?.is_empty());
    assert!(tx.node_callback(b.id).await?.is_none());
    assert!(matches!(
        tx.delete_node(b.id).await,
        Err(CoreError::NodeNotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_callback_binding_replaces_name() -> Result<(), CoreError> {
    let store = memory_store().await;
    let mut tx = store.begin().await?;
    let kind = tx.ensure_node_type("SIM").await?;
    let node = tx.create_node(NewNode::new("Sensor", kind.id)).await?;

    let first = tx.bind_callback(node.id, "emit_ten").await?;
    let second = tx.bind_callback(node.id, "passthrough").await?;
    assert_eq!(first.id, second.id);
    assert_eq!(second.callback_name, "passthrough");
    assert_eq!(tx.list_callbacks().await?.len(), 1);

    tx.unbind_callback(node.id).await?;
    assert!(tx.list_callbacks().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_file_database_persists_across_stores() -> Result<(), CoreError> {
    let dir = TempDir::new()?;
    let url = format!("sqlite://{}", dir.path().join("graph.db").display());

    {
        let store = SqliteGraphStore::new(&url).await?;
        let mut tx = store.begin().await?;
        let kind = tx.ensure_node_type("SIM").await?;
        tx.create_node(NewNode::new("Sensor", kind.id)).await?;
        tx.commit().await?;
        store.database().close().await;
    }

    let store = SqliteGraphStore::with_config(SqliteConfig {
        connection_string: url,
        max_connections: 2,
        ..Default::default()
    })
    .await?;
    let mut tx = store.begin().await?;
    assert!(tx.find_node_by_name("Sensor").await?.is_some());
    Ok(())
}
