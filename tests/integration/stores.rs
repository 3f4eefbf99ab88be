//! The engine over a SQLite file, as the binary runs it.

use pretty_assertions::assert_eq;

use eunomia::seed::{CONTROL_SYSTEM, SOLAR_PLANT};
use eunomia::{builtin_builder, Engine, EngineConfig, NodeRef};
use eunomia_core::{CoreError, PortDirection};

fn file_config(dir: &tempfile::TempDir) -> EngineConfig {
    EngineConfig {
        database_url: format!("sqlite://{}", dir.path().join("system.db").display()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_seeded_graph_survives_reopen() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = file_config(&dir);

    {
        let engine = Engine::open(&config, builtin_builder().build()).await?;
        let report = engine.seed().await?;
        assert_eq!(report.nodes, 3);
    }

    let engine = Engine::open(&config, builtin_builder().build()).await?;
    assert!(engine.seed().await?.is_noop());

    let dump = engine.dump().await?;
    let names: Vec<&str> = dump.nodes.iter().map(|n| n.node.name.as_str()).collect();
    assert!(names.contains(&CONTROL_SYSTEM));
    assert!(names.contains(&SOLAR_PLANT));
    assert_eq!(dump.connections.len(), 1);
    assert_eq!(dump.node_types.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_set_param_drives_seeded_control_system() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = file_config(&dir);
    let engine = Engine::open(&config, builtin_builder().build()).await?;
    engine.seed().await?;

    // Solar plant forwards its setpoint to the control system's CTRL #1
    {
        let mut tx = engine.store().begin().await?;
        let solar = tx.find_node_by_name(SOLAR_PLANT).await?.expect("solar plant");
        tx.create_port(solar.id, "in", PortDirection::Input).await?;
        tx.bind_callback(solar.id, "relay").await?;
        tx.commit().await?;
    }

    // `relay` is not a built-in, so validation fails until it is registered
    assert!(matches!(
        engine.validate().await,
        Err(CoreError::ConfigurationError(_))
    ));

    let engine = Engine::new(
        engine.store().clone(),
        builtin_builder()
            .register_fn("relay", |inputs| {
                Ok(inputs.get("in").cloned().map(|params| {
                    eunomia_core::PortOutputs::from([("CTRL #1".to_string(), params)])
                }))
            })
            .build(),
        config.executor_options(),
    );
    engine.validate().await?;

    let report = engine
        .set_input_parameter(&NodeRef::Name(SOLAR_PLANT.to_string()), "in", "setpoint", "0.75")
        .await?;
    assert_eq!(report.visited.len(), 2);

    let dump = engine.dump().await?;
    let control = dump
        .nodes
        .iter()
        .find(|n| n.node.name == CONTROL_SYSTEM)
        .expect("control system");
    let ctrl_1 = control
        .ports
        .iter()
        .find(|p| p.port.name == "CTRL #1" && p.port.direction == PortDirection::Input)
        .expect("CTRL #1");
    assert_eq!(ctrl_1.parameters.get("setpoint").map(String::as_str), Some("0.75"));
    Ok(())
}

#[tokio::test]
async fn test_memory_url_uses_in_memory_store() -> anyhow::Result<()> {
    let config = EngineConfig {
        database_url: eunomia::config::MEMORY_DATABASE_URL.to_string(),
        ..Default::default()
    };
    let engine = Engine::open(&config, builtin_builder().build()).await?;
    engine.seed().await?;

    let report = engine.run(&NodeRef::Name(CONTROL_SYSTEM.to_string())).await?;
    assert_eq!(report.visited.len(), 1);
    Ok(())
}
