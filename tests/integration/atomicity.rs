//! A failed cascade leaves no trace in the store.

use std::sync::Arc;

use eunomia_core::{CallbackRegistry, CoreError, GraphStore, NodeId};
use eunomia_state_inmemory::InMemoryGraphStore;
use eunomia_test_utils::{FaultPlan, FaultyGraphStore, GraphBuilder};
use eunomia_tests::{emit_ten, explode, scheduler, sensor_display, stored_value, stores};

fn sensor_then_failing_display() -> GraphBuilder {
    sensor_display()
        .output("Display", "out")
        .callback("Display", "explode")
}

#[tokio::test]
async fn test_callback_failure_rolls_back_upstream_writes() -> Result<(), CoreError> {
    for (name, store) in stores().await? {
        let graph = sensor_then_failing_display().build(store.as_ref()).await?;
        let registry = CallbackRegistry::builder()
            .register_fn("emit_ten", emit_ten)
            .register_fn("explode", explode)
            .build();

        let result = scheduler(store.clone(), registry)
            .run_cascade(graph.node("Sensor"))
            .await;

        assert!(matches!(result, Err(CoreError::CallbackError(_))), "{}", name);
        assert_eq!(
            stored_value(store.as_ref(), graph.output("Sensor", "reading"), "value").await?,
            None,
            "{}",
            name
        );
        assert_eq!(
            stored_value(store.as_ref(), graph.input("Display", "in"), "value").await?,
            None,
            "{}",
            name
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_unregistered_callback_rolls_back() -> Result<(), CoreError> {
    for (name, store) in stores().await? {
        let graph = sensor_then_failing_display().build(store.as_ref()).await?;
        // `explode` is bound but never registered
        let registry = CallbackRegistry::builder()
            .register_fn("emit_ten", emit_ten)
            .build();

        assert!(matches!(
            registry.validate_store(store.as_ref()).await,
            Err(CoreError::ConfigurationError(_))
        ));

        let result = scheduler(store.clone(), registry)
            .run_cascade(graph.node("Sensor"))
            .await;
        assert!(matches!(result, Err(CoreError::ConfigurationError(_))), "{}", name);
        assert_eq!(
            stored_value(store.as_ref(), graph.input("Display", "in"), "value").await?,
            None,
            "{}",
            name
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_missing_start_node_is_reported() -> Result<(), CoreError> {
    for (name, store) in stores().await? {
        let result = scheduler(store, CallbackRegistry::default())
            .run_cascade(NodeId(4_242))
            .await;
        assert!(matches!(result, Err(CoreError::NodeNotFound(_))), "{}", name);
    }
    Ok(())
}

#[tokio::test]
async fn test_store_failure_mid_cascade_rolls_back() -> Result<(), CoreError> {
    let inner = InMemoryGraphStore::new();
    let graph = sensor_display().build(&inner).await?;

    // Upsert #1 is Sensor.reading, #2 is Display.in
    let faulty = FaultyGraphStore::new(
        Arc::new(inner.clone()),
        FaultPlan {
            fail_upsert_at: Some(2),
            ..Default::default()
        },
    );
    let store: Arc<dyn GraphStore> = Arc::new(faulty.clone());
    let registry = CallbackRegistry::builder()
        .register_fn("emit_ten", emit_ten)
        .build();

    let result = scheduler(store, registry)
        .run_cascade(graph.node("Sensor"))
        .await;

    assert!(matches!(result, Err(CoreError::StateStoreError(_))));
    assert!(result.unwrap_err().is_store_failure());
    assert_eq!(faulty.upserts(), 2);
    assert_eq!(faulty.rollbacks(), 1);
    assert_eq!(faulty.commits(), 0);
    assert_eq!(inner.snapshot().await.parameter_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_commit_failure_surfaces_and_discards() -> Result<(), CoreError> {
    let inner = InMemoryGraphStore::new();
    let graph = sensor_display().build(&inner).await?;

    let store: Arc<dyn GraphStore> = Arc::new(FaultyGraphStore::new(
        Arc::new(inner.clone()),
        FaultPlan {
            fail_commit: true,
            ..Default::default()
        },
    ));
    let registry = CallbackRegistry::builder()
        .register_fn("emit_ten", emit_ten)
        .build();

    let result = scheduler(store, registry)
        .run_cascade(graph.node("Sensor"))
        .await;

    assert!(matches!(result, Err(CoreError::StateStoreError(_))));
    assert_eq!(inner.snapshot().await.parameter_count(), 0);
    Ok(())
}
