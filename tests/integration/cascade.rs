//! Cascade behaviour on both store back ends.

use pretty_assertions::assert_eq;

use eunomia_core::{CallbackRegistry, CoreError, ExecutorOptions, NodeExecutor};
use eunomia_monitoring::init_test_tracing;
use eunomia_test_utils::{GraphBuilder, RecordingTransformation};
use eunomia_tests::{emit_ten, increment, scheduler, sensor_display, stored_value, stores};

#[tokio::test]
async fn test_sensor_display_end_to_end() -> Result<(), CoreError> {
    init_test_tracing();

    for (name, store) in stores().await? {
        let graph = sensor_display().build(store.as_ref()).await?;
        let registry = CallbackRegistry::builder()
            .register_fn("emit_ten", emit_ten)
            .build();
        registry.validate_store(store.as_ref()).await?;

        let report = scheduler(store.clone(), registry)
            .run_cascade(graph.node("Sensor"))
            .await?;

        assert_eq!(report.visited, vec![graph.node("Sensor"), graph.node("Display")], "{}", name);
        // Display has no callback, so it is visited but never transformed
        assert_eq!(report.transformed, vec![graph.node("Sensor")], "{}", name);
        assert_eq!(report.propagated, vec![graph.node("Sensor")], "{}", name);
        assert_eq!(
            stored_value(store.as_ref(), graph.output("Sensor", "reading"), "value").await?,
            Some("10".to_string()),
            "{}",
            name
        );
        assert_eq!(
            stored_value(store.as_ref(), graph.input("Display", "in"), "value").await?,
            Some("10".to_string()),
            "{}",
            name
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_cycle_terminates_and_visits_each_node_once() -> Result<(), CoreError> {
    for (name, store) in stores().await? {
        let graph = GraphBuilder::new()
            .node("A", "VIRTUAL")
            .input("A", "in")
            .output("A", "out")
            .callback("A", "increment")
            .node("B", "VIRTUAL")
            .input("B", "in")
            .output("B", "out")
            .callback("B", "increment")
            .connect(("A", "out"), ("B", "in"))
            .connect(("B", "out"), ("A", "in"))
            .build(store.as_ref())
            .await?;

        let recorder = RecordingTransformation::new(increment);
        let registry = CallbackRegistry::builder()
            .register("increment", recorder.clone())
            .build();

        let report = scheduler(store.clone(), registry)
            .run_cascade(graph.node("A"))
            .await?;

        assert_eq!(report.visited, vec![graph.node("A"), graph.node("B")], "{}", name);
        assert_eq!(recorder.call_count(), 2, "{}", name);
        // A published 1 to B, B published 2 back to A
        assert_eq!(
            stored_value(store.as_ref(), graph.input("A", "in"), "value").await?,
            Some("2".to_string()),
            "{}",
            name
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_fan_in_node_runs_once() -> Result<(), CoreError> {
    for (name, store) in stores().await? {
        let graph = GraphBuilder::new()
            .node("Source", "SIM")
            .output("Source", "reading")
            .callback("Source", "emit_ten")
            .node("A", "VIRTUAL")
            .input("A", "in")
            .output("A", "out")
            .callback("A", "forward")
            .node("B", "VIRTUAL")
            .input("B", "in")
            .output("B", "out")
            .callback("B", "forward")
            .node("C", "VIRTUAL")
            .input("C", "left")
            .input("C", "right")
            .callback("C", "sink")
            .connect(("Source", "reading"), ("A", "in"))
            .connect(("Source", "reading"), ("B", "in"))
            .connect(("A", "out"), ("C", "left"))
            .connect(("B", "out"), ("C", "right"))
            .build(store.as_ref())
            .await?;

        let sink = RecordingTransformation::silent();
        let registry = CallbackRegistry::builder()
            .register_fn("emit_ten", emit_ten)
            .register_fn("forward", eunomia::callbacks::passthrough)
            .register("sink", sink.clone())
            .build();

        let report = scheduler(store.clone(), registry)
            .run_cascade(graph.node("Source"))
            .await?;

        assert_eq!(sink.call_count(), 1, "{}", name);
        assert_eq!(report.visited.len(), 4, "{}", name);
        assert_eq!(report.visited.last(), Some(&graph.node("C")), "{}", name);

        // C saw both inputs by the time it ran
        let inputs = sink.last_inputs().expect("sink inputs");
        assert_eq!(inputs["left"]["value"].as_i64(), Some(10), "{}", name);
        assert_eq!(inputs["right"]["value"].as_i64(), Some(10), "{}", name);
    }
    Ok(())
}

#[tokio::test]
async fn test_unconnected_node_is_reported_as_transformed() -> Result<(), CoreError> {
    for (name, store) in stores().await? {
        let graph = GraphBuilder::new()
            .node("Sensor", "SIM")
            .output("Sensor", "reading")
            .callback("Sensor", "emit_ten")
            .build(store.as_ref())
            .await?;
        let registry = CallbackRegistry::builder()
            .register_fn("emit_ten", emit_ten)
            .build();

        let report = scheduler(store.clone(), registry)
            .run_cascade(graph.node("Sensor"))
            .await?;

        assert_eq!(report.visited, vec![graph.node("Sensor")], "{}", name);
        assert_eq!(report.transformed, vec![graph.node("Sensor")], "{}", name);
        assert!(report.propagated.is_empty(), "{}", name);
        assert_eq!(
            stored_value(store.as_ref(), graph.output("Sensor", "reading"), "value").await?,
            Some("10".to_string()),
            "{}",
            name
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_passive_nodes_write_nothing() -> Result<(), CoreError> {
    for (name, store) in stores().await? {
        let graph = GraphBuilder::new()
            .node("Unbound", "PHYSICAL")
            .output("Unbound", "out")
            .node("Quiet", "SIM")
            .output("Quiet", "out")
            .callback("Quiet", "quiet")
            .build(store.as_ref())
            .await?;

        let quiet = RecordingTransformation::silent();
        let scheduler = scheduler(
            store.clone(),
            CallbackRegistry::builder().register("quiet", quiet.clone()).build(),
        );

        let report = scheduler.run_cascade(graph.node("Unbound")).await?;
        assert_eq!(report.visited, vec![graph.node("Unbound")], "{}", name);
        assert!(report.transformed.is_empty(), "{}", name);
        assert!(report.propagated.is_empty(), "{}", name);

        let report = scheduler.run_cascade(graph.node("Quiet")).await?;
        assert_eq!(quiet.call_count(), 1, "{}", name);
        assert_eq!(report.transformed, vec![graph.node("Quiet")], "{}", name);

        let mut tx = store.begin().await?;
        for port in [graph.output("Unbound", "out"), graph.output("Quiet", "out")] {
            assert!(tx.port_parameters(port).await?.is_empty(), "{}", name);
        }
        tx.rollback().await?;
    }
    Ok(())
}

#[tokio::test]
async fn test_missing_output_port_is_skipped_or_rejected() -> Result<(), CoreError> {
    for (name, store) in stores().await? {
        // Sensor emits on `reading` but only has `out`
        let graph = GraphBuilder::new()
            .node("Sensor", "SIM")
            .output("Sensor", "out")
            .callback("Sensor", "emit_ten")
            .build(store.as_ref())
            .await?;
        let registry = CallbackRegistry::builder()
            .register_fn("emit_ten", emit_ten)
            .build();

        let lenient = scheduler(store.clone(), registry.clone());
        let report = lenient.run_cascade(graph.node("Sensor")).await?;
        assert_eq!(report.transformed, vec![graph.node("Sensor")], "{}", name);
        assert!(report.propagated.is_empty(), "{}", name);

        let strict = eunomia_core::CascadeScheduler::new(
            store.clone(),
            NodeExecutor::with_options(
                registry,
                ExecutorOptions {
                    strict_output_ports: true,
                },
            ),
        );
        let result = strict.run_cascade(graph.node("Sensor")).await;
        assert!(matches!(result, Err(CoreError::ValidationError(_))), "{}", name);
        assert_eq!(
            stored_value(store.as_ref(), graph.output("Sensor", "out"), "value").await?,
            None,
            "{}",
            name
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_values_are_cast_before_transform() -> Result<(), CoreError> {
    for (name, store) in stores().await? {
        let graph = GraphBuilder::new()
            .node("Probe", "SIM")
            .input("Probe", "in")
            .input_param(("Probe", "in"), "count", "42")
            .input_param(("Probe", "in"), "ratio", "3.14")
            .input_param(("Probe", "in"), "armed", "True")
            .input_param(("Probe", "in"), "offset", "-5")
            .input_param(("Probe", "in"), "label", "hello")
            .input("Probe", "idle")
            .callback("Probe", "probe")
            .build(store.as_ref())
            .await?;

        let probe = RecordingTransformation::silent();
        scheduler(
            store.clone(),
            CallbackRegistry::builder().register("probe", probe.clone()).build(),
        )
        .run_cascade(graph.node("Probe"))
        .await?;

        let inputs = probe.last_inputs().expect("probe ran");
        let given = &inputs["in"];
        assert_eq!(given["count"].as_i64(), Some(42), "{}", name);
        assert_eq!(given["ratio"].as_f64(), Some(3.14), "{}", name);
        assert_eq!(given["armed"].as_bool(), Some(true), "{}", name);
        assert_eq!(given["offset"], eunomia_core::Scalar::Float(-5.0), "{}", name);
        assert_eq!(given["label"].as_str(), Some("hello"), "{}", name);
        // A port without parameters still appears, empty
        assert!(inputs["idle"].is_empty(), "{}", name);
    }
    Ok(())
}
