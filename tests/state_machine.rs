// tests/state_machine.rs

//! Lifecycle semantics of generic (non-function) processes.

mod common;
use crate::common::init_tracing;
use crate::common::processes::{
    AddProcess, BadOutputProcess, DummyProcess, ExceptionProcess, MissingOutputProcess,
};

use std::collections::BTreeMap;
use std::error::Error;

use provrun::data::{DataNode, DataValue};
use provrun::engine::Engine;
use provrun::errors::ProvrunError;
use provrun::graph::{GraphStore, ProcessNode};

type TestResult = Result<(), Box<dyn Error>>;

fn int(engine: &Engine, value: i64) -> DataNode {
    engine
        .store()
        .create_data(DataValue::Int(value))
        .expect("create data node")
}

fn inputs(pairs: Vec<(&str, DataNode)>) -> BTreeMap<String, DataNode> {
    pairs
        .into_iter()
        .map(|(name, node)| (name.to_string(), node))
        .collect()
}

/// Exactly one of {finished, excepted, killed} must hold for any terminal
/// node.
fn assert_single_terminal_flag(node: &ProcessNode) {
    assert!(node.is_terminated());
    let flags = [node.is_finished(), node.is_excepted(), node.is_killed()];
    assert_eq!(
        flags.iter().filter(|f| **f).count(),
        1,
        "terminal flags not mutually exclusive: {flags:?}"
    );
}

#[tokio::test]
async fn run_returns_outputs_of_a_finished_process() -> TestResult {
    init_tracing();
    let engine = Engine::new();

    let supplied = inputs(vec![("a", int(&engine, 2)), ("b", int(&engine, 3))]);
    let (outputs, node) = engine
        .run_get_node(Box::new(AddProcess::new()), supplied)
        .await?;

    assert_eq!(outputs["result"].as_int(), Some(5));
    assert!(node.is_finished_ok());
    assert!(node.is_sealed());
    assert_single_terminal_flag(&node);
    assert_eq!(engine.live_instances(), 0);
    Ok(())
}

#[tokio::test]
async fn dummy_process_accepts_arbitrary_inputs() -> TestResult {
    init_tracing();
    let engine = Engine::new();

    let supplied = inputs(vec![
        ("a", int(&engine, 2)),
        ("b", {
            engine
                .store()
                .create_data(DataValue::Str("test".to_string()))?
        }),
    ]);
    let outputs = engine.run(Box::new(DummyProcess::new()), supplied).await?;

    assert!(outputs.is_empty());
    assert_eq!(engine.live_instances(), 0);
    Ok(())
}

#[tokio::test]
async fn input_links_are_recorded_before_running() -> TestResult {
    init_tracing();
    let engine = Engine::new();

    let a = int(&engine, 2);
    let b = int(&engine, 3);
    let supplied = inputs(vec![("a", a.clone()), ("b", b.clone())]);
    let (_outputs, node) = engine
        .run_get_node(Box::new(AddProcess::new()), supplied)
        .await?;

    let incoming = node.incoming();
    assert_eq!(incoming.len(), 2);
    assert!(incoming.iter().any(|l| l.source == a.id() && l.label == "a"));
    assert!(incoming.iter().any(|l| l.source == b.id() && l.label == "b"));

    let outgoing = node.outgoing();
    assert_eq!(outgoing.len(), 1);
    assert_eq!(outgoing[0].label, "result");
    Ok(())
}

#[tokio::test]
async fn missing_required_inputs_reported_in_one_pass() {
    init_tracing();
    let engine = Engine::new();

    let result = engine
        .run(Box::new(AddProcess::new()), BTreeMap::new())
        .await;

    match result {
        Err(ProvrunError::Validation(validation)) => {
            // Both missing ports enumerated at once.
            assert_eq!(validation.problems().len(), 2);
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn type_mismatch_is_a_validation_error() {
    init_tracing();
    let engine = Engine::new();

    let supplied = inputs(vec![
        (
            "a",
            engine
                .store()
                .create_data(DataValue::Str("two".to_string()))
                .expect("create data node"),
        ),
        ("b", int(&engine, 3)),
    ]);
    let result = engine.run(Box::new(AddProcess::new()), supplied).await;

    assert!(matches!(result, Err(ProvrunError::Validation(_))));
}

#[tokio::test]
async fn undeclared_output_drives_excepted() {
    init_tracing();
    let engine = Engine::new();

    let result = engine
        .run_get_node(Box::new(BadOutputProcess::new()), BTreeMap::new())
        .await;

    match result {
        Err(ProvrunError::Excepted { node, .. }) => {
            let node = engine.store().process_node(node).expect("node persisted");
            assert!(node.is_excepted());
            assert_single_terminal_flag(&node);
            let exception = node.exception().expect("exception recorded");
            assert!(exception.contains("bad_output"), "got: {exception}");
        }
        other => panic!("expected an excepted error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_required_output_resolves_to_excepted() {
    init_tracing();
    let engine = Engine::new();

    let result = engine
        .run(Box::new(MissingOutputProcess::new()), BTreeMap::new())
        .await;

    match result {
        Err(ProvrunError::Validation(validation)) => {
            assert_eq!(validation.problems().len(), 1);
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
    assert_eq!(engine.live_instances(), 0);
}

#[tokio::test]
async fn handler_failure_is_persisted_before_surfacing() {
    init_tracing();
    let engine = Engine::new();

    let result = engine
        .run(Box::new(ExceptionProcess::new()), BTreeMap::new())
        .await;

    match result {
        Err(ProvrunError::Excepted { node, source }) => {
            assert_eq!(source.to_string(), "CRASH");
            let node = engine.store().process_node(node).expect("node persisted");
            assert!(node.is_excepted());
            assert!(node.is_sealed());
            assert_eq!(node.exception(), Some("CRASH"));
            assert_single_terminal_flag(&node);
        }
        other => panic!("expected an excepted error, got {other:?}"),
    }
}

#[tokio::test]
async fn sealed_node_rejects_mutation() -> TestResult {
    init_tracing();
    let engine = Engine::new();

    let supplied = inputs(vec![("a", int(&engine, 1)), ("b", int(&engine, 2))]);
    let (_outputs, node) = engine
        .run_get_node(Box::new(AddProcess::new()), supplied)
        .await?;
    assert!(node.is_sealed());

    let result = engine
        .store()
        .set_attribute(node.id(), "late", DataValue::Int(1));
    assert!(matches!(result, Err(ProvrunError::Storage(_))));

    let result = engine.store().set_extra(node.id(), "late", DataValue::Int(1));
    assert!(matches!(result, Err(ProvrunError::Storage(_))));
    Ok(())
}

#[tokio::test]
async fn submitted_failure_is_retained_for_async_retrieval() -> TestResult {
    init_tracing();
    let engine = Engine::new();

    let handle = engine.submit(Box::new(ExceptionProcess::new()), BTreeMap::new())?;
    let node = handle.wait().await?;

    assert!(node.is_excepted());
    assert_eq!(node.exception(), Some("CRASH"));
    assert_single_terminal_flag(&node);
    assert_eq!(engine.live_instances(), 0);
    Ok(())
}
