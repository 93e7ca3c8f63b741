// tests/checkpoint_resume.rs

//! Suspension, checkpointing, resumption and cooperative kill.

mod common;
use crate::common::processes::WaitProcess;
use crate::common::{init_tracing, with_timeout};

use std::collections::BTreeMap;
use std::error::Error;
use std::sync::Arc;

use tempfile::tempdir;
use tokio::time::{sleep, Duration};
use uuid::Uuid;

use provrun::config::EngineConfig;
use provrun::data::{DataNode, DataValue};
use provrun::engine::Engine;
use provrun::graph::{GraphStore, MemoryGraphStore, MemoryRepository};
use provrun::process::{CheckpointStore, FileCheckpointStore};
use provrun::types::ProcessState;

type TestResult = Result<(), Box<dyn Error>>;

async fn wait_for_state(engine: &Engine, node_id: Uuid, state: ProcessState) {
    with_timeout(async {
        loop {
            let node = engine.store().process_node(node_id).expect("node exists");
            if node.state() == state {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
}

fn int(engine: &Engine, value: i64) -> DataNode {
    engine
        .store()
        .create_data(DataValue::Int(value))
        .expect("create data node")
}

#[tokio::test]
async fn checkpoint_is_committed_before_waiting_is_observable() -> TestResult {
    init_tracing();
    let engine = Engine::new();

    let supplied = BTreeMap::from([("value".to_string(), int(&engine, 21))]);
    let handle = engine.submit(Box::new(WaitProcess::new()), supplied)?;
    let node_id = handle.node_id();

    wait_for_state(&engine, node_id, ProcessState::Waiting).await;

    // The waiting state is only set after the checkpoint committed, so a
    // checkpoint must exist by now.
    let checkpoint = engine
        .checkpoints()
        .load(node_id)?
        .expect("checkpoint committed before suspension is observable");
    assert_eq!(checkpoint.node_id, node_id);
    assert_eq!(checkpoint.continuation, "next_step");
    assert_eq!(checkpoint.inputs.len(), 1);

    handle.resume().await?;
    let node = handle.wait().await?;

    assert!(node.is_finished_ok());
    let outputs = engine.store().outputs_of(node_id)?;
    assert_eq!(outputs["result"].as_int(), Some(42));

    // Terminal processes leave no checkpoint and no live instance behind.
    assert!(engine.checkpoints().load(node_id)?.is_none());
    assert_eq!(engine.live_instances(), 0);
    Ok(())
}

#[tokio::test]
async fn kill_is_observed_at_the_suspension_point() -> TestResult {
    init_tracing();
    let engine = Engine::new();

    let handle = engine.submit(Box::new(WaitProcess::new()), BTreeMap::new())?;
    let node_id = handle.node_id();

    wait_for_state(&engine, node_id, ProcessState::Waiting).await;
    handle.kill().await?;
    let node = handle.wait().await?;

    assert!(node.is_killed());
    assert!(node.is_sealed());
    assert!(!node.is_finished());
    assert!(!node.is_excepted());
    assert_eq!(engine.live_instances(), 0);
    Ok(())
}

#[tokio::test]
async fn suspended_process_survives_an_engine_restart() -> TestResult {
    init_tracing();
    let dir = tempdir()?;

    // The graph store stands in for the durable storage backend, so both
    // engine incarnations share it; the checkpoint store is file-backed.
    let store = Arc::new(MemoryGraphStore::new());
    let repository = Arc::new(MemoryRepository::new());

    let engine = Engine::with_collaborators(
        store.clone(),
        repository.clone(),
        Arc::new(FileCheckpointStore::new(dir.path())),
        EngineConfig::default(),
    );

    let supplied = BTreeMap::from([("value".to_string(), int(&engine, 5))]);
    let handle = engine.submit(Box::new(WaitProcess::new()), supplied)?;
    let node_id = handle.node_id();
    wait_for_state(&engine, node_id, ProcessState::Waiting).await;

    // The checkpoint is a real file on disk.
    let path = dir.path().join(format!("{node_id}.json"));
    assert!(path.exists(), "expected checkpoint file at {path:?}");

    // "Crash": the first engine is abandoned, a fresh one reads only the
    // checkpoint and the store.
    drop(handle);
    drop(engine);

    let engine = Engine::with_collaborators(
        store,
        repository,
        Arc::new(FileCheckpointStore::new(dir.path())),
        EngineConfig::default(),
    );
    engine.register_restorer("wait_process", WaitProcess::restore);

    let handle = engine.restore(node_id)?;
    handle.resume().await?;
    let node = handle.wait().await?;

    assert!(node.is_finished_ok());
    let outputs = engine.store().outputs_of(node_id)?;
    assert_eq!(outputs["result"].as_int(), Some(10));
    assert_eq!(engine.live_instances(), 0);
    Ok(())
}

#[tokio::test]
async fn restore_without_checkpoint_fails() {
    init_tracing();
    let engine = Engine::new();

    let result = engine.restore(Uuid::new_v4());
    assert!(result.is_err());
}
