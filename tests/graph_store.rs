// tests/graph_store.rs

//! Invariants enforced at the storage boundary.

mod common;
use crate::common::init_tracing;

use std::error::Error;

use provrun::data::DataValue;
use provrun::errors::ProvrunError;
use provrun::graph::{FileRepository, GraphStore, MemoryGraphStore, MemoryRepository};
use provrun::types::{LinkType, ProcessState};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn duplicate_identity_rejected_at_creation() -> TestResult {
    init_tracing();
    let store = MemoryGraphStore::new();

    let node = store.create_data(DataValue::Int(1))?;
    let result = store.insert_data(node);

    match result {
        Err(ProvrunError::Storage(message)) => {
            assert!(message.contains("duplicate"), "got: {message}");
        }
        other => panic!("expected a storage error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn input_labels_unique_per_target() -> TestResult {
    init_tracing();
    let store = MemoryGraphStore::new();

    let process = store.create_process("p")?;
    let a = store.create_data(DataValue::Int(1))?;
    let b = store.create_data(DataValue::Int(2))?;

    store.add_incoming(process, a.id(), LinkType::InputCalc, "x")?;
    let result = store.add_incoming(process, b.id(), LinkType::InputCalc, "x");
    assert!(matches!(result, Err(ProvrunError::Storage(_))));
    Ok(())
}

#[test]
fn a_data_node_has_at_most_one_creator() -> TestResult {
    init_tracing();
    let store = MemoryGraphStore::new();

    let p1 = store.create_process("p1")?;
    let p2 = store.create_process("p2")?;
    let data = store.create_data(DataValue::Int(1))?;

    store.add_incoming(data.id(), p1, LinkType::Create, "result")?;
    let result = store.add_incoming(data.id(), p2, LinkType::Create, "result");
    assert!(matches!(result, Err(ProvrunError::Storage(_))));

    // Forwarding the same node with a return link is fine.
    store.add_incoming(data.id(), p2, LinkType::Return, "result")?;
    Ok(())
}

#[test]
fn links_must_stay_acyclic() -> TestResult {
    init_tracing();
    let store = MemoryGraphStore::new();

    let process = store.create_process("p")?;
    let input = store.create_data(DataValue::Int(1))?;
    let output = store.create_data(DataValue::Int(2))?;

    store.add_incoming(process, input.id(), LinkType::InputCalc, "in")?;
    store.add_incoming(output.id(), process, LinkType::Create, "out")?;

    // output -> process would close a cycle.
    let result = store.add_incoming(process, output.id(), LinkType::InputCalc, "loop");
    match result {
        Err(ProvrunError::Storage(message)) => {
            assert!(message.contains("cycle"), "got: {message}");
        }
        other => panic!("expected a storage error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn sealing_is_a_one_way_idempotent_cas() -> TestResult {
    init_tracing();
    let store = MemoryGraphStore::new();

    let process = store.create_process("p")?;

    // Sealing a non-terminal node is refused.
    assert!(store.seal(process).is_err());

    store.set_state(process, ProcessState::Running)?;
    store.set_state(process, ProcessState::Finished)?;
    store.set_exit(process, 0, "")?;

    assert!(store.seal(process)?);
    // Idempotent: the second attempt is a no-op, not an error.
    assert!(!store.seal(process)?);

    // Sealed nodes reject every mutation.
    assert!(store.set_attribute(process, "k", DataValue::Int(1)).is_err());
    assert!(store.set_extra(process, "k", DataValue::Int(1)).is_err());
    assert!(store.set_state(process, ProcessState::Running).is_err());
    assert!(store.set_metadata(process, Some("late"), None).is_err());

    let data = store.create_data(DataValue::Int(1))?;
    assert!(store
        .add_incoming(data.id(), process, LinkType::Create, "late")
        .is_err());
    Ok(())
}

#[test]
fn outputs_of_collects_create_and_return_links() -> TestResult {
    init_tracing();
    let store = MemoryGraphStore::new();

    let process = store.create_process("p")?;
    let input = store.create_data(DataValue::Int(1))?;
    let created = store.create_data(DataValue::Int(2))?;
    let forwarded = store.create_data(DataValue::Int(3))?;

    store.add_incoming(process, input.id(), LinkType::InputCalc, "in")?;
    store.add_incoming(created.id(), process, LinkType::Create, "fresh")?;
    store.add_incoming(forwarded.id(), process, LinkType::Return, "forwarded")?;

    let outputs = store.outputs_of(process)?;
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs["fresh"].as_int(), Some(2));
    assert_eq!(outputs["forwarded"].as_int(), Some(3));
    Ok(())
}

#[test]
fn repository_round_trips_file_content() -> TestResult {
    init_tracing();
    let store = MemoryGraphStore::new();
    let repository = MemoryRepository::new();

    let node = store.create_data(DataValue::Str("geometry".to_string()))?;
    repository.add_path(node.id(), "structure.xyz", b"3\n\nH 0 0 0")?;
    repository.add_path(node.id(), "notes.txt", b"relaxed")?;

    assert_eq!(repository.open(node.id(), "structure.xyz")?, b"3\n\nH 0 0 0");
    assert_eq!(
        repository.list(node.id())?,
        vec!["notes.txt".to_string(), "structure.xyz".to_string()]
    );

    let missing = repository.open(node.id(), "absent.txt");
    assert!(missing.is_err());
    Ok(())
}
