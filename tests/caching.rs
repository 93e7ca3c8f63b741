// tests/caching.rs

//! Content-based cache substitution.

mod common;
use crate::common::init_tracing;

use std::error::Error;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use provrun::config::{CachingSection, EngineConfig};
use provrun::data::{DataNode, DataValue};
use provrun::engine::Engine;
use provrun::function::{FunctionResult, FunctionSignature, ProcessFunction};
use provrun::graph::GraphStore;

type TestResult = Result<(), Box<dyn Error>>;

fn int(engine: &Engine, value: i64) -> DataNode {
    engine
        .store()
        .create_data(DataValue::Int(value))
        .expect("create data node")
}

/// A doubling function that counts real handler executions.
fn counting_double(counter: Arc<AtomicUsize>) -> ProcessFunction {
    let signature = FunctionSignature::builder("double")
        .param("value")
        .build()
        .expect("valid signature");
    ProcessFunction::new(signature, move |ctx| {
        counter.fetch_add(1, Ordering::SeqCst);
        let value = ctx.require("value")?.as_int().unwrap_or(0);
        Ok(FunctionResult::value(value * 2))
    })
}

#[test]
fn cache_hit_skips_the_handler() -> TestResult {
    init_tracing();
    let engine = Engine::new();
    let counter = Arc::new(AtomicUsize::new(0));

    let function = counting_double(counter.clone()).cached();

    let (outputs1, node1) = function
        .call(&engine)
        .arg(int(&engine, 21))
        .run_get_node()?;
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(outputs1["result"].as_int(), Some(42));
    assert!(node1.cached_from().is_none());

    let (outputs2, node2) = function
        .call(&engine)
        .arg(int(&engine, 21))
        .run_get_node()?;

    // Handler did not run again; the result was cloned from the first node.
    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert_eq!(outputs2["result"].as_int(), Some(42));
    assert_eq!(node2.cached_from(), Some(node1.id().to_string().as_str()));

    // Observationally indistinguishable from a fresh run.
    assert!(node2.is_finished_ok());
    assert!(node2.is_sealed());
    assert_eq!(node2.exit_status(), Some(0));
    assert_eq!(node2.content_hash(), node1.content_hash());
    assert_ne!(outputs2["result"].id(), outputs1["result"].id());
    Ok(())
}

#[test]
fn different_inputs_miss_the_cache() -> TestResult {
    init_tracing();
    let engine = Engine::new();
    let counter = Arc::new(AtomicUsize::new(0));

    let function = counting_double(counter.clone()).cached();

    function.call(&engine).arg(int(&engine, 1)).run()?;
    function.call(&engine).arg(int(&engine, 2)).run()?;

    assert_eq!(counter.load(Ordering::SeqCst), 2);
    Ok(())
}

#[test]
fn fingerprint_is_informational_without_opt_in() -> TestResult {
    init_tracing();
    let engine = Engine::new();
    let counter = Arc::new(AtomicUsize::new(0));

    // No .cached(): the fingerprint is still recorded, substitution is not.
    let function = counting_double(counter.clone());

    let (_outputs, node1) = function
        .call(&engine)
        .arg(int(&engine, 7))
        .run_get_node()?;
    let (_outputs, node2) = function
        .call(&engine)
        .arg(int(&engine, 7))
        .run_get_node()?;

    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert!(node1.content_hash().is_some());
    assert_eq!(node1.content_hash(), node2.content_hash());
    assert!(node2.cached_from().is_none());
    Ok(())
}

#[test]
fn engine_wide_caching_default_applies() -> TestResult {
    init_tracing();
    let config = EngineConfig {
        caching: CachingSection { enabled: true },
        ..EngineConfig::default()
    };
    let engine = Engine::from_config(config);
    let counter = Arc::new(AtomicUsize::new(0));

    let function = counting_double(counter.clone());

    function.call(&engine).arg(int(&engine, 3)).run()?;
    function.call(&engine).arg(int(&engine, 3)).run()?;

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn different_version_tags_change_the_fingerprint() -> TestResult {
    init_tracing();
    let engine = Engine::new();
    let counter = Arc::new(AtomicUsize::new(0));

    let v0 = counting_double(counter.clone()).cached();
    let v1 = counting_double(counter.clone()).cached().with_version("1");

    let (_o, node_v0) = v0.call(&engine).arg(int(&engine, 4)).run_get_node()?;
    let (_o, node_v1) = v1.call(&engine).arg(int(&engine, 4)).run_get_node()?;

    // A bumped code version is a different computation: no substitution.
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_ne!(node_v0.content_hash(), node_v1.content_hash());
    Ok(())
}
