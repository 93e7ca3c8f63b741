// src/lib.rs

//! `provrun` — a provenance-tracked process execution engine.
//!
//! Scientific computations run as "processes": tracked units with an
//! explicit lifecycle
//! (`Created → Running → {Waiting ⇄ Running}* → {Finished, Excepted, Killed}`),
//! a persisted provenance record, content-based caching and
//! checkpoint/restart across suspensions. Every execution outcome is
//! persisted before it is surfaced, so failure is auditable.
//!
//! The main entry points:
//!
//! - [`Engine`] wires the storage collaborators and exposes the launchers
//!   `run`, `run_get_node` and `submit`.
//! - [`ProcessFunction`] turns an ordinary computation into a tracked
//!   process type with a statically registered signature.
//! - The [`process::Process`] trait is implemented by long-form process
//!   types that need suspension and resumption.
//!
//! ```no_run
//! use provrun::data::DataValue;
//! use provrun::engine::Engine;
//! use provrun::function::{FunctionResult, FunctionSignature, ProcessFunction};
//! use provrun::graph::GraphStore;
//!
//! # fn main() -> provrun::errors::Result<()> {
//! let signature = FunctionSignature::builder("add")
//!     .param("a")
//!     .param("b")
//!     .build()?;
//! let add = ProcessFunction::new(signature, |ctx| {
//!     let a = ctx.require("a")?.as_int().unwrap_or(0);
//!     let b = ctx.require("b")?.as_int().unwrap_or(0);
//!     Ok(FunctionResult::value(a + b))
//! });
//!
//! let engine = Engine::new();
//! let store = engine.store().clone();
//! let outputs = add
//!     .call(&engine)
//!     .arg(store.create_data(DataValue::Int(2))?)
//!     .arg(store.create_data(DataValue::Int(3))?)
//!     .run()?;
//! assert_eq!(outputs["result"].as_int(), Some(5));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod data;
pub mod engine;
pub mod errors;
pub mod function;
pub mod graph;
pub mod logging;
pub mod process;
pub mod types;

pub use data::{DataNode, DataValue, ValueKind};
pub use engine::{Engine, Outputs, ProcessHandle};
pub use errors::{ProvrunError, Result, ValidationError};
pub use function::{FunctionResult, FunctionSignature, ProcessFunction};
pub use graph::ProcessNode;
pub use types::{ExitCode, LinkType, ProcessKind, ProcessState};
