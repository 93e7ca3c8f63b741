// src/graph/mod.rs

//! Provenance graph: nodes, links and the storage boundary.
//!
//! - [`link`] defines the typed, labelled edges between nodes.
//! - [`node`] is the persisted process-node record with its state queries.
//! - [`store`] is the minimum storage contract the engine requires, plus an
//!   in-memory reference implementation that enforces the graph invariants
//!   (unique identity, acyclic append-only links, one-way sealing).
//! - [`repository`] attaches file content to data nodes by relative name.

pub mod link;
pub mod node;
pub mod repository;
pub mod store;

pub use link::Link;
pub use node::ProcessNode;
pub use repository::{FileRepository, MemoryRepository};
pub use store::{GraphStore, MemoryGraphStore};
