// src/graph/store.rs

//! Storage boundary for the provenance graph.
//!
//! [`GraphStore`] is the minimum contract the engine requires from its
//! storage collaborator: an ordered, durable, link-capable key-value store,
//! agnostic to backend technology. [`MemoryGraphStore`] is the in-process
//! reference implementation; a database-backed store can be swapped in
//! behind the same trait.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use petgraph::algo::has_path_connecting;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;
use uuid::Uuid;

use crate::data::{DataNode, DataValue};
use crate::errors::{ProvrunError, Result};
use crate::graph::node::ProcessNode;
use crate::graph::Link;
use crate::types::{LinkType, ProcessState};

/// Minimum storage contract required by the execution engine.
///
/// Implementations must guarantee:
/// - node identities are globally unique, enforced at creation time;
/// - links are append-only; the data-provenance subgraph (every link type
///   except `Return`) is acyclic at node granularity; input labels are
///   unique per (target, label) and output labels per (source, label);
/// - sealing is a one-way, idempotent compare-and-set, after which the
///   node's attributes, extras and links never change.
pub trait GraphStore: Send + Sync {
    /// Create a new process node in the `Created` state.
    fn create_process(&self, process_label: &str) -> Result<Uuid>;

    /// Create a new data node wrapping `value`, minting a fresh identity.
    fn create_data(&self, value: DataValue) -> Result<DataNode>;

    /// Insert a data node with an explicit identity.
    ///
    /// Fails if the identity already exists; duplicates are rejected here
    /// rather than repaired after the fact.
    fn insert_data(&self, node: DataNode) -> Result<()>;

    fn get_data(&self, id: Uuid) -> Result<DataNode>;

    fn set_attribute(&self, id: Uuid, key: &str, value: DataValue) -> Result<()>;

    fn set_extra(&self, id: Uuid, key: &str, value: DataValue) -> Result<()>;

    /// Set the user-facing label / description metadata of a process node.
    fn set_metadata(&self, id: Uuid, label: Option<&str>, description: Option<&str>)
    -> Result<()>;

    fn set_state(&self, id: Uuid, state: ProcessState) -> Result<()>;

    fn set_exit(&self, id: Uuid, status: u32, message: &str) -> Result<()>;

    /// Record a link `source -> target` with the given type and label.
    fn add_incoming(&self, target: Uuid, source: Uuid, link_type: LinkType, label: &str)
    -> Result<()>;

    /// Seal a node. Idempotent: returns `true` if this call performed the
    /// seal, `false` if the node was already sealed.
    fn seal(&self, id: Uuid) -> Result<bool>;

    /// Materialise a full snapshot of a process node, links included.
    fn process_node(&self, id: Uuid) -> Result<ProcessNode>;

    /// The output data nodes of a process, keyed by link label.
    fn outputs_of(&self, id: Uuid) -> Result<BTreeMap<String, DataNode>>;

    /// Search sealed, finished-ok process nodes for a matching fingerprint.
    fn find_cached(&self, fingerprint: &str) -> Result<Option<ProcessNode>>;
}

#[derive(Default)]
struct Inner {
    processes: HashMap<Uuid, ProcessNode>,
    data: HashMap<Uuid, DataNode>,
    links: Vec<Link>,
    /// Edge direction: source -> target. Used for the acyclicity check.
    graph: DiGraphMap<Uuid, ()>,
}

/// In-memory reference implementation of [`GraphStore`].
#[derive(Default)]
pub struct MemoryGraphStore {
    inner: Mutex<Inner>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_poisoned() -> ProvrunError {
    ProvrunError::Storage("graph store lock poisoned".to_string())
}

impl Inner {
    fn process_mut(&mut self, id: Uuid) -> Result<&mut ProcessNode> {
        self.processes
            .get_mut(&id)
            .ok_or(ProvrunError::UnknownNode(id))
    }

    fn unsealed_process_mut(&mut self, id: Uuid) -> Result<&mut ProcessNode> {
        let record = self.process_mut(id)?;
        if record.sealed {
            return Err(ProvrunError::Storage(format!(
                "node {id} is sealed and can no longer be modified"
            )));
        }
        Ok(record)
    }

    fn snapshot(&self, id: Uuid) -> Result<ProcessNode> {
        let record = self.processes.get(&id).ok_or(ProvrunError::UnknownNode(id))?;
        let mut node = record.clone();
        node.incoming = self
            .links
            .iter()
            .filter(|l| l.target == id)
            .cloned()
            .collect();
        node.outgoing = self
            .links
            .iter()
            .filter(|l| l.source == id)
            .cloned()
            .collect();
        Ok(node)
    }

    fn contains(&self, id: Uuid) -> bool {
        self.processes.contains_key(&id) || self.data.contains_key(&id)
    }

    fn is_sealed_process(&self, id: Uuid) -> bool {
        self.processes.get(&id).map(|p| p.sealed).unwrap_or(false)
    }
}

impl GraphStore for MemoryGraphStore {
    fn create_process(&self, process_label: &str) -> Result<Uuid> {
        let mut inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        let id = Uuid::new_v4();
        // v4 collisions are practically impossible, but uniqueness is this
        // boundary's contract, so check anyway.
        if inner.contains(id) {
            return Err(ProvrunError::Storage(format!("duplicate node identity {id}")));
        }
        inner.processes.insert(
            id,
            ProcessNode {
                id,
                process_label: process_label.to_string(),
                state: ProcessState::Created,
                exit_status: None,
                exit_message: None,
                label: String::new(),
                description: String::new(),
                attributes: BTreeMap::new(),
                extras: BTreeMap::new(),
                incoming: Vec::new(),
                outgoing: Vec::new(),
                sealed: false,
            },
        );
        inner.graph.add_node(id);
        debug!(%id, process_label, "created process node");
        Ok(id)
    }

    fn create_data(&self, value: DataValue) -> Result<DataNode> {
        let mut inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        let id = Uuid::new_v4();
        if inner.contains(id) {
            return Err(ProvrunError::Storage(format!("duplicate node identity {id}")));
        }
        let node = DataNode::new(id, value);
        inner.data.insert(id, node.clone());
        inner.graph.add_node(id);
        Ok(node)
    }

    fn insert_data(&self, node: DataNode) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        let id = node.id();
        if inner.contains(id) {
            return Err(ProvrunError::Storage(format!("duplicate node identity {id}")));
        }
        inner.data.insert(id, node);
        inner.graph.add_node(id);
        Ok(())
    }

    fn get_data(&self, id: Uuid) -> Result<DataNode> {
        let inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        inner
            .data
            .get(&id)
            .cloned()
            .ok_or(ProvrunError::UnknownNode(id))
    }

    fn set_attribute(&self, id: Uuid, key: &str, value: DataValue) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        let record = inner.unsealed_process_mut(id)?;
        record.attributes.insert(key.to_string(), value);
        Ok(())
    }

    fn set_extra(&self, id: Uuid, key: &str, value: DataValue) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        let record = inner.unsealed_process_mut(id)?;
        record.extras.insert(key.to_string(), value);
        Ok(())
    }

    fn set_metadata(
        &self,
        id: Uuid,
        label: Option<&str>,
        description: Option<&str>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        let record = inner.unsealed_process_mut(id)?;
        if let Some(label) = label {
            record.label = label.to_string();
        }
        if let Some(description) = description {
            record.description = description.to_string();
        }
        Ok(())
    }

    fn set_state(&self, id: Uuid, state: ProcessState) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        let record = inner.unsealed_process_mut(id)?;
        debug!(%id, from = %record.state, to = %state, "process state transition");
        record.state = state;
        Ok(())
    }

    fn set_exit(&self, id: Uuid, status: u32, message: &str) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        let record = inner.unsealed_process_mut(id)?;
        record.exit_status = Some(status);
        record.exit_message = Some(message.to_string());
        Ok(())
    }

    fn add_incoming(
        &self,
        target: Uuid,
        source: Uuid,
        link_type: LinkType,
        label: &str,
    ) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| lock_poisoned())?;

        if !inner.contains(target) {
            return Err(ProvrunError::UnknownNode(target));
        }
        if !inner.contains(source) {
            return Err(ProvrunError::UnknownNode(source));
        }
        if inner.is_sealed_process(target) || inner.is_sealed_process(source) {
            return Err(ProvrunError::Storage(format!(
                "cannot link {source} -> {target}: sealed node"
            )));
        }
        // Label uniqueness is scoped per link family: inputs are unique per
        // (target, label), outputs per (source, label), and a data node has
        // at most one creator.
        match link_type {
            LinkType::InputCalc | LinkType::InputWork => {
                if inner.links.iter().any(|l| {
                    l.target == target
                        && l.label == label
                        && matches!(l.link_type, LinkType::InputCalc | LinkType::InputWork)
                }) {
                    return Err(ProvrunError::Storage(format!(
                        "input label '{label}' already used on node {target}"
                    )));
                }
            }
            LinkType::Create | LinkType::Return => {
                if inner.links.iter().any(|l| {
                    l.source == source
                        && l.label == label
                        && matches!(l.link_type, LinkType::Create | LinkType::Return)
                }) {
                    return Err(ProvrunError::Storage(format!(
                        "output label '{label}' already used on node {source}"
                    )));
                }
                if link_type == LinkType::Create
                    && inner
                        .links
                        .iter()
                        .any(|l| l.target == target && l.link_type == LinkType::Create)
                {
                    return Err(ProvrunError::Storage(format!(
                        "node {target} already has a creator"
                    )));
                }
            }
        }
        // The data-provenance subgraph (everything except `Return`) must
        // stay acyclic. `Return` only forwards an existing node and may
        // legitimately point back at a process input.
        if link_type != LinkType::Return {
            // Adding source -> target creates a cycle iff target already
            // reaches source.
            if has_path_connecting(&inner.graph, target, source, None) {
                return Err(ProvrunError::Storage(format!(
                    "link {source} -> {target} would create a cycle"
                )));
            }
            inner.graph.add_edge(source, target, ());
        }
        inner.links.push(Link {
            source,
            target,
            link_type,
            label: label.to_string(),
        });
        debug!(%source, %target, %link_type, label, "recorded link");
        Ok(())
    }

    fn seal(&self, id: Uuid) -> Result<bool> {
        let mut inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        let record = inner.process_mut(id)?;
        if record.sealed {
            return Ok(false);
        }
        if !record.state.is_terminal() {
            return Err(ProvrunError::Storage(format!(
                "cannot seal node {id} in non-terminal state {}",
                record.state
            )));
        }
        record.sealed = true;
        debug!(%id, state = %record.state, "sealed process node");
        Ok(true)
    }

    fn process_node(&self, id: Uuid) -> Result<ProcessNode> {
        let inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        inner.snapshot(id)
    }

    fn outputs_of(&self, id: Uuid) -> Result<BTreeMap<String, DataNode>> {
        let inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        let mut outputs = BTreeMap::new();
        for link in inner.links.iter().filter(|l| {
            l.source == id && matches!(l.link_type, LinkType::Create | LinkType::Return)
        }) {
            if let Some(data) = inner.data.get(&link.target) {
                outputs.insert(link.label.clone(), data.clone());
            }
        }
        Ok(outputs)
    }

    fn find_cached(&self, fingerprint: &str) -> Result<Option<ProcessNode>> {
        let inner = self.inner.lock().map_err(|_| lock_poisoned())?;
        let hit = inner
            .processes
            .values()
            .find(|p| p.sealed && p.is_finished_ok() && p.content_hash() == Some(fingerprint))
            .map(|p| p.id);
        match hit {
            Some(id) => Ok(Some(inner.snapshot(id)?)),
            None => Ok(None),
        }
    }
}
