// src/process/context.rs

//! Execution context threaded explicitly through handler invocations.
//!
//! There is no process-wide "currently executing process" singleton: nested
//! invocations receive the context (and through it the engine) as an
//! explicit argument.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;
use uuid::Uuid;

use crate::data::{DataNode, DataValue};
use crate::engine::Engine;
use crate::errors::{ProvrunError, Result};
use crate::graph::GraphStore;
use crate::process::spec::ProcessSpec;
use crate::types::LinkType;

/// A value a handler attaches as an output.
#[derive(Debug, Clone)]
pub enum OutputValue {
    /// Fresh content: the engine creates a new data node and records a
    /// `Create` link.
    New(DataValue),
    /// An already existing node forwarded as this process's output; recorded
    /// with a `Return` link.
    Existing(DataNode),
}

impl From<DataValue> for OutputValue {
    fn from(value: DataValue) -> Self {
        OutputValue::New(value)
    }
}

impl From<DataNode> for OutputValue {
    fn from(node: DataNode) -> Self {
        OutputValue::Existing(node)
    }
}

/// Handler-facing view of a running process.
///
/// Only exists while the process is in the `Running` state, which is what
/// makes the output contract ("outputs may be attached only while running")
/// hold by construction.
pub struct ProcessContext<'a> {
    engine: &'a Engine,
    node_id: Uuid,
    inputs: &'a BTreeMap<String, DataNode>,
    spec: &'a ProcessSpec,
    attached: &'a mut BTreeSet<String>,
}

impl<'a> ProcessContext<'a> {
    pub(crate) fn new(
        engine: &'a Engine,
        node_id: Uuid,
        inputs: &'a BTreeMap<String, DataNode>,
        spec: &'a ProcessSpec,
        attached: &'a mut BTreeSet<String>,
    ) -> Self {
        Self {
            engine,
            node_id,
            inputs,
            spec,
            attached,
        }
    }

    /// The engine this process runs in; used for nested invocations.
    pub fn engine(&self) -> &Engine {
        self.engine
    }

    /// Identity of the node backing this process.
    pub fn node_id(&self) -> Uuid {
        self.node_id
    }

    pub fn inputs(&self) -> &BTreeMap<String, DataNode> {
        self.inputs
    }

    pub fn input(&self, name: &str) -> Option<&DataNode> {
        self.inputs.get(name)
    }

    /// Fetch a bound input, failing with a usage error when absent.
    pub fn require(&self, name: &str) -> Result<&DataNode> {
        self.inputs
            .get(name)
            .ok_or_else(|| ProvrunError::Usage(format!("no input bound to port '{name}'")))
    }

    /// Attach an output under `label`.
    ///
    /// Each label may be set at most once; undeclared labels are rejected
    /// unless the output namespace is dynamic.
    pub fn out(&mut self, label: &str, value: impl Into<OutputValue>) -> Result<DataNode> {
        if self.attached.contains(label) {
            return Err(ProvrunError::Usage(format!(
                "output '{label}' has already been attached"
            )));
        }

        let port = self.spec.outputs().get(label);
        if port.is_none() && !self.spec.outputs().is_dynamic() {
            return Err(ProvrunError::Usage(format!(
                "'{label}' is not a declared output port and outputs are not dynamic"
            )));
        }

        let store = self.engine.store();
        let (node, link_type) = match value.into() {
            OutputValue::New(value) => {
                if let Some(expected) = port.and_then(|p| p.valid_kind()) {
                    let actual = value.kind();
                    if actual != expected {
                        return Err(ProvrunError::Usage(format!(
                            "output '{label}' expects {expected} but got {actual}"
                        )));
                    }
                }
                (store.create_data(value)?, LinkType::Create)
            }
            OutputValue::Existing(node) => (node, LinkType::Return),
        };

        store.add_incoming(node.id(), self.node_id, link_type, label)?;
        self.attached.insert(label.to_string());
        debug!(node = %self.node_id, label, link = %link_type, "attached output");
        Ok(node)
    }
}
