// src/graph/node.rs

//! Persisted process-node record and its state queries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::DataValue;
use crate::graph::Link;
use crate::types::ProcessState;

/// Extras key under which the content fingerprint is recorded.
pub const EXTRA_CONTENT_HASH: &str = "content_hash";

/// Extras key recording the uuid of the node a cache hit was cloned from.
pub const EXTRA_CACHED_FROM: &str = "cached_from";

/// Attribute key under which a handler exception is recorded.
pub const ATTR_EXCEPTION: &str = "exception";

/// Snapshot of a process node as persisted in the graph store.
///
/// Once the node reaches a terminal state it is sealed: attributes, extras
/// and links never change afterwards. A snapshot taken after sealing is
/// therefore the final provenance record of the execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessNode {
    pub(crate) id: Uuid,
    pub(crate) process_label: String,
    pub(crate) state: ProcessState,
    pub(crate) exit_status: Option<u32>,
    pub(crate) exit_message: Option<String>,
    pub(crate) label: String,
    pub(crate) description: String,
    pub(crate) attributes: BTreeMap<String, DataValue>,
    pub(crate) extras: BTreeMap<String, DataValue>,
    pub(crate) incoming: Vec<Link>,
    pub(crate) outgoing: Vec<Link>,
    pub(crate) sealed: bool,
}

impl ProcessNode {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn process_label(&self) -> &str {
        &self.process_label
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn is_terminated(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn is_finished(&self) -> bool {
        self.state == ProcessState::Finished
    }

    /// Finished with the implicit success status.
    pub fn is_finished_ok(&self) -> bool {
        self.is_finished() && self.exit_status == Some(0)
    }

    /// Finished, but with a named nonzero exit code.
    pub fn is_failed(&self) -> bool {
        self.is_finished() && self.exit_status.is_some_and(|s| s != 0)
    }

    pub fn is_excepted(&self) -> bool {
        self.state == ProcessState::Excepted
    }

    pub fn is_killed(&self) -> bool {
        self.state == ProcessState::Killed
    }

    pub fn exit_status(&self) -> Option<u32> {
        self.exit_status
    }

    pub fn exit_message(&self) -> Option<&str> {
        self.exit_message.as_deref()
    }

    /// The recorded handler exception, if this node excepted.
    pub fn exception(&self) -> Option<&str> {
        self.attributes.get(ATTR_EXCEPTION).and_then(|v| v.as_str())
    }

    pub fn attribute(&self, key: &str) -> Option<&DataValue> {
        self.attributes.get(key)
    }

    pub fn extra(&self, key: &str) -> Option<&DataValue> {
        self.extras.get(key)
    }

    /// Content fingerprint recorded on completion, if any.
    pub fn content_hash(&self) -> Option<&str> {
        self.extras.get(EXTRA_CONTENT_HASH).and_then(|v| v.as_str())
    }

    /// Uuid of the node this one was cloned from on a cache hit, if any.
    pub fn cached_from(&self) -> Option<&str> {
        self.extras.get(EXTRA_CACHED_FROM).and_then(|v| v.as_str())
    }

    pub fn incoming(&self) -> &[Link] {
        &self.incoming
    }

    pub fn outgoing(&self) -> &[Link] {
        &self.outgoing
    }
}
