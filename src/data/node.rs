// src/data/node.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::DataValue;

/// Immutable value wrapper with a globally unique identity.
///
/// A `DataNode` is created through the graph store, which enforces identity
/// uniqueness at the storage boundary. The wrapped value never changes after
/// creation; file content may additionally be attached through the
/// repository collaborator, keyed by this node's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataNode {
    id: Uuid,
    value: DataValue,
}

impl DataNode {
    /// Construct a node snapshot. Only the graph store should mint new ids;
    /// everything else obtains nodes from it.
    pub(crate) fn new(id: Uuid, value: DataValue) -> Self {
        Self { id, value }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn value(&self) -> &DataValue {
        &self.value
    }

    pub fn as_int(&self) -> Option<i64> {
        self.value.as_int()
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value.as_bool()
    }

    pub fn as_float(&self) -> Option<f64> {
        self.value.as_float()
    }
}
