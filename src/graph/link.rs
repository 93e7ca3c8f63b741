// src/graph/link.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::LinkType;

/// A typed, labelled, directed edge between two nodes.
///
/// Links are append-only: once recorded they are never mutated or removed by
/// the engine. Input labels are unique per target, output labels per source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub source: Uuid,
    pub target: Uuid,
    pub link_type: LinkType,
    pub label: String,
}
