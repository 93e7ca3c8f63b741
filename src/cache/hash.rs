// src/cache/hash.rs

use std::collections::BTreeMap;

use blake3::Hasher;
use tracing::debug;

use crate::data::{DataNode, DataValue};
use crate::errors::Result;
use crate::graph::FileRepository;

/// Compute the hash of a bare value from its canonical serialization.
pub fn value_hash(value: &DataValue) -> Result<String> {
    let mut hasher = Hasher::new();
    hasher.update(&value.canonical_bytes()?);
    Ok(hasher.finalize().to_hex().to_string())
}

/// Compute the content hash of a data node: its value plus any attached
/// file content.
///
/// File names are hashed in sorted order so the result is independent of
/// attachment order.
pub fn data_node_hash(node: &DataNode, repository: &dyn FileRepository) -> Result<String> {
    let mut hasher = Hasher::new();
    hasher.update(&node.value().canonical_bytes()?);

    let mut names = repository.list(node.id())?;
    names.sort();
    for name in names {
        let content = repository.open(node.id(), &name)?;
        hasher.update(name.as_bytes());
        hasher.update(&content);
    }

    Ok(hasher.finalize().to_hex().to_string())
}

/// Deterministic fingerprint over (process identity, normalized inputs).
///
/// Digest of the process label, a code-version tag for the handler, and the
/// recursively-serialized content of every bound input in port-name order.
/// Equal fingerprints are treated as proof of interchangeable results.
pub fn process_fingerprint(
    process_label: &str,
    version_tag: &str,
    inputs: &BTreeMap<String, DataNode>,
    repository: &dyn FileRepository,
) -> Result<String> {
    let mut hasher = Hasher::new();
    hasher.update(process_label.as_bytes());
    hasher.update(version_tag.as_bytes());

    // BTreeMap iteration is already sorted by port name, which keeps the
    // fingerprint stable independent of binding order.
    for (name, node) in inputs {
        hasher.update(name.as_bytes());
        hasher.update(data_node_hash(node, repository)?.as_bytes());
    }

    let fingerprint = hasher.finalize().to_hex().to_string();
    debug!(process_label, fingerprint = %fingerprint, "computed process fingerprint");
    Ok(fingerprint)
}
