// src/process/checkpoint.rs

//! Durable save/restore of suspended process instances.
//!
//! A checkpoint captures everything needed to reconstruct a suspended
//! instance: the serialized handler state, the pending continuation
//! identifier, the identities of the bound inputs and the labels of outputs
//! already attached. Resumption reads only the checkpoint and the graph
//! store; nothing relies on in-process state surviving the gap.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{ProvrunError, Result};

/// Relative path (from a working root) to the default checkpoint directory.
pub const CHECKPOINT_DIR: &str = ".provrun/checkpoints";

/// Serialized snapshot of a suspended process instance, keyed by the owning
/// node's identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub node_id: Uuid,
    pub process_label: String,
    /// Identifier of the pending continuation to invoke on resumption.
    pub continuation: String,
    /// Handler-internal state as produced by `Process::save_state`.
    pub state: serde_json::Value,
    /// Bound inputs by port name; values are re-fetched from the graph
    /// store on resumption.
    pub inputs: BTreeMap<String, Uuid>,
    /// Output labels already attached before suspension.
    pub attached_outputs: Vec<String>,
}

/// Durable store for checkpoints.
///
/// `save` must only return once the checkpoint is committed: a crash between
/// suspension and resumption never loses state.
pub trait CheckpointStore: Send + Sync {
    fn save(&self, checkpoint: &Checkpoint) -> Result<()>;
    fn load(&self, node_id: Uuid) -> Result<Option<Checkpoint>>;
    fn remove(&self, node_id: Uuid) -> Result<()>;
}

/// Stores checkpoints in memory only.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    map: Mutex<HashMap<Uuid, Checkpoint>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        let mut map = self
            .map
            .lock()
            .map_err(|_| ProvrunError::Storage("checkpoint store lock poisoned".to_string()))?;
        map.insert(checkpoint.node_id, checkpoint.clone());
        info!(node = %checkpoint.node_id, continuation = %checkpoint.continuation,
            "stored checkpoint (memory)");
        Ok(())
    }

    fn load(&self, node_id: Uuid) -> Result<Option<Checkpoint>> {
        let map = self
            .map
            .lock()
            .map_err(|_| ProvrunError::Storage("checkpoint store lock poisoned".to_string()))?;
        Ok(map.get(&node_id).cloned())
    }

    fn remove(&self, node_id: Uuid) -> Result<()> {
        let mut map = self
            .map
            .lock()
            .map_err(|_| ProvrunError::Storage("checkpoint store lock poisoned".to_string()))?;
        if map.remove(&node_id).is_some() {
            debug!(node = %node_id, "removed checkpoint (memory)");
        }
        Ok(())
    }
}

/// Stores one JSON file per checkpoint under a directory.
///
/// Writes go to a temporary file which is fsynced and then atomically
/// renamed into place, so a checkpoint is either fully committed or absent.
pub struct FileCheckpointStore {
    dir: PathBuf,
}

impl FileCheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at `<root>/.provrun/checkpoints`.
    pub fn in_root(root: &Path) -> Self {
        Self {
            dir: root.join(CHECKPOINT_DIR),
        }
    }

    fn path_for(&self, node_id: Uuid) -> PathBuf {
        self.dir.join(format!("{node_id}.json"))
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn save(&self, checkpoint: &Checkpoint) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating checkpoint directory at {:?}", self.dir))?;

        let path = self.path_for(checkpoint.node_id);
        let tmp = path.with_extension("json.tmp");

        let file = File::create(&tmp)
            .with_context(|| format!("creating checkpoint file at {tmp:?}"))?;
        serde_json::to_writer_pretty(&file, checkpoint)?;
        file.sync_all()
            .with_context(|| format!("syncing checkpoint file at {tmp:?}"))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("committing checkpoint file to {path:?}"))?;

        info!(node = %checkpoint.node_id, path = ?path, "stored checkpoint (file)");
        Ok(())
    }

    fn load(&self, node_id: Uuid) -> Result<Option<Checkpoint>> {
        let path = self.path_for(node_id);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("reading checkpoint file at {path:?}"))?;
        let checkpoint: Checkpoint = serde_json::from_str(&contents)?;
        Ok(Some(checkpoint))
    }

    fn remove(&self, node_id: Uuid) -> Result<()> {
        let path = self.path_for(node_id);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("removing checkpoint file at {path:?}"))?;
            debug!(node = %node_id, "removed checkpoint (file)");
        }
        Ok(())
    }
}
