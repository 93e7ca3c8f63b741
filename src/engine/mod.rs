// src/engine/mod.rs

//! Execution engine: storage wiring, live-instance registry and launchers.
//!
//! The [`Engine`] owns the collaborators every process needs — graph store,
//! file repository, checkpoint store, fingerprint claims and the restorer
//! registry — and exposes the launcher entry points (`run`,
//! `run_get_node`, `submit`) implemented in [`launch`].
//!
//! The lifecycle semantics live in the synchronous, IO-free-apart-from-the-
//! storage-traits [`ProcessInstance`](crate::process::ProcessInstance); this
//! module is the async shell around it: channels, spawned drivers and
//! message delivery.

pub mod launch;

pub use launch::ProcessHandle;

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crate::cache::FingerprintClaims;
use crate::config::EngineConfig;
use crate::data::DataNode;
use crate::errors::{ProvrunError, Result};
use crate::graph::{FileRepository, GraphStore, MemoryGraphStore, MemoryRepository};
use crate::process::checkpoint::{
    CheckpointStore, FileCheckpointStore, MemoryCheckpointStore, CHECKPOINT_DIR,
};
use crate::process::traits::Process;
use crate::types::CheckpointStorageMode;

/// Outputs of a terminated process, keyed by output port label.
pub type Outputs = BTreeMap<String, DataNode>;

/// Cooperative messages delivered to a live process instance.
///
/// Both are observed only at the process's own suspension points; a handler
/// mid-step is never interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessMessage {
    /// Invoke the stored continuation of a waiting process.
    Resume,
    /// Advisory kill request.
    Kill,
}

/// Factory reconstructing a process object from its checkpointed state.
pub type Restorer = Box<dyn Fn(serde_json::Value) -> anyhow::Result<Box<dyn Process>> + Send + Sync>;

/// The process execution engine.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn GraphStore>,
    repository: Arc<dyn FileRepository>,
    checkpoints: Arc<dyn CheckpointStore>,
    claims: FingerprintClaims,
    config: Arc<EngineConfig>,
    restorers: Arc<RwLock<HashMap<String, Restorer>>>,
    live: Arc<Mutex<HashMap<Uuid, mpsc::Sender<ProcessMessage>>>>,
}

impl Engine {
    /// All-in-memory engine with default configuration.
    pub fn new() -> Self {
        Self::with_collaborators(
            Arc::new(MemoryGraphStore::new()),
            Arc::new(MemoryRepository::new()),
            Arc::new(MemoryCheckpointStore::new()),
            EngineConfig::default(),
        )
    }

    /// Engine wired according to a validated configuration.
    pub fn from_config(config: EngineConfig) -> Self {
        let checkpoints: Arc<dyn CheckpointStore> = match config.checkpoint.storage {
            CheckpointStorageMode::Memory => Arc::new(MemoryCheckpointStore::new()),
            CheckpointStorageMode::File => {
                let dir = config
                    .checkpoint
                    .dir
                    .clone()
                    .unwrap_or_else(|| CHECKPOINT_DIR.into());
                Arc::new(FileCheckpointStore::new(dir))
            }
        };
        Self::with_collaborators(
            Arc::new(MemoryGraphStore::new()),
            Arc::new(MemoryRepository::new()),
            checkpoints,
            config,
        )
    }

    /// Engine over explicit collaborator implementations.
    pub fn with_collaborators(
        store: Arc<dyn GraphStore>,
        repository: Arc<dyn FileRepository>,
        checkpoints: Arc<dyn CheckpointStore>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            repository,
            checkpoints,
            claims: FingerprintClaims::new(),
            config: Arc::new(config),
            restorers: Arc::new(RwLock::new(HashMap::new())),
            live: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    pub fn repository(&self) -> &Arc<dyn FileRepository> {
        &self.repository
    }

    pub fn checkpoints(&self) -> &Arc<dyn CheckpointStore> {
        &self.checkpoints
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn claims(&self) -> &FingerprintClaims {
        &self.claims
    }

    /// Whether cache substitution applies to this process: the engine-wide
    /// default, or the process type's own opt-in.
    pub fn cache_enabled_for(&self, process: &dyn Process) -> bool {
        self.config.caching.enabled || process.cache_enabled()
    }

    /// Register a restorer used to reconstruct checkpointed processes of
    /// the given label.
    pub fn register_restorer(
        &self,
        process_label: impl Into<String>,
        restorer: impl Fn(serde_json::Value) -> anyhow::Result<Box<dyn Process>>
        + Send
        + Sync
        + 'static,
    ) {
        let mut restorers = self.restorers.write().unwrap_or_else(|e| e.into_inner());
        restorers.insert(process_label.into(), Box::new(restorer));
    }

    /// Number of live (not yet terminated) process instances.
    pub fn live_instances(&self) -> usize {
        self.live.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Deliver a resumption event to a waiting process.
    pub async fn resume(&self, node_id: Uuid) -> Result<()> {
        self.send_message(node_id, ProcessMessage::Resume).await
    }

    /// Deliver an advisory kill request to a live process.
    pub async fn kill(&self, node_id: Uuid) -> Result<()> {
        self.send_message(node_id, ProcessMessage::Kill).await
    }

    async fn send_message(&self, node_id: Uuid, message: ProcessMessage) -> Result<()> {
        let sender = {
            let live = self.live.lock().unwrap_or_else(|e| e.into_inner());
            live.get(&node_id).cloned()
        };
        let sender = sender.ok_or_else(|| {
            ProvrunError::Usage(format!("process {node_id} is not live"))
        })?;
        sender
            .send(message)
            .await
            .map_err(|_| ProvrunError::Usage(format!("process {node_id} is no longer live")))
    }

    pub(crate) fn register(&self, node_id: Uuid, sender: mpsc::Sender<ProcessMessage>) {
        let mut live = self.live.lock().unwrap_or_else(|e| e.into_inner());
        live.insert(node_id, sender);
        debug!(node = %node_id, "registered live process");
    }

    pub(crate) fn deregister(&self, node_id: Uuid) {
        let mut live = self.live.lock().unwrap_or_else(|e| e.into_inner());
        live.remove(&node_id);
        debug!(node = %node_id, "deregistered live process");
    }

    pub(crate) fn restore_process(
        &self,
        process_label: &str,
        state: serde_json::Value,
    ) -> Result<Box<dyn Process>> {
        let restorers = self.restorers.read().unwrap_or_else(|e| e.into_inner());
        let restorer = restorers.get(process_label).ok_or_else(|| {
            ProvrunError::Configuration(format!(
                "no restorer registered for process type '{process_label}'"
            ))
        })?;
        restorer(state).map_err(ProvrunError::Other)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
