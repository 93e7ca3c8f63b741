// src/engine/launch.rs

//! Launchers: `run`, `run_get_node`, `submit` and the driver loop.
//!
//! The driver consumes [`ProcessMessage`]s between state-machine steps and
//! delegates every semantic decision to the instance; it handles only async
//! IO (channels, spawning).

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::data::DataNode;
use crate::engine::{Engine, Outputs, ProcessMessage};
use crate::errors::{ProvrunError, Result};
use crate::graph::{GraphStore, ProcessNode};
use crate::process::checkpoint::CheckpointStore;
use crate::process::instance::{LaunchOptions, ProcessInstance};
use crate::process::traits::Process;
use crate::types::ProcessState;

impl Engine {
    /// Run a process to a terminal state and return its outputs.
    ///
    /// Blocks (asynchronously) until the process terminates; afterwards no
    /// live instance remains reachable. Handler failures are persisted on
    /// the node before this returns the error.
    pub async fn run(
        &self,
        process: Box<dyn Process>,
        inputs: BTreeMap<String, DataNode>,
    ) -> Result<Outputs> {
        let (outputs, _node) = self.run_get_node(process, inputs).await?;
        Ok(outputs)
    }

    /// As [`Engine::run`], additionally returning the persisted node.
    pub async fn run_get_node(
        &self,
        process: Box<dyn Process>,
        inputs: BTreeMap<String, DataNode>,
    ) -> Result<(Outputs, ProcessNode)> {
        self.run_with_options(process, inputs, LaunchOptions::default())
            .await
    }

    pub(crate) async fn run_with_options(
        &self,
        process: Box<dyn Process>,
        inputs: BTreeMap<String, DataNode>,
        options: LaunchOptions,
    ) -> Result<(Outputs, ProcessNode)> {
        let mut instance = ProcessInstance::create(self, process, inputs, options)?;
        let node_id = instance.node_id();

        let (tx, mut rx) = mpsc::channel::<ProcessMessage>(16);
        self.register(node_id, tx);
        let result = self.drive(&mut instance, &mut rx).await;
        self.deregister(node_id);

        result?;
        let outputs = self.store().outputs_of(node_id)?;
        let node = self.store().process_node(node_id)?;
        Ok((outputs, node))
    }

    /// Launch a process detached and return immediately with a handle.
    ///
    /// The returned node is in `Created`/`Running`. Function-wrapped
    /// processes cannot be submitted: they have no meaningful continuation
    /// independent of the calling context.
    pub fn submit(
        &self,
        process: Box<dyn Process>,
        inputs: BTreeMap<String, DataNode>,
    ) -> Result<ProcessHandle> {
        if process.is_function() {
            return Err(ProvrunError::Usage(format!(
                "process function '{}' cannot be submitted; use run instead",
                process.process_label()
            )));
        }

        let instance = ProcessInstance::create(self, process, inputs, LaunchOptions::default())?;
        self.spawn_driver(instance)
    }

    /// Reconstruct a suspended process from its checkpoint and spawn a
    /// driver for it.
    ///
    /// The instance is rebuilt from the checkpoint and the graph store
    /// alone; deliver [`Engine::resume`] to continue it.
    pub fn restore(&self, node_id: Uuid) -> Result<ProcessHandle> {
        let checkpoint = self
            .checkpoints()
            .load(node_id)?
            .ok_or(ProvrunError::MissingCheckpoint(node_id))?;
        let process = self.restore_process(&checkpoint.process_label, checkpoint.state.clone())?;
        let instance = ProcessInstance::from_checkpoint(self, process, checkpoint)?;
        info!(node = %node_id, "restored process from checkpoint");
        self.spawn_driver(instance)
    }

    fn spawn_driver(&self, mut instance: ProcessInstance) -> Result<ProcessHandle> {
        let node_id = instance.node_id();
        let (tx, mut rx) = mpsc::channel::<ProcessMessage>(16);
        self.register(node_id, tx);

        let engine = self.clone();
        let join = tokio::spawn(async move {
            let result = engine.drive(&mut instance, &mut rx).await;
            engine.deregister(node_id);
            if let Err(error) = result {
                // Already persisted on the node; retained for async
                // retrieval through the handle.
                warn!(node = %node_id, %error, "detached process ended with error");
            }
        });

        Ok(ProcessHandle {
            node_id,
            engine: self.clone(),
            join,
        })
    }

    /// Advance one instance to a terminal state, consuming cooperative
    /// messages at its suspension points.
    async fn drive(
        &self,
        instance: &mut ProcessInstance,
        rx: &mut mpsc::Receiver<ProcessMessage>,
    ) -> Result<()> {
        loop {
            match instance.state() {
                ProcessState::Created => {
                    // A kill that arrived before the first step is honoured
                    // here, the earliest suspension point.
                    if let Ok(ProcessMessage::Kill) = rx.try_recv() {
                        instance.kill(self)?;
                        continue;
                    }
                    instance.start(self)?;
                }
                ProcessState::Waiting => match rx.recv().await {
                    Some(ProcessMessage::Resume) => {
                        instance.resume_step(self)?;
                    }
                    Some(ProcessMessage::Kill) => {
                        instance.kill(self)?;
                    }
                    None => {
                        return Err(ProvrunError::Usage(format!(
                            "message channel for waiting process {} closed",
                            instance.node_id()
                        )));
                    }
                },
                ProcessState::Running => {
                    // Instance steps only return at suspension points or
                    // terminal states.
                    return Err(ProvrunError::Storage(format!(
                        "process {} observed mid-step",
                        instance.node_id()
                    )));
                }
                state => {
                    debug!(node = %instance.node_id(), %state, "process terminal");
                    return Ok(());
                }
            }
        }
    }
}

/// Handle to a detached (submitted or restored) process.
pub struct ProcessHandle {
    node_id: Uuid,
    engine: Engine,
    join: tokio::task::JoinHandle<()>,
}

impl ProcessHandle {
    pub fn node_id(&self) -> Uuid {
        self.node_id
    }

    /// Snapshot of the backing node as currently persisted.
    pub fn node(&self) -> Result<ProcessNode> {
        self.engine.store().process_node(self.node_id)
    }

    /// Deliver a resumption event.
    pub async fn resume(&self) -> Result<()> {
        self.engine.resume(self.node_id).await
    }

    /// Deliver an advisory kill request.
    pub async fn kill(&self) -> Result<()> {
        self.engine.kill(self.node_id).await
    }

    /// Wait for the process to terminate and return the sealed node.
    ///
    /// Failures were persisted before the driver exited, so they are read
    /// from the node rather than re-raised here.
    pub async fn wait(self) -> Result<ProcessNode> {
        if let Err(error) = self.join.await {
            warn!(node = %self.node_id, %error, "driver task failed");
        }
        self.engine.store().process_node(self.node_id)
    }
}
