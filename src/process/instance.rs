// src/process/instance.rs

//! Per-process lifecycle state machine.
//!
//! A [`ProcessInstance`] owns one process node exclusively while it runs and
//! is the only thing that mutates it. Every execution outcome is persisted
//! on the node before it is surfaced to a caller, so provenance survives
//! failure. Reaching a terminal state seals the node.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{self, FingerprintClaim};
use crate::data::{DataNode, DataValue};
use crate::engine::Engine;
use crate::errors::{ProvrunError, Result, ValidationError, ValidationProblem};
use crate::graph::node::{ATTR_EXCEPTION, EXTRA_CACHED_FROM, EXTRA_CONTENT_HASH};
use crate::graph::{FileRepository, GraphStore};
use crate::process::checkpoint::{Checkpoint, CheckpointStore};
use crate::process::context::ProcessContext;
use crate::process::traits::{Completion, HandlerOutcome, Process};
use crate::types::{ExitCode, LinkType, ProcessState};

/// Metadata supplied alongside the inputs when launching a process.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub label: Option<String>,
    pub description: Option<String>,
    /// Extra attributes recorded on the node at creation (e.g. source
    /// location of a function process).
    pub attributes: BTreeMap<String, DataValue>,
}

/// What a single driver step produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The process reached a terminal state and its node is sealed.
    Terminal(ProcessState),
    /// The process suspended; a checkpoint has been durably committed.
    Suspended,
}

/// A live process: the state machine around one process node.
pub struct ProcessInstance {
    process: Box<dyn Process>,
    node_id: Uuid,
    state: ProcessState,
    inputs: BTreeMap<String, DataNode>,
    attached_outputs: BTreeSet<String>,
    pending_continuation: Option<String>,
    fingerprint: String,
    claim: Option<FingerprintClaim>,
}

impl ProcessInstance {
    /// Create the backing node, validate and bind inputs, and record input
    /// links.
    ///
    /// Validation failures leave a `Created` node behind for audit; it never
    /// advances and is never sealed.
    pub fn create(
        engine: &Engine,
        process: Box<dyn Process>,
        supplied: BTreeMap<String, DataNode>,
        options: LaunchOptions,
    ) -> Result<Self> {
        let store = engine.store();
        let node_id = store.create_process(process.process_label())?;

        store.set_metadata(
            node_id,
            options.label.as_deref(),
            options.description.as_deref(),
        )?;
        for (key, value) in options.attributes {
            store.set_attribute(node_id, &key, value)?;
        }

        if let Err(validation) = process.spec().validate_inputs(&supplied) {
            warn!(node = %node_id, error = %validation, "input validation failed");
            return Err(validation.into());
        }

        // Bind: supplied values first, then defaults for absent optional
        // ports. Validation has already passed, so this cannot half-apply.
        let mut inputs = supplied;
        for port in process.spec().inputs().iter() {
            if !inputs.contains_key(port.name()) {
                if let Some(default) = port.default() {
                    let node = store.create_data(default.clone())?;
                    inputs.insert(port.name().to_string(), node);
                }
            }
        }

        let input_link = process.kind().input_link();
        for (name, node) in &inputs {
            store.add_incoming(node_id, node.id(), input_link, name)?;
        }

        let fingerprint = cache::process_fingerprint(
            process.process_label(),
            process.version_tag(),
            &inputs,
            engine.repository().as_ref(),
        )?;

        info!(node = %node_id, process = process.process_label(), "created process");

        Ok(Self {
            process,
            node_id,
            state: ProcessState::Created,
            inputs,
            attached_outputs: BTreeSet::new(),
            pending_continuation: None,
            fingerprint,
            claim: None,
        })
    }

    /// Reconstruct a suspended instance from its checkpoint.
    ///
    /// The process object is rebuilt by the engine's restorer registry from
    /// the serialized handler state; inputs are re-fetched from the graph
    /// store. Nothing else survives the gap.
    pub(crate) fn from_checkpoint(
        engine: &Engine,
        process: Box<dyn Process>,
        checkpoint: Checkpoint,
    ) -> Result<Self> {
        let store = engine.store();
        let mut inputs = BTreeMap::new();
        for (name, id) in &checkpoint.inputs {
            inputs.insert(name.clone(), store.get_data(*id)?);
        }

        let fingerprint = cache::process_fingerprint(
            process.process_label(),
            process.version_tag(),
            &inputs,
            engine.repository().as_ref(),
        )?;

        Ok(Self {
            process,
            node_id: checkpoint.node_id,
            state: ProcessState::Waiting,
            inputs,
            attached_outputs: checkpoint.attached_outputs.into_iter().collect(),
            pending_continuation: Some(checkpoint.continuation),
            fingerprint,
            claim: None,
        })
    }

    pub fn node_id(&self) -> Uuid {
        self.node_id
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// `Created -> Running` (or straight to `Finished` on a cache hit).
    ///
    /// Inputs were validated and bound at creation; no validation re-runs
    /// here or at any later point.
    pub fn start(&mut self, engine: &Engine) -> Result<StepOutcome> {
        if self.state != ProcessState::Created {
            return Err(ProvrunError::Usage(format!(
                "cannot start process in state {}",
                self.state
            )));
        }

        if engine.cache_enabled_for(self.process.as_ref()) {
            // Lookup-then-insert for this fingerprint is a critical section:
            // take the claim before looking, hold it until the result is
            // recorded. A contended claim degrades to duplicate execution.
            self.claim = engine.claims().try_claim(&self.fingerprint);
            if let Some(hit) = engine.store().find_cached(&self.fingerprint)? {
                return self.adopt_cached(engine, hit.id());
            }
        }

        engine.store().set_state(self.node_id, ProcessState::Running)?;
        self.state = ProcessState::Running;

        let spec = self.process.spec().clone();
        let mut ctx = ProcessContext::new(
            engine,
            self.node_id,
            &self.inputs,
            &spec,
            &mut self.attached_outputs,
        );
        let outcome = self.process.on_run(&mut ctx);
        self.conclude(engine, outcome)
    }

    /// `Waiting -> Running`: invoke the stored continuation.
    pub fn resume_step(&mut self, engine: &Engine) -> Result<StepOutcome> {
        if self.state != ProcessState::Waiting {
            return Err(ProvrunError::Usage(format!(
                "cannot resume process in state {}",
                self.state
            )));
        }
        let continuation = self.pending_continuation.take().ok_or_else(|| {
            ProvrunError::Usage("waiting process has no pending continuation".to_string())
        })?;

        engine.store().set_state(self.node_id, ProcessState::Running)?;
        self.state = ProcessState::Running;
        debug!(node = %self.node_id, continuation = %continuation, "resuming process");

        let spec = self.process.spec().clone();
        let mut ctx = ProcessContext::new(
            engine,
            self.node_id,
            &self.inputs,
            &spec,
            &mut self.attached_outputs,
        );
        let outcome = self.process.on_resume(&mut ctx, &continuation);
        self.conclude(engine, outcome)
    }

    /// Cooperative kill, observed at suspension points only.
    ///
    /// Outputs already attached remain on the node.
    pub fn kill(&mut self, engine: &Engine) -> Result<StepOutcome> {
        if self.state.is_terminal() {
            return Ok(StepOutcome::Terminal(self.state));
        }
        info!(node = %self.node_id, "killing process");
        engine.store().set_state(self.node_id, ProcessState::Killed)?;
        engine.store().seal(self.node_id)?;
        self.state = ProcessState::Killed;
        self.cleanup(engine);
        Ok(StepOutcome::Terminal(ProcessState::Killed))
    }

    fn conclude(
        &mut self,
        engine: &Engine,
        outcome: anyhow::Result<HandlerOutcome>,
    ) -> Result<StepOutcome> {
        match outcome {
            Ok(HandlerOutcome::Complete(Completion::Done)) => self.finish(engine, None),
            Ok(HandlerOutcome::Complete(Completion::Terminated(code))) => {
                self.finish(engine, Some(code))
            }
            Ok(HandlerOutcome::Wait { continuation }) => self.suspend(engine, continuation),
            Err(error) => self.except(engine, error),
        }
    }

    /// `Running -> Finished`, unless a declared-required output is missing,
    /// in which case the transition resolves to `Excepted` with a recorded
    /// validation failure. A named nonzero exit code is a recorded partial
    /// failure whose outputs may legitimately be absent, so only the
    /// success path validates outputs.
    fn finish(&mut self, engine: &Engine, exit: Option<ExitCode>) -> Result<StepOutcome> {
        let code = exit.unwrap_or_else(ExitCode::success);

        let missing = if code.is_success() {
            self.process.spec().missing_outputs(&self.attached_outputs)
        } else {
            Vec::new()
        };
        if !missing.is_empty() {
            let validation = ValidationError::new(
                missing
                    .into_iter()
                    .map(|port| ValidationProblem::MissingOutput { port })
                    .collect(),
            );
            let store = engine.store();
            store.set_attribute(
                self.node_id,
                ATTR_EXCEPTION,
                DataValue::Str(validation.to_string()),
            )?;
            store.set_state(self.node_id, ProcessState::Excepted)?;
            store.seal(self.node_id)?;
            self.state = ProcessState::Excepted;
            self.cleanup(engine);
            warn!(node = %self.node_id, error = %validation, "missing required outputs");
            return Err(validation.into());
        }

        let store = engine.store();
        store.set_exit(self.node_id, code.status, &code.message)?;
        store.set_extra(
            self.node_id,
            EXTRA_CONTENT_HASH,
            DataValue::Str(self.fingerprint.clone()),
        )?;
        store.set_state(self.node_id, ProcessState::Finished)?;
        store.seal(self.node_id)?;
        self.state = ProcessState::Finished;
        self.cleanup(engine);

        info!(node = %self.node_id, status = code.status, "process finished");
        Ok(StepOutcome::Terminal(ProcessState::Finished))
    }

    /// `Running -> Excepted`: the failure is persisted on the node before it
    /// is surfaced to the caller.
    fn except(&mut self, engine: &Engine, error: anyhow::Error) -> Result<StepOutcome> {
        let store = engine.store();
        store.set_attribute(
            self.node_id,
            ATTR_EXCEPTION,
            DataValue::Str(format!("{error:#}")),
        )?;
        store.set_state(self.node_id, ProcessState::Excepted)?;
        store.seal(self.node_id)?;
        self.state = ProcessState::Excepted;
        self.cleanup(engine);

        warn!(node = %self.node_id, error = %error, "process excepted");
        Err(ProvrunError::Excepted {
            node: self.node_id,
            source: error,
        })
    }

    /// `Running -> Waiting`: the checkpoint is durably committed before
    /// control returns to the caller.
    fn suspend(&mut self, engine: &Engine, continuation: String) -> Result<StepOutcome> {
        let checkpoint = Checkpoint {
            node_id: self.node_id,
            process_label: self.process.process_label().to_string(),
            continuation: continuation.clone(),
            state: self.process.save_state().map_err(ProvrunError::Other)?,
            inputs: self
                .inputs
                .iter()
                .map(|(name, node)| (name.clone(), node.id()))
                .collect(),
            attached_outputs: self.attached_outputs.iter().cloned().collect(),
        };
        engine.checkpoints().save(&checkpoint)?;

        engine.store().set_state(self.node_id, ProcessState::Waiting)?;
        self.state = ProcessState::Waiting;
        self.pending_continuation = Some(continuation);

        Ok(StepOutcome::Suspended)
    }

    /// Finish directly from a cache hit: outputs are cloned onto this node
    /// (file content included), the handler never runs.
    fn adopt_cached(&mut self, engine: &Engine, source: Uuid) -> Result<StepOutcome> {
        let store = engine.store();
        let repository = engine.repository();

        for (label, data) in store.outputs_of(source)? {
            let clone = store.create_data(data.value().clone())?;
            for name in repository.list(data.id())? {
                let content = repository.open(data.id(), &name)?;
                repository.add_path(clone.id(), &name, &content)?;
            }
            store.add_incoming(clone.id(), self.node_id, LinkType::Create, &label)?;
            self.attached_outputs.insert(label);
        }

        store.set_extra(
            self.node_id,
            EXTRA_CACHED_FROM,
            DataValue::Str(source.to_string()),
        )?;
        store.set_extra(
            self.node_id,
            EXTRA_CONTENT_HASH,
            DataValue::Str(self.fingerprint.clone()),
        )?;
        store.set_exit(self.node_id, 0, "")?;
        store.set_state(self.node_id, ProcessState::Finished)?;
        store.seal(self.node_id)?;
        self.state = ProcessState::Finished;
        self.cleanup(engine);

        info!(node = %self.node_id, cached_from = %source, "process finished from cache");
        Ok(StepOutcome::Terminal(ProcessState::Finished))
    }

    fn cleanup(&mut self, engine: &Engine) {
        if let Err(error) = engine.checkpoints().remove(self.node_id) {
            warn!(node = %self.node_id, %error, "failed to remove checkpoint");
        }
        self.claim = None;
    }
}
