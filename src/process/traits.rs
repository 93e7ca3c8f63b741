// src/process/traits.rs

//! The `Process` trait implemented by every executable process type.

use crate::process::context::ProcessContext;
use crate::process::spec::ProcessSpec;
use crate::types::{ExitCode, ProcessKind};

/// How a handler step concluded, when it did not fail outright.
#[derive(Debug, Clone)]
pub enum Completion {
    /// Finished normally; exit status defaults to 0.
    Done,
    /// Finished with an explicit named exit code (possibly a recorded
    /// partial failure).
    Terminated(ExitCode),
}

/// Result of a single handler step.
#[derive(Debug, Clone)]
pub enum HandlerOutcome {
    Complete(Completion),
    /// Suspend, to be resumed later through the stored continuation
    /// identifier. A checkpoint is durably committed before control returns
    /// to the caller.
    Wait { continuation: String },
}

/// A tracked unit of computation.
///
/// Implementations supply the static spec, identity metadata and the actual
/// handler steps. All persistence and lifecycle bookkeeping is done by the
/// surrounding [`ProcessInstance`](crate::process::ProcessInstance); the
/// handler only sees the explicit [`ProcessContext`].
pub trait Process: Send {
    fn spec(&self) -> &ProcessSpec;

    /// Stable label identifying the process type in provenance records.
    fn process_label(&self) -> &str;

    fn kind(&self) -> ProcessKind {
        ProcessKind::Calculation
    }

    /// Code-version tag mixed into the content fingerprint; bump it when the
    /// handler's semantics change.
    fn version_tag(&self) -> &str {
        "0"
    }

    /// Opt in to automatic cache substitution.
    fn cache_enabled(&self) -> bool {
        false
    }

    /// Whether this is a function-wrapped process. Function processes have
    /// no meaningful continuation independent of the calling context and
    /// cannot be submitted to run detached.
    fn is_function(&self) -> bool {
        false
    }

    /// First handler step, entered from the `Running` state.
    fn on_run(&mut self, ctx: &mut ProcessContext<'_>) -> anyhow::Result<HandlerOutcome>;

    /// Continuation step invoked when a suspended process is resumed.
    fn on_resume(
        &mut self,
        ctx: &mut ProcessContext<'_>,
        continuation: &str,
    ) -> anyhow::Result<HandlerOutcome> {
        let _ = ctx;
        Err(anyhow::anyhow!(
            "process '{}' does not support resumption (continuation '{continuation}')",
            self.process_label()
        ))
    }

    /// Serialize internal handler state for checkpointing.
    fn save_state(&self) -> anyhow::Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }
}
