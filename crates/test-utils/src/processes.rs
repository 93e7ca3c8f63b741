#![allow(dead_code)]

//! Minimal `Process` implementations for exercising the engine.

use anyhow::anyhow;
use provrun::data::{DataValue, ValueKind};
use provrun::process::{
    Completion, HandlerOutcome, Port, Process, ProcessContext, ProcessSpec,
};

/// A process that does nothing when it runs.
pub struct DummyProcess {
    spec: ProcessSpec,
}

impl DummyProcess {
    pub fn new() -> Self {
        Self {
            spec: ProcessSpec::new().dynamic_inputs().dynamic_outputs(),
        }
    }
}

impl Default for DummyProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl Process for DummyProcess {
    fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    fn process_label(&self) -> &str {
        "dummy"
    }

    fn on_run(&mut self, _ctx: &mut ProcessContext<'_>) -> anyhow::Result<HandlerOutcome> {
        Ok(HandlerOutcome::Complete(Completion::Done))
    }
}

/// A simple process that adds two integers.
pub struct AddProcess {
    spec: ProcessSpec,
}

impl AddProcess {
    pub fn new() -> Self {
        Self {
            spec: ProcessSpec::new()
                .input(Port::required("a").with_kind(ValueKind::Int))
                .input(Port::required("b").with_kind(ValueKind::Int))
                .output(Port::required("result")),
        }
    }
}

impl Default for AddProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl Process for AddProcess {
    fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    fn process_label(&self) -> &str {
        "add_process"
    }

    fn on_run(&mut self, ctx: &mut ProcessContext<'_>) -> anyhow::Result<HandlerOutcome> {
        let a = ctx.require("a")?.as_int().ok_or_else(|| anyhow!("a is not an int"))?;
        let b = ctx.require("b")?.as_int().ok_or_else(|| anyhow!("b is not an int"))?;
        ctx.out("result", DataValue::Int(a + b))?;
        Ok(HandlerOutcome::Complete(Completion::Done))
    }
}

/// A process that attaches an output that is not part of its spec.
pub struct BadOutputProcess {
    spec: ProcessSpec,
}

impl BadOutputProcess {
    pub fn new() -> Self {
        Self {
            spec: ProcessSpec::new()
                .dynamic_inputs()
                .output(Port::required("result")),
        }
    }
}

impl Default for BadOutputProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl Process for BadOutputProcess {
    fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    fn process_label(&self) -> &str {
        "bad_output"
    }

    fn on_run(&mut self, ctx: &mut ProcessContext<'_>) -> anyhow::Result<HandlerOutcome> {
        ctx.out("bad_output", DataValue::Int(5))?;
        Ok(HandlerOutcome::Complete(Completion::Done))
    }
}

/// A process that never attaches its required output.
pub struct MissingOutputProcess {
    spec: ProcessSpec,
}

impl MissingOutputProcess {
    pub fn new() -> Self {
        Self {
            spec: ProcessSpec::new()
                .dynamic_inputs()
                .output(Port::required("result")),
        }
    }
}

impl Default for MissingOutputProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl Process for MissingOutputProcess {
    fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    fn process_label(&self) -> &str {
        "missing_output"
    }

    fn on_run(&mut self, _ctx: &mut ProcessContext<'_>) -> anyhow::Result<HandlerOutcome> {
        Ok(HandlerOutcome::Complete(Completion::Done))
    }
}

/// A process that raises when run.
pub struct ExceptionProcess {
    spec: ProcessSpec,
}

impl ExceptionProcess {
    pub fn new() -> Self {
        Self {
            spec: ProcessSpec::new().dynamic_inputs().dynamic_outputs(),
        }
    }
}

impl Default for ExceptionProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl Process for ExceptionProcess {
    fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    fn process_label(&self) -> &str {
        "exception_process"
    }

    fn on_run(&mut self, _ctx: &mut ProcessContext<'_>) -> anyhow::Result<HandlerOutcome> {
        Err(anyhow!("CRASH"))
    }
}

/// A process that waits until it is asked to continue, then attaches its
/// result from state captured before the suspension.
pub struct WaitProcess {
    spec: ProcessSpec,
    staged: Option<i64>,
}

pub const WAIT_CONTINUATION: &str = "next_step";

impl WaitProcess {
    pub fn new() -> Self {
        Self {
            spec: ProcessSpec::new()
                .input(Port::optional("value", DataValue::Int(1)))
                .output(Port::required("result")),
            staged: None,
        }
    }

    /// Restorer for [`provrun::Engine::register_restorer`].
    pub fn restore(state: serde_json::Value) -> anyhow::Result<Box<dyn Process>> {
        let staged = state.get("staged").and_then(|v| v.as_i64());
        Ok(Box::new(Self {
            spec: Self::new().spec,
            staged,
        }))
    }
}

impl Default for WaitProcess {
    fn default() -> Self {
        Self::new()
    }
}

impl Process for WaitProcess {
    fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    fn process_label(&self) -> &str {
        "wait_process"
    }

    fn on_run(&mut self, ctx: &mut ProcessContext<'_>) -> anyhow::Result<HandlerOutcome> {
        let value = ctx.require("value")?.as_int().unwrap_or(0);
        self.staged = Some(value * 2);
        Ok(HandlerOutcome::Wait {
            continuation: WAIT_CONTINUATION.to_string(),
        })
    }

    fn on_resume(
        &mut self,
        ctx: &mut ProcessContext<'_>,
        continuation: &str,
    ) -> anyhow::Result<HandlerOutcome> {
        if continuation != WAIT_CONTINUATION {
            return Err(anyhow!("unknown continuation '{continuation}'"));
        }
        let staged = self.staged.ok_or_else(|| anyhow!("no staged value"))?;
        ctx.out("result", DataValue::Int(staged))?;
        Ok(HandlerOutcome::Complete(Completion::Done))
    }

    fn save_state(&self) -> anyhow::Result<serde_json::Value> {
        Ok(serde_json::json!({ "staged": self.staged }))
    }
}
