// src/function/process_function.rs

//! A tracked process wrapped around an ordinary function body.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::data::{DataNode, DataValue};
use crate::engine::{Engine, Outputs, ProcessHandle, ProcessMessage};
use crate::errors::{ProvrunError, Result};
use crate::function::signature::FunctionSignature;
use crate::function::DEFAULT_OUTPUT_LABEL;
use crate::graph::{GraphStore, ProcessNode};
use crate::process::context::{OutputValue, ProcessContext};
use crate::process::instance::{LaunchOptions, ProcessInstance, StepOutcome};
use crate::process::spec::{Port, ProcessSpec};
use crate::process::traits::{Completion, HandlerOutcome, Process};
use crate::types::{ExitCode, ProcessKind};

/// Attribute keys recording the function's source location on its nodes.
pub const ATTR_FUNCTION_NAME: &str = "function_name";
pub const ATTR_SOURCE_FILE: &str = "source_file";
pub const ATTR_SOURCE_LINE: &str = "source_line";

/// Normalized return value of a function body.
///
/// An explicit tagged variant instead of duck-typing the returned value:
/// a single output, a named mapping of outputs, or a terminal exit code
/// with no outputs. Failure is the `Err` arm of the handler itself.
#[derive(Debug, Clone)]
pub enum FunctionResult {
    Single(OutputValue),
    Multi(BTreeMap<String, OutputValue>),
    Terminated(ExitCode),
}

impl FunctionResult {
    /// Single fresh value under the default output label.
    pub fn value(value: impl Into<DataValue>) -> Self {
        FunctionResult::Single(OutputValue::New(value.into()))
    }

    /// Forward an existing node under the default output label.
    pub fn node(node: DataNode) -> Self {
        FunctionResult::Single(OutputValue::Existing(node))
    }

    pub fn multi<I, K, V>(outputs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<OutputValue>,
    {
        FunctionResult::Multi(
            outputs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn terminated(code: ExitCode) -> Self {
        FunctionResult::Terminated(code)
    }
}

/// Read-only view the function body receives: the bound inputs and the
/// engine for nested invocations.
pub struct FunctionContext<'a> {
    engine: &'a Engine,
    inputs: &'a BTreeMap<String, DataNode>,
}

impl<'a> FunctionContext<'a> {
    pub fn engine(&self) -> &Engine {
        self.engine
    }

    pub fn inputs(&self) -> &BTreeMap<String, DataNode> {
        self.inputs
    }

    pub fn input(&self, name: &str) -> Option<&DataNode> {
        self.inputs.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&DataNode> {
        self.inputs
            .get(name)
            .ok_or_else(|| ProvrunError::Usage(format!("no input bound to port '{name}'")))
    }
}

type FunctionHandler =
    dyn Fn(&FunctionContext<'_>) -> anyhow::Result<FunctionResult> + Send + Sync;

/// A function registered as a trackable process type.
///
/// Built once at definition time; calling it drives a full process
/// lifecycle per invocation.
#[derive(Clone)]
pub struct ProcessFunction {
    signature: Arc<FunctionSignature>,
    spec: ProcessSpec,
    handler: Arc<FunctionHandler>,
    kind: ProcessKind,
    cached: bool,
    version_tag: String,
    default_label: Option<String>,
    default_description: Option<String>,
}

impl ProcessFunction {
    /// Register `handler` under the given signature as a calculation-like
    /// process function.
    pub fn new(
        signature: FunctionSignature,
        handler: impl Fn(&FunctionContext<'_>) -> anyhow::Result<FunctionResult>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        let mut spec = ProcessSpec::new().dynamic_outputs();
        for param in signature.params() {
            let mut port = match param.default() {
                Some(default) => Port::optional(param.name(), default.clone()),
                None => Port::required(param.name()),
            };
            if let Some(kind) = param.kind() {
                port = port.with_kind(kind);
            }
            spec = spec.input(port);
        }
        if signature.is_keyword_variadic() {
            spec = spec.dynamic_inputs();
        }

        Self {
            signature: Arc::new(signature),
            spec,
            handler: Arc::new(handler),
            kind: ProcessKind::Calculation,
            cached: false,
            version_tag: "0".to_string(),
            default_label: None,
            default_description: None,
        }
    }

    /// Mark as workflow-like: consumed inputs get `InputWork` links.
    pub fn as_workflow(mut self) -> Self {
        self.kind = ProcessKind::Workflow;
        self
    }

    /// Opt in to automatic cache substitution.
    pub fn cached(mut self) -> Self {
        self.cached = true;
        self
    }

    /// Tag the handler's code version; part of the content fingerprint.
    pub fn with_version(mut self, tag: impl Into<String>) -> Self {
        self.version_tag = tag.into();
        self
    }

    /// Default node label applied when a call does not override it.
    pub fn with_default_label(mut self, label: impl Into<String>) -> Self {
        self.default_label = Some(label.into());
        self
    }

    pub fn with_default_description(mut self, description: impl Into<String>) -> Self {
        self.default_description = Some(description.into());
        self
    }

    /// Declare a named exit code on this function's spec.
    pub fn with_exit_code(
        mut self,
        name: impl Into<String>,
        status: u32,
        message: impl Into<String>,
    ) -> Result<Self> {
        self.spec = self.spec.exit_code(name, status, message)?;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        self.signature.name()
    }

    pub fn signature(&self) -> &FunctionSignature {
        &self.signature
    }

    pub fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    /// Begin a call: bind arguments with the returned builder, then `run`.
    pub fn call<'a>(&'a self, engine: &'a Engine) -> FunctionCall<'a> {
        FunctionCall {
            function: self,
            engine,
            positional: Vec::new(),
            named: Vec::new(),
            label: None,
            description: None,
        }
    }

    fn as_process(&self) -> FunctionProcess {
        FunctionProcess {
            label: self.signature.name().to_string(),
            spec: self.spec.clone(),
            handler: Arc::clone(&self.handler),
            kind: self.kind,
            cached: self.cached,
            version_tag: self.version_tag.clone(),
        }
    }
}

/// One invocation being assembled: positional and named arguments plus the
/// implicit `label` / `description` metadata options.
pub struct FunctionCall<'a> {
    function: &'a ProcessFunction,
    engine: &'a Engine,
    positional: Vec<DataNode>,
    named: Vec<(String, DataNode)>,
    label: Option<String>,
    description: Option<String>,
}

impl<'a> FunctionCall<'a> {
    /// Bind the next positional argument, in declaration order.
    pub fn arg(mut self, node: DataNode) -> Self {
        self.positional.push(node);
        self
    }

    /// Bind an argument by name.
    pub fn kwarg(mut self, name: impl Into<String>, node: DataNode) -> Self {
        self.named.push((name.into(), node));
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Execute synchronously and return the outputs.
    pub fn run(self) -> Result<Outputs> {
        let (outputs, _node) = self.run_get_node()?;
        Ok(outputs)
    }

    /// Execute synchronously; also return the persisted node.
    ///
    /// The function body runs inside the `Running` phase of a full process
    /// lifecycle. Undeclared keywords on a non-dynamic function fail here,
    /// before any node is created.
    pub fn run_get_node(self) -> Result<(Outputs, ProcessNode)> {
        let supplied = self.bind_arguments()?;
        let attributes = self.source_attributes();
        let options = LaunchOptions {
            label: self
                .label
                .clone()
                .or_else(|| self.function.default_label.clone()),
            description: self
                .description
                .clone()
                .or_else(|| self.function.default_description.clone()),
            attributes,
        };

        let engine = self.engine;
        let process = Box::new(self.function.as_process());
        let mut instance = ProcessInstance::create(engine, process, supplied, options)?;
        let node_id = instance.node_id();

        // Register for live-instance accounting even though a function can
        // never suspend; the receiver is dropped immediately.
        let (tx, _rx) = mpsc::channel::<ProcessMessage>(1);
        engine.register(node_id, tx);
        let result = instance.start(engine);
        engine.deregister(node_id);

        match result? {
            StepOutcome::Terminal(_) => {}
            StepOutcome::Suspended => {
                return Err(ProvrunError::Usage(format!(
                    "process function '{}' suspended, which functions cannot do",
                    self.function.name()
                )));
            }
        }

        let outputs = engine.store().outputs_of(node_id)?;
        let node = engine.store().process_node(node_id)?;
        Ok((outputs, node))
    }

    /// Submitting a function process is a usage error: its continuation is
    /// meaningless outside the calling context.
    pub fn submit(self) -> Result<ProcessHandle> {
        Err(ProvrunError::Usage(format!(
            "process function '{}' cannot be submitted; use run instead",
            self.function.name()
        )))
    }

    fn bind_arguments(&self) -> Result<BTreeMap<String, DataNode>> {
        let signature = self.function.signature();
        let params = signature.params();

        if self.positional.len() > params.len() {
            return Err(ProvrunError::Usage(format!(
                "function '{}' takes at most {} positional arguments, got {}",
                signature.name(),
                params.len(),
                self.positional.len()
            )));
        }

        let mut supplied: BTreeMap<String, DataNode> = BTreeMap::new();
        for (param, node) in params.iter().zip(self.positional.iter()) {
            supplied.insert(param.name().to_string(), node.clone());
        }

        for (name, node) in &self.named {
            if supplied.contains_key(name) {
                return Err(ProvrunError::Usage(format!(
                    "argument '{name}' bound both positionally and by name"
                )));
            }
            if signature.param(name).is_none() && !signature.is_keyword_variadic() {
                return Err(ProvrunError::Usage(format!(
                    "function '{}' got an unexpected keyword argument '{name}'",
                    signature.name()
                )));
            }
            supplied.insert(name.clone(), node.clone());
        }

        debug!(function = signature.name(), args = supplied.len(), "bound call arguments");
        Ok(supplied)
    }

    fn source_attributes(&self) -> BTreeMap<String, DataValue> {
        let source = self.function.signature().source();
        BTreeMap::from([
            (
                ATTR_FUNCTION_NAME.to_string(),
                DataValue::Str(source.name.clone()),
            ),
            (
                ATTR_SOURCE_FILE.to_string(),
                DataValue::Str(source.file.clone()),
            ),
            (
                ATTR_SOURCE_LINE.to_string(),
                DataValue::Int(i64::from(source.line)),
            ),
        ])
    }
}

/// The `Process` implementation driving one function invocation.
struct FunctionProcess {
    label: String,
    spec: ProcessSpec,
    handler: Arc<FunctionHandler>,
    kind: ProcessKind,
    cached: bool,
    version_tag: String,
}

impl Process for FunctionProcess {
    fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    fn process_label(&self) -> &str {
        &self.label
    }

    fn kind(&self) -> ProcessKind {
        self.kind
    }

    fn version_tag(&self) -> &str {
        &self.version_tag
    }

    fn cache_enabled(&self) -> bool {
        self.cached
    }

    fn is_function(&self) -> bool {
        true
    }

    fn on_run(&mut self, ctx: &mut ProcessContext<'_>) -> anyhow::Result<HandlerOutcome> {
        let result = {
            let fctx = FunctionContext {
                engine: ctx.engine(),
                inputs: ctx.inputs(),
            };
            (self.handler)(&fctx)?
        };

        match result {
            FunctionResult::Single(value) => {
                ctx.out(DEFAULT_OUTPUT_LABEL, value)?;
                Ok(HandlerOutcome::Complete(Completion::Done))
            }
            FunctionResult::Multi(outputs) => {
                for (label, value) in outputs {
                    ctx.out(&label, value)?;
                }
                Ok(HandlerOutcome::Complete(Completion::Done))
            }
            FunctionResult::Terminated(code) => {
                Ok(HandlerOutcome::Complete(Completion::Terminated(code)))
            }
        }
    }
}
