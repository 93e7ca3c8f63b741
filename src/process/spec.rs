// src/process/spec.rs

//! Static declaration of a process type: typed ports and named exit codes.

use std::collections::BTreeMap;

use crate::data::{DataNode, DataValue, ValueKind};
use crate::errors::{ProvrunError, Result, ValidationError, ValidationProblem};
use crate::types::ExitCode;

/// A single named input or output port.
#[derive(Debug, Clone)]
pub struct Port {
    name: String,
    required: bool,
    valid_kind: Option<ValueKind>,
    default: Option<DataValue>,
}

impl Port {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: true,
            valid_kind: None,
            default: None,
        }
    }

    /// An optional port whose default value is used when nothing is supplied.
    pub fn optional(name: impl Into<String>, default: DataValue) -> Self {
        Self {
            name: name.into(),
            required: false,
            valid_kind: None,
            default: Some(default),
        }
    }

    /// An optional port without a default.
    pub fn optional_no_default(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            valid_kind: None,
            default: None,
        }
    }

    /// Constrain the port to values of the given kind.
    pub fn with_kind(mut self, kind: ValueKind) -> Self {
        self.valid_kind = Some(kind);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn valid_kind(&self) -> Option<ValueKind> {
        self.valid_kind
    }

    pub fn default(&self) -> Option<&DataValue> {
        self.default.as_ref()
    }
}

/// Ordered collection of ports, optionally accepting undeclared extras.
#[derive(Debug, Clone, Default)]
pub struct PortNamespace {
    ports: Vec<Port>,
    dynamic: bool,
}

impl PortNamespace {
    pub fn get(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter()
    }

    /// Whether arbitrarily named extra ports are accepted.
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }
}

/// Static declaration of input/output ports and named exit codes for a
/// process type.
#[derive(Debug, Clone, Default)]
pub struct ProcessSpec {
    inputs: PortNamespace,
    outputs: PortNamespace,
    exit_codes: BTreeMap<String, ExitCode>,
}

impl ProcessSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, port: Port) -> Self {
        self.inputs.ports.push(port);
        self
    }

    pub fn output(mut self, port: Port) -> Self {
        self.outputs.ports.push(port);
        self
    }

    /// Accept arbitrarily named extra inputs.
    pub fn dynamic_inputs(mut self) -> Self {
        self.inputs.dynamic = true;
        self
    }

    /// Accept arbitrarily named extra outputs.
    pub fn dynamic_outputs(mut self) -> Self {
        self.outputs.dynamic = true;
        self
    }

    /// Declare a named exit code.
    ///
    /// Status `0` is reserved for success and can never be declared.
    pub fn exit_code(
        mut self,
        name: impl Into<String>,
        status: u32,
        message: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        if status == 0 {
            return Err(ProvrunError::Configuration(format!(
                "exit code '{name}' declares status 0, which is reserved for success"
            )));
        }
        if self.exit_codes.contains_key(&name) {
            return Err(ProvrunError::Configuration(format!(
                "exit code '{name}' is declared twice"
            )));
        }
        self.exit_codes.insert(name, ExitCode::new(status, message));
        Ok(self)
    }

    pub fn inputs(&self) -> &PortNamespace {
        &self.inputs
    }

    pub fn outputs(&self) -> &PortNamespace {
        &self.outputs
    }

    pub fn exit_codes(&self) -> &BTreeMap<String, ExitCode> {
        &self.exit_codes
    }

    pub fn get_exit_code(&self, name: &str) -> Option<&ExitCode> {
        self.exit_codes.get(name)
    }

    /// Check supplied inputs against the declared input ports.
    ///
    /// Runs a single pass and reports *every* missing required port, type
    /// mismatch and (for non-dynamic namespaces) unknown port at once. Never
    /// partially applies inputs: on failure nothing has been bound.
    pub fn validate_inputs(
        &self,
        supplied: &BTreeMap<String, DataNode>,
    ) -> std::result::Result<(), ValidationError> {
        let mut problems = Vec::new();

        for port in self.inputs.iter() {
            match supplied.get(port.name()) {
                None => {
                    if port.is_required() {
                        problems.push(ValidationProblem::MissingRequired {
                            port: port.name().to_string(),
                        });
                    }
                }
                Some(node) => {
                    if let Some(expected) = port.valid_kind() {
                        let actual = node.value().kind();
                        if actual != expected {
                            problems.push(ValidationProblem::TypeMismatch {
                                port: port.name().to_string(),
                                expected,
                                actual,
                            });
                        }
                    }
                }
            }
        }

        if !self.inputs.is_dynamic() {
            for name in supplied.keys() {
                if self.inputs.get(name).is_none() {
                    problems.push(ValidationProblem::UnknownPort { port: name.clone() });
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(problems))
        }
    }

    /// Required output ports that are absent from `attached`.
    pub fn missing_outputs(&self, attached: &std::collections::BTreeSet<String>) -> Vec<String> {
        self.outputs
            .iter()
            .filter(|p| p.is_required() && !attached.contains(p.name()))
            .map(|p| p.name().to_string())
            .collect()
    }
}
