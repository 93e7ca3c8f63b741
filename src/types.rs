use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a process.
///
/// Transitions are driven exclusively by the owning process instance:
///
/// `Created → Running → {Waiting ⇄ Running}* → {Finished, Excepted, Killed}`
///
/// The three rightmost states are terminal; reaching one of them seals the
/// backing node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    Created,
    Running,
    Waiting,
    Finished,
    Excepted,
    Killed,
}

impl ProcessState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProcessState::Finished | ProcessState::Excepted | ProcessState::Killed
        )
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessState::Created => "created",
            ProcessState::Running => "running",
            ProcessState::Waiting => "waiting",
            ProcessState::Finished => "finished",
            ProcessState::Excepted => "excepted",
            ProcessState::Killed => "killed",
        };
        f.write_str(s)
    }
}

impl FromStr for ProcessState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "created" => Ok(ProcessState::Created),
            "running" => Ok(ProcessState::Running),
            "waiting" => Ok(ProcessState::Waiting),
            "finished" => Ok(ProcessState::Finished),
            "excepted" => Ok(ProcessState::Excepted),
            "killed" => Ok(ProcessState::Killed),
            other => Err(format!("invalid process state: {other}")),
        }
    }
}

/// Exit code of a finished process: a status plus a human-readable message.
///
/// Status `0` always denotes success and is never declared explicitly in a
/// process specification; named exit codes carry a nonzero status and mark a
/// completed-but-abnormal outcome, distinct from an excepted process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitCode {
    pub status: u32,
    pub message: String,
}

impl ExitCode {
    pub fn new(status: u32, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// The implicit success code.
    pub fn success() -> Self {
        Self {
            status: 0,
            message: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 0
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "exit code {}", self.status)
        } else {
            write!(f, "exit code {} ({})", self.status, self.message)
        }
    }
}

/// Type of a provenance link between two nodes.
///
/// - `Create`: a process produced a brand new data node.
/// - `Return`: a process forwards an already existing node as its own output.
/// - `InputCalc` / `InputWork`: data consumed by a calculation-like or
///   workflow-like process respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    Create,
    Return,
    InputCalc,
    InputWork,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkType::Create => "create",
            LinkType::Return => "return",
            LinkType::InputCalc => "input_calc",
            LinkType::InputWork => "input_work",
        };
        f.write_str(s)
    }
}

impl FromStr for LinkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "create" => Ok(LinkType::Create),
            "return" => Ok(LinkType::Return),
            "input_calc" => Ok(LinkType::InputCalc),
            "input_work" => Ok(LinkType::InputWork),
            other => Err(format!("invalid link type: {other}")),
        }
    }
}

/// Flavour of a process, deciding which link type its consumed inputs get.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessKind {
    /// Calculation-like: consumes via `InputCalc` links.
    Calculation,
    /// Workflow-like: consumes via `InputWork` links.
    Workflow,
}

impl ProcessKind {
    pub fn input_link(self) -> LinkType {
        match self {
            ProcessKind::Calculation => LinkType::InputCalc,
            ProcessKind::Workflow => LinkType::InputWork,
        }
    }
}

/// Mode for storing process checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckpointStorageMode {
    /// Store checkpoints as files under a checkpoint directory.
    File,
    /// Store checkpoints in memory only (lost on restart).
    Memory,
}

impl Default for CheckpointStorageMode {
    fn default() -> Self {
        CheckpointStorageMode::Memory
    }
}

impl FromStr for CheckpointStorageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(CheckpointStorageMode::File),
            "memory" => Ok(CheckpointStorageMode::Memory),
            other => Err(format!(
                "invalid checkpoint storage mode: {other} (expected \"file\" or \"memory\")"
            )),
        }
    }
}
