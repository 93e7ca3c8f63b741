// src/process/mod.rs

//! Process definition and execution.
//!
//! - [`spec`] declares the static input/output ports and named exit codes of
//!   a process type.
//! - [`traits`] is the `Process` trait implemented by every executable
//!   process type.
//! - [`context`] is the execution context threaded explicitly through
//!   handler invocations.
//! - [`instance`] is the lifecycle state machine driving a single process.
//! - [`checkpoint`] persists suspended instances for later resumption.

pub mod checkpoint;
pub mod context;
pub mod instance;
pub mod spec;
pub mod traits;

pub use checkpoint::{Checkpoint, CheckpointStore, FileCheckpointStore, MemoryCheckpointStore};
pub use context::{OutputValue, ProcessContext};
pub use instance::{LaunchOptions, ProcessInstance, StepOutcome};
pub use spec::{Port, PortNamespace, ProcessSpec};
pub use traits::{Completion, HandlerOutcome, Process};
