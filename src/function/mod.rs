// src/function/mod.rs

//! Function-to-process adapter.
//!
//! Wraps an ordinary computation (a closure over data nodes) into a fully
//! tracked process: the signature is registered once at definition time and
//! reflected into a static port list, every call creates a process node,
//! and the tagged return value is normalized into outputs or a terminal
//! exit code.

pub mod process_function;
pub mod signature;

pub use process_function::{
    FunctionCall, FunctionContext, FunctionResult, ProcessFunction,
};
pub use signature::{FunctionParam, FunctionSignature, SignatureBuilder, SourceInfo};

/// Output label used when a function returns a single unnamed value.
pub const DEFAULT_OUTPUT_LABEL: &str = "result";
