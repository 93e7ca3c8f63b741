// src/errors.rs

//! Crate-wide error types and helpers.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::data::ValueKind;

/// A single problem found while checking inputs or outputs against a spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationProblem {
    MissingRequired { port: String },
    TypeMismatch {
        port: String,
        expected: ValueKind,
        actual: ValueKind,
    },
    UnknownPort { port: String },
    MissingOutput { port: String },
}

impl fmt::Display for ValidationProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationProblem::MissingRequired { port } => {
                write!(f, "required input port '{port}' was not supplied")
            }
            ValidationProblem::TypeMismatch {
                port,
                expected,
                actual,
            } => write!(
                f,
                "input port '{port}' expects {expected} but got {actual}"
            ),
            ValidationProblem::UnknownPort { port } => {
                write!(f, "'{port}' is not a declared port and the namespace is not dynamic")
            }
            ValidationProblem::MissingOutput { port } => {
                write!(f, "required output port '{port}' was never attached")
            }
        }
    }
}

/// Validation failure carrying *every* problem found in a single pass.
#[derive(Debug, Clone, Error)]
pub struct ValidationError {
    problems: Vec<ValidationProblem>,
}

impl ValidationError {
    pub fn new(problems: Vec<ValidationProblem>) -> Self {
        Self { problems }
    }

    pub fn problems(&self) -> &[ValidationProblem] {
        &self.problems
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation error: ")?;
        for (i, problem) in self.problems.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{problem}")?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum ProvrunError {
    /// Invalid definition or configuration; raised before any node exists.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Disallowed call pattern; raised synchronously before execution.
    #[error("Usage error: {0}")]
    Usage(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Unknown node: {0}")]
    UnknownNode(Uuid),

    #[error("No checkpoint stored for process {0}")]
    MissingCheckpoint(Uuid),

    /// A process handler failed at run time. The failure is persisted on the
    /// node before this error is surfaced, so `node` can be audited.
    #[error("Process {node} excepted: {source}")]
    Excepted {
        node: Uuid,
        #[source]
        source: anyhow::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ProvrunError>;
