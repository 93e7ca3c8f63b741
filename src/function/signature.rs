// src/function/signature.rs

//! Static registration of a function's parameter list.
//!
//! The signature is declared once, when the process function is defined;
//! nothing is reflected per call. Declaring a variadic positional parameter
//! fails here, at definition time, because arity must be statically known.

use std::panic::Location;

use crate::data::{DataValue, ValueKind};
use crate::errors::{ProvrunError, Result};

/// Source location of a function definition.
///
/// Captured once when the signature is built and copied onto every node the
/// function produces; never re-derived from a possibly-changed file.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub file: String,
    pub name: String,
    pub line: u32,
}

/// A single declared parameter.
#[derive(Debug, Clone)]
pub struct FunctionParam {
    name: String,
    default: Option<DataValue>,
    kind: Option<ValueKind>,
}

impl FunctionParam {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default(&self) -> Option<&DataValue> {
        self.default.as_ref()
    }

    pub fn kind(&self) -> Option<ValueKind> {
        self.kind
    }
}

/// Immutable parameter list of a process function.
#[derive(Debug, Clone)]
pub struct FunctionSignature {
    name: String,
    params: Vec<FunctionParam>,
    keyword_variadic: bool,
    source: SourceInfo,
}

impl FunctionSignature {
    /// Start declaring a signature. The caller's source location is
    /// captured here.
    #[track_caller]
    pub fn builder(name: impl Into<String>) -> SignatureBuilder {
        let name = name.into();
        let location = Location::caller();
        SignatureBuilder {
            source: SourceInfo {
                file: location.file().to_string(),
                name: name.clone(),
                line: location.line(),
            },
            name,
            params: Vec::new(),
            variadic_positional: false,
            keyword_variadic: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[FunctionParam] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&FunctionParam> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Whether undeclared keyword arguments are accepted.
    pub fn is_keyword_variadic(&self) -> bool {
        self.keyword_variadic
    }

    pub fn source(&self) -> &SourceInfo {
        &self.source
    }
}

pub struct SignatureBuilder {
    name: String,
    params: Vec<FunctionParam>,
    variadic_positional: bool,
    keyword_variadic: bool,
    source: SourceInfo,
}

impl SignatureBuilder {
    /// A parameter without a default: becomes a required input port.
    pub fn param(mut self, name: impl Into<String>) -> Self {
        self.params.push(FunctionParam {
            name: name.into(),
            default: None,
            kind: None,
        });
        self
    }

    /// A parameter constrained to values of `kind`.
    pub fn typed_param(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.params.push(FunctionParam {
            name: name.into(),
            default: None,
            kind: Some(kind),
        });
        self
    }

    /// A parameter with a default: becomes an optional port whose default
    /// is `default` wrapped as a data node at bind time.
    pub fn param_with_default(
        mut self,
        name: impl Into<String>,
        default: impl Into<DataValue>,
    ) -> Self {
        self.params.push(FunctionParam {
            name: name.into(),
            default: Some(default.into()),
            kind: None,
        });
        self
    }

    /// Declare a variadic positional parameter. Always rejected by
    /// [`SignatureBuilder::build`].
    pub fn variadic_positional(mut self) -> Self {
        self.variadic_positional = true;
        self
    }

    /// Accept undeclared keyword arguments (dynamic input namespace).
    pub fn keyword_variadic(mut self) -> Self {
        self.keyword_variadic = true;
        self
    }

    pub fn build(self) -> Result<FunctionSignature> {
        if self.variadic_positional {
            return Err(ProvrunError::Configuration(format!(
                "function '{}' declares a variadic positional parameter; \
                 arity must be statically known",
                self.name
            )));
        }

        let mut seen_default = false;
        for (i, param) in self.params.iter().enumerate() {
            if self.params[..i].iter().any(|p| p.name == param.name) {
                return Err(ProvrunError::Configuration(format!(
                    "function '{}' declares parameter '{}' twice",
                    self.name, param.name
                )));
            }
            if param.default.is_some() {
                seen_default = true;
            } else if seen_default {
                return Err(ProvrunError::Configuration(format!(
                    "function '{}': parameter '{}' without default follows a \
                     parameter with one",
                    self.name, param.name
                )));
            }
        }

        Ok(FunctionSignature {
            name: self.name,
            params: self.params,
            keyword_variadic: self.keyword_variadic,
            source: self.source,
        })
    }
}
