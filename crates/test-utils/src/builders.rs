#![allow(dead_code)]

//! Ready-made process functions shared across the integration tests.

use provrun::function::{FunctionResult, FunctionSignature, ProcessFunction};

/// `add(a, b) -> result = a + b`.
pub fn add_function() -> ProcessFunction {
    let signature = FunctionSignature::builder("add")
        .param("a")
        .param("b")
        .build()
        .expect("valid signature");
    ProcessFunction::new(signature, |ctx| {
        let a = ctx.require("a")?.as_int().unwrap_or(0);
        let b = ctx.require("b")?.as_int().unwrap_or(0);
        Ok(FunctionResult::value(a + b))
    })
}

/// `mul(a, b) -> result = a * b`.
pub fn mul_function() -> ProcessFunction {
    let signature = FunctionSignature::builder("mul")
        .param("a")
        .param("b")
        .build()
        .expect("valid signature");
    ProcessFunction::new(signature, |ctx| {
        let a = ctx.require("a")?.as_int().unwrap_or(0);
        let b = ctx.require("b")?.as_int().unwrap_or(0);
        Ok(FunctionResult::value(a * b))
    })
}

/// `return_input(data)` forwards its input node unchanged.
pub fn return_input_function() -> ProcessFunction {
    let signature = FunctionSignature::builder("return_input")
        .param("data")
        .build()
        .expect("valid signature");
    ProcessFunction::new(signature, |ctx| {
        Ok(FunctionResult::node(ctx.require("data")?.clone()))
    })
}

/// `return_kwargs(**kwargs)` forwards every bound input as an output.
pub fn return_kwargs_function() -> ProcessFunction {
    let signature = FunctionSignature::builder("return_kwargs")
        .keyword_variadic()
        .build()
        .expect("valid signature");
    ProcessFunction::new(signature, |ctx| {
        Ok(FunctionResult::multi(
            ctx.inputs()
                .iter()
                .map(|(name, node)| (name.clone(), node.clone())),
        ))
    })
}
