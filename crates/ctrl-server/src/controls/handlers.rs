// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Handlers of the `Stop` and `Start` methods.

use std::sync::Arc;

use tracing::info;

use ctrl_core::methods::{Argument, FnHandler, MethodHandler, MethodSignature};
use ctrl_core::{DataType, NodeId, ServerError, Value};

/// Initial value of `Mode`.
pub const MODE_INITIAL: i16 = 2;

/// Value written to `Mode` by `Stop`.
pub const MODE_STOPPED: i16 = 0;

/// Returns the `Stop` handler, bound to the `Mode` variable it resets.
pub fn stop(mode: NodeId) -> Arc<dyn MethodHandler> {
    FnHandler::mutating(move |context, _inputs| {
        context.set_value(&mode, Value::Int16(MODE_STOPPED))?;
        info!(method = %context.method_id(), mode = %mode, "Stop requested");
        Ok(Vec::new())
    })
}

/// Returns the `Start` handler: the product of its two inputs.
pub fn start() -> Arc<dyn MethodHandler> {
    FnHandler::pure(|context, inputs| match inputs {
        [Value::Double(a), Value::Double(b)] => Ok(vec![Value::Double(a * b)]),
        _ => Err(ServerError::internal(format!(
            "{} called with unchecked inputs",
            context.method_id()
        ))),
    })
}

/// Signature of `Start`.
pub fn start_signature() -> MethodSignature {
    MethodSignature::new()
        .input(Argument::new("a", DataType::Double).with_description("First factor"))
        .input(Argument::new("b", DataType::Double).with_description("Second factor"))
        .output(Argument::new("result", DataType::Double).with_description("a * b"))
}
