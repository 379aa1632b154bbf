// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Method invocation.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, warn};

use super::{MethodContext, MethodSignature};
use crate::address_space::AddressSpace;
use crate::error::{ServerError, ServerResult};
use crate::types::{NodeId, NodeKind, Value};

/// Resolves method nodes and runs their handlers.
///
/// The node snapshot is taken under the shared lock and released before the
/// handler runs, so a mutating handler can take the exclusive lock itself.
///
/// # Failure Mapping
///
/// | Condition                         | Error              |
/// |-----------------------------------|--------------------|
/// | identifier not registered         | `NotFound`         |
/// | node is not a method              | `TypeMismatch`     |
/// | method not executable             | `AccessDenied`     |
/// | fewer inputs than declared        | `ArgumentsMissing` |
/// | wrong kind or extra input         | `InvalidArgument`  |
/// | handler panic or unexpected fault | `InternalError`    |
#[derive(Clone)]
pub struct MethodDispatcher {
    space: AddressSpace,
    stats: Arc<DispatcherStats>,
}

impl MethodDispatcher {
    /// Creates a dispatcher over `space`.
    pub fn new(space: AddressSpace) -> Self {
        Self {
            space,
            stats: Arc::new(DispatcherStats::default()),
        }
    }

    /// Returns the dispatcher statistics.
    pub fn stats(&self) -> &DispatcherStats {
        &self.stats
    }

    /// Invokes the method identified by `method_id`.
    pub fn invoke(&self, method_id: &NodeId, inputs: &[Value]) -> ServerResult<Vec<Value>> {
        self.stats.calls.fetch_add(1, Ordering::Relaxed);

        let result = self.dispatch(method_id, inputs);
        match &result {
            Ok(outputs) => {
                self.stats.succeeded.fetch_add(1, Ordering::Relaxed);
                debug!(method = %method_id, outputs = outputs.len(), "Method call completed");
            }
            Err(ServerError::InternalError { message }) => {
                self.stats.internal_errors.fetch_add(1, Ordering::Relaxed);
                error!(method = %method_id, error = %message, "Method call failed internally");
            }
            Err(e) => {
                self.stats.faults.fetch_add(1, Ordering::Relaxed);
                debug!(method = %method_id, error = %e, "Method call rejected");
            }
        }
        result
    }

    fn dispatch(&self, method_id: &NodeId, inputs: &[Value]) -> ServerResult<Vec<Value>> {
        let node = self.space.lookup(method_id)?;
        let method = node.as_method().ok_or_else(|| {
            ServerError::kind_mismatch(method_id.clone(), NodeKind::Method, node.kind())
        })?;

        if !method.executable {
            return Err(ServerError::access_denied(method_id.clone(), "call"));
        }
        check_inputs(method_id, &method.signature, inputs)?;

        let context = MethodContext::new(&self.space, method_id, node.parent.as_ref());
        let handler = Arc::clone(&method.handler);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.call(&context, inputs)));

        let outputs = match outcome {
            Ok(Ok(outputs)) => outputs,
            Ok(Err(e)) if e.is_expected_fault() => return Err(e),
            Ok(Err(ServerError::InternalError { message })) => {
                return Err(ServerError::internal(message))
            }
            Ok(Err(e)) => {
                warn!(method = %method_id, error = %e, "Unexpected handler fault");
                return Err(ServerError::internal(e.to_string()));
            }
            Err(payload) => {
                return Err(ServerError::internal(format!(
                    "handler panicked: {}",
                    panic_message(payload.as_ref())
                )))
            }
        };

        check_outputs(method_id, &method.signature, &outputs)?;
        Ok(outputs)
    }
}

impl std::fmt::Debug for MethodDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodDispatcher")
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

fn check_inputs(method_id: &NodeId, signature: &MethodSignature, inputs: &[Value]) -> ServerResult<()> {
    let declared = signature.inputs.len();
    if inputs.len() < declared {
        return Err(ServerError::arguments_missing(
            method_id.clone(),
            declared,
            inputs.len(),
        ));
    }
    if inputs.len() > declared {
        return Err(ServerError::invalid_argument(
            method_id.clone(),
            declared,
            format!("unexpected argument, method declares {}", declared),
        ));
    }

    for (index, (argument, value)) in signature.inputs.iter().zip(inputs).enumerate() {
        if value.data_type() != argument.data_type {
            return Err(ServerError::invalid_argument(
                method_id.clone(),
                index,
                format!(
                    "'{}' expects {}, got {}",
                    argument.name,
                    argument.data_type,
                    value.data_type()
                ),
            ));
        }
    }
    Ok(())
}

fn check_outputs(method_id: &NodeId, signature: &MethodSignature, outputs: &[Value]) -> ServerResult<()> {
    if outputs.len() != signature.outputs.len() {
        return Err(ServerError::internal(format!(
            "{} returned {} output(s), declares {}",
            method_id,
            outputs.len(),
            signature.outputs.len()
        )));
    }
    for (argument, value) in signature.outputs.iter().zip(outputs) {
        if value.data_type() != argument.data_type {
            return Err(ServerError::internal(format!(
                "{} output '{}' is {}, declares {}",
                method_id,
                argument.name,
                value.data_type(),
                argument.data_type
            )));
        }
    }
    Ok(())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// =============================================================================
// DispatcherStats
// =============================================================================

/// Call counters of a dispatcher.
#[derive(Debug, Default)]
pub struct DispatcherStats {
    calls: AtomicU64,
    succeeded: AtomicU64,
    faults: AtomicU64,
    internal_errors: AtomicU64,
}

/// Point-in-time copy of [`DispatcherStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatcherStatsSnapshot {
    /// Total invocations.
    pub calls: u64,
    /// Invocations that returned outputs.
    pub succeeded: u64,
    /// Invocations rejected with a client fault.
    pub faults: u64,
    /// Invocations that failed internally.
    pub internal_errors: u64,
}

impl DispatcherStats {
    /// Returns a snapshot of the counters.
    pub fn snapshot(&self) -> DispatcherStatsSnapshot {
        DispatcherStatsSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            faults: self.faults.load(Ordering::Relaxed),
            internal_errors: self.internal_errors.load(Ordering::Relaxed),
        }
    }
}
