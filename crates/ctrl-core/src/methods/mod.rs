// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Method handlers and invocation.
//!
//! A method node is bound to a [`MethodHandler`] when it is created. Calls
//! go through the [`MethodDispatcher`], which resolves the node, checks the
//! inputs against the declared [`MethodSignature`] and runs the handler.
//!
//! # Handler Kinds
//!
//! - [`HandlerKind::Pure`]: computes outputs from inputs only
//! - [`HandlerKind::Mutating`]: changes variables through the
//!   [`MethodContext`], which takes the space-wide lock per operation
//!
//! The dispatcher never holds the address space lock while a handler runs.

mod dispatcher;

pub use dispatcher::{DispatcherStats, DispatcherStatsSnapshot, MethodDispatcher};

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::address_space::AddressSpace;
use crate::error::ServerResult;
use crate::types::{DataType, DataValue, NodeId, Value};

// =============================================================================
// Signature
// =============================================================================

/// Declaration of one method argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    /// Argument name.
    pub name: String,
    /// Expected data type.
    pub data_type: DataType,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Argument {
    /// Creates an argument.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            description: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Input and output arguments of a method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSignature {
    /// Input arguments in call order.
    pub inputs: Vec<Argument>,
    /// Output arguments in result order.
    pub outputs: Vec<Argument>,
}

impl MethodSignature {
    /// Creates an empty signature.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an input argument.
    pub fn input(mut self, argument: Argument) -> Self {
        self.inputs.push(argument);
        self
    }

    /// Appends an output argument.
    pub fn output(mut self, argument: Argument) -> Self {
        self.outputs.push(argument);
        self
    }
}

// =============================================================================
// Handler
// =============================================================================

/// Whether a handler touches shared variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandlerKind {
    /// Outputs depend on inputs only.
    Pure,
    /// Writes variables of the address space.
    Mutating,
}

/// Access to the address space granted to a running handler.
pub struct MethodContext<'a> {
    space: &'a AddressSpace,
    method_id: &'a NodeId,
    owner: Option<&'a NodeId>,
}

impl<'a> MethodContext<'a> {
    pub(crate) fn new(
        space: &'a AddressSpace,
        method_id: &'a NodeId,
        owner: Option<&'a NodeId>,
    ) -> Self {
        Self {
            space,
            method_id,
            owner,
        }
    }

    /// Returns the method being invoked.
    pub fn method_id(&self) -> &NodeId {
        self.method_id
    }

    /// Returns the node owning the method.
    pub fn owner(&self) -> Option<&NodeId> {
        self.owner
    }

    /// Reads a variable.
    pub fn read(&self, node_id: &NodeId) -> ServerResult<DataValue> {
        self.space.read(node_id)
    }

    /// Sets a variable value on behalf of the server.
    ///
    /// Unlike a client write this ignores the access level; the value kind
    /// must still match the declared type.
    pub fn set_value(&self, node_id: &NodeId, value: Value) -> ServerResult<DataValue> {
        self.space.batch(|writer| writer.set_value(node_id, value))?
    }
}

/// A function bound to a method node.
pub trait MethodHandler: Send + Sync {
    /// Returns the handler kind.
    fn kind(&self) -> HandlerKind;

    /// Runs the handler with inputs already checked against the signature.
    fn call(&self, context: &MethodContext<'_>, inputs: &[Value]) -> ServerResult<Vec<Value>>;
}

/// Adapts a closure into a [`MethodHandler`].
pub struct FnHandler<F> {
    kind: HandlerKind,
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&MethodContext<'_>, &[Value]) -> ServerResult<Vec<Value>> + Send + Sync + 'static,
{
    /// Wraps a pure closure.
    pub fn pure(f: F) -> Arc<dyn MethodHandler> {
        Arc::new(Self {
            kind: HandlerKind::Pure,
            f,
        })
    }

    /// Wraps a mutating closure.
    pub fn mutating(f: F) -> Arc<dyn MethodHandler> {
        Arc::new(Self {
            kind: HandlerKind::Mutating,
            f,
        })
    }
}

impl<F> MethodHandler for FnHandler<F>
where
    F: Fn(&MethodContext<'_>, &[Value]) -> ServerResult<Vec<Value>> + Send + Sync + 'static,
{
    fn kind(&self) -> HandlerKind {
        self.kind
    }

    fn call(&self, context: &MethodContext<'_>, inputs: &[Value]) -> ServerResult<Vec<Value>> {
        (self.f)(context, inputs)
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").field("kind", &self.kind).finish()
    }
}
