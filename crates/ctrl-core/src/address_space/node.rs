// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Node model of the address space.
//!
//! A [`Node`] carries the attributes common to every node plus a
//! kind-specific [`NodePayload`]. Ownership (parent / children) and semantic
//! references are kept in separate fields: ownership decides where a node
//! lives in the tree, references are lookup metadata only.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::methods::{HandlerKind, MethodHandler, MethodSignature};
use crate::types::{
    AccessLevel, DataType, DataValue, NodeId, NodeKind, ReferenceKind, Value, WriteMask,
};

// =============================================================================
// Reference
// =============================================================================

/// A typed semantic edge to another node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Reference {
    /// Reference type.
    pub kind: ReferenceKind,
    /// `true` for forward references, `false` for inverse ones.
    pub is_forward: bool,
    /// The node the reference points at.
    pub target: NodeId,
}

impl Reference {
    /// Creates a forward reference.
    pub fn forward(kind: ReferenceKind, target: NodeId) -> Self {
        Self {
            kind,
            is_forward: true,
            target,
        }
    }

    /// Creates an inverse reference.
    pub fn inverse(kind: ReferenceKind, target: NodeId) -> Self {
        Self {
            kind,
            is_forward: false,
            target,
        }
    }
}

// =============================================================================
// Node
// =============================================================================

/// A node of the address space.
///
/// Nodes returned by the store are snapshots: mutating a returned node has no
/// effect on the space.
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique identifier.
    pub id: NodeId,
    /// Symbolic name used for identifier allocation.
    pub symbolic_name: String,
    /// Browse name.
    pub browse_name: String,
    /// Display name.
    pub display_name: String,
    /// Optional description.
    pub description: Option<String>,
    /// Attributes a client may change.
    pub write_mask: WriteMask,
    /// Owning parent. `None` for roots.
    pub parent: Option<NodeId>,
    /// Hierarchical reference type linking the parent to this node.
    pub parent_reference: ReferenceKind,
    /// Owned children in insertion order.
    pub children: Vec<NodeId>,
    /// Semantic references in insertion order.
    pub references: Vec<Reference>,
    /// Kind specific attributes.
    pub payload: NodePayload,
}

impl Node {
    /// Returns the node kind.
    pub fn kind(&self) -> NodeKind {
        self.payload.kind()
    }

    /// Returns the variable attributes if this is a variable.
    pub fn as_variable(&self) -> Option<&VariableAttributes> {
        match &self.payload {
            NodePayload::Variable(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the method attributes if this is a method.
    pub fn as_method(&self) -> Option<&MethodAttributes> {
        match &self.payload {
            NodePayload::Method(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the folder attributes if this is a folder.
    pub fn as_folder(&self) -> Option<&FolderAttributes> {
        match &self.payload {
            NodePayload::Folder(f) => Some(f),
            _ => None,
        }
    }

    /// Returns `true` if the node has a reference of `kind` to `target`.
    pub fn has_reference(&self, kind: ReferenceKind, is_forward: bool, target: &NodeId) -> bool {
        self.references
            .iter()
            .any(|r| r.kind == kind && r.is_forward == is_forward && &r.target == target)
    }
}

/// Kind specific node attributes.
#[derive(Debug, Clone)]
pub enum NodePayload {
    /// Folder payload.
    Folder(FolderAttributes),
    /// Variable payload.
    Variable(VariableAttributes),
    /// Method payload.
    Method(MethodAttributes),
}

impl NodePayload {
    /// Returns the node kind of this payload.
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Folder(_) => NodeKind::Folder,
            Self::Variable(_) => NodeKind::Variable,
            Self::Method(_) => NodeKind::Method,
        }
    }
}

/// Folder attributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderAttributes {
    /// Whether clients may subscribe to events on this folder.
    pub event_notifier: bool,
}

/// Variable attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableAttributes {
    /// Declared data type.
    pub data_type: DataType,
    /// Current value, timestamp and status.
    pub data_value: DataValue,
    /// Client access to the value.
    pub access_level: AccessLevel,
}

/// Method attributes.
#[derive(Clone)]
pub struct MethodAttributes {
    /// Argument signature.
    pub signature: MethodSignature,
    /// Whether clients may call the method.
    pub executable: bool,
    /// The bound handler.
    pub handler: Arc<dyn MethodHandler>,
}

impl MethodAttributes {
    /// Returns the handler kind.
    pub fn handler_kind(&self) -> HandlerKind {
        self.handler.kind()
    }
}

impl fmt::Debug for MethodAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodAttributes")
            .field("signature", &self.signature)
            .field("executable", &self.executable)
            .field("handler_kind", &self.handler.kind())
            .finish()
    }
}

// =============================================================================
// Definitions
// =============================================================================

/// Describes a folder to create.
#[derive(Debug, Clone)]
pub struct FolderDefinition {
    pub(crate) name: String,
    pub(crate) display_name: Option<String>,
    pub(crate) node_id: Option<NodeId>,
    pub(crate) event_notifier: bool,
}

impl FolderDefinition {
    /// Creates a folder definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            node_id: None,
            event_notifier: false,
        }
    }

    /// Sets the display name (defaults to the symbolic name).
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Sets the constructed identifier.
    pub fn with_node_id(mut self, node_id: NodeId) -> Self {
        self.node_id = Some(node_id);
        self
    }

    /// Marks the folder as an event notifier.
    pub fn with_event_notifier(mut self, enabled: bool) -> Self {
        self.event_notifier = enabled;
        self
    }
}

/// Describes a variable to create.
#[derive(Debug, Clone)]
pub struct VariableDefinition {
    pub(crate) name: String,
    pub(crate) data_type: DataType,
    pub(crate) initial_value: Value,
    pub(crate) access_level: AccessLevel,
    pub(crate) write_mask: WriteMask,
    pub(crate) display_name: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) node_id: Option<NodeId>,
}

impl VariableDefinition {
    /// Creates a read-write variable definition.
    pub fn new(name: impl Into<String>, data_type: DataType, initial_value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            data_type,
            initial_value: initial_value.into(),
            access_level: AccessLevel::ReadWrite,
            write_mask: WriteMask::DISPLAY_NAME | WriteMask::DESCRIPTION,
            display_name: None,
            description: None,
            node_id: None,
        }
    }

    /// Sets the access level.
    pub fn with_access_level(mut self, access_level: AccessLevel) -> Self {
        self.access_level = access_level;
        self
    }

    /// Makes the variable read-only.
    pub fn read_only(self) -> Self {
        self.with_access_level(AccessLevel::ReadOnly)
    }

    /// Sets the write mask.
    pub fn with_write_mask(mut self, write_mask: WriteMask) -> Self {
        self.write_mask = write_mask;
        self
    }

    /// Sets the display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the constructed identifier.
    pub fn with_node_id(mut self, node_id: NodeId) -> Self {
        self.node_id = Some(node_id);
        self
    }
}

/// Describes a method to create.
#[derive(Clone)]
pub struct MethodDefinition {
    pub(crate) name: String,
    pub(crate) handler: Arc<dyn MethodHandler>,
    pub(crate) signature: MethodSignature,
    pub(crate) display_name: Option<String>,
    pub(crate) node_id: Option<NodeId>,
}

impl MethodDefinition {
    /// Creates a method definition without arguments.
    pub fn new(name: impl Into<String>, handler: Arc<dyn MethodHandler>) -> Self {
        Self {
            name: name.into(),
            handler,
            signature: MethodSignature::default(),
            display_name: None,
            node_id: None,
        }
    }

    /// Sets the argument signature.
    pub fn with_signature(mut self, signature: MethodSignature) -> Self {
        self.signature = signature;
        self
    }

    /// Sets the display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Sets the constructed identifier.
    pub fn with_node_id(mut self, node_id: NodeId) -> Self {
        self.node_id = Some(node_id);
        self
    }
}

impl fmt::Debug for MethodDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDefinition")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("node_id", &self.node_id)
            .finish()
    }
}
