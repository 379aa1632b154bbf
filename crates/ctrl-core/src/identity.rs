// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Node identifier assignment.
//!
//! When a node is inserted into the address space, its final identifier is
//! produced by a [`NodeIdFactory`] from the parent identifier and the
//! child's symbolic name. The default [`ParentPathFactory`] builds path-like
//! string identifiers:
//!
//! ```text
//! ns=2;s=Controls
//! └── ns=2;s=Controls_Sensors
//!     └── ns=2;s=Controls_Sensors_Pressure
//! ```
//!
//! Uniqueness follows from unique symbolic names per parent. Two siblings
//! sharing a name produce the same identifier, which the store rejects as a
//! duplicate.

use crate::types::{NodeId, NodeIdentifier};

/// Separator placed between the parent identifier and the symbolic name.
pub const PATH_SEPARATOR: char = '_';

/// Produces the identifier of a node being inserted.
pub trait NodeIdFactory: Send + Sync {
    /// Returns the identifier for a node named `symbolic_name` under `parent`.
    ///
    /// `constructed` is the identifier the node was built with. It is used
    /// whenever the policy has nothing better to offer.
    fn new_id(&self, parent: Option<&NodeId>, symbolic_name: &str, constructed: &NodeId) -> NodeId;
}

/// Derives child identifiers from the parent's string identifier.
///
/// # Examples
///
/// ```
/// use ctrl_core::identity::{NodeIdFactory, ParentPathFactory};
/// use ctrl_core::types::NodeId;
///
/// let factory = ParentPathFactory;
/// let parent = NodeId::string(2, "Controls");
/// let id = factory.new_id(Some(&parent), "Mode", &NodeId::string(2, "Mode"));
/// assert_eq!(id, NodeId::string(2, "Controls_Mode"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ParentPathFactory;

impl NodeIdFactory for ParentPathFactory {
    fn new_id(&self, parent: Option<&NodeId>, symbolic_name: &str, constructed: &NodeId) -> NodeId {
        match parent {
            Some(NodeId {
                namespace_index,
                identifier: NodeIdentifier::String(parent_id),
            }) => NodeId::string(
                *namespace_index,
                format!("{}{}{}", parent_id, PATH_SEPARATOR, symbolic_name),
            ),
            _ => constructed.clone(),
        }
    }
}

/// Keeps every constructed identifier unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstructedIdFactory;

impl NodeIdFactory for ConstructedIdFactory {
    fn new_id(&self, _parent: Option<&NodeId>, _symbolic_name: &str, constructed: &NodeId) -> NodeId {
        constructed.clone()
    }
}
