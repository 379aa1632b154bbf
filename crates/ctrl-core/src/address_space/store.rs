// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The shared address space store.
//!
//! [`AddressSpace`] is a cheap, clonable handle onto one tree of nodes and the
//! identifier index over it. A single `parking_lot::RwLock` covers the whole
//! space:
//!
//! - create, add-reference, write and [`AddressSpace::batch`] take it
//!   exclusively
//! - lookup and read take it shared, so a read always returns a value with
//!   the timestamp and status committed together with it
//!
//! The lock is never held across an `.await`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::node::{
    FolderAttributes, FolderDefinition, MethodAttributes, MethodDefinition, Node, NodePayload,
    Reference, VariableAttributes, VariableDefinition,
};
use crate::error::{ServerError, ServerResult};
use crate::identity::{NodeIdFactory, ParentPathFactory};
use crate::methods::MethodHandler;
use crate::types::{
    DataType, DataValue, NodeId, NodeKind, ReferenceKind, StatusCode, Value, WriteMask,
};

/// URI of the standard namespace (index 0).
pub const STANDARD_NAMESPACE_URI: &str = "http://opcfoundation.org/UA/";

/// Default capacity of the data change channel.
pub const DEFAULT_CHANGE_CAPACITY: usize = 1024;

// =============================================================================
// DataChange
// =============================================================================

/// Notification published for every committed value change.
#[derive(Debug, Clone, PartialEq)]
pub struct DataChange {
    /// The variable that changed.
    pub node_id: NodeId,
    /// The committed value.
    pub data_value: DataValue,
}

// =============================================================================
// AddressSpace
// =============================================================================

/// Handle to a shared address space.
///
/// # Examples
///
/// ```
/// use ctrl_core::address_space::AddressSpace;
/// use ctrl_core::types::{DataType, Value};
///
/// let space = AddressSpace::new("example/namespace");
/// let root = space.create_folder(None, "Controls").unwrap();
/// let mode = space
///     .create_variable(Some(&root.id), "Mode", DataType::Int16, Value::Int16(2))
///     .unwrap();
///
/// assert_eq!(mode.id.to_string(), "ns=1;s=Controls_Mode");
/// assert_eq!(space.read(&mode.id).unwrap().value, Value::Int16(2));
/// ```
#[derive(Clone)]
pub struct AddressSpace {
    shared: Arc<Shared>,
}

struct Shared {
    state: RwLock<Option<SpaceState>>,
    changes: broadcast::Sender<DataChange>,
    factory: Arc<dyn NodeIdFactory>,
    default_namespace: u16,
}

struct SpaceState {
    nodes: HashMap<NodeId, Node>,
    roots: Vec<NodeId>,
    namespaces: Vec<String>,
}

/// Node fields resolved before the identifier is allocated.
struct Draft {
    symbolic_name: String,
    display_name: String,
    description: Option<String>,
    write_mask: WriteMask,
    constructed: NodeId,
    parent_reference: ReferenceKind,
    payload: NodePayload,
}

impl AddressSpace {
    /// Creates a space with standard nodes and one application namespace.
    pub fn new(namespace_uri: impl Into<String>) -> Self {
        Self::builder().namespace_uri(namespace_uri).build()
    }

    /// Creates a builder.
    pub fn builder() -> AddressSpaceBuilder {
        AddressSpaceBuilder::new()
    }

    // =========================================================================
    // Namespaces
    // =========================================================================

    /// Returns the namespace index used for constructed identifiers.
    pub fn default_namespace(&self) -> u16 {
        self.shared.default_namespace
    }

    /// Returns the index of a registered namespace URI.
    pub fn namespace_index(&self, uri: &str) -> Option<u16> {
        let guard = self.shared.state.read();
        let state = guard.as_ref()?;
        state
            .namespaces
            .iter()
            .position(|ns| ns == uri)
            .and_then(|i| u16::try_from(i).ok())
    }

    /// Registers a namespace URI, returning its index.
    ///
    /// Registering an already known URI returns the existing index.
    pub fn register_namespace(&self, uri: impl Into<String>) -> ServerResult<u16> {
        let uri = uri.into();
        let mut guard = self.shared.state.write();
        let state = guard.as_mut().ok_or_else(released)?;
        register(&mut state.namespaces, uri)
    }

    /// Returns the namespace table.
    pub fn namespaces(&self) -> ServerResult<Vec<String>> {
        let guard = self.shared.state.read();
        let state = guard.as_ref().ok_or_else(released)?;
        Ok(state.namespaces.clone())
    }

    // =========================================================================
    // Construction
    // =========================================================================

    /// Creates a folder under `parent`, or a root when `parent` is `None`.
    pub fn create_folder(&self, parent: Option<&NodeId>, name: &str) -> ServerResult<Node> {
        self.create_folder_with(parent, FolderDefinition::new(name))
    }

    /// Creates a folder from a definition.
    pub fn create_folder_with(
        &self,
        parent: Option<&NodeId>,
        definition: FolderDefinition,
    ) -> ServerResult<Node> {
        let constructed = self.constructed_id(definition.node_id, &definition.name);
        self.insert(
            parent,
            Draft {
                display_name: definition.display_name.unwrap_or_else(|| definition.name.clone()),
                symbolic_name: definition.name,
                description: None,
                write_mask: WriteMask::NONE,
                constructed,
                parent_reference: ReferenceKind::Organizes,
                payload: NodePayload::Folder(FolderAttributes {
                    event_notifier: definition.event_notifier,
                }),
            },
        )
    }

    /// Creates a read-write variable.
    pub fn create_variable(
        &self,
        parent: Option<&NodeId>,
        name: &str,
        data_type: DataType,
        initial_value: Value,
    ) -> ServerResult<Node> {
        self.create_variable_with(parent, VariableDefinition::new(name, data_type, initial_value))
    }

    /// Creates a variable from a definition.
    ///
    /// Fails with `TypeMismatch` if the initial value kind differs from the
    /// declared data type.
    pub fn create_variable_with(
        &self,
        parent: Option<&NodeId>,
        definition: VariableDefinition,
    ) -> ServerResult<Node> {
        let constructed = self.constructed_id(definition.node_id, &definition.name);
        if definition.initial_value.data_type() != definition.data_type {
            return Err(ServerError::type_mismatch(
                constructed,
                definition.data_type,
                definition.initial_value.data_type(),
            ));
        }

        self.insert(
            parent,
            Draft {
                display_name: definition.display_name.unwrap_or_else(|| definition.name.clone()),
                symbolic_name: definition.name,
                description: definition.description,
                write_mask: definition.write_mask,
                constructed,
                parent_reference: ReferenceKind::Organizes,
                payload: NodePayload::Variable(VariableAttributes {
                    data_type: definition.data_type,
                    data_value: DataValue::new(definition.initial_value),
                    access_level: definition.access_level,
                }),
            },
        )
    }

    /// Creates a method without arguments bound to `handler`.
    pub fn create_method(
        &self,
        parent: Option<&NodeId>,
        name: &str,
        handler: Arc<dyn MethodHandler>,
    ) -> ServerResult<Node> {
        self.create_method_with(parent, MethodDefinition::new(name, handler))
    }

    /// Creates a method from a definition.
    pub fn create_method_with(
        &self,
        parent: Option<&NodeId>,
        definition: MethodDefinition,
    ) -> ServerResult<Node> {
        let constructed = self.constructed_id(definition.node_id, &definition.name);
        self.insert(
            parent,
            Draft {
                display_name: definition.display_name.unwrap_or_else(|| definition.name.clone()),
                symbolic_name: definition.name,
                description: None,
                write_mask: WriteMask::NONE,
                constructed,
                parent_reference: ReferenceKind::HasComponent,
                payload: NodePayload::Method(MethodAttributes {
                    signature: definition.signature,
                    executable: true,
                    handler: definition.handler,
                }),
            },
        )
    }

    /// Records a semantic reference from `source` to `target`.
    ///
    /// The inverse reference is mirrored on `target`. Adding the same
    /// reference twice has no effect.
    pub fn add_external_reference(
        &self,
        source: &NodeId,
        kind: ReferenceKind,
        is_forward: bool,
        target: &NodeId,
    ) -> ServerResult<()> {
        let mut guard = self.shared.state.write();
        let state = guard.as_mut().ok_or_else(released)?;

        for endpoint in [source, target] {
            if !state.nodes.contains_key(endpoint) {
                return Err(ServerError::unknown_node(endpoint.clone()));
            }
        }

        let reference = Reference {
            kind,
            is_forward,
            target: target.clone(),
        };
        let mirror = Reference {
            kind,
            is_forward: !is_forward,
            target: source.clone(),
        };

        if let Some(node) = state.nodes.get_mut(source) {
            if !node.references.contains(&reference) {
                node.references.push(reference);
            }
        }
        if let Some(node) = state.nodes.get_mut(target) {
            if !node.references.contains(&mirror) {
                node.references.push(mirror);
            }
        }

        debug!(
            source = %source,
            target = %target,
            reference = %kind,
            is_forward,
            "Reference added"
        );
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns a snapshot of the node with the given identifier.
    pub fn lookup(&self, node_id: &NodeId) -> ServerResult<Node> {
        let guard = self.shared.state.read();
        let state = guard.as_ref().ok_or_else(released)?;
        state
            .nodes
            .get(node_id)
            .cloned()
            .ok_or_else(|| ServerError::not_found(node_id.clone()))
    }

    /// Returns `true` if the identifier is registered.
    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.shared
            .state
            .read()
            .as_ref()
            .map(|state| state.nodes.contains_key(node_id))
            .unwrap_or(false)
    }

    /// Returns the children of a node in insertion order.
    pub fn children(&self, node_id: &NodeId) -> ServerResult<Vec<NodeId>> {
        self.lookup(node_id).map(|node| node.children)
    }

    /// Returns the root identifiers in insertion order.
    pub fn roots(&self) -> ServerResult<Vec<NodeId>> {
        let guard = self.shared.state.read();
        let state = guard.as_ref().ok_or_else(released)?;
        Ok(state.roots.clone())
    }

    /// Returns the number of nodes, or 0 once released.
    pub fn len(&self) -> usize {
        self.shared
            .state
            .read()
            .as_ref()
            .map(|state| state.nodes.len())
            .unwrap_or(0)
    }

    /// Returns `true` if the space holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads the current (value, timestamp, status) of a variable.
    pub fn read(&self, node_id: &NodeId) -> ServerResult<DataValue> {
        let guard = self.shared.state.read();
        let state = guard.as_ref().ok_or_else(released)?;
        variable(state, node_id).map(|attrs| attrs.data_value.clone())
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Writes a variable value on behalf of a client.
    ///
    /// Fails with `AccessDenied` for read-only variables and with
    /// `TypeMismatch` when the value kind differs from the declared type. A
    /// failed write leaves the value and timestamp unchanged.
    pub fn write(&self, node_id: &NodeId, value: Value) -> ServerResult<()> {
        self.batch(|writer| writer.write(node_id, value))?.map(|_| ())
    }

    /// Changes the display name if the write mask allows it.
    pub fn write_display_name(&self, node_id: &NodeId, display_name: &str) -> ServerResult<()> {
        let mut guard = self.shared.state.write();
        let state = guard.as_mut().ok_or_else(released)?;
        let node = state
            .nodes
            .get_mut(node_id)
            .ok_or_else(|| ServerError::not_found(node_id.clone()))?;

        if !node.write_mask.contains(WriteMask::DISPLAY_NAME) {
            return Err(ServerError::access_denied(node_id.clone(), "write display name"));
        }
        node.display_name = display_name.to_string();
        Ok(())
    }

    /// Runs `f` with exclusive access to the space.
    ///
    /// Every value committed through the writer is published to subscribers
    /// once `f` returns, in commit order.
    pub fn batch<R>(&self, f: impl FnOnce(&mut SpaceWriter<'_>) -> R) -> ServerResult<R> {
        let mut guard = self.shared.state.write();
        let state = guard.as_mut().ok_or_else(released)?;

        let mut writer = SpaceWriter {
            state,
            changes: Vec::new(),
        };
        let result = f(&mut writer);

        for change in writer.changes {
            // No receivers is not an error.
            let _ = self.shared.changes.send(change);
        }
        Ok(result)
    }

    /// Subscribes to data change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<DataChange> {
        self.shared.changes.subscribe()
    }

    /// Releases every node.
    ///
    /// Afterwards all operations fail with `Shutdown`. Returns the number of
    /// released nodes (0 if already released).
    pub fn release(&self) -> usize {
        let mut guard = self.shared.state.write();
        match guard.take() {
            Some(state) => {
                let count = state.nodes.len();
                info!(nodes = count, "Address space released");
                count
            }
            None => 0,
        }
    }

    /// Returns `true` once the space has been released.
    pub fn is_released(&self) -> bool {
        self.shared.state.read().is_none()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn constructed_id(&self, node_id: Option<NodeId>, name: &str) -> NodeId {
        node_id.unwrap_or_else(|| NodeId::string(self.shared.default_namespace, name))
    }

    fn insert(&self, parent: Option<&NodeId>, draft: Draft) -> ServerResult<Node> {
        let mut guard = self.shared.state.write();
        let state = guard.as_mut().ok_or_else(released)?;

        if let Some(parent_id) = parent {
            let parent_node = state
                .nodes
                .get(parent_id)
                .ok_or_else(|| ServerError::unknown_node(parent_id.clone()))?;
            if parent_node.kind() == NodeKind::Method {
                return Err(ServerError::kind_mismatch(
                    parent_id.clone(),
                    NodeKind::Folder,
                    NodeKind::Method,
                ));
            }
        }

        let id = self
            .shared
            .factory
            .new_id(parent, &draft.symbolic_name, &draft.constructed);
        if state.nodes.contains_key(&id) {
            return Err(ServerError::duplicate_identifier(id));
        }

        let node = Node {
            id: id.clone(),
            browse_name: draft.symbolic_name.clone(),
            symbolic_name: draft.symbolic_name,
            display_name: draft.display_name,
            description: draft.description,
            write_mask: draft.write_mask,
            parent: parent.cloned(),
            parent_reference: draft.parent_reference,
            children: Vec::new(),
            references: Vec::new(),
            payload: draft.payload,
        };

        match parent.and_then(|p| state.nodes.get_mut(p)) {
            Some(parent_node) => parent_node.children.push(id.clone()),
            None => state.roots.push(id.clone()),
        }
        state.nodes.insert(id.clone(), node.clone());

        debug!(node_id = %id, kind = %node.kind(), "Node created");
        Ok(node)
    }
}

impl std::fmt::Debug for AddressSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddressSpace")
            .field("nodes", &self.len())
            .field("default_namespace", &self.shared.default_namespace)
            .field("released", &self.is_released())
            .finish()
    }
}

// =============================================================================
// SpaceWriter
// =============================================================================

/// Exclusive view of the space inside [`AddressSpace::batch`].
pub struct SpaceWriter<'a> {
    state: &'a mut SpaceState,
    changes: Vec<DataChange>,
}

impl SpaceWriter<'_> {
    /// Reads a variable.
    pub fn read(&self, node_id: &NodeId) -> ServerResult<DataValue> {
        variable(&*self.state, node_id).map(|attrs| attrs.data_value.clone())
    }

    /// Returns the declared data type of a variable.
    pub fn data_type(&self, node_id: &NodeId) -> ServerResult<DataType> {
        variable(&*self.state, node_id).map(|attrs| attrs.data_type)
    }

    /// Writes a value on behalf of a client, honoring the access level.
    pub fn write(&mut self, node_id: &NodeId, value: Value) -> ServerResult<DataValue> {
        let attrs = variable_mut(self.state, node_id)?;
        if !attrs.access_level.is_writable() {
            return Err(ServerError::access_denied(node_id.clone(), "write value"));
        }
        self.set_value(node_id, value)
    }

    /// Sets a value on behalf of the server, ignoring the access level.
    ///
    /// Value and timestamp are replaced together; the timestamp is strictly
    /// greater than the previous one.
    pub fn set_value(&mut self, node_id: &NodeId, value: Value) -> ServerResult<DataValue> {
        let attrs = variable_mut(self.state, node_id)?;
        if value.data_type() != attrs.data_type {
            return Err(ServerError::type_mismatch(
                node_id.clone(),
                attrs.data_type,
                value.data_type(),
            ));
        }

        let now = Utc::now();
        let previous = attrs.data_value.source_timestamp;
        let source_timestamp = if now > previous {
            now
        } else {
            previous + chrono::Duration::microseconds(1)
        };

        attrs.data_value = DataValue {
            value,
            source_timestamp,
            status: StatusCode::GOOD,
        };

        let data_value = attrs.data_value.clone();
        self.changes.push(DataChange {
            node_id: node_id.clone(),
            data_value: data_value.clone(),
        });
        Ok(data_value)
    }

    /// Sets the status of a variable without touching its value.
    ///
    /// No change is published, and the next `set_value` resets it to `GOOD`.
    pub fn set_status(&mut self, node_id: &NodeId, status: StatusCode) -> ServerResult<()> {
        variable_mut(self.state, node_id)?.data_value.status = status;
        Ok(())
    }
}

// =============================================================================
// AddressSpaceBuilder
// =============================================================================

/// Builder for [`AddressSpace`].
pub struct AddressSpaceBuilder {
    namespaces: Vec<String>,
    factory: Arc<dyn NodeIdFactory>,
    standard_nodes: bool,
    change_capacity: usize,
}

impl AddressSpaceBuilder {
    /// Creates a builder with the standard namespace only.
    pub fn new() -> Self {
        Self {
            namespaces: vec![STANDARD_NAMESPACE_URI.to_string()],
            factory: Arc::new(ParentPathFactory),
            standard_nodes: true,
            change_capacity: DEFAULT_CHANGE_CAPACITY,
        }
    }

    /// Registers a namespace. The last one registered becomes the default.
    pub fn namespace_uri(mut self, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        if !self.namespaces.contains(&uri) {
            self.namespaces.push(uri);
        }
        self
    }

    /// Sets the identifier policy.
    pub fn factory(mut self, factory: Arc<dyn NodeIdFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Enables or disables seeding of the Root and Objects folders.
    pub fn standard_nodes(mut self, enabled: bool) -> Self {
        self.standard_nodes = enabled;
        self
    }

    /// Sets the data change channel capacity.
    pub fn change_capacity(mut self, capacity: usize) -> Self {
        self.change_capacity = capacity.max(1);
        self
    }

    /// Builds the address space.
    pub fn build(self) -> AddressSpace {
        let default_namespace = u16::try_from(self.namespaces.len().saturating_sub(1))
            .unwrap_or(u16::MAX);
        let mut state = SpaceState {
            nodes: HashMap::new(),
            roots: Vec::new(),
            namespaces: self.namespaces,
        };
        if self.standard_nodes {
            seed_standard_nodes(&mut state);
        }

        let (changes, _) = broadcast::channel(self.change_capacity);
        AddressSpace {
            shared: Arc::new(Shared {
                state: RwLock::new(Some(state)),
                changes,
                factory: self.factory,
                default_namespace,
            }),
        }
    }
}

impl Default for AddressSpaceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn released() -> ServerError {
    ServerError::shutdown("address space released")
}

fn register(namespaces: &mut Vec<String>, uri: String) -> ServerResult<u16> {
    let index = match namespaces.iter().position(|ns| *ns == uri) {
        Some(index) => index,
        None => {
            namespaces.push(uri);
            namespaces.len() - 1
        }
    };
    u16::try_from(index).map_err(|_| ServerError::internal("namespace table full"))
}

fn variable<'s>(state: &'s SpaceState, node_id: &NodeId) -> ServerResult<&'s VariableAttributes> {
    let node = state
        .nodes
        .get(node_id)
        .ok_or_else(|| ServerError::not_found(node_id.clone()))?;
    match &node.payload {
        NodePayload::Variable(attrs) => Ok(attrs),
        other => Err(ServerError::kind_mismatch(
            node_id.clone(),
            NodeKind::Variable,
            other.kind(),
        )),
    }
}

fn variable_mut<'s>(
    state: &'s mut SpaceState,
    node_id: &NodeId,
) -> ServerResult<&'s mut VariableAttributes> {
    let node = state
        .nodes
        .get_mut(node_id)
        .ok_or_else(|| ServerError::not_found(node_id.clone()))?;
    match &mut node.payload {
        NodePayload::Variable(attrs) => Ok(attrs),
        other => Err(ServerError::kind_mismatch(
            node_id.clone(),
            NodeKind::Variable,
            other.kind(),
        )),
    }
}

fn standard_folder(id: NodeId, name: &str, parent: Option<NodeId>) -> Node {
    Node {
        id,
        symbolic_name: name.to_string(),
        browse_name: name.to_string(),
        display_name: name.to_string(),
        description: None,
        write_mask: WriteMask::NONE,
        parent,
        parent_reference: ReferenceKind::Organizes,
        children: Vec::new(),
        references: Vec::new(),
        payload: NodePayload::Folder(FolderAttributes::default()),
    }
}

fn seed_standard_nodes(state: &mut SpaceState) {
    let mut root = standard_folder(NodeId::ROOT_FOLDER, "Root", None);
    root.children.push(NodeId::OBJECTS_FOLDER);
    let objects = standard_folder(NodeId::OBJECTS_FOLDER, "Objects", Some(NodeId::ROOT_FOLDER));

    state.roots.push(NodeId::ROOT_FOLDER);
    state.nodes.insert(NodeId::ROOT_FOLDER, root);
    state.nodes.insert(NodeId::OBJECTS_FOLDER, objects);
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::FnHandler;

    fn space() -> AddressSpace {
        AddressSpace::new("example/namespace")
    }

    fn noop() -> Arc<dyn MethodHandler> {
        FnHandler::pure(|_, _| Ok(Vec::new()))
    }

    #[test]
    fn test_standard_nodes_seeded() {
        let space = space();
        let objects = space.lookup(&NodeId::OBJECTS_FOLDER).unwrap();
        assert_eq!(objects.parent, Some(NodeId::ROOT_FOLDER));
        assert_eq!(space.roots().unwrap(), vec![NodeId::ROOT_FOLDER]);
        assert_eq!(space.len(), 2);
    }

    #[test]
    fn test_namespaces() {
        let space = space();
        assert_eq!(space.default_namespace(), 1);
        assert_eq!(space.namespace_index(STANDARD_NAMESPACE_URI), Some(0));
        assert_eq!(space.namespace_index("example/namespace"), Some(1));
        assert_eq!(space.register_namespace("urn:other").unwrap(), 2);
        assert_eq!(space.register_namespace("urn:other").unwrap(), 2);
    }

    #[test]
    fn test_create_tree_allocates_path_ids() {
        let space = space();
        let root = space.create_folder(None, "Controls").unwrap();
        let sensors = space.create_folder(Some(&root.id), "Sensors").unwrap();
        let pressure = space
            .create_variable(Some(&sensors.id), "Pressure", DataType::Float, Value::Float(0.0))
            .unwrap();
        let stop = space.create_method(Some(&root.id), "Stop", noop()).unwrap();

        assert_eq!(root.id, NodeId::string(1, "Controls"));
        assert_eq!(sensors.id, NodeId::string(1, "Controls_Sensors"));
        assert_eq!(pressure.id, NodeId::string(1, "Controls_Sensors_Pressure"));
        assert_eq!(stop.parent_reference, ReferenceKind::HasComponent);

        let root = space.lookup(&root.id).unwrap();
        assert_eq!(root.children, vec![sensors.id.clone(), stop.id.clone()]);
        assert!(space.roots().unwrap().contains(&root.id));
        assert_eq!(space.lookup(&pressure.id).unwrap().parent, Some(sensors.id));
    }

    #[test]
    fn test_duplicate_leaves_store_unchanged() {
        let space = space();
        let root = space.create_folder(None, "Controls").unwrap();
        space
            .create_variable(Some(&root.id), "Mode", DataType::Int16, Value::Int16(2))
            .unwrap();
        let before = space.len();

        let err = space
            .create_variable(Some(&root.id), "Mode", DataType::Int16, Value::Int16(5))
            .unwrap_err();
        assert!(matches!(err, ServerError::DuplicateIdentifier { .. }));
        assert_eq!(space.len(), before);
        assert_eq!(space.lookup(&root.id).unwrap().children.len(), 1);
        assert_eq!(
            space.read(&NodeId::string(1, "Controls_Mode")).unwrap().value,
            Value::Int16(2)
        );
    }

    #[test]
    fn test_unknown_parent() {
        let space = space();
        let err = space
            .create_folder(Some(&NodeId::string(1, "Missing")), "X")
            .unwrap_err();
        assert!(matches!(err, ServerError::UnknownNode { .. }));
        assert_eq!(space.len(), 2);
    }

    #[test]
    fn test_method_cannot_own_children() {
        let space = space();
        let stop = space.create_method(None, "Stop", noop()).unwrap();
        let err = space.create_folder(Some(&stop.id), "Inner").unwrap_err();
        assert!(matches!(err, ServerError::TypeMismatch { .. }));
    }

    #[test]
    fn test_initial_value_must_match_type() {
        let space = space();
        let err = space
            .create_variable(None, "Bad", DataType::Int16, Value::Double(1.0))
            .unwrap_err();
        assert!(matches!(err, ServerError::TypeMismatch { .. }));
        assert!(!space.contains(&NodeId::string(1, "Bad")));
    }

    #[test]
    fn test_external_reference_is_mirrored() {
        let space = space();
        let root = space.create_folder(None, "Controls").unwrap();
        space
            .add_external_reference(&root.id, ReferenceKind::Organizes, false, &NodeId::OBJECTS_FOLDER)
            .unwrap();
        space
            .add_external_reference(&root.id, ReferenceKind::Organizes, false, &NodeId::OBJECTS_FOLDER)
            .unwrap();

        let root = space.lookup(&root.id).unwrap();
        let objects = space.lookup(&NodeId::OBJECTS_FOLDER).unwrap();
        assert_eq!(root.references.len(), 1);
        assert!(root.has_reference(ReferenceKind::Organizes, false, &NodeId::OBJECTS_FOLDER));
        assert!(objects.has_reference(ReferenceKind::Organizes, true, &root.id));
        // Ownership is untouched by semantic references.
        assert!(objects.children.is_empty());
        assert_eq!(root.parent, None);
    }

    #[test]
    fn test_external_reference_unknown_endpoint() {
        let space = space();
        let err = space
            .add_external_reference(
                &NodeId::OBJECTS_FOLDER,
                ReferenceKind::Organizes,
                true,
                &NodeId::string(1, "Nope"),
            )
            .unwrap_err();
        assert!(matches!(err, ServerError::UnknownNode { .. }));
    }

    #[test]
    fn test_lookup_not_found() {
        let err = space().lookup(&NodeId::string(1, "Nope")).unwrap_err();
        assert!(matches!(err, ServerError::NotFound { .. }));
    }

    #[test]
    fn test_write_type_mismatch_keeps_value() {
        let space = space();
        let mode = space
            .create_variable(None, "Mode", DataType::Int16, Value::Int16(2))
            .unwrap();
        let before = space.read(&mode.id).unwrap();

        let err = space.write(&mode.id, Value::Double(1.0)).unwrap_err();
        assert!(matches!(err, ServerError::TypeMismatch { .. }));
        assert_eq!(space.read(&mode.id).unwrap(), before);
    }

    #[test]
    fn test_write_read_only_denied() {
        let space = space();
        let node = space
            .create_variable_with(
                None,
                VariableDefinition::new("Serial", DataType::String, "A-1").read_only(),
            )
            .unwrap();
        let err = space.write(&node.id, Value::from("B-2")).unwrap_err();
        assert!(matches!(err, ServerError::AccessDenied { .. }));
        assert_eq!(space.read(&node.id).unwrap().value, Value::from("A-1"));
    }

    #[test]
    fn test_server_side_set_ignores_access_level() {
        let space = space();
        let node = space
            .create_variable_with(
                None,
                VariableDefinition::new("Serial", DataType::String, "A-1").read_only(),
            )
            .unwrap();
        space
            .batch(|w| w.set_value(&node.id, Value::from("B-2")))
            .unwrap()
            .unwrap();
        assert_eq!(space.read(&node.id).unwrap().value, Value::from("B-2"));
    }

    #[test]
    fn test_read_on_folder_is_type_mismatch() {
        let space = space();
        let err = space.read(&NodeId::OBJECTS_FOLDER).unwrap_err();
        assert!(matches!(err, ServerError::TypeMismatch { .. }));
    }

    #[test]
    fn test_timestamps_strictly_increase() {
        let space = space();
        let node = space
            .create_variable(None, "Counter", DataType::Int32, Value::Int32(0))
            .unwrap();
        let mut last = space.read(&node.id).unwrap().source_timestamp;
        for i in 1..200 {
            space.write(&node.id, Value::Int32(i)).unwrap();
            let current = space.read(&node.id).unwrap().source_timestamp;
            assert!(current > last);
            last = current;
        }
    }

    #[test]
    fn test_write_display_name_honors_mask() {
        let space = space();
        let var = space
            .create_variable(None, "Temperature", DataType::Float, Value::Float(0.0))
            .unwrap();
        space.write_display_name(&var.id, "Temp").unwrap();
        assert_eq!(space.lookup(&var.id).unwrap().display_name, "Temp");

        let folder = space.create_folder(None, "Controls").unwrap();
        let err = space.write_display_name(&folder.id, "Other").unwrap_err();
        assert!(matches!(err, ServerError::AccessDenied { .. }));
    }

    #[tokio::test]
    async fn test_changes_published() {
        let space = space();
        let mut rx = space.subscribe();
        let node = space
            .create_variable(None, "Mode", DataType::Int16, Value::Int16(2))
            .unwrap();
        space.write(&node.id, Value::Int16(0)).unwrap();

        let change = rx.recv().await.unwrap();
        assert_eq!(change.node_id, node.id);
        assert_eq!(change.data_value.value, Value::Int16(0));
    }

    #[test]
    fn test_release() {
        let space = space();
        let root = space.create_folder(None, "Controls").unwrap();
        assert_eq!(space.release(), 3);
        assert!(space.is_released());
        assert_eq!(space.release(), 0);
        assert!(matches!(
            space.lookup(&root.id).unwrap_err(),
            ServerError::Shutdown { .. }
        ));
        assert!(space.create_folder(None, "Again").is_err());
        assert!(space.batch(|_| ()).is_err());
        assert_eq!(space.len(), 0);
    }

    #[test]
    fn test_clones_share_state() {
        let space = space();
        let other = space.clone();
        let root = space.create_folder(None, "Controls").unwrap();
        assert!(other.contains(&root.id));
    }
}
