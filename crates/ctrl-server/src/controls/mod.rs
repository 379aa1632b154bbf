// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The `Controls` node set.
//!
//! ```text
//! Controls                      folder, event notifier
//! ├── Sensors                   folder
//! │   └── Pressure              Float, simulated
//! ├── Temperature               Float, simulated
//! ├── Mode                      Int16 = 2
//! ├── Stop()                    sets Mode to 0
//! └── Start(a, b) -> result     a * b
//! ```
//!
//! Only the root is mandatory. Every other node is created best-effort: a
//! failure is logged and the remaining nodes are still built.

pub mod handlers;

use tracing::{info, warn};

use ctrl_core::address_space::{FolderDefinition, MethodDefinition, VariableDefinition};
use ctrl_core::{AddressSpace, DataType, Node, NodeId, ReferenceKind, ServerError, ServerResult, Value};

/// Namespace URI of the node set.
pub const NAMESPACE_URI: &str = "example/namespace";

/// Symbolic name of the root folder.
pub const ROOT_NAME: &str = "Controls";

/// Identifiers of the created nodes. Optional nodes are `None` when their
/// creation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlsNodes {
    /// `Controls`
    pub root: NodeId,
    /// `Controls_Sensors`
    pub sensors: Option<NodeId>,
    /// `Controls_Sensors_Pressure`
    pub pressure: Option<NodeId>,
    /// `Controls_Temperature`
    pub temperature: Option<NodeId>,
    /// `Controls_Mode`
    pub mode: Option<NodeId>,
    /// `Controls_Stop`
    pub stop: Option<NodeId>,
    /// `Controls_Start`
    pub start: Option<NodeId>,
}

impl ControlsNodes {
    /// Returns the variables driven by the update engine.
    pub fn simulated(&self) -> Vec<NodeId> {
        [&self.pressure, &self.temperature]
            .into_iter()
            .flatten()
            .cloned()
            .collect()
    }

    /// Returns the number of created nodes.
    pub fn len(&self) -> usize {
        1 + [
            &self.sensors,
            &self.pressure,
            &self.temperature,
            &self.mode,
            &self.stop,
            &self.start,
        ]
        .iter()
        .filter(|n| n.is_some())
        .count()
    }

    /// Always `false`; the root exists.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Builds the node set in the default namespace of `space`.
///
/// Fails with `StartupFailure` when the root cannot be created or linked to
/// the Objects folder.
pub fn build(space: &AddressSpace) -> ServerResult<ControlsNodes> {
    let root = space
        .create_folder_with(None, FolderDefinition::new(ROOT_NAME).with_event_notifier(true))
        .map_err(|e| ServerError::startup(format!("cannot create root node: {}", e)))?
        .id;
    space
        .add_external_reference(&root, ReferenceKind::Organizes, false, &NodeId::OBJECTS_FOLDER)
        .map_err(|e| ServerError::startup(format!("cannot link root node: {}", e)))?;

    let sensors = optional("Sensors", space.create_folder(Some(&root), "Sensors"));
    let pressure = sensors.as_ref().and_then(|sensors| {
        optional(
            "Pressure",
            space.create_variable_with(Some(sensors), variable("Pressure", DataType::Float, 0.0f32)),
        )
    });
    let temperature = optional(
        "Temperature",
        space.create_variable_with(Some(&root), variable("Temperature", DataType::Float, 0.0f32)),
    );
    let mode = optional(
        "Mode",
        space.create_variable_with(
            Some(&root),
            variable("Mode", DataType::Int16, handlers::MODE_INITIAL),
        ),
    );

    let stop = match &mode {
        Some(mode) => optional(
            "Stop",
            space.create_method_with(
                Some(&root),
                MethodDefinition::new("Stop", handlers::stop(mode.clone())),
            ),
        ),
        None => {
            warn!("Skipping Stop, Mode is unavailable");
            None
        }
    };
    let start = optional(
        "Start",
        space.create_method_with(
            Some(&root),
            MethodDefinition::new("Start", handlers::start())
                .with_signature(handlers::start_signature()),
        ),
    );

    let nodes = ControlsNodes {
        root,
        sensors,
        pressure,
        temperature,
        mode,
        stop,
        start,
    };
    info!(root = %nodes.root, nodes = nodes.len(), "Controls node set created");
    Ok(nodes)
}

fn variable(name: &str, data_type: DataType, initial: impl Into<Value>) -> VariableDefinition {
    VariableDefinition::new(name, data_type, initial).with_description(format!("{} value", name))
}

fn optional(name: &str, result: ServerResult<Node>) -> Option<NodeId> {
    match result {
        Ok(node) => Some(node.id),
        Err(e) => {
            warn!(node = name, error = %e, "Failed to create example node");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctrl_core::{MethodDispatcher, StatusCode, WriteMask};

    fn space() -> AddressSpace {
        AddressSpace::builder()
            .namespace_uri("urn:localhost:ControlsServer")
            .namespace_uri(NAMESPACE_URI)
            .build()
    }

    #[test]
    fn test_tree() {
        let space = space();
        let nodes = build(&space).unwrap();

        assert_eq!(nodes.root.to_string(), "ns=2;s=Controls");
        assert_eq!(
            nodes.pressure.as_ref().unwrap().to_string(),
            "ns=2;s=Controls_Sensors_Pressure"
        );
        assert_eq!(nodes.mode, Some(NodeId::string(2, "Controls_Mode")));
        assert_eq!(nodes.stop, Some(NodeId::string(2, "Controls_Stop")));
        assert_eq!(nodes.start, Some(NodeId::string(2, "Controls_Start")));
        assert_eq!(nodes.len(), 7);
        assert_eq!(nodes.simulated().len(), 2);

        let root = space.lookup(&nodes.root).unwrap();
        assert!(root.as_folder().unwrap().event_notifier);
        assert!(root.has_reference(ReferenceKind::Organizes, false, &NodeId::OBJECTS_FOLDER));
        let objects = space.lookup(&NodeId::OBJECTS_FOLDER).unwrap();
        assert!(objects.has_reference(ReferenceKind::Organizes, true, &nodes.root));
    }

    #[test]
    fn test_variable_attributes() {
        let space = space();
        let nodes = build(&space).unwrap();

        let mode = space.lookup(nodes.mode.as_ref().unwrap()).unwrap();
        let attrs = mode.as_variable().unwrap();
        assert_eq!(attrs.data_value.value, Value::Int16(2));
        assert_eq!(attrs.data_value.status, StatusCode::GOOD);
        assert!(attrs.access_level.is_writable());
        assert!(mode.write_mask.contains(WriteMask::DISPLAY_NAME | WriteMask::DESCRIPTION));

        let temperature = space.read(nodes.temperature.as_ref().unwrap()).unwrap();
        assert_eq!(temperature.value, Value::Float(0.0));
    }

    #[test]
    fn test_methods() {
        let space = space();
        let nodes = build(&space).unwrap();
        let dispatcher = MethodDispatcher::new(space.clone());

        let out = dispatcher
            .invoke(nodes.start.as_ref().unwrap(), &[Value::Double(3.0), Value::Double(4.0)])
            .unwrap();
        assert_eq!(out, vec![Value::Double(12.0)]);

        assert!(dispatcher.invoke(nodes.stop.as_ref().unwrap(), &[]).unwrap().is_empty());
        assert_eq!(
            space.read(nodes.mode.as_ref().unwrap()).unwrap().value,
            Value::Int16(handlers::MODE_STOPPED)
        );
    }

    #[test]
    fn test_root_conflict_is_fatal() {
        let space = space();
        build(&space).unwrap();
        let err = build(&space).unwrap_err();
        assert!(matches!(err, ServerError::StartupFailure { .. }));
    }

    #[test]
    fn test_missing_objects_folder_is_fatal() {
        let space = AddressSpace::builder()
            .namespace_uri(NAMESPACE_URI)
            .standard_nodes(false)
            .build();
        let err = build(&space).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_optional_nodes_skip_on_conflict() {
        let space = space();
        // Pre-register the Temperature identifier so its creation collides.
        let ns = space.default_namespace();
        space
            .create_variable_with(
                None,
                VariableDefinition::new("Squatter", DataType::Int32, 1)
                    .with_node_id(NodeId::string(ns, "Controls_Temperature")),
            )
            .unwrap();

        let nodes = build(&space).unwrap();
        assert!(nodes.temperature.is_none());
        assert!(nodes.mode.is_some());
        assert_eq!(nodes.simulated().len(), 1);
    }
}
