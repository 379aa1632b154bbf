// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Method Integration Tests
//!
//! - `test_controls_*`: The Stop and Start methods of the Controls node set
//! - `test_dispatch_*`: Argument checking and fault reporting

use ctrl_core::address_space::MethodDefinition;
use ctrl_core::{
    Argument, DataType, FnHandler, MethodDispatcher, MethodSignature, NodeId, ServerError,
    StatusCode, Value,
};
use ctrl_tests::prelude::*;

fn dispatcher() -> (MethodDispatcher, ctrl_server::ControlsNodes, ctrl_core::AddressSpace) {
    let (space, nodes) = SpaceFixtures::controls();
    (MethodDispatcher::new(space.clone()), nodes, space)
}

// =============================================================================
// Controls Methods
// =============================================================================

#[test]
fn test_controls_stop_sets_mode() {
    let (dispatcher, nodes, space) = dispatcher();
    let mode = nodes.mode.clone().unwrap();
    let before = space.read(&mode).unwrap();
    assert_eq!(before.value, Value::Int16(2));

    let outputs = dispatcher.invoke(nodes.stop.as_ref().unwrap(), &[]).unwrap();
    assert!(outputs.is_empty());

    let after = space.read(&mode).unwrap();
    assert_eq!(after.value, Value::Int16(0));
    after.assert_newer_than(&before);
}

#[test]
fn test_controls_stop_is_idempotent() {
    let (dispatcher, nodes, space) = dispatcher();
    let stop = nodes.stop.clone().unwrap();

    dispatcher.invoke(&stop, &[]).unwrap();
    dispatcher.invoke(&stop, &[]).unwrap();
    assert_eq!(space.read(nodes.mode.as_ref().unwrap()).unwrap().value, Value::Int16(0));
}

#[test]
fn test_controls_start_multiplies() {
    let (dispatcher, nodes, _space) = dispatcher();
    let start = nodes.start.clone().unwrap();

    let out = dispatcher
        .invoke(&start, &[Value::Double(3.0), Value::Double(4.0)])
        .unwrap();
    assert_eq!(out, vec![Value::Double(12.0)]);

    let out = dispatcher
        .invoke(&start, &[Value::Double(-1.5), Value::Double(2.0)])
        .unwrap();
    assert_eq!(out, vec![Value::Double(-3.0)]);
}

#[test]
fn test_controls_start_leaves_mode_alone() {
    let (dispatcher, nodes, space) = dispatcher();
    let mode = nodes.mode.clone().unwrap();
    let before = space.read(&mode).unwrap();

    dispatcher
        .invoke(nodes.start.as_ref().unwrap(), &[Value::Double(1.0), Value::Double(1.0)])
        .unwrap();
    assert_eq!(space.read(&mode).unwrap(), before);
}

#[test]
fn test_controls_start_missing_argument() {
    let (dispatcher, nodes, _space) = dispatcher();
    let err = assert_status(
        dispatcher.invoke(nodes.start.as_ref().unwrap(), &[Value::Double(3.0)]),
        StatusCode::BAD_ARGUMENTS_MISSING,
    );
    assert!(matches!(
        err,
        ServerError::ArgumentsMissing { expected: 2, actual: 1, .. }
    ));
}

#[test]
fn test_controls_start_extra_argument() {
    let (dispatcher, nodes, _space) = dispatcher();
    assert_status(
        dispatcher.invoke(
            nodes.start.as_ref().unwrap(),
            &[Value::Double(1.0), Value::Double(2.0), Value::Double(3.0)],
        ),
        StatusCode::BAD_INVALID_ARGUMENT,
    );
}

#[test]
fn test_controls_start_wrong_argument_kind() {
    let (dispatcher, nodes, _space) = dispatcher();
    let err = assert_status(
        dispatcher.invoke(
            nodes.start.as_ref().unwrap(),
            &[Value::Double(1.0), Value::Int32(2)],
        ),
        StatusCode::BAD_INVALID_ARGUMENT,
    );
    assert!(matches!(err, ServerError::InvalidArgument { index: 1, .. }));
}

// =============================================================================
// Dispatch
// =============================================================================

#[test]
fn test_dispatch_unknown_method() {
    let (dispatcher, _nodes, _space) = dispatcher();
    assert_status(
        dispatcher.invoke(&NodeId::string(2, "Controls_Launch"), &[]),
        StatusCode::BAD_NODE_ID_UNKNOWN,
    );
}

#[test]
fn test_dispatch_non_method_node() {
    let (dispatcher, nodes, _space) = dispatcher();
    assert_status(
        dispatcher.invoke(nodes.mode.as_ref().unwrap(), &[]),
        StatusCode::BAD_TYPE_MISMATCH,
    );
}

#[test]
fn test_dispatch_handler_panic_is_internal() {
    let (space, nodes) = SpaceFixtures::controls();
    let method = space
        .create_method(Some(&nodes.root), "Explode", Handlers::panicking())
        .unwrap();
    let dispatcher = MethodDispatcher::new(space.clone());

    let err = assert_status(dispatcher.invoke(&method.id, &[]), StatusCode::BAD_INTERNAL_ERROR);
    assert!(matches!(err, ServerError::InternalError { .. }));
    assert!(!err.is_fatal());

    // The dispatcher survives and keeps serving.
    dispatcher.invoke(nodes.stop.as_ref().unwrap(), &[]).unwrap();
}

#[test]
fn test_dispatch_expected_fault_passes_through() {
    let (space, nodes) = SpaceFixtures::controls();
    let method = space
        .create_method(
            Some(&nodes.root),
            "Lookup",
            Handlers::failing(|| ServerError::not_found(NodeId::string(2, "Elsewhere"))),
        )
        .unwrap();
    let dispatcher = MethodDispatcher::new(space);

    assert_status(dispatcher.invoke(&method.id, &[]), StatusCode::BAD_NODE_ID_UNKNOWN);
}

#[test]
fn test_dispatch_undeclared_outputs_are_internal() {
    let (space, nodes) = SpaceFixtures::controls();
    let method = space
        .create_method(
            Some(&nodes.root),
            "Chatty",
            Handlers::returning(vec![Value::Int32(1)]),
        )
        .unwrap();
    let dispatcher = MethodDispatcher::new(space);

    assert_status(dispatcher.invoke(&method.id, &[]), StatusCode::BAD_INTERNAL_ERROR);
}

#[test]
fn test_dispatch_declared_signature() {
    let (space, nodes) = SpaceFixtures::controls();
    let method = space
        .create_method_with(
            Some(&nodes.root),
            MethodDefinition::new("Echo", Handlers::echo()).with_signature(
                MethodSignature::new()
                    .input(Argument::new("label", DataType::String))
                    .output(Argument::new("label", DataType::String)),
            ),
        )
        .unwrap();
    let dispatcher = MethodDispatcher::new(space);

    let out = dispatcher
        .invoke(&method.id, &[Value::String("line-3".into())])
        .unwrap();
    assert_eq!(out, vec![Value::String("line-3".into())]);
}

#[test]
fn test_dispatch_mutating_handler_uses_owner() {
    let (space, nodes) = SpaceFixtures::controls();
    let method = space
        .create_method(
            Some(&nodes.root),
            "Reset",
            FnHandler::mutating(|ctx, _| {
                let owner = ctx.owner().cloned().ok_or_else(|| ServerError::internal("no owner"))?;
                let mode = NodeId::string(2, format!("{}_Mode", owner.as_string().unwrap_or("")));
                ctx.set_value(&mode, Value::Int16(1))?;
                Ok(vec![])
            }),
        )
        .unwrap();
    let dispatcher = MethodDispatcher::new(space.clone());

    dispatcher.invoke(&method.id, &[]).unwrap();
    assert_eq!(space.read(nodes.mode.as_ref().unwrap()).unwrap().value, Value::Int16(1));
}

#[test]
fn test_dispatch_stats() {
    let (space, nodes) = SpaceFixtures::controls();
    let explode = space
        .create_method(Some(&nodes.root), "Explode", Handlers::panicking())
        .unwrap();
    let dispatcher = MethodDispatcher::new(space);
    let start = nodes.start.clone().unwrap();

    dispatcher.invoke(&start, &[Value::Double(1.0), Value::Double(2.0)]).unwrap();
    let _ = dispatcher.invoke(&start, &[]);
    let _ = dispatcher.invoke(&explode.id, &[]);

    let stats = dispatcher.stats().snapshot();
    assert_eq!(stats.calls, 3);
    assert_eq!(stats.succeeded, 1);
    assert_eq!(stats.faults, 1);
    assert_eq!(stats.internal_errors, 1);
}

#[test]
fn test_dispatch_after_release() {
    let (dispatcher, nodes, space) = dispatcher();
    space.release();
    assert_status(
        dispatcher.invoke(nodes.stop.as_ref().unwrap(), &[]),
        StatusCode::BAD_SHUTDOWN,
    );
}
