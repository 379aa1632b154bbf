// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # ctrl-core
//!
//! Core of the CONTROLS telemetry server.
//!
//! - **Types**: `NodeId`, `Value`, `DataValue`, `StatusCode` and attributes
//! - **Identity**: node identifier policies
//! - **Address space**: the shared node store and its write batches
//! - **Methods**: handler binding and argument-checked dispatch
//! - **Error**: unified error hierarchy with status code mapping
//!
//! ## Example
//!
//! ```
//! use ctrl_core::{AddressSpace, MethodDispatcher};
//! use ctrl_core::methods::FnHandler;
//!
//! let space = AddressSpace::new("example/namespace");
//! let root = space.create_folder(None, "Controls").unwrap();
//! let ping = space
//!     .create_method(Some(&root.id), "Ping", FnHandler::pure(|_, _| Ok(Vec::new())))
//!     .unwrap();
//!
//! let dispatcher = MethodDispatcher::new(space.clone());
//! assert!(dispatcher.invoke(&ping.id, &[]).unwrap().is_empty());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod address_space;
pub mod error;
pub mod identity;
pub mod methods;
pub mod types;

pub use address_space::{AddressSpace, AddressSpaceBuilder, DataChange, Node, NodePayload};
pub use error::{ServerError, ServerResult};
pub use identity::{ConstructedIdFactory, NodeIdFactory, ParentPathFactory};
pub use methods::{
    Argument, FnHandler, HandlerKind, MethodContext, MethodDispatcher, MethodHandler,
    MethodSignature,
};
pub use types::{
    AccessLevel, DataType, DataValue, NodeId, NodeIdentifier, NodeKind, ReferenceKind,
    StatusCode, Value, WriteMask,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
