// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The address space: a tree of folders, variables and methods.
//!
//! # Structure
//!
//! ```text
//! Root (i=84)
//! └── Objects (i=85) <── Organizes (inverse) ── Controls (ns=2;s=Controls)
//!                                               ├── Sensors
//!                                               │   └── Pressure
//!                                               ├── Temperature
//!                                               ├── Mode
//!                                               ├── Stop()
//!                                               └── Start(a, b)
//! ```
//!
//! Each node has exactly one owner (its parent, or none for roots). Semantic
//! references such as the link from `Controls` to `Objects` never change
//! ownership.

mod node;
mod store;

pub use node::{
    FolderAttributes, FolderDefinition, MethodAttributes, MethodDefinition, Node, NodePayload,
    Reference, VariableAttributes, VariableDefinition,
};
pub use store::{
    AddressSpace, AddressSpaceBuilder, DataChange, SpaceWriter, DEFAULT_CHANGE_CAPACITY,
    STANDARD_NAMESPACE_URI,
};
