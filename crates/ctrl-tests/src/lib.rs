// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # CONTROLS Integration Tests
//!
//! Integration tests and shared test utilities for the telemetry server.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: Pre-built configurations, certificates and address spaces
//!   - `assertions`: Custom assertion helpers
//!   - `mocks`: Recording sinks and scripted method handlers
//!   - `harness`: A started server in a temporary directory
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ctrl-tests
//! cargo test -p ctrl-tests --test integration_address_space
//! cargo test -p ctrl-tests --test integration_lifecycle -- --nocapture
//! ```
//!
//! ## Using the Test Harness
//!
//! ```rust,ignore
//! use ctrl_tests::prelude::*;
//!
//! #[tokio::test]
//! async fn test_with_server() {
//!     let server = TestServer::start().await.unwrap();
//!     let mode = server.nodes().mode.unwrap();
//!     assert_eq!(server.controller.read(&mode).unwrap().value, Value::Int16(2));
//!     server.stop().await.unwrap();
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod common;

/// Re-export commonly used items for convenience.
pub mod prelude {
    pub use crate::common::assertions::*;
    pub use crate::common::fixtures::*;
    pub use crate::common::harness::*;
    pub use crate::common::mocks::*;
    pub use crate::common::{init_test_logging, temp_test_dir};
    pub use ctrl_core::{DataType, DataValue, NodeId, ServerError, StatusCode, Value};
}
