// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Common Test Utilities
//!
//! - `fixtures`: Pre-built test data and configurations
//! - `assertions`: Custom assertion helpers
//! - `mocks`: Mock implementations for testing
//! - `harness`: Test harness for running a server

pub mod assertions;
pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use assertions::*;
pub use fixtures::*;
pub use harness::*;
pub use mocks::*;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Initialize test logging. Call this at the start of a test.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("warn,ctrl=debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Create a temporary directory for test data.
pub fn temp_test_dir(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(prefix)
        .tempdir()
        .expect("Failed to create temp directory")
}
