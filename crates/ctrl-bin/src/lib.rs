// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # ctrl-bin
//!
//! CLI binary for the CONTROLS telemetry server:
//!
//! - CLI argument parsing with clap
//! - Server runtime orchestration
//! - Graceful shutdown handling
//! - Logging initialization
//!
//! ## Usage
//!
//! ```bash
//! # Start the server (default command)
//! ctrl
//!
//! # Start with a custom config, accepting untrusted peers
//! ctrl -c /etc/ctrl/ctrl.yaml run --auto-accept
//!
//! # Validate configuration
//! ctrl validate --show-config
//!
//! # Show version
//! ctrl version
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;

// =============================================================================
// Re-exports
// =============================================================================

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use runtime::{controller_config, RuntimeBuilder, ServerRuntime};
pub use shutdown::ShutdownCoordinator;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
