// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # ctrl-server
//!
//! Runtime components of the CONTROLS telemetry server built on `ctrl-core`:
//!
//! - **Simulation**: the periodic update engine for process variables
//! - **Certificate**: peer trust decisions and the application certificate
//! - **Session**: session event reporting and the idle sweep
//! - **Controls**: the demonstration node set and its method handlers
//! - **Lifecycle**: the controller that starts and stops everything
//!
//! ## Example
//!
//! ```no_run
//! use ctrl_server::{ControllerConfig, ServerController};
//!
//! #[tokio::main]
//! async fn main() -> ctrl_core::ServerResult<()> {
//!     let controller = ServerController::new(ControllerConfig::default());
//!     controller.start().await?;
//!     tokio::signal::ctrl_c().await.ok();
//!     controller.stop().await
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod certificate;
pub mod controls;
pub mod lifecycle;
pub mod session;
pub mod simulation;
pub mod task;

pub use certificate::{
    ApplicationCertificate, CertificateClass, CertificateProvider, CertificateRequest,
    FileCertificateProvider, PeerCertificate, StaticCertificateProvider, TrustDecision, TrustGate,
    TrustMode,
};
pub use controls::ControlsNodes;
pub use lifecycle::{ControllerConfig, ServerController, ServerControllerBuilder, ServerState, StateChange};
pub use session::{
    SessionEvent, SessionMonitor, SessionMonitorConfig, SessionReason, SessionSnapshot,
    StatusSink, TracingSink,
};
pub use simulation::{SimulationConfig, UpdateEngine};
pub use task::TaskHandle;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
