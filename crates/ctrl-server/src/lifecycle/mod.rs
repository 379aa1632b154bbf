// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Server lifecycle.
//!
//! The [`ServerController`] is the only component that starts or stops the
//! background engines. Startup runs through the states in order:
//!
//! 1. `ConfiguringTrust`: obtain the application certificate, build the
//!    trust gate
//! 2. `BuildingAddressSpace`: create the Controls node set, start the
//!    update engine and the session sweep
//! 3. `Running`: serve requests
//!
//! Shutdown goes through `Draining` (new sessions refused, engines stopped
//! and awaited, address space released) to `Stopped`.

mod controller;
mod state;

pub use controller::{
    ControllerConfig, ServerController, ServerControllerBuilder, DEFAULT_ENDPOINT,
};
pub use state::{ServerState, StateChange};
