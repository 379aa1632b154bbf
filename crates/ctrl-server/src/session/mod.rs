// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session lifecycle observation.
//!
//! The transport reports session transitions through
//! [`SessionMonitor::deliver`]. The monitor keeps the set of known sessions,
//! prints one status line per event and, when nothing happened for a while,
//! a periodic summary of the last contact of every session.

mod event;
mod monitor;

pub use event::{SessionEvent, SessionReason, SessionSnapshot, SessionState};
pub use monitor::{
    SessionMonitor, SessionMonitorConfig, SessionRecord, StatusSink, TracingSink,
    DEFAULT_IDLE_THRESHOLD, DEFAULT_SWEEP_INTERVAL, STATUS_REASON,
};
