// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Server lifecycle states.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle state of the server.
///
/// ```text
/// Unstarted ─► ConfiguringTrust ─► BuildingAddressSpace ─► Running ─► Draining ─► Stopped
///                     │                     │
///                     └────────► Failed ◄───┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerState {
    /// Constructed, `start` not called.
    Unstarted,
    /// Obtaining the application certificate.
    ConfiguringTrust,
    /// Creating the node set.
    BuildingAddressSpace,
    /// Serving requests.
    Running,
    /// Refusing new sessions, stopping engines.
    Draining,
    /// Stopped.
    Stopped,
    /// Startup aborted.
    Failed,
}

impl ServerState {
    /// Returns the state name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unstarted => "unstarted",
            Self::ConfiguringTrust => "configuring_trust",
            Self::BuildingAddressSpace => "building_address_space",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }

    /// Returns `true` if `next` may follow this state.
    pub const fn can_transition_to(&self, next: ServerState) -> bool {
        matches!(
            (self, next),
            (Self::Unstarted, Self::ConfiguringTrust)
                | (Self::Unstarted, Self::Stopped)
                | (Self::ConfiguringTrust, Self::BuildingAddressSpace)
                | (Self::ConfiguringTrust, Self::Failed)
                | (Self::BuildingAddressSpace, Self::Running)
                | (Self::BuildingAddressSpace, Self::Failed)
                | (Self::Running, Self::Draining)
                | (Self::Draining, Self::Stopped)
        )
    }

    /// Returns `true` while requests are served.
    pub const fn is_serving(&self) -> bool {
        matches!(self, Self::Running | Self::Draining)
    }

    /// Returns `true` for `Stopped` and `Failed`.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Stopped | Self::Failed)
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateChange {
    /// Previous state.
    pub from: ServerState,
    /// New state.
    pub to: ServerState,
    /// When the transition happened.
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let path = [
            ServerState::Unstarted,
            ServerState::ConfiguringTrust,
            ServerState::BuildingAddressSpace,
            ServerState::Running,
            ServerState::Draining,
            ServerState::Stopped,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_invalid_transitions() {
        assert!(!ServerState::Running.can_transition_to(ServerState::Stopped));
        assert!(!ServerState::Stopped.can_transition_to(ServerState::Running));
        assert!(!ServerState::Failed.can_transition_to(ServerState::ConfiguringTrust));
        assert!(!ServerState::Running.can_transition_to(ServerState::Failed));
    }

    #[test]
    fn test_classification() {
        assert!(ServerState::Draining.is_serving());
        assert!(!ServerState::BuildingAddressSpace.is_serving());
        assert!(ServerState::Failed.is_terminal());
        assert_eq!(ServerState::ConfiguringTrust.to_string(), "configuring_trust");
    }
}
