// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session event types.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The transition being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionReason {
    /// Session established.
    Created,
    /// Session activated (or re-activated with a new identity).
    Activated,
    /// Session about to close.
    Closing,
}

impl SessionReason {
    /// Returns the reason label used in status lines.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Activated => "Activated",
            Self::Closing => "Closing",
        }
    }
}

impl fmt::Display for SessionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `pad` so width specifiers apply.
        f.pad(self.as_str())
    }
}

/// Lifecycle state of a known session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created, not yet activated.
    Created,
    /// Activated.
    Active,
    /// Closed; the session is no longer tracked.
    Closed,
}

impl From<SessionReason> for SessionState {
    fn from(reason: SessionReason) -> Self {
        match reason {
            SessionReason::Created => Self::Created,
            SessionReason::Activated => Self::Active,
            SessionReason::Closing => Self::Closed,
        }
    }
}

/// What the transport knows about a session at the time of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session identifier.
    pub session_id: String,
    /// Client-chosen session name.
    pub name: String,
    /// Display name of the user identity, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
}

impl SessionSnapshot {
    /// Creates a snapshot without identity.
    pub fn new(session_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            name: name.into(),
            identity: None,
        }
    }

    /// Creates a snapshot with a fresh random identifier.
    pub fn generated(name: impl Into<String>) -> Self {
        Self::new(Uuid::new_v4().to_string(), name)
    }

    /// Sets the identity display name.
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }
}

/// A session transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    /// The transition.
    pub reason: SessionReason,
    /// The session.
    pub snapshot: SessionSnapshot,
}

impl SessionEvent {
    /// Creates an event.
    pub fn new(reason: SessionReason, snapshot: SessionSnapshot) -> Self {
        Self { reason, snapshot }
    }

    /// Shorthand for a `Created` event.
    pub fn created(snapshot: SessionSnapshot) -> Self {
        Self::new(SessionReason::Created, snapshot)
    }

    /// Shorthand for an `Activated` event.
    pub fn activated(snapshot: SessionSnapshot) -> Self {
        Self::new(SessionReason::Activated, snapshot)
    }

    /// Shorthand for a `Closing` event.
    pub fn closing(snapshot: SessionSnapshot) -> Self {
        Self::new(SessionReason::Closing, snapshot)
    }

    /// Formats the event status line.
    pub fn status_line(&self) -> String {
        let mut line = format!("{:>9}:{:>20}:", self.reason, self.snapshot.name);
        if let Some(identity) = &self.snapshot.identity {
            line.push_str(&format!(":{:>20}", identity));
        }
        line.push_str(&format!(":{}", self.snapshot.session_id));
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line_without_identity() {
        let event = SessionEvent::created(SessionSnapshot::new("s-1", "ui"));
        assert_eq!(
            event.status_line(),
            format!("  Created:{}ui::s-1", " ".repeat(18))
        );
    }

    #[test]
    fn test_status_line_with_identity() {
        let event =
            SessionEvent::activated(SessionSnapshot::new("s-2", "ui").with_identity("operator"));
        let line = event.status_line();
        assert!(line.starts_with("Activated:"));
        assert!(line.ends_with(&format!(":{:>20}:s-2", "operator")));
    }

    #[test]
    fn test_generated_ids_differ() {
        let a = SessionSnapshot::generated("ui");
        let b = SessionSnapshot::generated("ui");
        assert_ne!(a.session_id, b.session_id);
        assert_eq!(a.session_id.len(), 36);
    }

    #[test]
    fn test_state_from_reason() {
        assert_eq!(SessionState::from(SessionReason::Closing), SessionState::Closed);
        assert_eq!(SessionState::from(SessionReason::Activated), SessionState::Active);
    }
}
