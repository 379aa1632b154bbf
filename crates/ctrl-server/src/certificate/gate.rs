// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Peer certificate trust decisions.
//!
//! The transport validates a peer certificate first. Only when validation
//! fails does it ask the [`TrustGate`], passing the failure class:
//!
//! | Class          | AutoAccept | ManualReview |
//! |----------------|------------|--------------|
//! | `Untrusted`    | accept     | reject       |
//! | anything else  | reject     | reject       |

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use ctrl_core::StatusCode;

use super::fingerprint;

// =============================================================================
// Types
// =============================================================================

/// How untrusted peers are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrustMode {
    /// Accept untrusted (but otherwise valid) certificates.
    AutoAccept,
    /// Reject everything that failed validation.
    ManualReview,
}

impl TrustMode {
    /// Selects the mode from the auto-accept flag.
    pub fn from_auto_accept(auto_accept: bool) -> Self {
        if auto_accept {
            Self::AutoAccept
        } else {
            Self::ManualReview
        }
    }
}

impl fmt::Display for TrustMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AutoAccept => write!(f, "auto-accept"),
            Self::ManualReview => write!(f, "manual-review"),
        }
    }
}

/// Why validation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificateClass {
    /// Issuer not in the trust list.
    Untrusted,
    /// Outside its validity period.
    Expired,
    /// Revoked by its issuer.
    Revoked,
    /// Could not be decoded.
    Malformed,
    /// Issuer chain incomplete or invalid.
    ChainFailure,
    /// Any other validation failure.
    Other,
}

impl CertificateClass {
    /// Returns the status code describing the failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Untrusted => StatusCode::BAD_CERTIFICATE_UNTRUSTED,
            Self::Expired => StatusCode::BAD_CERTIFICATE_TIME_INVALID,
            Self::Revoked => StatusCode::BAD_CERTIFICATE_REVOKED,
            Self::ChainFailure => StatusCode::BAD_CERTIFICATE_CHAIN_INCOMPLETE,
            Self::Malformed | Self::Other => StatusCode::BAD_CERTIFICATE_INVALID,
        }
    }
}

impl fmt::Display for CertificateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status_code().name())
    }
}

/// A certificate presented by a connecting peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerCertificate {
    /// Subject distinguished name.
    pub subject: String,
    /// DER bytes.
    pub der: Vec<u8>,
}

impl PeerCertificate {
    /// Creates a peer certificate.
    pub fn new(subject: impl Into<String>, der: impl Into<Vec<u8>>) -> Self {
        Self {
            subject: subject.into(),
            der: der.into(),
        }
    }

    /// Returns the SHA-256 fingerprint.
    pub fn fingerprint(&self) -> String {
        fingerprint(&self.der)
    }
}

/// Outcome of [`TrustGate::evaluate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "class", rename_all = "snake_case")]
pub enum TrustDecision {
    /// The peer is accepted.
    Accepted,
    /// The peer is rejected for the given reason.
    Rejected(CertificateClass),
}

impl TrustDecision {
    /// Returns `true` if accepted.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Formats the decision for a certificate as a single status line.
    pub fn describe(&self, certificate: &PeerCertificate) -> String {
        match self {
            Self::Accepted => format!(
                "Accepted Certificate: [{}] [{}]",
                certificate.subject,
                certificate.fingerprint()
            ),
            Self::Rejected(class) => format!(
                "Rejected Certificate: {} [{}] [{}]",
                class,
                certificate.subject,
                certificate.fingerprint()
            ),
        }
    }
}

// =============================================================================
// TrustGate
// =============================================================================

/// Trust policy for peers whose certificate failed validation.
///
/// The mode is fixed at construction. Evaluation is lock-free and may run
/// concurrently from any number of connections.
#[derive(Debug)]
pub struct TrustGate {
    mode: TrustMode,
    accepted: AtomicU64,
    rejected: AtomicU64,
}

/// Decision counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrustStats {
    /// Accepted peers.
    pub accepted: u64,
    /// Rejected peers.
    pub rejected: u64,
}

impl TrustGate {
    /// Creates a gate.
    pub fn new(mode: TrustMode) -> Self {
        Self {
            mode,
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Returns the mode.
    pub fn mode(&self) -> TrustMode {
        self.mode
    }

    /// Decides on a certificate that failed validation with `class`.
    pub fn evaluate(&self, certificate: &PeerCertificate, class: CertificateClass) -> TrustDecision {
        let decision = match (class, self.mode) {
            (CertificateClass::Untrusted, TrustMode::AutoAccept) => TrustDecision::Accepted,
            (class, _) => TrustDecision::Rejected(class),
        };

        let line = decision.describe(certificate);
        if decision.is_accepted() {
            self.accepted.fetch_add(1, Ordering::Relaxed);
            info!(subject = %certificate.subject, mode = %self.mode, "{}", line);
        } else {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            warn!(subject = %certificate.subject, mode = %self.mode, "{}", line);
        }
        decision
    }

    /// Returns the decision counters.
    pub fn stats(&self) -> TrustStats {
        TrustStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}
