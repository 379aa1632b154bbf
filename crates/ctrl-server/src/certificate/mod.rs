// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Certificate handling.
//!
//! - [`TrustGate`]: decides whether a peer certificate that failed
//!   validation is accepted anyway
//! - [`CertificateProvider`]: obtains the server's own application
//!   instance certificate at startup

mod application;
mod gate;

pub use application::{
    ApplicationCertificate, CertificateProvider, CertificateRequest, FileCertificateProvider,
    StaticCertificateProvider,
};
pub use gate::{
    CertificateClass, PeerCertificate, TrustDecision, TrustGate, TrustMode, TrustStats,
};

use sha2::{Digest, Sha256};

/// Returns the upper-case hex SHA-256 fingerprint of DER bytes.
pub fn fingerprint(der: &[u8]) -> String {
    hex::encode_upper(Sha256::digest(der))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint() {
        let fp = fingerprint(b"abc");
        assert_eq!(fp.len(), 64);
        assert!(fp.starts_with("BA7816BF"));
        assert_eq!(fp, fingerprint(b"abc"));
        assert_ne!(fp, fingerprint(b"abd"));
    }
}
