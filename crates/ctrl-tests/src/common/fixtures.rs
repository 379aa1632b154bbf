// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Pre-built configurations, certificates and address spaces.

use std::path::Path;
use std::time::Duration;

use ctrl_core::AddressSpace;
use ctrl_server::controls::{self, ControlsNodes};
use ctrl_server::{
    ApplicationCertificate, CertificateRequest, ControllerConfig, PeerCertificate,
    SessionMonitorConfig, SessionSnapshot, SimulationConfig, TrustMode,
};

/// Application URI used by the fixtures.
pub const TEST_APPLICATION_URI: &str = "urn:localhost:ControlsServer";

// =============================================================================
// Address Spaces
// =============================================================================

/// Address space fixtures.
pub struct SpaceFixtures;

impl SpaceFixtures {
    /// An empty space laid out like the server's: namespace 1 is the
    /// application, namespace 2 the Controls node set.
    pub fn server_layout() -> AddressSpace {
        AddressSpace::builder()
            .namespace_uri(TEST_APPLICATION_URI)
            .namespace_uri(controls::NAMESPACE_URI)
            .build()
    }

    /// A space with the Controls node set already built.
    pub fn controls() -> (AddressSpace, ControlsNodes) {
        let space = Self::server_layout();
        let nodes = controls::build(&space).expect("Controls node set");
        (space, nodes)
    }
}

// =============================================================================
// Controller Configurations
// =============================================================================

/// Controller configuration fixtures.
pub struct ControllerFixtures;

impl ControllerFixtures {
    /// Fast timings, certificate under `dir`.
    pub fn fast(dir: &Path) -> ControllerConfig {
        ControllerConfig {
            trust_mode: TrustMode::ManualReview,
            certificate: CertificateFixtures::request(dir),
            simulation: Some(SimulationConfig {
                period: Duration::from_millis(10),
                perturbation: 0.1,
            }),
            sessions: SessionMonitorConfig {
                sweep_interval: Duration::from_millis(10),
                idle_threshold: Duration::from_millis(50),
            },
            ..ControllerConfig::default()
        }
    }

    /// Like [`fast`](Self::fast) with auto-accept and no simulation.
    pub fn auto_accept_static(dir: &Path) -> ControllerConfig {
        ControllerConfig {
            trust_mode: TrustMode::AutoAccept,
            simulation: None,
            ..Self::fast(dir)
        }
    }
}

// =============================================================================
// Certificates
// =============================================================================

/// Certificate fixtures.
pub struct CertificateFixtures;

impl CertificateFixtures {
    /// A request creating `own/ControlsServer.pem` under `dir`.
    pub fn request(dir: &Path) -> CertificateRequest {
        CertificateRequest {
            path: dir.join("own").join("ControlsServer.pem"),
            subject: "CN=ControlsServer".to_string(),
            application_uri: TEST_APPLICATION_URI.to_string(),
            validity_days: 30,
            create_if_missing: true,
            renew: false,
        }
    }

    /// An in-memory application certificate.
    pub fn application() -> ApplicationCertificate {
        ApplicationCertificate {
            subject: "CN=ControlsServer".to_string(),
            der: vec![0x30, 0x03, 0x02, 0x01, 0x01],
            not_after: None,
            path: None,
        }
    }

    /// A peer certificate with a distinct body per subject.
    pub fn peer(subject: &str) -> PeerCertificate {
        let mut der = vec![0x30, subject.len() as u8];
        der.extend_from_slice(subject.as_bytes());
        PeerCertificate::new(subject, der)
    }
}

// =============================================================================
// Sessions
// =============================================================================

/// Session fixtures.
pub struct SessionFixtures;

impl SessionFixtures {
    /// A named session with a fixed identifier.
    pub fn operator(index: usize) -> SessionSnapshot {
        SessionSnapshot::new(format!("ns=1;i={}", 1000 + index), format!("Operator{}", index))
            .with_identity(format!("user{}", index))
    }
}

// =============================================================================
// Configuration Files
// =============================================================================

/// Configuration file fixtures.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// An empty YAML document; every section takes its default.
    pub fn yaml_empty() -> &'static str {
        "{}\n"
    }

    /// A YAML document touching every section.
    pub fn yaml_full() -> &'static str {
        r#"
application:
  name: LineServer
  uri: urn:plant:LineServer
  product_uri: urn:plant:product
security:
  auto_accept_untrusted: true
  renew_certificate: false
  certificate:
    path: pki/own/line.pem
    create_if_missing: true
    subject: CN=LineServer
    validity_days: 90
endpoints:
  - opc.tcp://localhost:4840/LineServer
  - opc.tcp://localhost:4841/LineServer
address_space:
  namespace_uri: urn:plant:controls
  simulation:
    enabled: true
    period: 50ms
    perturbation: 0.05
sessions:
  sweep_interval: 200ms
  idle_threshold: 2s
logging:
  level: debug
  format: compact
"#
    }

    /// A TOML document with simulation disabled.
    pub fn toml_static() -> &'static str {
        r#"
endpoints = ["opc.tcp://localhost:4840/ControlsServer"]

[application]
name = "StaticServer"

[address_space.simulation]
enabled = false
"#
    }

    /// A JSON document with a placeholder for the namespace.
    pub fn json_with_placeholder() -> &'static str {
        r#"{"address_space": {"namespace_uri": "${CTRL_IT_NAMESPACE:urn:default}"}}"#
    }
}
