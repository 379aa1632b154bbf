// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema for the telemetry server.
//!
//! # Schema Structure
//!
//! ```text
//! ServerConfig
//! ├── application: ApplicationConfig
//! ├── security: SecurityConfig
//! │   └── certificate: CertificateConfig
//! ├── endpoints: Vec<String>
//! ├── address_space: AddressSpaceConfig
//! │   └── simulation: SimulationSettings
//! ├── sessions: SessionSettings
//! └── logging: LoggingConfig
//! ```
//!
//! Every section has defaults, so an empty document is a valid
//! configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Constants
// =============================================================================

/// Default application name.
pub const DEFAULT_APPLICATION_NAME: &str = "ControlsServer";

/// Default endpoint URL.
pub const DEFAULT_ENDPOINT: &str = "opc.tcp://localhost:4840/ControlsServer";

/// Default namespace of the Controls node set.
pub const DEFAULT_NAMESPACE_URI: &str = "example/namespace";

/// Default certificate validity in days.
pub const DEFAULT_VALIDITY_DAYS: u32 = 365;

/// Maximum certificate validity in days.
pub const MAX_VALIDITY_DAYS: u32 = 3650;

/// Default update engine period.
pub const DEFAULT_SIMULATION_PERIOD: Duration = Duration::from_millis(250);

/// Default perturbation amplitude.
pub const DEFAULT_PERTURBATION: f64 = 0.1;

/// Default session sweep interval.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Default session idle threshold.
pub const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_secs(10);

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// The root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Application identity.
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Certificate and trust settings.
    #[serde(default)]
    pub security: SecurityConfig,

    /// Endpoint URLs.
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,

    /// Address space settings.
    #[serde(default)]
    pub address_space: AddressSpaceConfig,

    /// Session monitor settings.
    #[serde(default)]
    pub sessions: SessionSettings,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Validates the entire configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.application.validate()?;
        self.security.validate()?;

        if self.endpoints.is_empty() {
            return Err(ConfigError::validation("endpoints", "at least one endpoint is required"));
        }
        for (i, endpoint) in self.endpoints.iter().enumerate() {
            if !endpoint.starts_with("opc.tcp://") {
                return Err(ConfigError::validation(
                    format!("endpoints[{}]", i),
                    format!("'{}' is not an opc.tcp URL", endpoint),
                ));
            }
        }

        self.address_space.validate()?;
        self.sessions.validate()?;
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            application: ApplicationConfig::default(),
            security: SecurityConfig::default(),
            endpoints: default_endpoints(),
            address_space: AddressSpaceConfig::default(),
            sessions: SessionSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_endpoints() -> Vec<String> {
    vec![DEFAULT_ENDPOINT.to_string()]
}

fn default_enabled() -> bool {
    true
}

// =============================================================================
// Application
// =============================================================================

/// Application identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplicationConfig {
    /// Application name.
    #[serde(default = "default_application_name")]
    pub name: String,

    /// Application URI. Derived from the name when omitted.
    #[serde(default)]
    pub uri: Option<String>,

    /// Product URI.
    #[serde(default)]
    pub product_uri: Option<String>,
}

impl ApplicationConfig {
    /// Returns the configured URI or `urn:localhost:<name>`.
    pub fn application_uri(&self) -> String {
        self.uri
            .clone()
            .unwrap_or_else(|| format!("urn:localhost:{}", self.name))
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::validation("application.name", "must not be empty"));
        }
        if matches!(self.uri.as_deref(), Some(uri) if uri.trim().is_empty()) {
            return Err(ConfigError::validation("application.uri", "must not be empty"));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_application_name(),
            uri: None,
            product_uri: None,
        }
    }
}

fn default_application_name() -> String {
    DEFAULT_APPLICATION_NAME.to_string()
}

// =============================================================================
// Security
// =============================================================================

/// Certificate and trust settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecurityConfig {
    /// Accept peers whose only validation failure is an untrusted issuer.
    #[serde(default)]
    pub auto_accept_untrusted: bool,

    /// Delete and regenerate the application certificate at startup.
    #[serde(default)]
    pub renew_certificate: bool,

    /// Application instance certificate.
    #[serde(default)]
    pub certificate: CertificateConfig,
}

impl SecurityConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.certificate.validate()
    }
}

/// Application instance certificate settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CertificateConfig {
    /// Certificate file. Relative paths resolve against the config file.
    #[serde(default = "default_certificate_path")]
    pub path: PathBuf,

    /// Create the certificate when the file is missing.
    #[serde(default = "default_enabled")]
    pub create_if_missing: bool,

    /// Subject of a created certificate. Defaults to `CN=<application name>`.
    #[serde(default)]
    pub subject: Option<String>,

    /// Validity of a created certificate.
    #[serde(default = "default_validity_days")]
    pub validity_days: u32,
}

impl CertificateConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::validation("security.certificate.path", "must not be empty"));
        }
        if self.validity_days == 0 || self.validity_days > MAX_VALIDITY_DAYS {
            return Err(ConfigError::out_of_range(
                "security.certificate.validity_days",
                self.validity_days,
                1,
                MAX_VALIDITY_DAYS,
            ));
        }
        Ok(())
    }
}

impl Default for CertificateConfig {
    fn default() -> Self {
        Self {
            path: default_certificate_path(),
            create_if_missing: true,
            subject: None,
            validity_days: DEFAULT_VALIDITY_DAYS,
        }
    }
}

fn default_certificate_path() -> PathBuf {
    PathBuf::from("pki/own/certs/ControlsServer.pem")
}

fn default_validity_days() -> u32 {
    DEFAULT_VALIDITY_DAYS
}

// =============================================================================
// Address Space
// =============================================================================

/// Address space settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddressSpaceConfig {
    /// Namespace of the Controls node set.
    #[serde(default = "default_namespace_uri")]
    pub namespace_uri: String,

    /// Update engine settings.
    #[serde(default)]
    pub simulation: SimulationSettings,
}

impl AddressSpaceConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.namespace_uri.trim().is_empty() {
            return Err(ConfigError::validation(
                "address_space.namespace_uri",
                "must not be empty",
            ));
        }
        self.simulation.validate()
    }
}

impl Default for AddressSpaceConfig {
    fn default() -> Self {
        Self {
            namespace_uri: default_namespace_uri(),
            simulation: SimulationSettings::default(),
        }
    }
}

fn default_namespace_uri() -> String {
    DEFAULT_NAMESPACE_URI.to_string()
}

/// Update engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationSettings {
    /// Run the update engine.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Time between ticks, e.g. `250ms`.
    #[serde(default = "default_simulation_period", with = "humantime_serde")]
    pub period: Duration,

    /// Full width of the random step.
    #[serde(default = "default_perturbation")]
    pub perturbation: f64,
}

impl SimulationSettings {
    fn validate(&self) -> ConfigResult<()> {
        if self.period.is_zero() {
            return Err(ConfigError::validation(
                "address_space.simulation.period",
                "must be greater than zero",
            ));
        }
        if !self.perturbation.is_finite() || self.perturbation < 0.0 || self.perturbation > 1.0 {
            return Err(ConfigError::out_of_range(
                "address_space.simulation.perturbation",
                self.perturbation,
                0,
                1,
            ));
        }
        Ok(())
    }
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            period: DEFAULT_SIMULATION_PERIOD,
            perturbation: DEFAULT_PERTURBATION,
        }
    }
}

fn default_simulation_period() -> Duration {
    DEFAULT_SIMULATION_PERIOD
}

fn default_perturbation() -> f64 {
    DEFAULT_PERTURBATION
}

// =============================================================================
// Sessions
// =============================================================================

/// Session monitor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionSettings {
    /// Time between idle sweeps.
    #[serde(default = "default_sweep_interval", with = "humantime_serde")]
    pub sweep_interval: Duration,

    /// Quiet period after which session status lines are emitted.
    #[serde(default = "default_idle_threshold", with = "humantime_serde")]
    pub idle_threshold: Duration,
}

impl SessionSettings {
    fn validate(&self) -> ConfigResult<()> {
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::validation(
                "sessions.sweep_interval",
                "must be greater than zero",
            ));
        }
        if self.idle_threshold < self.sweep_interval {
            return Err(ConfigError::validation(
                "sessions.idle_threshold",
                "must not be shorter than sweep_interval",
            ));
        }
        Ok(())
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
        }
    }
}

fn default_sweep_interval() -> Duration {
    DEFAULT_SWEEP_INTERVAL
}

fn default_idle_threshold() -> Duration {
    DEFAULT_IDLE_THRESHOLD
}

// =============================================================================
// Logging
// =============================================================================

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the filter directive for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Single-line compact text.
    Compact,
    /// JSON lines.
    Json,
}

impl LogFormat {
    /// Returns the format name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ServerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.application.application_uri(), "urn:localhost:ControlsServer");
        assert_eq!(config.address_space.simulation.period, Duration::from_millis(250));
        assert_eq!(config.sessions.idle_threshold, Duration::from_secs(10));
        assert!(!config.security.auto_accept_untrusted);
        assert!(config.security.certificate.create_if_missing);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: ServerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.endpoints, vec![DEFAULT_ENDPOINT.to_string()]);
        assert_eq!(config.address_space.namespace_uri, DEFAULT_NAMESPACE_URI);
        config.validate().unwrap();
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: Result<ServerConfig, _> = serde_json::from_str(r#"{"gateway": {}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_humantime_durations() {
        let config: ServerConfig = serde_json::from_str(
            r#"{"address_space": {"simulation": {"period": "1s 500ms"}},
                "sessions": {"sweep_interval": "2s", "idle_threshold": "1m"}}"#,
        )
        .unwrap();
        assert_eq!(config.address_space.simulation.period, Duration::from_millis(1500));
        assert_eq!(config.sessions.idle_threshold, Duration::from_secs(60));
    }

    #[test]
    fn test_validation_failures() {
        let mut config: ServerConfig = serde_json::from_str("{}").unwrap();
        config.endpoints.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Validation { .. })));

        let mut config: ServerConfig = serde_json::from_str("{}").unwrap();
        config.endpoints = vec!["http://localhost".to_string()];
        assert!(config.validate().is_err());

        let mut config: ServerConfig = serde_json::from_str("{}").unwrap();
        config.address_space.simulation.perturbation = 2.0;
        assert!(matches!(config.validate(), Err(ConfigError::OutOfRange { .. })));

        let mut config: ServerConfig = serde_json::from_str("{}").unwrap();
        config.sessions.idle_threshold = Duration::from_millis(10);
        assert!(config.validate().is_err());

        let mut config: ServerConfig = serde_json::from_str("{}").unwrap();
        config.security.certificate.validity_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        assert_eq!(LogLevel::default().as_str(), "info");
        assert_eq!(LogFormat::default().as_str(), "text");
    }
}
