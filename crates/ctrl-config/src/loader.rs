// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading and processing.
//!
//! # Loading Pipeline
//!
//! 1. Read the file and pick the format from its extension
//! 2. Resolve `${VAR}` and `${VAR:default}` placeholders in the raw text
//! 3. Parse into [`ServerConfig`]
//! 4. Apply `CTRL_*` environment overrides
//! 5. Resolve the certificate path against the config file directory
//! 6. Validate
//!
//! # Environment Variable Override
//!
//! ```text
//! CTRL_APPLICATION_NAME=Plant7
//! CTRL_AUTO_ACCEPT=true
//! CTRL_RENEW_CERTIFICATE=1
//! CTRL_CERTIFICATE_PATH=/etc/ctrl/own.pem
//! CTRL_NAMESPACE_URI=urn:plant7
//! CTRL_SIMULATION_ENABLED=false
//! CTRL_LOG_LEVEL=debug
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{LogFormat, LogLevel, ServerConfig};

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "CTRL";

// =============================================================================
// ConfigLoader
// =============================================================================

/// Configuration loader.
///
/// # Examples
///
/// ```no_run
/// use ctrl_config::ConfigLoader;
///
/// let config = ConfigLoader::new().load("ctrl.yaml").unwrap();
/// println!("{}", config.application.name);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    base_path: Option<PathBuf>,
    env_prefix: String,
    resolve_env_vars: bool,
    resolve_paths: bool,
}

impl ConfigLoader {
    /// Creates a loader with default settings.
    pub fn new() -> Self {
        Self {
            base_path: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            resolve_env_vars: true,
            resolve_paths: true,
        }
    }

    /// Creates a builder for configuring the loader.
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder::new()
    }

    /// Returns the environment variable prefix.
    pub fn env_prefix(&self) -> &str {
        &self.env_prefix
    }

    /// Loads configuration from a file.
    ///
    /// The format follows the extension: `.yaml`/`.yml`, `.toml` or `.json`.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<ServerConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let base_path = self.base_path.clone().unwrap_or_else(|| {
            path.parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
        });

        let format = ConfigFormat::from_path(path)?;
        let content = self.read_file(path)?;
        let mut config = self.parse_content(&content, format, path)?;

        self.finish(&mut config, Some(&base_path))?;

        info!("Configuration loaded successfully");
        debug!(
            application = %config.application.name,
            endpoints = config.endpoints.len(),
            simulation = config.address_space.simulation.enabled,
            "Configuration summary"
        );
        Ok(config)
    }

    /// Loads configuration from a string.
    ///
    /// Relative paths are resolved only when a base path was configured.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<ServerConfig> {
        let content = self.resolve_placeholders(content);
        let mut config = parse_str(&content, format)?;
        let base_path = self.base_path.clone();
        self.finish(&mut config, base_path.as_deref())?;
        Ok(config)
    }

    /// Returns the default configuration with environment overrides applied.
    pub fn defaults(&self) -> ConfigResult<ServerConfig> {
        let mut config = ServerConfig::default();
        let base_path = self.base_path.clone();
        self.finish(&mut config, base_path.as_deref())?;
        Ok(config)
    }

    fn finish(&self, config: &mut ServerConfig, base_path: Option<&Path>) -> ConfigResult<()> {
        if self.resolve_env_vars {
            self.apply_env_overrides(config)?;
        }
        if let (true, Some(base)) = (self.resolve_paths, base_path) {
            resolve_relative_paths(config, base);
        }
        config.validate()
    }

    fn read_file(&self, path: &Path) -> ConfigResult<String> {
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))
    }

    fn parse_content(
        &self,
        content: &str,
        format: ConfigFormat,
        path: &Path,
    ) -> ConfigResult<ServerConfig> {
        let content = self.resolve_placeholders(content);
        parse_str(&content, format).map_err(|e| match e {
            ConfigError::Serialization { message } => ConfigError::parse(path, message),
            other => other,
        })
    }

    fn resolve_placeholders(&self, content: &str) -> String {
        if self.resolve_env_vars {
            resolve_env_placeholders(content)
        } else {
            content.to_string()
        }
    }

    fn var(&self, suffix: &str) -> Option<(String, String)> {
        let name = format!("{}_{}", self.env_prefix, suffix);
        env::var(&name).ok().map(|value| (name, value))
    }

    fn apply_env_overrides(&self, config: &mut ServerConfig) -> ConfigResult<()> {
        if let Some((_, value)) = self.var("APPLICATION_NAME") {
            config.application.name = value;
        }
        if let Some((_, value)) = self.var("APPLICATION_URI") {
            config.application.uri = Some(value);
        }

        if let Some((name, value)) = self.var("AUTO_ACCEPT") {
            config.security.auto_accept_untrusted = parse_bool(&name, &value)?;
        }
        if let Some((name, value)) = self.var("RENEW_CERTIFICATE") {
            config.security.renew_certificate = parse_bool(&name, &value)?;
        }
        if let Some((_, value)) = self.var("CERTIFICATE_PATH") {
            config.security.certificate.path = PathBuf::from(value);
        }

        if let Some((_, value)) = self.var("ENDPOINTS") {
            config.endpoints = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
        }

        if let Some((_, value)) = self.var("NAMESPACE_URI") {
            config.address_space.namespace_uri = value;
        }
        if let Some((name, value)) = self.var("SIMULATION_ENABLED") {
            config.address_space.simulation.enabled = parse_bool(&name, &value)?;
        }

        if let Some((name, value)) = self.var("LOG_LEVEL") {
            config.logging.level = parse_log_level(&value).ok_or_else(|| {
                ConfigError::invalid_env_var(name, "expected trace, debug, info, warn or error")
            })?;
        }
        if let Some((name, value)) = self.var("LOG_FORMAT") {
            config.logging.format = parse_log_format(&value)
                .ok_or_else(|| ConfigError::invalid_env_var(name, "expected text, compact or json"))?;
        }

        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigLoaderBuilder
// =============================================================================

/// Builder for ConfigLoader.
#[derive(Debug, Default)]
pub struct ConfigLoaderBuilder {
    base_path: Option<PathBuf>,
    env_prefix: Option<String>,
    resolve_env_vars: Option<bool>,
    resolve_paths: Option<bool>,
}

impl ConfigLoaderBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base path for relative paths.
    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Sets the environment prefix.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Enables or disables placeholders and environment overrides.
    pub fn resolve_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = Some(enabled);
        self
    }

    /// Enables or disables path resolution.
    pub fn resolve_paths(mut self, enabled: bool) -> Self {
        self.resolve_paths = Some(enabled);
        self
    }

    /// Builds the ConfigLoader.
    pub fn build(self) -> ConfigLoader {
        let mut loader = ConfigLoader::new();
        loader.base_path = self.base_path;
        if let Some(prefix) = self.env_prefix {
            loader.env_prefix = prefix;
        }
        if let Some(enabled) = self.resolve_env_vars {
            loader.resolve_env_vars = enabled;
        }
        if let Some(enabled) = self.resolve_paths {
            loader.resolve_paths = enabled;
        }
        loader
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(other) => Err(ConfigError::unsupported_format(other)),
            None => Err(ConfigError::unsupported_format("(no extension)")),
        }
    }

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Loads configuration from a file with the default loader.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<ServerConfig> {
    ConfigLoader::new().load(path)
}

fn parse_str(content: &str, format: ConfigFormat) -> ConfigResult<ServerConfig> {
    match format {
        ConfigFormat::Yaml => yaml_parse(content),
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
        ConfigFormat::Json => {
            serde_json::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
        }
    }
}

/// Replaces `${VAR}` and `${VAR:default}` with environment values.
///
/// An unset variable without a default keeps its placeholder. An unclosed
/// `${` is copied through unchanged.
fn resolve_env_placeholders(content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' || chars.peek() != Some(&'{') {
            result.push(c);
            continue;
        }
        chars.next();

        let mut inner = String::new();
        let mut closed = false;
        for c in chars.by_ref() {
            if c == '}' {
                closed = true;
                break;
            }
            inner.push(c);
        }

        if !closed {
            result.push_str("${");
            result.push_str(&inner);
            continue;
        }

        let (name, default) = match inner.split_once(':') {
            Some((name, default)) => (name, Some(default)),
            None => (inner.as_str(), None),
        };

        match (env::var(name), default) {
            (Ok(value), _) => result.push_str(&value),
            (Err(_), Some(default)) => result.push_str(default),
            (Err(_), None) => {
                warn!("Environment variable '{}' not found", name);
                result.push_str(&format!("${{{}}}", name));
            }
        }
    }

    result
}

fn resolve_relative_paths(config: &mut ServerConfig, base_path: &Path) {
    let cert = &mut config.security.certificate.path;
    if cert.is_relative() {
        *cert = base_path.join(&*cert);
    }
}

fn parse_bool(name: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "enabled" => Ok(true),
        "false" | "0" | "no" | "off" | "disabled" => Ok(false),
        _ => Err(ConfigError::invalid_env_var(name, "expected a boolean")),
    }
}

fn parse_log_level(value: &str) -> Option<LogLevel> {
    match value.trim().to_lowercase().as_str() {
        "trace" => Some(LogLevel::Trace),
        "debug" => Some(LogLevel::Debug),
        "info" => Some(LogLevel::Info),
        "warn" | "warning" => Some(LogLevel::Warn),
        "error" => Some(LogLevel::Error),
        _ => None,
    }
}

fn parse_log_format(value: &str) -> Option<LogFormat> {
    match value.trim().to_lowercase().as_str() {
        "text" | "pretty" => Some(LogFormat::Text),
        "compact" => Some(LogFormat::Compact),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}

/// YAML goes through the `config` crate.
fn yaml_parse<T: DeserializeOwned>(content: &str) -> ConfigResult<T> {
    config::Config::builder()
        .add_source(config::File::from_str(content, config::FileFormat::Yaml))
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| ConfigError::serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const YAML: &str = r#"
application:
  name: Plant7
security:
  auto_accept_untrusted: true
  certificate:
    path: pki/own.pem
    validity_days: 30
endpoints:
  - opc.tcp://0.0.0.0:4840/Plant7
address_space:
  namespace_uri: urn:plant7
  simulation:
    period: 100ms
    perturbation: 0.2
sessions:
  sweep_interval: 500ms
  idle_threshold: 5s
logging:
  level: debug
  format: json
"#;

    /// A loader whose prefix no real environment sets.
    fn isolated(prefix: &str) -> ConfigLoader {
        ConfigLoader::builder().env_prefix(prefix).build()
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.TOML")).unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")).unwrap(), ConfigFormat::Json);
        assert!(matches!(
            ConfigFormat::from_path(Path::new("a.ini")),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
        assert!(ConfigFormat::from_path(Path::new("ctrl")).is_err());
    }

    #[test]
    fn test_load_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctrl.yaml");
        fs::write(&path, YAML).unwrap();

        let config = isolated("CTRL_TEST_YAML").load(&path).unwrap();
        assert_eq!(config.application.name, "Plant7");
        assert!(config.security.auto_accept_untrusted);
        assert_eq!(config.security.certificate.validity_days, 30);
        assert_eq!(config.security.certificate.path, dir.path().join("pki/own.pem"));
        assert_eq!(config.address_space.namespace_uri, "urn:plant7");
        assert_eq!(config.address_space.simulation.period, Duration::from_millis(100));
        assert_eq!(config.sessions.idle_threshold, Duration::from_secs(5));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_load_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctrl.toml");
        fs::write(
            &path,
            r#"
endpoints = ["opc.tcp://localhost:4841/ControlsServer"]

[security]
renew_certificate = true

[address_space.simulation]
enabled = false
"#,
        )
        .unwrap();

        let config = isolated("CTRL_TEST_TOML").load(&path).unwrap();
        assert!(config.security.renew_certificate);
        assert!(!config.address_space.simulation.enabled);
        assert_eq!(config.endpoints.len(), 1);
    }

    #[test]
    fn test_absolute_certificate_path_kept() {
        let loader = ConfigLoader::builder()
            .env_prefix("CTRL_TEST_ABS")
            .base_path("/srv/ctrl")
            .build();
        let config = loader
            .load_from_str(
                r#"{"security": {"certificate": {"path": "/etc/own.pem"}}}"#,
                ConfigFormat::Json,
            )
            .unwrap();
        assert_eq!(config.security.certificate.path, PathBuf::from("/etc/own.pem"));

        let config = loader.load_from_str("{}", ConfigFormat::Json).unwrap();
        assert_eq!(
            config.security.certificate.path,
            PathBuf::from("/srv/ctrl/pki/own/certs/ControlsServer.pem")
        );
    }

    #[test]
    fn test_missing_file() {
        let err = isolated("CTRL_TEST_MISSING")
            .load("/nonexistent/ctrl.yaml")
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_parse_error_carries_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctrl.json");
        fs::write(&path, r#"{"endpoints": 5}"#).unwrap();

        let err = isolated("CTRL_TEST_PARSE").load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_unknown_section_rejected() {
        let err = isolated("CTRL_TEST_UNKNOWN")
            .load_from_str("[gateway]\nid = \"x\"\n", ConfigFormat::Toml)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Serialization { .. }));
    }

    #[test]
    fn test_env_placeholders() {
        env::set_var("CTRL_TEST_PH_NAME", "FromEnv");
        env::remove_var("CTRL_TEST_PH_UNSET");

        let resolved = resolve_env_placeholders(
            "a=${CTRL_TEST_PH_NAME} b=${CTRL_TEST_PH_UNSET:fallback} c=${CTRL_TEST_PH_UNSET} d=${open",
        );
        assert_eq!(
            resolved,
            "a=FromEnv b=fallback c=${CTRL_TEST_PH_UNSET} d=${open"
        );
        env::remove_var("CTRL_TEST_PH_NAME");
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("CTRL_TEST_OV_AUTO_ACCEPT", "yes");
        env::set_var("CTRL_TEST_OV_LOG_LEVEL", "warning");
        env::set_var("CTRL_TEST_OV_NAMESPACE_URI", "urn:override");
        env::set_var(
            "CTRL_TEST_OV_ENDPOINTS",
            "opc.tcp://a:1/x, opc.tcp://b:2/y",
        );

        let config = isolated("CTRL_TEST_OV")
            .load_from_str("{}", ConfigFormat::Json)
            .unwrap();
        assert!(config.security.auto_accept_untrusted);
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert_eq!(config.address_space.namespace_uri, "urn:override");
        assert_eq!(config.endpoints, vec!["opc.tcp://a:1/x", "opc.tcp://b:2/y"]);

        for suffix in ["AUTO_ACCEPT", "LOG_LEVEL", "NAMESPACE_URI", "ENDPOINTS"] {
            env::remove_var(format!("CTRL_TEST_OV_{}", suffix));
        }
    }

    #[test]
    fn test_invalid_env_override() {
        env::set_var("CTRL_TEST_BAD_AUTO_ACCEPT", "maybe");
        let err = isolated("CTRL_TEST_BAD").defaults().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));
        env::remove_var("CTRL_TEST_BAD_AUTO_ACCEPT");
    }

    #[test]
    fn test_env_vars_disabled() {
        env::set_var("CTRL_TEST_OFF_AUTO_ACCEPT", "true");
        let config = ConfigLoader::builder()
            .env_prefix("CTRL_TEST_OFF")
            .resolve_env_vars(false)
            .build()
            .defaults()
            .unwrap();
        assert!(!config.security.auto_accept_untrusted);
        env::remove_var("CTRL_TEST_OFF_AUTO_ACCEPT");
    }

    #[test]
    fn test_validation_runs_after_load() {
        let err = isolated("CTRL_TEST_VALID")
            .load_from_str(r#"{"endpoints": []}"#, ConfigFormat::Json)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { .. }));
    }
}
