// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # ctrl-config
//!
//! Configuration management for the CONTROLS telemetry server.
//!
//! ## Features
//!
//! - **Schema Definition**: every section has a default and is validated
//! - **Multi-Format Support**: YAML, TOML, and JSON configuration files
//! - **Environment Overrides**: `${VAR:default}` placeholders and `CTRL_*` variables
//!
//! ## Quick Start
//!
//! ```no_run
//! use ctrl_config::load_config;
//!
//! let config = load_config("ctrl.yaml").unwrap();
//! println!("Application: {}", config.application.name);
//! println!("Endpoints: {:?}", config.endpoints);
//! ```
//!
//! ## Configuration Schema
//!
//! - `application` - name and URIs
//! - `security` - trust policy and the application certificate
//! - `endpoints` - endpoint URLs
//! - `address_space` - Controls namespace and the update engine
//! - `sessions` - session sweep timing
//! - `logging` - level and format

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, ConfigFormat, ConfigLoader, ConfigLoaderBuilder, DEFAULT_ENV_PREFIX};
pub use schema::{
    AddressSpaceConfig, ApplicationConfig, CertificateConfig, LogFormat, LogLevel, LoggingConfig,
    SecurityConfig, ServerConfig, SessionSettings, SimulationSettings,
};
