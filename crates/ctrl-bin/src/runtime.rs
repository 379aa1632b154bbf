// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Server runtime orchestration.
//!
//! Loads the configuration, turns it into a [`ControllerConfig`], starts the
//! controller and keeps it running until shutdown is signaled.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use ctrl_config::{ConfigLoader, ServerConfig};
use ctrl_server::{
    CertificateRequest, ControllerConfig, ServerController, SessionMonitorConfig,
    SimulationConfig, TrustMode,
};

use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

// =============================================================================
// Configuration mapping
// =============================================================================

/// Converts a loaded configuration into controller settings.
pub fn controller_config(config: &ServerConfig) -> ControllerConfig {
    let application_uri = config.application.application_uri();
    let certificate = &config.security.certificate;
    let simulation = &config.address_space.simulation;

    ControllerConfig {
        application_name: config.application.name.clone(),
        application_uri: application_uri.clone(),
        namespace_uri: config.address_space.namespace_uri.clone(),
        endpoints: config.endpoints.clone(),
        trust_mode: TrustMode::from_auto_accept(config.security.auto_accept_untrusted),
        certificate: CertificateRequest {
            path: certificate.path.clone(),
            subject: certificate
                .subject
                .clone()
                .unwrap_or_else(|| format!("CN={}", config.application.name)),
            application_uri,
            validity_days: certificate.validity_days,
            create_if_missing: certificate.create_if_missing,
            renew: config.security.renew_certificate,
        },
        simulation: simulation.enabled.then_some(SimulationConfig {
            period: simulation.period,
            perturbation: simulation.perturbation,
        }),
        sessions: SessionMonitorConfig {
            sweep_interval: config.sessions.sweep_interval,
            idle_threshold: config.sessions.idle_threshold,
        },
    }
}

// =============================================================================
// ServerRuntime
// =============================================================================

/// Runs one controller until shutdown.
pub struct ServerRuntime {
    controller: Arc<ServerController>,
    shutdown: ShutdownCoordinator,
}

impl ServerRuntime {
    /// Creates a runtime around a controller.
    pub fn new(controller: ServerController) -> Self {
        Self {
            controller: Arc::new(controller),
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Returns the controller.
    pub fn controller(&self) -> Arc<ServerController> {
        Arc::clone(&self.controller)
    }

    /// Returns a coordinator that ends [`run`](Self::run) when initiated.
    pub fn shutdown_handle(&self) -> ShutdownCoordinator {
        self.shutdown.clone()
    }

    /// Starts the server, waits for shutdown, then stops it.
    pub async fn run(self) -> BinResult<()> {
        info!("Starting CONTROLS server v{}", ctrl_server::VERSION);

        self.controller.start().await?;
        info!(
            endpoints = self.controller.endpoints().len(),
            "Server is ready, press Ctrl+C to stop"
        );

        self.shutdown.wait_for_shutdown().await;

        info!("Shutdown initiated, cleaning up...");
        self.controller.stop().await?;
        info!("CONTROLS server shutdown complete");
        Ok(())
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`ServerRuntime`].
#[derive(Default)]
pub struct RuntimeBuilder {
    config_path: Option<PathBuf>,
    config: Option<ServerConfig>,
    loader: Option<ConfigLoader>,
    auto_accept: bool,
    renew_certificate: bool,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration file path.
    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the configuration directly.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the loader used for the configuration file.
    pub fn loader(mut self, loader: ConfigLoader) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Forces auto-accept of untrusted peers.
    pub fn auto_accept(mut self, enabled: bool) -> Self {
        self.auto_accept = enabled;
        self
    }

    /// Forces certificate renewal.
    pub fn renew_certificate(mut self, enabled: bool) -> Self {
        self.renew_certificate = enabled;
        self
    }

    /// Resolves the configuration and builds the runtime.
    ///
    /// A configuration file that does not exist selects the defaults.
    pub fn build(self) -> BinResult<ServerRuntime> {
        let loader = self.loader.unwrap_or_default();

        let mut config = match (self.config, self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) if path.exists() => loader
                .load(&path)
                .map_err(|e| BinError::from(e).with_context(format!("loading {}", path.display())))?,
            (None, Some(path)) => {
                warn!(path = %path.display(), "Configuration file not found, using defaults");
                loader.defaults()?
            }
            (None, None) => {
                return Err(BinError::config("No configuration provided"));
            }
        };

        if self.auto_accept {
            config.security.auto_accept_untrusted = true;
        }
        if self.renew_certificate {
            config.security.renew_certificate = true;
        }

        let controller = ServerController::new(controller_config(&config));
        Ok(ServerRuntime::new(controller))
    }
}

// =============================================================================
// Tests
// =============================================================================
