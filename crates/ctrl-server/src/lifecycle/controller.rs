// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The server lifecycle controller.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info, warn};

use ctrl_core::{
    AddressSpace, DataValue, MethodDispatcher, Node, NodeId, ServerError, ServerResult, Value,
};

use super::state::{ServerState, StateChange};
use crate::certificate::{
    ApplicationCertificate, CertificateClass, CertificateProvider, CertificateRequest,
    FileCertificateProvider, PeerCertificate, TrustDecision, TrustGate, TrustMode, TrustStats,
};
use crate::controls::{self, ControlsNodes};
use crate::session::{SessionEvent, SessionMonitor, SessionMonitorConfig, StatusSink, TracingSink};
use crate::simulation::{SimulationConfig, UpdateEngine};
use crate::task::TaskHandle;

/// Default endpoint URL.
pub const DEFAULT_ENDPOINT: &str = "opc.tcp://localhost:4840/ControlsServer";

// =============================================================================
// ControllerConfig
// =============================================================================

/// Settings consumed by [`ServerController`].
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Application name.
    pub application_name: String,
    /// Application URI, registered as namespace 1.
    pub application_uri: String,
    /// Namespace of the Controls node set.
    pub namespace_uri: String,
    /// Endpoint URLs reported at startup.
    pub endpoints: Vec<String>,
    /// Peer trust policy.
    pub trust_mode: TrustMode,
    /// Application instance certificate.
    pub certificate: CertificateRequest,
    /// Update engine settings; `None` disables simulation.
    pub simulation: Option<SimulationConfig>,
    /// Session monitor settings.
    pub sessions: SessionMonitorConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            application_name: "ControlsServer".to_string(),
            application_uri: "urn:localhost:ControlsServer".to_string(),
            namespace_uri: controls::NAMESPACE_URI.to_string(),
            endpoints: vec![DEFAULT_ENDPOINT.to_string()],
            trust_mode: TrustMode::ManualReview,
            certificate: CertificateRequest {
                path: PathBuf::from("pki/own/certs/ControlsServer.pem"),
                subject: "CN=ControlsServer".to_string(),
                application_uri: "urn:localhost:ControlsServer".to_string(),
                validity_days: 365,
                create_if_missing: true,
                renew: false,
            },
            simulation: Some(SimulationConfig::default()),
            sessions: SessionMonitorConfig::default(),
        }
    }
}

// =============================================================================
// ServerController
// =============================================================================

/// Components shared by the request entry points while serving.
#[derive(Clone)]
struct Services {
    space: AddressSpace,
    dispatcher: MethodDispatcher,
    gate: Arc<TrustGate>,
    sessions: SessionMonitor,
    nodes: ControlsNodes,
    certificate: ApplicationCertificate,
}

#[derive(Default)]
struct Tasks {
    engine: Option<TaskHandle>,
    sweep: Option<TaskHandle>,
}

/// Orchestrates startup and shutdown of the server.
///
/// `start` and `stop` are serialized; request entry points may be called
/// concurrently from any task.
///
/// # Examples
///
/// ```no_run
/// use ctrl_server::{ControllerConfig, ServerController};
///
/// # async fn run() -> ctrl_core::ServerResult<()> {
/// let controller = ServerController::new(ControllerConfig::default());
/// controller.start().await?;
/// // serve...
/// controller.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct ServerController {
    config: ControllerConfig,
    provider: Arc<dyn CertificateProvider>,
    sink: Arc<dyn StatusSink>,
    state: RwLock<ServerState>,
    state_tx: broadcast::Sender<StateChange>,
    services: RwLock<Option<Services>>,
    lifecycle: Mutex<Tasks>,
}

impl ServerController {
    /// Creates a controller with the file certificate provider and the
    /// tracing status sink.
    pub fn new(config: ControllerConfig) -> Self {
        ServerControllerBuilder::new(config).build()
    }

    /// Creates a builder.
    pub fn builder(config: ControllerConfig) -> ServerControllerBuilder {
        ServerControllerBuilder::new(config)
    }

    /// Returns the settings.
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Returns the current state.
    pub fn state(&self) -> ServerState {
        *self.state.read()
    }

    /// Subscribes to state transitions.
    pub fn subscribe_state(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Starts the server.
    ///
    /// Only valid from `Unstarted`. On failure the controller ends in
    /// `Failed` and the error is returned.
    pub async fn start(&self) -> ServerResult<()> {
        let mut tasks = self.lifecycle.lock().await;
        self.transition(ServerState::ConfiguringTrust)?;

        match self.bring_up(&mut tasks).await {
            Ok(()) => {
                self.transition(ServerState::Running)?;
                info!(name = %self.config.application_name, "Server running");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Server startup failed");
                self.shutdown_tasks(&mut tasks).await;
                if let Some(services) = self.services.write().take() {
                    services.space.release();
                }
                self.force_state(ServerState::Failed);
                Err(e)
            }
        }
    }

    async fn bring_up(&self, tasks: &mut Tasks) -> ServerResult<()> {
        let certificate = self.provider.obtain(&self.config.certificate).await?;
        info!(
            provider = self.provider.name(),
            subject = %certificate.subject,
            fingerprint = %certificate.fingerprint(),
            "Application instance certificate ready"
        );
        if !certificate.is_valid() {
            warn!(subject = %certificate.subject, "Application instance certificate has expired");
        }
        let gate = Arc::new(TrustGate::new(self.config.trust_mode));
        info!(mode = %gate.mode(), "Trust gate configured");

        self.transition(ServerState::BuildingAddressSpace)?;
        let space = AddressSpace::builder()
            .namespace_uri(self.config.application_uri.clone())
            .namespace_uri(self.config.namespace_uri.clone())
            .build();
        let nodes = controls::build(&space)?;
        let dispatcher = MethodDispatcher::new(space.clone());
        let sessions = SessionMonitor::new(self.config.sessions, Arc::clone(&self.sink));

        if let Some(simulation) = self.config.simulation {
            let mut engine = UpdateEngine::new(space.clone(), simulation);
            for node_id in nodes.simulated() {
                if let Err(e) = engine.watch(node_id.clone()) {
                    warn!(node_id = %node_id, error = %e, "Variable not simulated");
                }
            }
            tasks.engine = Some(engine.start()?);
        } else {
            info!("Simulation disabled");
        }
        tasks.sweep = Some(sessions.start_sweep()?);

        for endpoint in &self.config.endpoints {
            info!(endpoint = %endpoint, "{}", endpoint);
        }

        *self.services.write() = Some(Services {
            space,
            dispatcher,
            gate,
            sessions,
            nodes,
            certificate,
        });
        Ok(())
    }

    /// Stops the server.
    ///
    /// Refuses new sessions, stops the update engine and the session sweep,
    /// waits for both, then releases the address space. Calling `stop` again
    /// once stopped (or on a controller that never started) is a no-op.
    pub async fn stop(&self) -> ServerResult<()> {
        let mut tasks = self.lifecycle.lock().await;

        match self.state() {
            ServerState::Stopped | ServerState::Failed => return Ok(()),
            ServerState::Unstarted => return self.transition(ServerState::Stopped),
            ServerState::Running => {}
            other => {
                return Err(ServerError::internal(format!("cannot stop while {}", other)));
            }
        }

        self.transition(ServerState::Draining)?;
        if let Some(services) = self.services.read().as_ref() {
            services.sessions.set_accepting(false);
        }

        self.shutdown_tasks(&mut tasks).await;

        if let Some(services) = self.services.write().take() {
            let released = services.space.release();
            info!(
                nodes = released,
                sessions = services.sessions.session_count(),
                "Server resources released"
            );
        }

        self.transition(ServerState::Stopped)?;
        info!(name = %self.config.application_name, "Server stopped");
        Ok(())
    }

    async fn shutdown_tasks(&self, tasks: &mut Tasks) {
        // Signal both before awaiting either.
        for handle in [&tasks.engine, &tasks.sweep].into_iter().flatten() {
            handle.stop();
        }
        if let Some(mut engine) = tasks.engine.take() {
            engine.join().await;
        }
        if let Some(mut sweep) = tasks.sweep.take() {
            sweep.join().await;
        }
    }

    fn transition(&self, next: ServerState) -> ServerResult<()> {
        let from = {
            let mut state = self.state.write();
            let from = *state;
            if !from.can_transition_to(next) {
                return Err(ServerError::startup(format!(
                    "invalid state transition {} -> {}",
                    from, next
                )));
            }
            *state = next;
            from
        };
        self.announce(from, next);
        Ok(())
    }

    fn force_state(&self, next: ServerState) {
        let from = std::mem::replace(&mut *self.state.write(), next);
        self.announce(from, next);
    }

    fn announce(&self, from: ServerState, to: ServerState) {
        info!(from = %from, to = %to, "Server state changed");
        // No subscribers is fine.
        let _ = self.state_tx.send(StateChange {
            from,
            to,
            at: Utc::now(),
        });
    }

    // =========================================================================
    // Request entry points
    // =========================================================================

    fn services(&self) -> ServerResult<Services> {
        if !self.state().is_serving() {
            return Err(ServerError::shutdown(format!("server is {}", self.state())));
        }
        self.services
            .read()
            .clone()
            .ok_or_else(|| ServerError::shutdown("server resources released"))
    }

    /// Reads a variable.
    pub fn read(&self, node_id: &NodeId) -> ServerResult<DataValue> {
        self.services()?.space.read(node_id)
    }

    /// Writes a variable on behalf of a client.
    pub fn write(&self, node_id: &NodeId, value: Value) -> ServerResult<()> {
        self.services()?.space.write(node_id, value)
    }

    /// Returns a node snapshot.
    pub fn lookup(&self, node_id: &NodeId) -> ServerResult<Node> {
        self.services()?.space.lookup(node_id)
    }

    /// Invokes a method.
    pub fn invoke(&self, method_id: &NodeId, inputs: &[Value]) -> ServerResult<Vec<Value>> {
        self.services()?.dispatcher.invoke(method_id, inputs)
    }

    /// Decides on a peer certificate that failed validation.
    pub fn validate_peer_certificate(
        &self,
        certificate: &PeerCertificate,
        class: CertificateClass,
    ) -> ServerResult<TrustDecision> {
        Ok(self.services()?.gate.evaluate(certificate, class))
    }

    /// Forwards a session transition to the monitor.
    pub fn deliver_session_event(&self, event: SessionEvent) -> ServerResult<()> {
        self.services()?.sessions.deliver(event)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    /// Returns the address space while serving.
    pub fn address_space(&self) -> Option<AddressSpace> {
        self.services.read().as_ref().map(|s| s.space.clone())
    }

    /// Returns the Controls node identifiers while serving.
    pub fn nodes(&self) -> Option<ControlsNodes> {
        self.services.read().as_ref().map(|s| s.nodes.clone())
    }

    /// Returns the session monitor while serving.
    pub fn sessions(&self) -> Option<SessionMonitor> {
        self.services.read().as_ref().map(|s| s.sessions.clone())
    }

    /// Returns the application certificate while serving.
    pub fn certificate(&self) -> Option<ApplicationCertificate> {
        self.services.read().as_ref().map(|s| s.certificate.clone())
    }

    /// Returns the trust gate counters while serving.
    pub fn trust_stats(&self) -> Option<TrustStats> {
        self.services.read().as_ref().map(|s| s.gate.stats())
    }

    /// Returns the configured endpoint URLs.
    pub fn endpoints(&self) -> &[String] {
        &self.config.endpoints
    }
}

impl std::fmt::Debug for ServerController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerController")
            .field("name", &self.config.application_name)
            .field("state", &self.state())
            .field("provider", &self.provider.name())
            .finish()
    }
}

// =============================================================================
// ServerControllerBuilder
// =============================================================================

/// Builder for [`ServerController`].
pub struct ServerControllerBuilder {
    config: ControllerConfig,
    provider: Arc<dyn CertificateProvider>,
    sink: Arc<dyn StatusSink>,
}

impl ServerControllerBuilder {
    /// Creates a builder with default collaborators.
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            provider: Arc::new(FileCertificateProvider::new()),
            sink: Arc::new(TracingSink),
        }
    }

    /// Sets the certificate provider.
    pub fn certificate_provider(mut self, provider: Arc<dyn CertificateProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// Sets the session status sink.
    pub fn status_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Builds the controller in `Unstarted`.
    pub fn build(self) -> ServerController {
        let (state_tx, _) = broadcast::channel(32);
        ServerController {
            config: self.config,
            provider: self.provider,
            sink: self.sink,
            state: RwLock::new(ServerState::Unstarted),
            state_tx,
            services: RwLock::new(None),
            lifecycle: Mutex::new(Tasks::default()),
        }
    }
}
