// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Harness
//!
//! Runs a [`ServerController`] inside a private temporary directory with a
//! recording status sink. The directory lives as long as the harness.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use tempfile::TempDir;

use ctrl_server::{ControlsNodes, ControllerConfig, ServerController, ServerState};

use super::fixtures::ControllerFixtures;
use super::init_test_logging;
use super::mocks::RecordingSink;

/// A running controller plus everything it needs.
pub struct TestServer {
    /// The controller under test.
    pub controller: Arc<ServerController>,
    /// Receives every session status line.
    pub sink: Arc<RecordingSink>,
    dir: TempDir,
}

impl TestServer {
    /// Starts a controller with [`ControllerFixtures::fast`].
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with(ControllerFixtures::fast).await
    }

    /// Starts a controller with settings derived from the harness directory.
    pub async fn start_with(config: fn(&Path) -> ControllerConfig) -> anyhow::Result<Self> {
        let server = Self::unstarted(config)?;
        server
            .controller
            .start()
            .await
            .context("controller failed to start")?;
        Ok(server)
    }

    /// Builds a controller without starting it.
    pub fn unstarted(config: fn(&Path) -> ControllerConfig) -> anyhow::Result<Self> {
        init_test_logging();
        let dir = tempfile::Builder::new()
            .prefix("ctrl-it-")
            .tempdir()
            .context("cannot create harness directory")?;
        let sink = RecordingSink::new();
        let controller = ServerController::builder(config(dir.path()))
            .status_sink(sink.clone())
            .build();

        Ok(Self {
            controller: Arc::new(controller),
            sink,
            dir,
        })
    }

    /// The harness directory.
    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// The Controls node identifiers.
    ///
    /// Panics when the server is not serving.
    pub fn nodes(&self) -> ControlsNodes {
        self.controller
            .nodes()
            .expect("server is not serving, no Controls nodes")
    }

    /// Waits until the controller reaches `state`.
    pub async fn wait_for_state(&self, state: ServerState, timeout: Duration) -> anyhow::Result<()> {
        let reached = super::assertions::eventually(timeout, || self.controller.state() == state).await;
        if reached {
            Ok(())
        } else {
            Err(anyhow!(
                "expected {} within {:?}, still {}",
                state,
                timeout,
                self.controller.state()
            ))
        }
    }

    /// Stops the controller.
    pub async fn stop(&self) -> anyhow::Result<()> {
        self.controller.stop().await.context("controller failed to stop")
    }
}
