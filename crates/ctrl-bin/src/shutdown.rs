// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Graceful shutdown coordination.
//!
//! SIGINT, SIGTERM and SIGQUIT (Ctrl+C elsewhere) end the server, as does
//! [`ShutdownCoordinator::initiate_shutdown`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info};

/// Coordinates graceful shutdown.
///
/// # Example
///
/// ```ignore
/// use ctrl_bin::shutdown::ShutdownCoordinator;
///
/// let coordinator = ShutdownCoordinator::new();
/// let handle = coordinator.clone();
/// tokio::spawn(async move { handle.initiate_shutdown() });
/// coordinator.wait_for_shutdown().await;
/// ```
#[derive(Clone)]
pub struct ShutdownCoordinator {
    sender: broadcast::Sender<()>,
    shutdown_initiated: Arc<AtomicBool>,
}

impl ShutdownCoordinator {
    /// Creates a new shutdown coordinator.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self {
            sender,
            shutdown_initiated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribes to shutdown notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Initiates shutdown. Idempotent.
    pub fn initiate_shutdown(&self) {
        if self
            .shutdown_initiated
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            info!("Shutdown initiated");
            let _ = self.sender.send(());
        }
    }

    /// Returns true if shutdown has been initiated.
    pub fn is_shutdown_initiated(&self) -> bool {
        self.shutdown_initiated.load(Ordering::SeqCst)
    }

    /// Waits for an OS signal or a manual initiation.
    pub async fn wait_for_shutdown(&self) {
        // Subscribe before checking the flag so an initiation in between is seen.
        let mut receiver = self.sender.subscribe();
        if self.is_shutdown_initiated() {
            return;
        }

        tokio::select! {
            _ = receiver.recv() => {}
            _ = os_signal() => self.initiate_shutdown(),
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
async fn os_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let handlers = (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
        signal(SignalKind::quit()),
    );

    match handlers {
        (Ok(mut sigterm), Ok(mut sigint), Ok(mut sigquit)) => {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM"),
                _ = sigint.recv() => info!("Received SIGINT"),
                _ = sigquit.recv() => info!("Received SIGQUIT"),
            }
        }
        _ => {
            error!("Failed to register signal handlers, falling back to Ctrl+C");
            ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn os_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C"),
        Err(e) => {
            // Only a manual initiation can end the wait now.
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shutdown_coordinator() {
        let coordinator = ShutdownCoordinator::new();
        let mut rx = coordinator.subscribe();

        assert!(!coordinator.is_shutdown_initiated());
        coordinator.initiate_shutdown();
        assert!(coordinator.is_shutdown_initiated());
        assert!(rx.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_wait_resolves_on_initiation() {
        let coordinator = ShutdownCoordinator::new();
        let handle = coordinator.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            handle.initiate_shutdown();
        });

        tokio::time::timeout(Duration::from_secs(1), coordinator.wait_for_shutdown())
            .await
            .expect("shutdown wait should resolve");
    }

    #[tokio::test]
    async fn test_wait_after_initiation_returns_immediately() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.initiate_shutdown();
        coordinator.initiate_shutdown();

        tokio::time::timeout(Duration::from_millis(100), coordinator.wait_for_shutdown())
            .await
            .expect("already initiated");
    }
}
