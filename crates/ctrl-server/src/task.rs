// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Handles for the server's background loops.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::warn;

/// Handle to a running background task.
///
/// Dropping the handle without calling [`TaskHandle::join`] leaves the task
/// running until the runtime shuts down.
#[derive(Debug)]
pub struct TaskHandle {
    shutdown: Arc<Notify>,
    running: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl TaskHandle {
    /// Signals the task to stop after the in-flight iteration.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    /// Waits for the task to exit. Returns immediately if already joined.
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Background task ended abnormally");
            }
        }
    }

    /// Stops the task and waits for it.
    pub async fn shutdown(&mut self) {
        self.stop();
        self.join().await;
    }

    /// Returns `true` while the task has not been told to stop.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns the number of completed iterations.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Assembles a handle from the task's shared control state.
    pub(crate) fn from_parts(
        shutdown: Arc<Notify>,
        running: Arc<AtomicBool>,
        ticks: Arc<AtomicU64>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            shutdown,
            running,
            ticks,
            task: Some(task),
        }
    }
}
