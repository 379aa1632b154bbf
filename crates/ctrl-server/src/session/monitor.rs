// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session registry, status lines and the idle sweep.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

use ctrl_core::{ServerError, ServerResult};

use super::event::{SessionEvent, SessionReason, SessionSnapshot, SessionState};
use crate::task::TaskHandle;

/// Reason label of periodic status lines.
pub const STATUS_REASON: &str = "-Status-";

/// Default time between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Default quiet period after which a summary is printed.
pub const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_secs(10);

/// Monitor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionMonitorConfig {
    /// Time between sweeps.
    pub sweep_interval: Duration,
    /// Quiet period after which a summary is printed.
    pub idle_threshold: Duration,
}

impl Default for SessionMonitorConfig {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
        }
    }
}

// =============================================================================
// StatusSink
// =============================================================================

/// Destination of session status lines.
pub trait StatusSink: Send + Sync {
    /// Writes one line.
    fn emit(&self, line: &str);
}

/// Writes status lines as `info` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn emit(&self, line: &str) {
        info!(target: "ctrl::session", "{}", line);
    }
}

// =============================================================================
// SessionRecord
// =============================================================================

/// Bookkeeping for one known session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    /// Latest snapshot.
    pub snapshot: SessionSnapshot,
    /// Lifecycle state.
    pub state: SessionState,
    /// Time of the last event.
    pub last_contact: DateTime<Utc>,
    /// Events seen for this session.
    pub events: u64,
}

impl SessionRecord {
    /// Formats the periodic status line.
    pub fn status_line(&self) -> String {
        format!(
            "{:>9}:{:>20}:Last Event:{}",
            STATUS_REASON,
            self.snapshot.name,
            self.last_contact.with_timezone(&Local).format("%H:%M:%S")
        )
    }
}

// =============================================================================
// SessionMonitor
// =============================================================================

/// Tracks sessions reported by the transport.
///
/// Cheap to clone; clones share one registry.
#[derive(Clone)]
pub struct SessionMonitor {
    inner: Arc<Inner>,
}

struct Inner {
    config: SessionMonitorConfig,
    sessions: DashMap<String, SessionRecord>,
    last_event: Mutex<Instant>,
    sink: Arc<dyn StatusSink>,
    accepting: AtomicBool,
    delivered: AtomicU64,
}

impl SessionMonitor {
    /// Creates a monitor writing to `sink`.
    pub fn new(config: SessionMonitorConfig, sink: Arc<dyn StatusSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                sessions: DashMap::new(),
                last_event: Mutex::new(Instant::now()),
                sink,
                accepting: AtomicBool::new(true),
                delivered: AtomicU64::new(0),
            }),
        }
    }

    /// Creates a monitor writing to [`TracingSink`].
    pub fn with_tracing(config: SessionMonitorConfig) -> Self {
        Self::new(config, Arc::new(TracingSink))
    }

    /// Returns the settings.
    pub fn config(&self) -> &SessionMonitorConfig {
        &self.inner.config
    }

    /// Records a session transition and prints its status line.
    ///
    /// Fails with `Shutdown` for `Created` events once the monitor stopped
    /// accepting sessions. Other events are always recorded so that draining
    /// sessions can still close.
    pub fn deliver(&self, event: SessionEvent) -> ServerResult<()> {
        if event.reason == SessionReason::Created && !self.is_accepting() {
            debug!(session_id = %event.snapshot.session_id, "Refusing new session");
            return Err(ServerError::shutdown("new sessions are not accepted"));
        }

        *self.inner.last_event.lock() = Instant::now();
        self.inner.delivered.fetch_add(1, Ordering::Relaxed);
        let now = Utc::now();

        match event.reason {
            SessionReason::Closing => {
                self.inner.sessions.remove(&event.snapshot.session_id);
            }
            reason => {
                self.inner
                    .sessions
                    .entry(event.snapshot.session_id.clone())
                    .and_modify(|record| {
                        record.snapshot = event.snapshot.clone();
                        record.state = reason.into();
                        record.last_contact = now;
                        record.events += 1;
                    })
                    .or_insert_with(|| SessionRecord {
                        snapshot: event.snapshot.clone(),
                        state: reason.into(),
                        last_contact: now,
                        events: 1,
                    });
            }
        }

        self.inner.sink.emit(&event.status_line());
        Ok(())
    }

    /// Prints a summary when no event fired during the idle threshold.
    ///
    /// Returns the number of lines printed. The idle timer restarts after
    /// every summary, even when no session is known.
    pub fn sweep(&self) -> usize {
        {
            let mut last_event = self.inner.last_event.lock();
            if last_event.elapsed() <= self.inner.config.idle_threshold {
                return 0;
            }
            *last_event = Instant::now();
        }

        let lines: Vec<String> = self.sessions().iter().map(SessionRecord::status_line).collect();
        for line in &lines {
            self.inner.sink.emit(line);
        }
        lines.len()
    }

    /// Starts the periodic sweep task.
    ///
    /// Fails with a startup error when the sweep interval is zero.
    pub fn start_sweep(&self) -> ServerResult<TaskHandle> {
        if self.inner.config.sweep_interval.is_zero() {
            return Err(ServerError::startup("session sweep interval must be non-zero"));
        }
        let shutdown = Arc::new(Notify::new());
        let running = Arc::new(AtomicBool::new(true));
        let ticks = Arc::new(AtomicU64::new(0));

        let monitor = self.clone();
        let task = {
            let shutdown = Arc::clone(&shutdown);
            let running = Arc::clone(&running);
            let ticks = Arc::clone(&ticks);
            tokio::spawn(async move {
                let period = monitor.inner.config.sweep_interval;
                info!(interval_ms = period.as_millis() as u64, "Session sweep started");

                let mut interval = time::interval_at(time::Instant::now() + period, period);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            if !running.load(Ordering::SeqCst) {
                                break;
                            }
                            let printed = monitor.sweep();
                            ticks.fetch_add(1, Ordering::Relaxed);
                            if printed > 0 {
                                debug!(sessions = printed, "Session summary printed");
                            }
                        }
                        _ = shutdown.notified() => break,
                    }
                }

                running.store(false, Ordering::SeqCst);
                info!("Session sweep stopped");
            })
        };

        Ok(TaskHandle::from_parts(shutdown, running, ticks, task))
    }

    /// Enables or disables establishment of new sessions.
    pub fn set_accepting(&self, accepting: bool) {
        self.inner.accepting.store(accepting, Ordering::SeqCst);
    }

    /// Returns `true` while new sessions are accepted.
    pub fn is_accepting(&self) -> bool {
        self.inner.accepting.load(Ordering::SeqCst)
    }

    /// Returns a known session.
    pub fn session(&self, session_id: &str) -> Option<SessionRecord> {
        self.inner.sessions.get(session_id).map(|r| r.value().clone())
    }

    /// Returns all known sessions ordered by name, then identifier.
    pub fn sessions(&self) -> Vec<SessionRecord> {
        let mut sessions: Vec<SessionRecord> = self
            .inner
            .sessions
            .iter()
            .map(|r| r.value().clone())
            .collect();
        sessions.sort_by(|a, b| {
            (&a.snapshot.name, &a.snapshot.session_id).cmp(&(&b.snapshot.name, &b.snapshot.session_id))
        });
        sessions
    }

    /// Returns the number of known sessions.
    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }

    /// Returns the number of delivered events.
    pub fn delivered(&self) -> u64 {
        self.inner.delivered.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for SessionMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMonitor")
            .field("config", &self.inner.config)
            .field("sessions", &self.session_count())
            .field("accepting", &self.is_accepting())
            .finish()
    }
}
