// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Periodic perturbation of simulated variables.
//!
//! The [`UpdateEngine`] owns one background task. Every period it takes the
//! exclusive address space lock once and moves each watched variable by a
//! small random step:
//!
//! ```text
//! next = prev > 0 ? prev + (r - 0.5) * perturbation : r      r in (0, 1)
//! ```
//!
//! With the default perturbation of 0.1 a step never exceeds 0.05, and a
//! variable starting at zero jumps into (0, 1) on its first tick.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Notify;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use ctrl_core::{AddressSpace, DataType, NodeId, ServerError, ServerResult, StatusCode, Value};

use crate::task::TaskHandle;

/// Default tick period.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(250);

/// Default perturbation amplitude.
pub const DEFAULT_PERTURBATION: f64 = 0.1;

/// Update engine settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationConfig {
    /// Time between ticks.
    pub period: Duration,
    /// Full width of the random step.
    pub perturbation: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_PERIOD,
            perturbation: DEFAULT_PERTURBATION,
        }
    }
}

/// Computes the next simulated value.
///
/// `r` must lie in (0, 1).
#[inline]
pub fn next_value(previous: f64, r: f64, perturbation: f64) -> f64 {
    if previous > 0.0 {
        previous + (r - 0.5) * perturbation
    } else {
        r
    }
}

/// Largest `f32` below one.
const FLOAT_BELOW_ONE: f32 = 1.0 - f32::EPSILON / 2.0;

/// Narrows a sample drawn from (0, 1) to the precision of `data_type`,
/// keeping it inside the open interval.
pub fn reseed_sample(r: f64, data_type: DataType) -> f64 {
    match data_type {
        DataType::Float => f64::from((r as f32).clamp(f32::MIN_POSITIVE, FLOAT_BELOW_ONE)),
        _ => r,
    }
}

// =============================================================================
// UpdateEngine
// =============================================================================

/// Drives the simulated variables of an address space.
pub struct UpdateEngine {
    space: AddressSpace,
    config: SimulationConfig,
    variables: Vec<NodeId>,
}

impl UpdateEngine {
    /// Creates an engine with no watched variables.
    pub fn new(space: AddressSpace, config: SimulationConfig) -> Self {
        Self {
            space,
            config,
            variables: Vec::new(),
        }
    }

    /// Adds a numeric variable to the simulated set.
    pub fn watch(&mut self, node_id: NodeId) -> ServerResult<()> {
        let data_type = self.space.batch(|w| w.data_type(&node_id))??;
        if !matches!(data_type, DataType::Float | DataType::Double) {
            return Err(ServerError::type_mismatch(node_id, DataType::Double, data_type));
        }
        if !self.variables.contains(&node_id) {
            self.variables.push(node_id);
        }
        Ok(())
    }

    /// Returns the simulated variables.
    pub fn variables(&self) -> &[NodeId] {
        &self.variables
    }

    /// Returns the engine settings.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Runs one tick synchronously, returning the number of updated variables.
    ///
    /// A variable that cannot be updated is skipped and keeps its value with
    /// status `UNCERTAIN_LAST_USABLE_VALUE`; the others still move. Fails only
    /// when the address space itself is unavailable.
    pub fn tick(&self) -> ServerResult<usize> {
        let perturbation = self.config.perturbation;
        let variables = &self.variables;

        self.space.batch(|writer| {
            let mut rng = rand::thread_rng();
            let mut updated = 0;

            for node_id in variables {
                let step = writer.read(node_id).and_then(|current| {
                    let data_type = current.value.data_type();
                    let previous = current.value.as_f64().unwrap_or(0.0);
                    let r = reseed_sample(rng.gen_range(f64::MIN_POSITIVE..1.0), data_type);
                    let next = next_value(previous, r, perturbation);
                    let value = Value::from_f64_as(data_type, next)
                        .filter(|v| v.as_f64().map_or(false, f64::is_finite))
                        .ok_or_else(|| {
                            ServerError::internal(format!("{} has no finite next value", node_id))
                        })?;
                    writer.set_value(node_id, value)
                });

                match step {
                    Ok(_) => updated += 1,
                    Err(e) => {
                        warn!(node_id = %node_id, error = %e, "Skipping simulated variable");
                        // Keeps the last value, flagged until the next good step.
                        let _ = writer.set_status(node_id, StatusCode::UNCERTAIN_LAST_USABLE_VALUE);
                    }
                }
            }
            updated
        })
    }

    /// Starts the background task.
    ///
    /// Fails with a startup error when the period is zero.
    pub fn start(self) -> ServerResult<TaskHandle> {
        if self.config.period.is_zero() {
            return Err(ServerError::startup("simulation period must be non-zero"));
        }
        let shutdown = Arc::new(Notify::new());
        let running = Arc::new(AtomicBool::new(true));
        let ticks = Arc::new(AtomicU64::new(0));

        let task = tokio::spawn(Self::run(
            self,
            Arc::clone(&shutdown),
            Arc::clone(&running),
            Arc::clone(&ticks),
        ));

        Ok(TaskHandle::from_parts(shutdown, running, ticks, task))
    }

    async fn run(
        self,
        shutdown: Arc<Notify>,
        running: Arc<AtomicBool>,
        ticks: Arc<AtomicU64>,
    ) {
        info!(
            period_ms = self.config.period.as_millis() as u64,
            variables = self.variables.len(),
            "Update engine started"
        );

        let mut interval = time::interval_at(Instant::now() + self.config.period, self.config.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    match self.tick() {
                        Ok(updated) => {
                            let n = ticks.fetch_add(1, Ordering::Relaxed) + 1;
                            debug!(tick = n, updated, "Simulation tick");
                        }
                        Err(e) => warn!(error = %e, "Simulation tick failed"),
                    }
                }
                _ = shutdown.notified() => break,
            }
        }

        running.store(false, Ordering::SeqCst);
        info!(ticks = ticks.load(Ordering::Relaxed), "Update engine stopped");
    }
}

impl std::fmt::Debug for UpdateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateEngine")
            .field("config", &self.config)
            .field("variables", &self.variables)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space_with(value: Value) -> (AddressSpace, NodeId) {
        let space = AddressSpace::new("example/namespace");
        let data_type = value.data_type();
        let node = space.create_variable(None, "Temperature", data_type, value).unwrap();
        (space, node.id)
    }

    #[test]
    fn test_next_value() {
        assert_eq!(next_value(0.0, 0.3, 0.1), 0.3);
        assert_eq!(next_value(-1.0, 0.3, 0.1), 0.3);
        assert!((next_value(1.0, 1.0, 0.1) - 1.05).abs() < 1e-12);
        assert!((next_value(1.0, 0.0, 0.1) - 0.95).abs() < 1e-12);
    }

    #[test]
    fn test_reseed_sample_stays_open_for_float() {
        // 1 - 1e-12 rounds to 1.0 as f32.
        let high = reseed_sample(1.0 - 1e-12, DataType::Float);
        assert!(high < 1.0 && (high as f32) < 1.0);

        let low = reseed_sample(1e-300, DataType::Float);
        assert!(low > 0.0 && (low as f32) > 0.0);

        assert_eq!(reseed_sample(1.0 - 1e-12, DataType::Double), 1.0 - 1e-12);
    }

    #[test]
    fn test_unrepresentable_step_marks_value_uncertain() {
        let (space, id) = space_with(Value::Float(1.0));
        let steady = space
            .create_variable(None, "Pressure", DataType::Double, Value::Double(1.0))
            .unwrap()
            .id;
        // Any step this wide overflows f32.
        let config = SimulationConfig {
            perturbation: 1e300,
            ..SimulationConfig::default()
        };
        let mut engine = UpdateEngine::new(space.clone(), config);
        engine.watch(id.clone()).unwrap();
        engine.watch(steady.clone()).unwrap();

        assert_eq!(engine.tick().unwrap(), 1);

        let stuck = space.read(&id).unwrap();
        assert_eq!(stuck.value, Value::Float(1.0));
        assert_eq!(stuck.status, StatusCode::UNCERTAIN_LAST_USABLE_VALUE);
        assert_eq!(space.read(&steady).unwrap().status, StatusCode::GOOD);
    }

    #[test]
    fn test_first_tick_leaves_zero() {
        let (space, id) = space_with(Value::Float(0.0));
        let mut engine = UpdateEngine::new(space.clone(), SimulationConfig::default());
        engine.watch(id.clone()).unwrap();

        assert_eq!(engine.tick().unwrap(), 1);
        let v = space.read(&id).unwrap().value.as_f64().unwrap();
        assert!(v > 0.0 && v < 1.0);
    }

    #[test]
    fn test_steps_bounded_and_timestamps_increase() {
        let (space, id) = space_with(Value::Double(10.0));
        let mut engine = UpdateEngine::new(space.clone(), SimulationConfig::default());
        engine.watch(id.clone()).unwrap();

        let mut last = space.read(&id).unwrap();
        for _ in 0..100 {
            engine.tick().unwrap();
            let current = space.read(&id).unwrap();
            let step = (current.value.as_f64().unwrap() - last.value.as_f64().unwrap()).abs();
            assert!(step <= 0.05 + 1e-9);
            assert!(current.source_timestamp > last.source_timestamp);
            last = current;
        }
    }

    #[test]
    fn test_watch_rejects_non_numeric() {
        let (space, _) = space_with(Value::Double(1.0));
        let mode = space
            .create_variable(None, "Mode", DataType::Int16, Value::Int16(2))
            .unwrap();
        let mut engine = UpdateEngine::new(space, SimulationConfig::default());
        assert!(matches!(
            engine.watch(mode.id).unwrap_err(),
            ServerError::TypeMismatch { .. }
        ));
        assert!(engine
            .watch(NodeId::string(1, "Missing"))
            .is_err());
        assert!(engine.variables().is_empty());
    }

    #[test]
    fn test_tick_fails_after_release() {
        let (space, id) = space_with(Value::Double(1.0));
        let mut engine = UpdateEngine::new(space.clone(), SimulationConfig::default());
        engine.watch(id).unwrap();
        space.release();
        assert!(matches!(engine.tick().unwrap_err(), ServerError::Shutdown { .. }));
    }

    #[tokio::test]
    async fn test_background_ticks_and_stop() {
        let (space, id) = space_with(Value::Double(1.0));
        let config = SimulationConfig {
            period: Duration::from_millis(10),
            perturbation: DEFAULT_PERTURBATION,
        };
        let mut engine = UpdateEngine::new(space.clone(), config);
        engine.watch(id.clone()).unwrap();

        let mut handle = engine.start().unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        handle.shutdown().await;

        let ticks = handle.ticks();
        assert!(ticks > 0);
        assert!(!handle.is_running());

        let frozen = space.read(&id).unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(space.read(&id).unwrap(), frozen);
        assert_eq!(handle.ticks(), ticks);
    }

    #[tokio::test]
    async fn test_zero_period_is_rejected() {
        let (space, id) = space_with(Value::Double(1.0));
        let config = SimulationConfig {
            period: Duration::ZERO,
            perturbation: DEFAULT_PERTURBATION,
        };
        let mut engine = UpdateEngine::new(space, config);
        engine.watch(id).unwrap();

        let err = engine.start().unwrap_err();
        assert!(matches!(err, ServerError::StartupFailure { .. }));
    }

    #[tokio::test]
    async fn test_release_does_not_kill_loop() {
        let (space, id) = space_with(Value::Double(1.0));
        let config = SimulationConfig {
            period: Duration::from_millis(5),
            perturbation: DEFAULT_PERTURBATION,
        };
        let mut engine = UpdateEngine::new(space.clone(), config);
        engine.watch(id).unwrap();

        let mut handle = engine.start().unwrap();
        space.release();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(handle.is_running());
        handle.shutdown().await;
    }
}
