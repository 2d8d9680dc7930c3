//! Sinks offered the merged state after each step.
//!
//! Monitors are called by [`Simulation`](crate::model::Simulation) once a
//! step has been merged, never from inside a step.

use crate::errors::{RGCMError, RGCMResult};
use crate::state::State;
use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

/// Consumes a state after each step.
pub trait Monitor: Debug {
    fn store(&mut self, state: &State) -> RGCMResult<()>;
}

/// Shares a monitor with the caller, who can inspect it while a
/// [`Simulation`](crate::model::Simulation) owns the other handle.
impl<M: Monitor> Monitor for Arc<Mutex<M>> {
    fn store(&mut self, state: &State) -> RGCMResult<()> {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .store(state)
    }
}

/// Keeps in-memory snapshots of selected quantities.
#[derive(Debug, Clone)]
pub struct StateRecorder {
    names: Option<Vec<String>>,
    every: usize,
    calls: usize,
    snapshots: Vec<State>,
}

impl StateRecorder {
    /// Records every quantity on every call.
    pub fn new() -> Self {
        Self {
            names: None,
            every: 1,
            calls: 0,
            snapshots: vec![],
        }
    }

    /// Only records the named quantities.
    pub fn with_names(mut self, names: &[&str]) -> Self {
        self.names = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }

    /// Records the first call and then one call in every `every`.
    pub fn every(mut self, every: usize) -> RGCMResult<Self> {
        if every == 0 {
            return Err(RGCMError::InvalidConfiguration(
                "a recorder must record at least every call".to_string(),
            ));
        }
        self.every = every;
        Ok(self)
    }

    pub fn snapshots(&self) -> &[State] {
        &self.snapshots
    }

    /// The recorded values of one quantity, oldest first.
    pub fn series(&self, name: &str) -> Vec<&ndarray::ArrayD<f64>> {
        self.snapshots.iter().filter_map(|s| s.values(name)).collect()
    }
}

impl Default for StateRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Monitor for StateRecorder {
    fn store(&mut self, state: &State) -> RGCMResult<()> {
        let due = self.calls % self.every == 0;
        self.calls += 1;
        if !due {
            return Ok(());
        }

        let snapshot = match &self.names {
            None => state.clone(),
            Some(names) => {
                let mut snapshot = State::new(state.time);
                for name in names {
                    if let Some(quantity) = state.get(name) {
                        snapshot.insert(name.clone(), quantity.clone());
                    }
                }
                snapshot
            }
        };
        self.snapshots.push(snapshot);
        Ok(())
    }
}

/// Logs min, max and mean of selected quantities with `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingMonitor {
    names: Vec<String>,
}

impl TracingMonitor {
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
        }
    }
}

/// Minimum, maximum and mean of an array, or `None` when it is empty.
pub fn summarize(values: &ndarray::ArrayD<f64>) -> Option<(f64, f64, f64)> {
    let mean = values.mean()?;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some((min, max, mean))
}

impl Monitor for TracingMonitor {
    fn store(&mut self, state: &State) -> RGCMResult<()> {
        for name in &self.names {
            let Some(quantity) = state.get(name) else {
                continue;
            };
            if let Some((min, max, mean)) = summarize(&quantity.values) {
                info!(
                    time = state.time,
                    quantity = %name,
                    units = %quantity.units,
                    min,
                    max,
                    mean,
                    "state summary"
                );
            }
        }
        Ok(())
    }
}
