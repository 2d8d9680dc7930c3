//! Driving a model through time.

use crate::errors::RGCMResult;
use crate::monitor::Monitor;
use crate::state::{QuantityMap, State};
use crate::Time;
use tracing::info;

use super::runtime::Model;
use super::types::ConfigurationWarning;

/// Owns a model and the state it advances.
///
/// Each step merges the model's new values and diagnostics into the state,
/// moves the state's time forward and offers the result to every monitor.
#[derive(Debug)]
pub struct Simulation {
    model: Model,
    state: State,
    monitors: Vec<Box<dyn Monitor>>,
    last_tendencies: QuantityMap,
    warnings: Vec<ConfigurationWarning>,
}

impl Simulation {
    pub fn new(model: Model, state: State) -> Self {
        Self {
            model,
            state,
            monitors: vec![],
            last_tendencies: QuantityMap::new(),
            warnings: vec![],
        }
    }

    /// Starts from [`Model::default_state`].
    pub fn from_defaults(model: Model) -> RGCMResult<Self> {
        let state = model.default_state()?;
        Ok(Self::new(model, state))
    }

    pub fn with_monitor(mut self, monitor: impl Monitor + 'static) -> Self {
        self.monitors.push(Box::new(monitor));
        self
    }

    pub fn add_monitor(&mut self, monitor: Box<dyn Monitor>) {
        self.monitors.push(monitor);
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn current_time(&self) -> Time {
        self.state.time
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    /// Tendencies aggregated during the latest step.
    pub fn last_tendencies(&self) -> &QuantityMap {
        &self.last_tendencies
    }

    /// Warnings reported by the latest step.
    pub fn warnings(&self) -> &[ConfigurationWarning] {
        &self.warnings
    }

    /// Advances one step. The state is left unchanged if the step fails.
    pub fn step(&mut self) -> RGCMResult<&State> {
        let output = self.model.step(&self.state)?;
        self.state.update(output.state);
        self.state.update(output.diagnostics);
        self.state.time = output.time;
        self.last_tendencies = output.tendencies;
        self.warnings = output.warnings;

        for monitor in &mut self.monitors {
            monitor.store(&self.state)?;
        }
        Ok(&self.state)
    }

    /// Advances `n_steps` steps, stopping at the first error.
    pub fn run(&mut self, n_steps: usize) -> RGCMResult<()> {
        let start = self.state.time;
        for _ in 0..n_steps {
            self.step()?;
        }
        info!(
            start,
            end = self.state.time,
            n_steps,
            "simulation run complete"
        );
        Ok(())
    }

    pub fn into_state(self) -> State {
        self.state
    }
}
