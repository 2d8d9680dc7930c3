//! Model struct and step execution.

use crate::component::{Component, Declarations, RequirementType, ResolvedQuantity};
use crate::constants::ConstantsTable;
use crate::errors::{RGCMError, RGCMResult};
use crate::grid::Grid;
use crate::initialization::{default_quantity, default_state_for};
use crate::registry::{QuantityRegistry, QUANTITY_REGISTRY};
use crate::state::{OutputState, QuantityMap, State};
use crate::units::tendency_units;
use crate::Time;
use ndarray::{ArrayD, IxDyn};
use petgraph::dot::{Config, Dot};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::time::Instant;
use tracing::{debug, trace};

use super::aggregation::{forward_step, merge_last_wins, sum_tendencies};
use super::builder::attach_physics;
use super::coupling::{build_coupling_graph, find_conflicts};
use super::types::{
    AttachedCore, AttachedDiagnostic, AttachedPhysics, ConfigurationWarning, CouplingGraph,
    MissingInputPolicy, PhysicsComponent, StepOutput,
};
use super::validation::{log_warnings, verify_time_step};

fn global_registry() -> QuantityRegistry {
    QUANTITY_REGISTRY.clone()
}

/// A dynamical core coupled to a list of physics components.
///
/// A step reads a borrowed [`State`] and returns a [`StepOutput`] describing
/// the next state without modifying the input:
///
/// 1. Every physics component is evaluated against the incoming state in
///    list order.
/// 2. Tendencies for the same quantity are summed after conversion to
///    canonical tendency units.
/// 3. The dynamical core advances the quantities it owns with the summed
///    tendencies. Tendencies of quantities without an owner are integrated
///    with a forward step.
/// 4. Implicit outputs replace the advanced values. When several implicit
///    components write the same quantity the last one wins.
/// 5. Diagnostic components run on the provisional new state.
///
/// Components never refer to each other. All coupling goes through quantity
/// names, which the model resolves against the quantity registry when it is
/// built.
#[derive(Debug, Serialize, Deserialize)]
pub struct Model {
    core: Option<AttachedCore>,
    physics: Vec<AttachedPhysics>,
    diagnostics: Vec<AttachedDiagnostic>,
    time_step: Time,
    grid: Grid,
    constants: ConstantsTable,
    missing_inputs: MissingInputPolicy,
    /// Bipartite graph of components and the quantities coupling them.
    coupling: CouplingGraph,
    warnings: Vec<ConfigurationWarning>,
    #[serde(skip, default = "global_registry")]
    registry: QuantityRegistry,
}

impl Model {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        core: Option<AttachedCore>,
        physics: Vec<AttachedPhysics>,
        diagnostics: Vec<AttachedDiagnostic>,
        time_step: Time,
        grid: Grid,
        constants: ConstantsTable,
        registry: QuantityRegistry,
        missing_inputs: MissingInputPolicy,
    ) -> Self {
        let mut model = Self {
            core,
            physics,
            diagnostics,
            time_step,
            grid,
            constants,
            missing_inputs,
            coupling: CouplingGraph::new(),
            warnings: vec![],
            registry,
        };
        model.refresh_coupling();
        model
    }

    fn refresh_coupling(&mut self) {
        self.coupling = build_coupling_graph(&self.physics, self.core.as_ref(), &self.diagnostics);
        self.warnings = find_conflicts(&self.coupling);
        log_warnings(&self.warnings);
    }

    /// Replaces the physics components, keeping the core and diagnostics.
    ///
    /// On error the previous list stays in place.
    pub fn set_prognostics(&mut self, physics: Vec<PhysicsComponent>) -> RGCMResult<()> {
        self.physics = attach_physics(physics, &self.registry)?;
        self.refresh_coupling();
        Ok(())
    }

    pub fn time_step(&self) -> Time {
        self.time_step
    }

    pub fn set_time_step(&mut self, time_step: Time) -> RGCMResult<()> {
        verify_time_step(time_step)?;
        self.time_step = time_step;
        Ok(())
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn missing_inputs(&self) -> MissingInputPolicy {
        self.missing_inputs
    }

    pub fn constants(&self) -> &ConstantsTable {
        &self.constants
    }

    /// Mutable access to the constants seen by every component from the next
    /// step on.
    pub fn constants_mut(&mut self) -> &mut ConstantsTable {
        &mut self.constants
    }

    pub fn reset_constants(&mut self) {
        self.constants.reset();
    }

    /// Conflicts found when the components were attached.
    pub fn warnings(&self) -> &[ConfigurationWarning] {
        &self.warnings
    }

    pub fn coupling_graph(&self) -> &CouplingGraph {
        &self.coupling
    }

    /// Names of the attached components: the core first, then physics and
    /// diagnostic components in evaluation order.
    pub fn component_names(&self) -> Vec<String> {
        self.core
            .iter()
            .map(|c| c.declarations.component.clone())
            .chain(self.physics.iter().map(|p| p.declarations.component.clone()))
            .chain(self.diagnostics.iter().map(|d| d.declarations.component.clone()))
            .collect()
    }

    /// Create a diagram that represents the coupling graph.
    ///
    /// Useful for debugging.
    pub fn as_dot(&self) -> Dot<'_, &CouplingGraph> {
        Dot::with_attr_getters(
            &self.coupling,
            &[Config::NodeNoLabel, Config::EdgeNoLabel],
            &|_, er| {
                let edge = er.weight();
                format!(
                    "label = \"{} [{}]\"",
                    edge.requirement_type.as_str(),
                    edge.unit.replace('"', "\\\"")
                )
            },
            &|_, (_, node)| {
                let escaped = node.to_string().replace('\\', "\\\\").replace('"', "\\\"");
                format!("label = \"{}\"", escaped)
            },
        )
    }

    fn all_declarations(&self) -> impl Iterator<Item = &Declarations> {
        self.core
            .iter()
            .map(|c| &c.declarations)
            .chain(self.physics.iter().map(|p| &p.declarations))
            .chain(self.diagnostics.iter().map(|d| &d.declarations))
    }

    /// A state holding every quantity any component reads or produces at its
    /// registry default.
    pub fn default_state(&self) -> RGCMResult<State> {
        let names: BTreeSet<&str> = self
            .all_declarations()
            .flat_map(|d| {
                d.inputs
                    .iter()
                    .chain(&d.tendencies)
                    .chain(&d.outputs)
                    .chain(&d.diagnostics)
            })
            .map(|q| q.name.as_str())
            .collect();
        default_state_for(names, &self.grid, &self.registry)
    }

    /// Quantities the state must hold before the physics and core run.
    ///
    /// Physics tendencies target state quantities, so their names are
    /// required along with every input.
    fn required_before_physics(&self) -> Vec<(&str, &ResolvedQuantity)> {
        self.core
            .iter()
            .map(|c| &c.declarations)
            .chain(self.physics.iter().map(|p| &p.declarations))
            .flat_map(|d| {
                d.inputs
                    .iter()
                    .chain(&d.tendencies)
                    .map(move |q| (d.component.as_str(), q))
            })
            .collect()
    }

    /// Diagnostic inputs that neither the physics nor the core produce, and
    /// which must therefore already be in the state.
    fn required_by_diagnostics(&self) -> Vec<(&str, &ResolvedQuantity)> {
        let produced: BTreeSet<&str> = self
            .core
            .iter()
            .map(|c| &c.declarations)
            .chain(self.physics.iter().map(|p| &p.declarations))
            .flat_map(|d| d.outputs.iter().chain(&d.diagnostics))
            .map(|q| q.name.as_str())
            .collect();
        self.diagnostics
            .iter()
            .map(|d| &d.declarations)
            .flat_map(|d| d.inputs.iter().map(move |q| (d.component.as_str(), q)))
            .filter(|(_, q)| !produced.contains(q.name.as_str()))
            .collect()
    }

    /// Applies the missing input policy to `required` and checks that the
    /// quantities already present span their registered dimensions.
    ///
    /// Returns the quantities created from registry defaults, which is empty
    /// when nothing was missing.
    fn fill_missing(
        &self,
        state: &State,
        required: &[(&str, &ResolvedQuantity)],
    ) -> RGCMResult<QuantityMap> {
        let mut filled = QuantityMap::new();
        for (component, quantity) in required {
            if let Some(present) = state.get(&quantity.name) {
                present.check_dims(&quantity.name, &quantity.dims, &self.grid)?;
                continue;
            }
            if filled.contains_key(&quantity.name) {
                continue;
            }
            match self.missing_inputs {
                MissingInputPolicy::Error => {
                    return Err(RGCMError::MissingInput {
                        component: component.to_string(),
                        name: quantity.name.clone(),
                    })
                }
                MissingInputPolicy::FillDefaults => {
                    let descriptor = self.registry.describe(&quantity.name)?;
                    debug!(quantity = %quantity.name, "filling missing input from defaults");
                    filled.insert(
                        quantity.name.clone(),
                        default_quantity(&descriptor, &self.grid, &self.registry),
                    );
                }
            }
        }
        Ok(filled)
    }

    /// Advances the model by one time step.
    ///
    /// `state` is never modified. Merge [`StepOutput::state`] and
    /// [`StepOutput::diagnostics`] into it and set its time to
    /// [`StepOutput::time`] to obtain the next state.
    ///
    /// # Errors
    ///
    /// Any error raised while resolving inputs, calling a component or
    /// checking its results aborts the step. Missing inputs and inputs
    /// spanning the wrong dimensions are detected before any component runs.
    /// A failed step rolls back the internal state of every component, so
    /// retrying it behaves like a first attempt.
    pub fn step(&mut self, state: &State) -> RGCMResult<StepOutput> {
        let result = self.try_step(state);
        match &result {
            Ok(_) => self.settle_components(true),
            Err(e) => {
                debug!(error = %e, "step failed, rolling back component state");
                self.settle_components(false);
            }
        }
        result
    }

    /// Commits or rolls back the internal state of every attached component.
    fn settle_components(&mut self, commit: bool) {
        fn settle<C: Component + ?Sized>(component: &mut C, commit: bool) {
            if commit {
                component.commit_step();
            } else {
                component.rollback_step();
            }
        }

        if let Some(core) = &mut self.core {
            settle(core.component.as_mut(), commit);
        }
        for attached in &mut self.physics {
            match &mut attached.component {
                PhysicsComponent::Prognostic(component) => settle(component.as_mut(), commit),
                PhysicsComponent::Implicit(component) => settle(component.as_mut(), commit),
            }
        }
        for attached in &mut self.diagnostics {
            settle(attached.component.as_mut(), commit);
        }
    }

    fn try_step(&mut self, state: &State) -> RGCMResult<StepOutput> {
        let started = Instant::now();
        let time_step = self.time_step;
        let next_time = state.time + time_step;

        let mut required = self.required_before_physics();
        required.extend(self.required_by_diagnostics());
        let filled = self.fill_missing(state, &required)?;
        let working: Cow<'_, State> = if filled.is_empty() {
            Cow::Borrowed(state)
        } else {
            let mut owned = state.clone();
            owned.update(filled.clone());
            Cow::Owned(owned)
        };

        // Physics against the incoming state
        let mut tendency_contributions = vec![];
        let mut implicit_outputs = vec![];
        let mut diagnostic_sets = vec![];
        for attached in &mut self.physics {
            let declarations = &attached.declarations;
            let input = declarations.input_state(&working, &self.constants, &self.grid)?;
            trace!(component = %declarations.component, "computing");
            match &mut attached.component {
                PhysicsComponent::Prognostic(component) => {
                    let output = component.compute(&input, time_step)?;
                    tendency_contributions.push(declarations.check_returned(
                        RequirementType::Tendency,
                        output.tendencies,
                        &self.grid,
                    )?);
                    diagnostic_sets.push(declarations.check_returned(
                        RequirementType::Diagnostic,
                        output.diagnostics,
                        &self.grid,
                    )?);
                }
                PhysicsComponent::Implicit(component) => {
                    let output = component.compute(&input, time_step)?;
                    implicit_outputs.push(declarations.check_returned(
                        RequirementType::Output,
                        output.outputs,
                        &self.grid,
                    )?);
                    diagnostic_sets.push(declarations.check_returned(
                        RequirementType::Diagnostic,
                        output.diagnostics,
                        &self.grid,
                    )?);
                }
            }
        }

        let tendencies = sum_tendencies(tendency_contributions)?;

        // Integration
        let owned: BTreeSet<&str> = self
            .core
            .iter()
            .flat_map(|c| c.declarations.outputs.iter().map(|q| q.name.as_str()))
            .collect();
        let mut delta = forward_step(
            &working,
            tendencies
                .iter()
                .filter(|(name, _)| !owned.contains(name.as_str())),
            time_step,
        )?;
        if let Some(core) = &mut self.core {
            let declarations = &core.declarations;
            let input = declarations.input_state(&working, &self.constants, &self.grid)?;
            let mut forcing = OutputState::new();
            for quantity in &declarations.outputs {
                let units = tendency_units(&quantity.units);
                let values = match tendencies.get(&quantity.name) {
                    Some(t) => t.values_in(&quantity.name, &units)?.into_owned(),
                    None => ArrayD::zeros(IxDyn(&self.grid.shape_for(&quantity.dims))),
                };
                forcing.insert(quantity.name.clone(), values);
            }
            trace!(component = %declarations.component, "advancing");
            let output = core.component.advance(&input, &forcing, time_step)?;
            delta.extend(declarations.check_returned(
                RequirementType::Output,
                output.state,
                &self.grid,
            )?);
            diagnostic_sets.push(declarations.check_returned(
                RequirementType::Diagnostic,
                output.diagnostics,
                &self.grid,
            )?);
        }
        delta.extend(merge_last_wins(implicit_outputs));
        let mut diagnostics = merge_last_wins(diagnostic_sets);

        // Diagnostics of the provisional next state
        if !self.diagnostics.is_empty() {
            let mut provisional = working.into_owned();
            provisional.update(delta.clone());
            provisional.update(diagnostics.clone());
            provisional.time = next_time;

            for attached in &mut self.diagnostics {
                let declarations = &attached.declarations;
                let input = declarations.input_state(&provisional, &self.constants, &self.grid)?;
                trace!(component = %declarations.component, "diagnosing");
                let output = attached.component.compute(&input)?;
                diagnostics.extend(declarations.check_returned(
                    RequirementType::Diagnostic,
                    output,
                    &self.grid,
                )?);
            }
        }

        // Filled inputs the step did not otherwise change are reported so the
        // caller's next state holds them.
        for (name, quantity) in filled {
            delta.entry(name).or_insert(quantity);
        }

        debug!(
            time = next_time,
            n_components = self.physics.len() + self.diagnostics.len() + self.core.iter().len(),
            n_updated = delta.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "model step complete"
        );

        Ok(StepOutput {
            state: delta,
            diagnostics,
            tendencies,
            warnings: self.warnings.clone(),
            time: next_time,
        })
    }
}
