//! Component contracts.
//!
//! A component wraps one physical process. It declares the quantities it reads
//! and the quantities it produces through [`Component::definitions`], and is
//! invoked through one of the variant traits:
//!
//! - [`PrognosticComponent`]: returns tendencies and diagnostics
//! - [`ImplicitComponent`]: returns new absolute values and diagnostics
//! - [`DiagnosticComponent`]: returns diagnostics only
//! - [`DynamicalCore`]: advances the quantities it owns using aggregated tendencies
//!
//! Components never see the model state directly. The model resolves their
//! declarations once with [`Declarations::resolve`], then for every call builds
//! an [`InputState`] holding only the declared inputs, converted to the declared
//! units, and checks the returned names and shapes with
//! [`Declarations::check_returned`].

use crate::constants::ConstantsTable;
use crate::errors::{RGCMError, RGCMResult};
use crate::grid::{Grid, GridDimension};
use crate::registry::QuantityRegistry;
use crate::state::{unit_conversion, InputState, OutputState, Quantity, QuantityMap, State};
use crate::units::tendency_units;
use crate::Time;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use tracing::warn;

/// The role a declared quantity plays for a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RequirementType {
    /// Read from the state before the component runs.
    Input,
    /// Rate of change per second of a state quantity.
    Tendency,
    /// Derived quantity reported alongside the main result.
    Diagnostic,
    /// New absolute value of a state quantity.
    Output,
}

impl RequirementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementType::Input => "inputs",
            RequirementType::Tendency => "tendencies",
            RequirementType::Diagnostic => "diagnostics",
            RequirementType::Output => "outputs",
        }
    }
}

/// A single declared quantity.
///
/// `unit` is the unit the component works in. For tendencies it is the unit
/// of the rate, e.g. `K day^-1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequirementDefinition {
    pub name: String,
    pub unit: String,
    pub requirement_type: RequirementType,
}

impl RequirementDefinition {
    pub fn new(name: &str, unit: &str, requirement_type: RequirementType) -> Self {
        Self {
            name: name.to_string(),
            unit: unit.to_string(),
            requirement_type,
        }
    }

    pub fn input(name: &str, unit: &str) -> Self {
        Self::new(name, unit, RequirementType::Input)
    }

    pub fn tendency(name: &str, unit: &str) -> Self {
        Self::new(name, unit, RequirementType::Tendency)
    }

    pub fn diagnostic(name: &str, unit: &str) -> Self {
        Self::new(name, unit, RequirementType::Diagnostic)
    }

    pub fn output(name: &str, unit: &str) -> Self {
        Self::new(name, unit, RequirementType::Output)
    }
}

/// Extracts a short component name from a `Debug` rendering.
///
/// `SlabSurface { depth: 50.0 }` becomes `SlabSurface`.
pub fn component_name(debug: &str) -> String {
    debug
        .split(['{', ' ', '('])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("UnknownComponent")
        .to_string()
}

/// Declarations shared by every component variant.
///
/// The declared sets must not change after construction.
pub trait Component: Debug + Send + Sync {
    /// Every quantity this component reads or produces.
    fn definitions(&self) -> Vec<RequirementDefinition>;

    /// Name used in errors, warnings and the coupling graph.
    fn name(&self) -> String {
        component_name(&format!("{:?}", self))
    }

    fn inputs(&self) -> Vec<RequirementDefinition> {
        self.of_type(RequirementType::Input)
    }

    fn tendencies(&self) -> Vec<RequirementDefinition> {
        self.of_type(RequirementType::Tendency)
    }

    fn diagnostics(&self) -> Vec<RequirementDefinition> {
        self.of_type(RequirementType::Diagnostic)
    }

    fn outputs(&self) -> Vec<RequirementDefinition> {
        self.of_type(RequirementType::Output)
    }

    fn input_names(&self) -> Vec<String> {
        self.inputs().into_iter().map(|d| d.name).collect()
    }

    fn of_type(&self, requirement_type: RequirementType) -> Vec<RequirementDefinition> {
        self.definitions()
            .into_iter()
            .filter(|d| d.requirement_type == requirement_type)
            .collect()
    }

    /// Keeps the internal state changes made since the last commit or
    /// rollback.
    ///
    /// The model calls this on every component once a whole step has
    /// succeeded. Components without internal state keep the default.
    fn commit_step(&mut self) {}

    /// Undoes the internal state changes made since the last commit or
    /// rollback.
    ///
    /// The model calls this on every component when a step fails, so that a
    /// retried step sees the components exactly as a fresh one would.
    fn rollback_step(&mut self) {}
}

/// Result of a prognostic call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrognosticOutput {
    pub tendencies: OutputState,
    pub diagnostics: OutputState,
}

/// Result of an implicit call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImplicitOutput {
    pub outputs: OutputState,
    pub diagnostics: OutputState,
}

/// Result of a dynamical core advance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreOutput {
    /// New values of every quantity the core owns.
    pub state: OutputState,
    pub diagnostics: OutputState,
}

/// A component that produces tendencies.
///
/// Calls take `&mut self` so that a component may keep private state such as
/// a cache, but the input state is read-only.
#[typetag::serde]
pub trait PrognosticComponent: Component {
    fn compute(&mut self, input_state: &InputState, time_step: Time)
        -> RGCMResult<PrognosticOutput>;
}

/// A component that produces new absolute values of state quantities.
///
/// Iterative solvers signal failure with [`RGCMError::Nonconvergence`].
#[typetag::serde]
pub trait ImplicitComponent: Component {
    fn compute(&mut self, input_state: &InputState, time_step: Time) -> RGCMResult<ImplicitOutput>;
}

/// A component that only derives diagnostics from the state.
#[typetag::serde]
pub trait DiagnosticComponent: Component {
    fn compute(&mut self, input_state: &InputState) -> RGCMResult<OutputState>;
}

/// The dynamical core hosting a model.
///
/// The core owns the quantities it declares as outputs. Each step it receives
/// the aggregated tendency of every owned quantity, expressed per second in
/// the owned quantity's declared units (zero where no component contributed),
/// and returns the new values.
///
/// A core that keeps internal state between steps must leave it untouched
/// when it returns an error, and restore it in
/// [`rollback_step`](Component::rollback_step) when a later part of the step
/// fails.
#[typetag::serde]
pub trait DynamicalCore: Component {
    fn advance(
        &mut self,
        input_state: &InputState,
        tendencies: &OutputState,
        time_step: Time,
    ) -> RGCMResult<CoreOutput>;
}

/// A declared quantity resolved against the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedQuantity {
    pub name: String,
    /// Units the component declared.
    pub units: String,
    /// Units the value is stored in outside the component.
    pub canonical_units: String,
    pub dims: Vec<GridDimension>,
}

/// A component's declarations, checked against the registry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Declarations {
    pub component: String,
    pub inputs: Vec<ResolvedQuantity>,
    pub tendencies: Vec<ResolvedQuantity>,
    pub diagnostics: Vec<ResolvedQuantity>,
    pub outputs: Vec<ResolvedQuantity>,
}

impl Declarations {
    /// Resolves every definition of `component`.
    ///
    /// # Errors
    ///
    /// - [`RGCMError::UnknownQuantity`] for a name the registry does not know
    /// - [`RGCMError::UnitParseError`] or [`RGCMError::UnitMismatch`] if a
    ///   declared unit cannot be converted to the canonical one
    /// - [`RGCMError::InvalidConfiguration`] if a name is declared twice with
    ///   the same role
    pub fn resolve<C: Component + ?Sized>(
        component: &C,
        registry: &QuantityRegistry,
    ) -> RGCMResult<Self> {
        Self::from_definitions(component.name(), &component.definitions(), registry)
    }

    pub fn from_definitions(
        component: String,
        definitions: &[RequirementDefinition],
        registry: &QuantityRegistry,
    ) -> RGCMResult<Self> {
        let mut declarations = Declarations {
            component,
            ..Default::default()
        };
        let mut seen: BTreeSet<(RequirementType, &str)> = BTreeSet::new();

        for definition in definitions {
            if !seen.insert((definition.requirement_type, definition.name.as_str())) {
                return Err(RGCMError::InvalidConfiguration(format!(
                    "component '{}' declares '{}' twice in its {}",
                    declarations.component,
                    definition.name,
                    definition.requirement_type.as_str()
                )));
            }

            let descriptor = registry.describe(&definition.name)?;
            let canonical_units = match definition.requirement_type {
                RequirementType::Tendency => tendency_units(&descriptor.units),
                _ => descriptor.units.clone(),
            };
            unit_conversion(&definition.name, &definition.unit, &canonical_units).inspect_err(
                |e| {
                    if let RGCMError::UnitParseError { unit_string, .. } = e {
                        warn!(
                            component = %declarations.component,
                            quantity = %definition.name,
                            unit = %unit_string,
                            "cannot parse declared unit"
                        );
                    }
                },
            )?;

            let resolved = ResolvedQuantity {
                name: definition.name.clone(),
                units: definition.unit.clone(),
                canonical_units,
                dims: descriptor.dims,
            };
            match definition.requirement_type {
                RequirementType::Input => declarations.inputs.push(resolved),
                RequirementType::Tendency => declarations.tendencies.push(resolved),
                RequirementType::Diagnostic => declarations.diagnostics.push(resolved),
                RequirementType::Output => declarations.outputs.push(resolved),
            }
        }
        Ok(declarations)
    }

    pub fn of_type(&self, requirement_type: RequirementType) -> &[ResolvedQuantity] {
        match requirement_type {
            RequirementType::Input => &self.inputs,
            RequirementType::Tendency => &self.tendencies,
            RequirementType::Diagnostic => &self.diagnostics,
            RequirementType::Output => &self.outputs,
        }
    }

    /// Builds the read-only view the component is called with.
    ///
    /// Inputs are borrowed from `state` when they are already stored in the
    /// declared units and converted otherwise.
    pub fn input_state<'a>(
        &self,
        state: &'a State,
        constants: &'a ConstantsTable,
        grid: &Grid,
    ) -> RGCMResult<InputState<'a>> {
        let mut values = BTreeMap::new();
        for input in &self.inputs {
            let quantity = state.get(&input.name).ok_or_else(|| RGCMError::MissingInput {
                component: self.component.clone(),
                name: input.name.clone(),
            })?;
            quantity.check_dims(&input.name, &input.dims, grid)?;
            values.insert(
                input.name.clone(),
                quantity.values_in(&input.name, &input.units)?,
            );
        }
        Ok(InputState::build(
            self.component.clone(),
            state.time,
            constants,
            values,
        ))
    }

    /// Checks what a component returned for one role and converts it to
    /// canonical units.
    ///
    /// # Errors
    ///
    /// - [`RGCMError::InvalidComponentOutput`] unless the returned names equal
    ///   the declared names exactly
    /// - [`RGCMError::DimensionMismatch`] if an array does not fit the grid
    pub fn check_returned(
        &self,
        requirement_type: RequirementType,
        returned: OutputState,
        grid: &Grid,
    ) -> RGCMResult<QuantityMap> {
        let declared = self.of_type(requirement_type);
        let declared_names: BTreeSet<&str> = declared.iter().map(|d| d.name.as_str()).collect();
        let returned_names: BTreeSet<&str> = returned.keys().map(String::as_str).collect();

        if declared_names != returned_names {
            return Err(RGCMError::InvalidComponentOutput {
                component: self.component.clone(),
                kind: requirement_type.as_str().to_string(),
                missing: declared_names
                    .difference(&returned_names)
                    .map(|s| s.to_string())
                    .collect(),
                undeclared: returned_names
                    .difference(&declared_names)
                    .map(|s| s.to_string())
                    .collect(),
            });
        }

        let mut returned = returned;
        let mut checked = QuantityMap::new();
        for d in declared {
            let Some(values) = returned.remove(&d.name) else {
                continue;
            };
            let quantity = Quantity {
                values,
                units: d.units.clone(),
                dims: d.dims.clone(),
            };
            quantity.check_grid(&d.name, grid)?;
            checked.insert(d.name.clone(), quantity.to_units(&d.name, &d.canonical_units)?);
        }
        Ok(checked)
    }
}
