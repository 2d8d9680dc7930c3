//! ModelBuilder for constructing models.

use crate::component::{
    Declarations, DiagnosticComponent, DynamicalCore, ImplicitComponent, PrognosticComponent,
};
use crate::constants::ConstantsTable;
use crate::errors::{RGCMError, RGCMResult};
use crate::grid::Grid;
use crate::registry::{QuantityRegistry, QUANTITY_REGISTRY};
use crate::Time;

use super::runtime::Model;
use super::types::{
    AttachedCore, AttachedDiagnostic, AttachedPhysics, MissingInputPolicy, PhysicsComponent,
};
use super::validation::{verify_core, verify_diagnostic, verify_physics, verify_time_step};

/// Resolves and checks the declarations of a physics list.
pub(crate) fn attach_physics(
    physics: Vec<PhysicsComponent>,
    registry: &QuantityRegistry,
) -> RGCMResult<Vec<AttachedPhysics>> {
    physics
        .into_iter()
        .map(|component| {
            let declarations = match &component {
                PhysicsComponent::Prognostic(c) => Declarations::resolve(c.as_ref(), registry)?,
                PhysicsComponent::Implicit(c) => Declarations::resolve(c.as_ref(), registry)?,
            };
            verify_physics(
                &declarations,
                matches!(component, PhysicsComponent::Implicit(_)),
            )?;
            Ok(AttachedPhysics {
                component,
                declarations,
            })
        })
        .collect()
}

/// Builds a [`Model`] from a dynamical core and a list of components.
///
/// Physics components (prognostic and implicit) are evaluated in the order
/// they are added. That order only matters when two implicit components write
/// the same quantity, in which case the later one wins.
///
/// ```rust,ignore
/// let model = ModelBuilder::new()
///     .with_core(RelaxationCore::default())
///     .with_prognostic(GrayLongwaveRadiation::default())
///     .with_implicit(SlabSurface::default())
///     .with_time_step(600.0)
///     .with_grid(Grid::from_levels(4, 3, 10)?)
///     .build()?;
/// ```
#[derive(Debug)]
pub struct ModelBuilder {
    core: Option<Box<dyn DynamicalCore>>,
    physics: Vec<PhysicsComponent>,
    diagnostics: Vec<Box<dyn DiagnosticComponent>>,
    time_step: Option<Time>,
    grid: Grid,
    constants: ConstantsTable,
    registry: QuantityRegistry,
    missing_inputs: MissingInputPolicy,
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self {
            core: None,
            physics: vec![],
            diagnostics: vec![],
            time_step: None,
            grid: Grid::default(),
            constants: ConstantsTable::default(),
            registry: QUANTITY_REGISTRY.clone(),
            missing_inputs: MissingInputPolicy::default(),
        }
    }

    /// Sets the dynamical core. Without one, every tendency is integrated
    /// with a forward step.
    pub fn with_core(&mut self, core: impl DynamicalCore + 'static) -> &mut Self {
        self.core = Some(Box::new(core));
        self
    }

    pub fn with_boxed_core(&mut self, core: Box<dyn DynamicalCore>) -> &mut Self {
        self.core = Some(core);
        self
    }

    pub fn with_prognostic(&mut self, component: impl PrognosticComponent + 'static) -> &mut Self {
        self.physics.push(PhysicsComponent::prognostic(component));
        self
    }

    pub fn with_implicit(&mut self, component: impl ImplicitComponent + 'static) -> &mut Self {
        self.physics.push(PhysicsComponent::implicit(component));
        self
    }

    /// Adds an already boxed physics component.
    pub fn with_physics(&mut self, component: PhysicsComponent) -> &mut Self {
        self.physics.push(component);
        self
    }

    /// Adds a diagnostic component, run on the state at the end of each step.
    pub fn with_diagnostic(&mut self, component: impl DiagnosticComponent + 'static) -> &mut Self {
        self.diagnostics.push(Box::new(component));
        self
    }

    pub fn with_boxed_diagnostic(&mut self, component: Box<dyn DiagnosticComponent>) -> &mut Self {
        self.diagnostics.push(component);
        self
    }

    /// Seconds per step.
    pub fn with_time_step(&mut self, time_step: Time) -> &mut Self {
        self.time_step = Some(time_step);
        self
    }

    pub fn with_grid(&mut self, grid: Grid) -> &mut Self {
        self.grid = grid;
        self
    }

    pub fn with_constants(&mut self, constants: ConstantsTable) -> &mut Self {
        self.constants = constants;
        self
    }

    /// Uses `registry` instead of the process-wide [`QUANTITY_REGISTRY`].
    pub fn with_registry(&mut self, registry: QuantityRegistry) -> &mut Self {
        self.registry = registry;
        self
    }

    pub fn with_missing_inputs(&mut self, policy: MissingInputPolicy) -> &mut Self {
        self.missing_inputs = policy;
        self
    }

    /// Resolves every declaration against the registry and creates the model.
    ///
    /// The builder's components are moved into the model, so a builder
    /// builds at most one model with components.
    ///
    /// # Errors
    ///
    /// - [`RGCMError::UnknownQuantity`] if any component declares an unregistered name
    /// - [`RGCMError::UnitMismatch`] if a declared unit cannot be converted to
    ///   the canonical one
    /// - [`RGCMError::InvalidConfiguration`] for a missing or invalid time
    ///   step, or declarations inconsistent with a component's variant
    pub fn build(&mut self) -> RGCMResult<Model> {
        let time_step = self.time_step.ok_or_else(|| {
            RGCMError::InvalidConfiguration("a model needs a time step".to_string())
        })?;
        verify_time_step(time_step)?;

        let core = match self.core.take() {
            None => None,
            Some(component) => {
                let declarations = Declarations::resolve(component.as_ref(), &self.registry)?;
                verify_core(&declarations)?;
                Some(AttachedCore {
                    component,
                    declarations,
                })
            }
        };

        let physics = attach_physics(std::mem::take(&mut self.physics), &self.registry)?;

        let diagnostics = std::mem::take(&mut self.diagnostics)
            .into_iter()
            .map(|component| {
                let declarations = Declarations::resolve(component.as_ref(), &self.registry)?;
                verify_diagnostic(&declarations)?;
                Ok(AttachedDiagnostic {
                    component,
                    declarations,
                })
            })
            .collect::<RGCMResult<Vec<_>>>()?;

        Ok(Model::new(
            core,
            physics,
            diagnostics,
            time_step,
            self.grid,
            self.constants.clone(),
            self.registry.clone(),
            self.missing_inputs,
        ))
    }
}
