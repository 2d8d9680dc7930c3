//! Type definitions for the model module.

use crate::component::{
    Component, Declarations, DiagnosticComponent, DynamicalCore, ImplicitComponent,
    PrognosticComponent, RequirementDefinition,
};
use crate::state::QuantityMap;
use crate::Time;
use petgraph::Graph;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An attached physics component.
///
/// Physics components are evaluated in list order against the same state.
#[derive(Debug, Serialize, Deserialize)]
pub enum PhysicsComponent {
    Prognostic(Box<dyn PrognosticComponent>),
    Implicit(Box<dyn ImplicitComponent>),
}

impl PhysicsComponent {
    pub fn prognostic(component: impl PrognosticComponent + 'static) -> Self {
        PhysicsComponent::Prognostic(Box::new(component))
    }

    pub fn implicit(component: impl ImplicitComponent + 'static) -> Self {
        PhysicsComponent::Implicit(Box::new(component))
    }

    pub fn name(&self) -> String {
        match self {
            PhysicsComponent::Prognostic(c) => c.name(),
            PhysicsComponent::Implicit(c) => c.name(),
        }
    }

    pub fn definitions(&self) -> Vec<RequirementDefinition> {
        match self {
            PhysicsComponent::Prognostic(c) => c.definitions(),
            PhysicsComponent::Implicit(c) => c.definitions(),
        }
    }

    pub fn role(&self) -> ComponentRole {
        match self {
            PhysicsComponent::Prognostic(_) => ComponentRole::Prognostic,
            PhysicsComponent::Implicit(_) => ComponentRole::Implicit,
        }
    }
}

/// What kind of component a coupling graph node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentRole {
    Prognostic,
    Implicit,
    Diagnostic,
    DynamicalCore,
}

/// A node of the coupling graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CouplingNode {
    Component {
        name: String,
        role: ComponentRole,
        /// Position among the physics components, or among the diagnostic
        /// components for [`ComponentRole::Diagnostic`].
        position: usize,
    },
    Quantity(String),
}

impl fmt::Display for CouplingNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CouplingNode::Component { name, role, .. } => write!(f, "{} ({:?})", name, role),
            CouplingNode::Quantity(name) => write!(f, "{}", name),
        }
    }
}

/// Bipartite graph of components and quantities.
///
/// Edges run from a quantity to each component reading it, and from a
/// component to each quantity it produces. The edge weight is the declaration.
pub type CouplingGraph = Graph<CouplingNode, RequirementDefinition>;

/// How a step treats a declared input that is absent from the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingInputPolicy {
    /// Fail with [`RGCMError::MissingInput`](crate::errors::RGCMError::MissingInput).
    #[default]
    Error,
    /// Create registered quantities from their registry defaults.
    FillDefaults,
}

/// The kind of a [`ConfigurationWarning`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    /// Several implicit components write the same quantity. The last one wins.
    DuplicateImplicitOutput,
    /// Several components produce the same diagnostic. The last one wins.
    DuplicateDiagnostic,
    /// An implicit output replaces a quantity that also receives tendencies.
    ImplicitOverridesTendency,
}

/// A non-fatal configuration problem, reported with every step.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigurationWarning {
    pub kind: WarningKind,
    pub quantity: String,
    /// The components involved, in evaluation order. The last one wins.
    pub components: Vec<String>,
}

impl fmt::Display for ConfigurationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let winner = self.components.last().map(String::as_str).unwrap_or("");
        match self.kind {
            WarningKind::DuplicateImplicitOutput => write!(
                f,
                "'{}' is written by several implicit components ({}); '{}' wins",
                self.quantity,
                self.components.join(", "),
                winner
            ),
            WarningKind::DuplicateDiagnostic => write!(
                f,
                "diagnostic '{}' is produced by several components ({}); '{}' wins",
                self.quantity,
                self.components.join(", "),
                winner
            ),
            WarningKind::ImplicitOverridesTendency => write!(
                f,
                "'{}' receives tendencies but is replaced by the output of '{}'",
                self.quantity, winner
            ),
        }
    }
}

/// The result of one model step.
///
/// Nothing here has been merged into the caller's state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StepOutput {
    /// New values of every quantity the step changed or filled, in canonical units.
    pub state: QuantityMap,
    pub diagnostics: QuantityMap,
    /// Aggregated tendencies in canonical tendency units, before integration.
    pub tendencies: QuantityMap,
    pub warnings: Vec<ConfigurationWarning>,
    /// Time at the end of the step.
    pub time: Time,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AttachedPhysics {
    pub component: PhysicsComponent,
    pub declarations: Declarations,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AttachedDiagnostic {
    pub component: Box<dyn DiagnosticComponent>,
    pub declarations: Declarations,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AttachedCore {
    pub component: Box<dyn DynamicalCore>,
    pub declarations: Declarations,
}
