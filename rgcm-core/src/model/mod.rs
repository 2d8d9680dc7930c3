//! A model couples a dynamical core with physics components.
//!
//! Components are attached through [`ModelBuilder`], which resolves every
//! declared quantity against the quantity registry and records how the
//! components are coupled through shared quantities. Each [`Model::step`]
//! evaluates the physics against one snapshot of the state, sums the
//! tendencies, lets the dynamical core advance the quantities it owns and
//! applies implicit outputs on top.
//!
//! The caller owns the state. [`Simulation`] is a small driver that keeps a
//! state, merges each step's results into it and feeds monitors.

mod aggregation;
mod builder;
mod coupling;
mod runtime;
mod simulation;
mod types;
mod validation;

#[cfg(test)]
mod tests;

// Public re-exports
pub use builder::ModelBuilder;
pub use runtime::Model;
pub use simulation::Simulation;
pub use types::{
    ComponentRole, ConfigurationWarning, CouplingGraph, CouplingNode, MissingInputPolicy,
    PhysicsComponent, StepOutput, WarningKind,
};
