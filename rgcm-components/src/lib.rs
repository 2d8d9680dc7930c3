//! Reference process components for rgcm.
//!
//! These are small, self-contained physics components and a simple dynamical
//! core. They exercise every component variant and are useful for tests,
//! demos and as templates for real parameterisations.

pub mod columns;
pub mod components;

pub use components::*;
