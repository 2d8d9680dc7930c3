//! Validation functions for model building.

use crate::component::Declarations;
use crate::errors::{RGCMError, RGCMResult};
use crate::Time;
use tracing::warn;

use super::types::ConfigurationWarning;

pub(crate) fn verify_time_step(time_step: Time) -> RGCMResult<()> {
    if !(time_step > 0.0 && time_step.is_finite()) {
        return Err(RGCMError::InvalidConfiguration(format!(
            "time step must be positive and finite, got {}",
            time_step
        )));
    }
    Ok(())
}

/// A dynamical core must read every quantity it owns and may not produce
/// tendencies.
pub(crate) fn verify_core(declarations: &Declarations) -> RGCMResult<()> {
    if !declarations.tendencies.is_empty() {
        return Err(RGCMError::InvalidConfiguration(format!(
            "dynamical core '{}' declares tendencies; a core returns new values",
            declarations.component
        )));
    }
    for owned in &declarations.outputs {
        match declarations.inputs.iter().find(|i| i.name == owned.name) {
            Some(input) if input.units == owned.units => {}
            Some(input) => {
                return Err(RGCMError::InvalidConfiguration(format!(
                    "dynamical core '{}' reads '{}' in '{}' but writes it in '{}'",
                    declarations.component, owned.name, input.units, owned.units
                )))
            }
            None => {
                return Err(RGCMError::InvalidConfiguration(format!(
                    "dynamical core '{}' owns '{}' but does not read it",
                    declarations.component, owned.name
                )))
            }
        }
    }
    Ok(())
}

/// Prognostic components produce tendencies and diagnostics, implicit ones
/// outputs and diagnostics.
pub(crate) fn verify_physics(declarations: &Declarations, implicit: bool) -> RGCMResult<()> {
    let (unexpected, kind) = if implicit {
        (&declarations.tendencies, "tendencies")
    } else {
        (&declarations.outputs, "outputs")
    };
    if let Some(q) = unexpected.first() {
        return Err(RGCMError::InvalidConfiguration(format!(
            "component '{}' cannot declare {} such as '{}'",
            declarations.component, kind, q.name
        )));
    }
    Ok(())
}

/// Diagnostic components only produce diagnostics.
pub(crate) fn verify_diagnostic(declarations: &Declarations) -> RGCMResult<()> {
    if !declarations.tendencies.is_empty() || !declarations.outputs.is_empty() {
        return Err(RGCMError::InvalidConfiguration(format!(
            "diagnostic component '{}' may only declare inputs and diagnostics",
            declarations.component
        )));
    }
    Ok(())
}

pub(crate) fn log_warnings(warnings: &[ConfigurationWarning]) {
    for warning in warnings {
        warn!(
            quantity = %warning.quantity,
            kind = ?warning.kind,
            components = ?warning.components,
            "{}",
            warning
        );
    }
}
