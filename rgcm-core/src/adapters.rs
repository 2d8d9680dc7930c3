//! Adapters between component variants.

use crate::component::{
    Component, ImplicitComponent, PrognosticComponent, PrognosticOutput, RequirementDefinition,
    RequirementType,
};
use crate::errors::{RGCMError, RGCMResult};
use crate::state::{InputState, OutputState};
use crate::units::tendency_units;
use crate::Time;
use serde::{Deserialize, Serialize};

/// Runs an implicit component as a prognostic one.
///
/// Each output `x` becomes a tendency `(x_new - x_old) / time_step`, so the
/// implicit update can be combined with other tendencies instead of replacing
/// the state outright. Every output must therefore also be an input.
#[derive(Debug, Serialize, Deserialize)]
pub struct ImplicitTendencies {
    component: Box<dyn ImplicitComponent>,
}

impl ImplicitTendencies {
    /// # Errors
    ///
    /// [`RGCMError::InvalidConfiguration`] if an output is not also an input,
    /// or is declared in different units.
    pub fn new(component: Box<dyn ImplicitComponent>) -> RGCMResult<Self> {
        let inputs = component.inputs();
        for output in component.outputs() {
            match inputs.iter().find(|i| i.name == output.name) {
                Some(input) if input.unit == output.unit => {}
                Some(input) => {
                    return Err(RGCMError::InvalidConfiguration(format!(
                        "'{}' of {} is read in '{}' but written in '{}'",
                        output.name,
                        component.name(),
                        input.unit,
                        output.unit
                    )))
                }
                None => {
                    return Err(RGCMError::InvalidConfiguration(format!(
                        "{} cannot produce tendencies: output '{}' is not an input",
                        component.name(),
                        output.name
                    )))
                }
            }
        }
        Ok(Self { component })
    }

    pub fn into_inner(self) -> Box<dyn ImplicitComponent> {
        self.component
    }
}

impl Component for ImplicitTendencies {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        self.component
            .definitions()
            .into_iter()
            .map(|d| match d.requirement_type {
                RequirementType::Output => {
                    RequirementDefinition::tendency(&d.name, &tendency_units(&d.unit))
                }
                _ => d,
            })
            .collect()
    }

    fn name(&self) -> String {
        self.component.name()
    }

    fn commit_step(&mut self) {
        self.component.commit_step();
    }

    fn rollback_step(&mut self) {
        self.component.rollback_step();
    }
}

#[typetag::serde]
impl PrognosticComponent for ImplicitTendencies {
    fn compute(
        &mut self,
        input_state: &InputState,
        time_step: Time,
    ) -> RGCMResult<PrognosticOutput> {
        if time_step <= 0.0 {
            return Err(RGCMError::InvalidConfiguration(format!(
                "tendencies need a positive time step, got {time_step}"
            )));
        }
        let result = self.component.compute(input_state, time_step)?;

        let mut tendencies = OutputState::new();
        for (name, new) in result.outputs {
            let old = input_state.get(&name)?;
            if new.shape() != old.shape() {
                return Err(RGCMError::DimensionMismatch {
                    name,
                    dims: "its input".to_string(),
                    expected: old.shape().to_vec(),
                    actual: new.shape().to_vec(),
                });
            }
            tendencies.insert(name, (new - old) / time_step);
        }
        Ok(PrognosticOutput {
            tendencies,
            diagnostics: result.diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ImplicitOutput;
    use is_close::is_close;
    use ndarray::{ArrayD, IxDyn};

    #[derive(Debug, Serialize, Deserialize)]
    struct Warming {
        increment: f64,
    }

    impl Component for Warming {
        fn definitions(&self) -> Vec<RequirementDefinition> {
            vec![
                RequirementDefinition::input("surface_temperature", "K"),
                RequirementDefinition::output("surface_temperature", "K"),
                RequirementDefinition::diagnostic("surface_upward_longwave_flux_in_air", "W m^-2"),
            ]
        }
    }

    #[typetag::serde]
    impl ImplicitComponent for Warming {
        fn compute(
            &mut self,
            input_state: &InputState,
            _time_step: Time,
        ) -> RGCMResult<ImplicitOutput> {
            let t = input_state.get("surface_temperature")?;
            let mut out = ImplicitOutput::default();
            out.outputs
                .insert("surface_temperature".to_string(), t + self.increment);
            out.diagnostics.insert(
                "surface_upward_longwave_flux_in_air".to_string(),
                t.mapv(|v| v * 0.0),
            );
            Ok(out)
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Writer;

    impl Component for Writer {
        fn definitions(&self) -> Vec<RequirementDefinition> {
            vec![RequirementDefinition::output("surface_temperature", "K")]
        }
    }

    #[typetag::serde]
    impl ImplicitComponent for Writer {
        fn compute(&mut self, _: &InputState, _: Time) -> RGCMResult<ImplicitOutput> {
            Ok(ImplicitOutput::default())
        }
    }

    #[test]
    fn test_outputs_become_tendencies() {
        let adapter = ImplicitTendencies::new(Box::new(Warming { increment: 2.0 })).unwrap();
        let tendencies = adapter.tendencies();
        assert_eq!(tendencies.len(), 1);
        assert_eq!(tendencies[0].unit, "(K) / s");
        assert!(adapter.outputs().is_empty());
        assert_eq!(adapter.diagnostics().len(), 1);
    }

    #[test]
    fn test_tendency_is_difference_over_time_step() {
        let mut adapter = ImplicitTendencies::new(Box::new(Warming { increment: 2.0 })).unwrap();
        let input = InputState::empty()
            .with_values("surface_temperature", ArrayD::from_elem(IxDyn(&[2, 2]), 300.0));
        let out = adapter.compute(&input, 10.0).unwrap();
        assert!(out.tendencies["surface_temperature"]
            .iter()
            .all(|v| is_close!(*v, 0.2)));
        assert!(out
            .diagnostics
            .contains_key("surface_upward_longwave_flux_in_air"));
    }

    /// Returns the surface temperature flattened to one dimension.
    #[derive(Debug, Serialize, Deserialize)]
    struct Flattening;

    impl Component for Flattening {
        fn definitions(&self) -> Vec<RequirementDefinition> {
            vec![
                RequirementDefinition::input("surface_temperature", "K"),
                RequirementDefinition::output("surface_temperature", "K"),
            ]
        }
    }

    #[typetag::serde]
    impl ImplicitComponent for Flattening {
        fn compute(&mut self, input_state: &InputState, _: Time) -> RGCMResult<ImplicitOutput> {
            let t = input_state.get("surface_temperature")?;
            let mut out = ImplicitOutput::default();
            out.outputs.insert(
                "surface_temperature".to_string(),
                ArrayD::from_elem(IxDyn(&[t.len()]), 300.0),
            );
            Ok(out)
        }
    }

    #[test]
    fn test_reshaped_output_is_dimension_mismatch() {
        let mut adapter = ImplicitTendencies::new(Box::new(Flattening)).unwrap();
        let input = InputState::empty()
            .with_values("surface_temperature", ArrayD::from_elem(IxDyn(&[2, 2]), 300.0));
        let err = adapter.compute(&input, 10.0).unwrap_err();
        assert_eq!(
            err,
            RGCMError::DimensionMismatch {
                name: "surface_temperature".to_string(),
                dims: "its input".to_string(),
                expected: vec![2, 2],
                actual: vec![4],
            }
        );
    }

    #[test]
    fn test_output_must_be_input() {
        let err = ImplicitTendencies::new(Box::new(Writer)).unwrap_err();
        assert!(matches!(err, RGCMError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_zero_time_step_rejected() {
        let mut adapter = ImplicitTendencies::new(Box::new(Warming { increment: 2.0 })).unwrap();
        let input = InputState::empty()
            .with_values("surface_temperature", ArrayD::from_elem(IxDyn(&[1, 1]), 300.0));
        assert!(adapter.compute(&input, 0.0).is_err());
    }
}
