//! Newtonian cooling component
//!
//! Relaxes air temperature towards an equilibrium profile that only depends
//! on latitude.

use crate::columns::{check_shape, columns, coordinate};
use ndarray::{Array3, Zip};
use rgcm_core::component::{
    Component, PrognosticComponent, PrognosticOutput, RequirementDefinition,
};
use rgcm_core::errors::{RGCMError, RGCMResult};
use rgcm_core::state::InputState;
use rgcm_core::{ComponentIO, FloatValue, Time};
use serde::{Deserialize, Serialize};

/// Parameters for the Newtonian cooling component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewtonianCoolingParameters {
    /// Equilibrium temperature at the equator
    /// unit: K
    pub equator_temperature: FloatValue,
    /// Drop in equilibrium temperature from the equator to either pole
    /// unit: K
    pub meridional_difference: FloatValue,
    /// Relaxation timescale
    /// unit: day
    pub timescale: FloatValue,
}

impl Default for NewtonianCoolingParameters {
    fn default() -> Self {
        Self {
            equator_temperature: 300.0,
            meridional_difference: 60.0,
            timescale: 40.0,
        }
    }
}

/// Newtonian relaxation of air temperature
///
/// $$ \frac{dT}{dt} = -\frac{T - T_{eq}(\phi)}{\tau} $$
///
/// with $T_{eq}(\phi) = T_0 - \Delta T \sin^2 \phi$.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ComponentIO)]
#[inputs(
    temperature { name = "air_temperature", unit = "K" },
    latitude { name = "latitude", unit = "degrees_north" },
)]
#[tendencies(
    temperature { name = "air_temperature", unit = "K day^-1" },
)]
pub struct NewtonianCooling {
    parameters: NewtonianCoolingParameters,
}

impl NewtonianCooling {
    pub fn from_parameters(parameters: NewtonianCoolingParameters) -> Self {
        Self { parameters }
    }

    /// Equilibrium temperature in K at `latitude` degrees north
    pub fn equilibrium_temperature(&self, latitude: FloatValue) -> FloatValue {
        let sin_lat = latitude.to_radians().sin();
        self.parameters.equator_temperature - self.parameters.meridional_difference * sin_lat * sin_lat
    }
}

impl Component for NewtonianCooling {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        Self::generated_definitions()
    }
}

#[typetag::serde]
impl PrognosticComponent for NewtonianCooling {
    fn compute(&mut self, input_state: &InputState, _time_step: Time) -> RGCMResult<PrognosticOutput> {
        if self.parameters.timescale <= 0.0 {
            return Err(RGCMError::InvalidConfiguration(
                "Newtonian cooling timescale must be positive".to_string(),
            ));
        }
        let inputs = NewtonianCoolingInputs::from_input_state(input_state)?;
        let temperature = columns("air_temperature", inputs.temperature)?;
        let latitude = coordinate("latitude", inputs.latitude)?;
        check_shape("latitude", &[temperature.dim().1], latitude.shape())?;

        let equilibrium = latitude.mapv(|lat| self.equilibrium_temperature(lat));
        let mut tendency = Array3::zeros(temperature.raw_dim());
        Zip::indexed(&mut tendency)
            .and(&temperature)
            .for_each(|(_, j, _), rate, &t| {
                *rate = -(t - equilibrium[j]) / self.parameters.timescale;
            });

        Ok(PrognosticOutput {
            tendencies: NewtonianCoolingTendencies {
                temperature: tendency.into_dyn(),
            }
            .into(),
            diagnostics: NewtonianCoolingDiagnostics {}.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;
    use ndarray::{array, ArrayD, IxDyn};

    fn input_state(temperature: FloatValue) -> InputState<'static> {
        InputState::empty()
            .with_values(
                "air_temperature",
                ArrayD::from_elem(IxDyn(&[2, 3, 4]), temperature),
            )
            .with_values("latitude", array![-90.0, 0.0, 30.0].into_dyn())
    }

    #[test]
    fn test_definitions() {
        let definitions = NewtonianCooling::default().definitions();
        assert_eq!(
            definitions,
            vec![
                RequirementDefinition::input("air_temperature", "K"),
                RequirementDefinition::input("latitude", "degrees_north"),
                RequirementDefinition::tendency("air_temperature", "K day^-1"),
            ]
        );
    }

    #[test]
    fn test_equilibrium_temperature() {
        let component = NewtonianCooling::default();
        assert!(is_close!(component.equilibrium_temperature(0.0), 300.0));
        assert!(is_close!(component.equilibrium_temperature(90.0), 240.0));
        assert!(is_close!(component.equilibrium_temperature(30.0), 285.0));
    }

    #[test]
    fn test_relaxes_towards_equilibrium() {
        let mut component = NewtonianCooling::default();
        let output = component.compute(&input_state(280.0), 600.0).unwrap();

        let tendency = &output.tendencies["air_temperature"];
        assert_eq!(tendency.shape(), &[2, 3, 4]);
        // At the pole the air is warmer than equilibrium and cools
        assert!(is_close!(tendency[[0, 0, 0]], -(280.0 - 240.0) / 40.0));
        // At the equator it is colder and warms
        assert!(is_close!(tendency[[1, 1, 3]], 20.0 / 40.0));
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_rejects_bad_timescale() {
        let mut component = NewtonianCooling::from_parameters(NewtonianCoolingParameters {
            timescale: 0.0,
            ..Default::default()
        });
        assert!(component.compute(&input_state(280.0), 600.0).is_err());
    }

    #[test]
    fn test_latitude_must_match_grid() {
        let mut component = NewtonianCooling::default();
        let input = InputState::empty()
            .with_values("air_temperature", ArrayD::zeros(IxDyn(&[2, 2, 4])))
            .with_values("latitude", array![0.0, 10.0, 20.0].into_dyn());
        assert!(matches!(
            component.compute(&input, 600.0),
            Err(RGCMError::DimensionMismatch { .. })
        ));
    }
}
