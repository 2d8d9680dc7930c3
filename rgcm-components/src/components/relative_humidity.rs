use crate::columns::check_shape;
use ndarray::Zip;
use rgcm_core::component::{Component, DiagnosticComponent, RequirementDefinition};
use rgcm_core::errors::RGCMResult;
use rgcm_core::state::{InputState, OutputState};
use rgcm_core::util::bolton_q_sat;
use rgcm_core::ComponentIO;
use serde::{Deserialize, Serialize};

/// Relative humidity with respect to liquid water, as a fraction
#[derive(Debug, Clone, Default, Serialize, Deserialize, ComponentIO)]
#[inputs(
    temperature { name = "air_temperature", unit = "K" },
    humidity { name = "specific_humidity", unit = "kg/kg" },
    pressure { name = "air_pressure", unit = "Pa" },
)]
#[diagnostics(
    relative_humidity { name = "relative_humidity", unit = "1" },
)]
pub struct RelativeHumidity {}

impl Component for RelativeHumidity {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        Self::generated_definitions()
    }
}

#[typetag::serde]
impl DiagnosticComponent for RelativeHumidity {
    fn compute(&mut self, input_state: &InputState) -> RGCMResult<OutputState> {
        let constants = input_state.constants();
        let epsilon = constants.get("gas_constant_of_dry_air", "J kg^-1 K^-1")?
            / constants.get("gas_constant_of_vapor_phase", "J kg^-1 K^-1")?;

        let inputs = RelativeHumidityInputs::from_input_state(input_state)?;
        check_shape("specific_humidity", inputs.temperature.shape(), inputs.humidity.shape())?;
        check_shape("air_pressure", inputs.temperature.shape(), inputs.pressure.shape())?;

        let relative_humidity = Zip::from(inputs.temperature)
            .and(inputs.humidity)
            .and(inputs.pressure)
            .map_collect(|&t, &q, &p| q / bolton_q_sat(t, p, epsilon));

        Ok(RelativeHumidityDiagnostics { relative_humidity }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;
    use ndarray::array;

    #[test]
    fn test_relative_humidity() {
        let epsilon = 287.04 / 461.5;
        let q_sat = bolton_q_sat(290.0, 9e4, epsilon);
        let input = InputState::empty()
            .with_values("air_temperature", array![[[290.0, 290.0]]].into_dyn())
            .with_values("specific_humidity", array![[[q_sat, 0.5 * q_sat]]].into_dyn())
            .with_values("air_pressure", array![[[9e4, 9e4]]].into_dyn());

        let output = RelativeHumidity::default().compute(&input).unwrap();
        let rh = &output["relative_humidity"];
        assert!(is_close!(rh[[0, 0, 0]], 1.0));
        assert!(is_close!(rh[[0, 0, 1]], 0.5));
    }

    #[test]
    fn test_definitions() {
        let names: Vec<String> = RelativeHumidity::default()
            .definitions()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(
            names,
            vec![
                "air_temperature",
                "specific_humidity",
                "air_pressure",
                "relative_humidity"
            ]
        );
    }
}
