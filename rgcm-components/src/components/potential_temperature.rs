use crate::columns::check_shape;
use ndarray::Zip;
use rgcm_core::component::{Component, DiagnosticComponent, RequirementDefinition};
use rgcm_core::errors::RGCMResult;
use rgcm_core::state::{InputState, OutputState};
use rgcm_core::ComponentIO;
use serde::{Deserialize, Serialize};

/// Potential temperature of the air at mid levels
///
/// $$ \theta = T \left( \frac{p_0}{p} \right)^{R_d / c_p} $$
#[derive(Debug, Clone, Default, Serialize, Deserialize, ComponentIO)]
#[inputs(
    temperature { name = "air_temperature", unit = "K" },
    pressure { name = "air_pressure", unit = "Pa" },
)]
#[diagnostics(
    potential_temperature { name = "air_potential_temperature", unit = "K" },
)]
pub struct PotentialTemperature {}

impl Component for PotentialTemperature {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        Self::generated_definitions()
    }
}

#[typetag::serde]
impl DiagnosticComponent for PotentialTemperature {
    fn compute(&mut self, input_state: &InputState) -> RGCMResult<OutputState> {
        let constants = input_state.constants();
        let reference = constants.get("reference_air_pressure", "Pa")?;
        let kappa = constants.get("gas_constant_of_dry_air", "J kg^-1 K^-1")?
            / constants.get("heat_capacity_of_dry_air_at_constant_pressure", "J kg^-1 K^-1")?;

        let inputs = PotentialTemperatureInputs::from_input_state(input_state)?;
        check_shape("air_pressure", inputs.temperature.shape(), inputs.pressure.shape())?;
        let theta = Zip::from(inputs.temperature)
            .and(inputs.pressure)
            .map_collect(|&t, &p| t * (reference / p).powf(kappa));

        Ok(PotentialTemperatureDiagnostics {
            potential_temperature: theta,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;
    use ndarray::array;

    #[test]
    fn test_potential_temperature() {
        let input = InputState::empty()
            .with_values("air_temperature", array![[[300.0, 250.0]]].into_dyn())
            .with_values("air_pressure", array![[[1e5, 5e4]]].into_dyn());
        let output = PotentialTemperature::default().compute(&input).unwrap();
        let theta = &output["air_potential_temperature"];

        assert!(is_close!(theta[[0, 0, 0]], 300.0));
        let kappa = 287.04 / 1004.64;
        assert!(is_close!(theta[[0, 0, 1]], 250.0 * 2.0_f64.powf(kappa)));
    }

    #[test]
    fn test_follows_reference_pressure() {
        let mut constants = rgcm_core::constants::ConstantsTable::default();
        constants.set("reference_air_pressure", 500.0, "hPa").unwrap();
        let input = InputState::empty()
            .with_constants(constants)
            .with_values("air_temperature", array![[[250.0]]].into_dyn())
            .with_values("air_pressure", array![[[5e4]]].into_dyn());
        let output = PotentialTemperature::default().compute(&input).unwrap();
        assert!(is_close!(output["air_potential_temperature"][[0, 0, 0]], 250.0));
    }
}
