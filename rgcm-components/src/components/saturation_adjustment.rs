//! Large-scale condensation
//!
//! Removes supersaturation by condensing the excess vapour and releasing its
//! latent heat into the air, precipitating the condensate immediately.

use crate::columns::{check_shape, columns};
use ndarray::{Array2, Array3, Zip};
use rgcm_core::component::{
    Component, ImplicitComponent, ImplicitOutput, RequirementDefinition,
};
use rgcm_core::errors::{RGCMError, RGCMResult};
use rgcm_core::state::InputState;
use rgcm_core::util::{bolton_dqsat_dt, bolton_q_sat};
use rgcm_core::{ComponentIO, FloatValue, Time};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parameters for [`SaturationAdjustment`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaturationAdjustmentParameters {
    /// Newton iterations allowed per grid point
    pub max_iterations: usize,
    /// Convergence threshold on the temperature update
    /// unit: K
    pub tolerance: FloatValue,
}

impl Default for SaturationAdjustmentParameters {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            tolerance: 1e-8,
        }
    }
}

/// Physical constants used by the adjustment
#[derive(Debug, Clone, Copy)]
struct Thermodynamics {
    latent_heat: FloatValue,
    heat_capacity: FloatValue,
    epsilon: FloatValue,
}

/// Saturation adjustment at constant pressure
///
/// Where the air is supersaturated the new temperature $T'$ solves
///
/// $$ T' - T = \frac{L}{c_p} \left( q - q_{sat}(T', p) \right) $$
///
/// by Newton iteration and the humidity is set to $q_{sat}(T', p)$. The
/// condensed water is reported as a column amount.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ComponentIO)]
#[inputs(
    temperature { name = "air_temperature", unit = "K" },
    humidity { name = "specific_humidity", unit = "kg/kg" },
    pressure { name = "air_pressure", unit = "Pa" },
    interface_pressure { name = "air_pressure_on_interface_levels", unit = "Pa" },
)]
#[outputs(
    temperature { name = "air_temperature", unit = "K" },
    humidity { name = "specific_humidity", unit = "kg/kg" },
)]
#[diagnostics(
    precipitation { name = "stratiform_precipitation_amount", unit = "kg m^-2" },
)]
pub struct SaturationAdjustment {
    parameters: SaturationAdjustmentParameters,
}

impl SaturationAdjustment {
    pub fn from_parameters(parameters: SaturationAdjustmentParameters) -> Self {
        Self { parameters }
    }

    /// Adjusted temperature and humidity at one point.
    fn adjust(
        &self,
        temperature: FloatValue,
        humidity: FloatValue,
        pressure: FloatValue,
        thermo: Thermodynamics,
    ) -> RGCMResult<(FloatValue, FloatValue)> {
        if humidity <= bolton_q_sat(temperature, pressure, thermo.epsilon) {
            return Ok((temperature, humidity));
        }

        let ratio = thermo.latent_heat / thermo.heat_capacity;
        let mut adjusted = temperature;
        for _ in 0..self.parameters.max_iterations {
            let q_sat = bolton_q_sat(adjusted, pressure, thermo.epsilon);
            let residual = adjusted - temperature - ratio * (humidity - q_sat);
            let slope = 1.0 + ratio * bolton_dqsat_dt(adjusted, pressure, thermo.epsilon);
            let update = residual / slope;
            adjusted -= update;

            if !adjusted.is_finite() {
                break;
            }
            if update.abs() < self.parameters.tolerance {
                return Ok((adjusted, bolton_q_sat(adjusted, pressure, thermo.epsilon)));
            }
        }

        Err(RGCMError::Nonconvergence {
            component: self.name(),
            details: format!(
                "no solution within {} iterations for T = {} K, q = {}, p = {} Pa",
                self.parameters.max_iterations, temperature, humidity, pressure
            ),
        })
    }
}

impl Component for SaturationAdjustment {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        Self::generated_definitions()
    }
}

#[typetag::serde]
impl ImplicitComponent for SaturationAdjustment {
    fn compute(&mut self, input_state: &InputState, _time_step: Time) -> RGCMResult<ImplicitOutput> {
        let constants = input_state.constants();
        let gravity = constants.get("gravitational_acceleration", "m s^-2")?;
        let thermo = Thermodynamics {
            latent_heat: constants.get("latent_heat_of_condensation_of_water", "J kg^-1")?,
            heat_capacity: constants
                .get("heat_capacity_of_dry_air_at_constant_pressure", "J kg^-1 K^-1")?,
            epsilon: constants.get("gas_constant_of_dry_air", "J kg^-1 K^-1")?
                / constants.get("gas_constant_of_vapor_phase", "J kg^-1 K^-1")?,
        };

        let inputs = SaturationAdjustmentInputs::from_input_state(input_state)?;
        let temperature = columns("air_temperature", inputs.temperature)?;
        let humidity = columns("specific_humidity", inputs.humidity)?;
        let pressure = columns("air_pressure", inputs.pressure)?;
        let interface_pressure =
            columns("air_pressure_on_interface_levels", inputs.interface_pressure)?;

        let (nlon, nlat, n_levels) = temperature.dim();
        check_shape("specific_humidity", temperature.shape(), humidity.shape())?;
        check_shape("air_pressure", temperature.shape(), pressure.shape())?;
        check_shape(
            "air_pressure_on_interface_levels",
            &[nlon, nlat, n_levels + 1],
            interface_pressure.shape(),
        )?;

        let mut new_temperature = Array3::zeros(temperature.raw_dim());
        let mut new_humidity = Array3::zeros(temperature.raw_dim());
        let mut condensed = 0_usize;
        for (index, &t) in temperature.indexed_iter() {
            let q = humidity[index];
            let (t_new, q_new) = self.adjust(t, q, pressure[index], thermo)?;
            if q_new < q {
                condensed += 1;
            }
            new_temperature[index] = t_new;
            new_humidity[index] = q_new;
        }

        let mut precipitation = Array2::zeros((nlon, nlat));
        Zip::indexed(&mut precipitation).for_each(|(i, j), amount| {
            *amount = (0..n_levels)
                .map(|k| {
                    let dp = interface_pressure[[i, j, k]] - interface_pressure[[i, j, k + 1]];
                    (humidity[[i, j, k]] - new_humidity[[i, j, k]]) * dp / gravity
                })
                .sum::<FloatValue>();
        });
        if condensed > 0 {
            debug!(points = condensed, "saturation adjustment condensed");
        }

        Ok(ImplicitOutput {
            outputs: SaturationAdjustmentOutputs {
                temperature: new_temperature.into_dyn(),
                humidity: new_humidity.into_dyn(),
            }
            .into(),
            diagnostics: SaturationAdjustmentDiagnostics {
                precipitation: precipitation.into_dyn(),
            }
            .into(),
        })
    }
}
