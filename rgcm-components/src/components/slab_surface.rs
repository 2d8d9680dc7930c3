//! Slab ocean surface
//!
//! The surface is a well mixed layer of liquid water. Its temperature follows
//! the surface energy budget, integrated over each step with an adaptive
//! Dormand-Prince solver so that large steps stay stable.

use crate::columns::{check_shape, surface};
use ndarray::{Array2, Zip};
use ode_solvers::*;
use rgcm_core::component::{
    Component, ImplicitComponent, ImplicitOutput, RequirementDefinition,
};
use rgcm_core::errors::{RGCMError, RGCMResult};
use rgcm_core::state::InputState;
use rgcm_core::{ComponentIO, FloatValue, Time};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Parameters for [`SlabSurface`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlabSurfaceParameters {
    /// Fraction of downwelling shortwave reflected by the surface
    pub albedo: FloatValue,
    /// Relative tolerance of the integrator
    pub rtol: FloatValue,
    /// Absolute tolerance of the integrator
    /// unit: K
    pub atol: FloatValue,
}

impl Default for SlabSurfaceParameters {
    fn default() -> Self {
        Self {
            albedo: 0.06,
            rtol: 1e-6,
            atol: 1e-6,
        }
    }
}

/// Surface energy budget of one grid point
///
/// $$ C \frac{dT_s}{dt} = (1 - \alpha) SW + LW - SH - LH - \sigma T_s^4 $$
#[derive(Debug, Clone, Copy)]
struct SurfaceBudget {
    /// Every flux except emission, W m^-2
    absorbed: FloatValue,
    /// Heat capacity per unit area, J m^-2 K^-1
    heat_capacity: FloatValue,
    sigma: FloatValue,
}

impl System<FloatValue, Vector1<FloatValue>> for SurfaceBudget {
    fn system(&self, _t: FloatValue, y: &Vector1<FloatValue>, dy: &mut Vector1<FloatValue>) {
        dy[0] = (self.absorbed - self.sigma * y[0].powi(4)) / self.heat_capacity;
    }
}

/// Slab ocean whose temperature responds to the surface fluxes
///
/// Returns the new surface temperature as an implicit output, so the result
/// replaces the stored value at the end of the step.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ComponentIO)]
#[inputs(
    temperature { name = "surface_temperature", unit = "K" },
    shortwave { name = "surface_downwelling_shortwave_flux_in_air", unit = "W m^-2" },
    longwave { name = "surface_downwelling_longwave_flux_in_air", unit = "W m^-2" },
    sensible { name = "surface_upward_sensible_heat_flux", unit = "W m^-2" },
    latent { name = "surface_upward_latent_heat_flux", unit = "W m^-2" },
    depth { name = "ocean_mixed_layer_thickness", unit = "m" },
)]
#[outputs(
    temperature { name = "surface_temperature", unit = "K" },
)]
#[diagnostics(
    upward_longwave { name = "surface_upward_longwave_flux_in_air", unit = "W m^-2" },
)]
pub struct SlabSurface {
    parameters: SlabSurfaceParameters,
}

impl SlabSurface {
    pub fn from_parameters(parameters: SlabSurfaceParameters) -> Self {
        Self { parameters }
    }

    fn integrate(&self, budget: SurfaceBudget, initial: FloatValue, time_step: Time) -> RGCMResult<FloatValue> {
        let mut stepper = Dopri5::new(
            budget,
            0.0,
            time_step,
            time_step,
            Vector1::new(initial),
            self.parameters.rtol,
            self.parameters.atol,
        );
        let stats = stepper.integrate().map_err(|e| RGCMError::Nonconvergence {
            component: self.name(),
            details: format!("{:?}", e),
        })?;
        trace!(
            accepted = stats.accepted_steps,
            rejected = stats.rejected_steps,
            "slab surface integrated"
        );

        let result = stepper.y_out().last().map(|y| y[0]).ok_or_else(|| {
            RGCMError::Nonconvergence {
                component: self.name(),
                details: "integrator produced no output".to_string(),
            }
        })?;
        if !result.is_finite() {
            return Err(RGCMError::Nonconvergence {
                component: self.name(),
                details: format!("surface temperature became {}", result),
            });
        }
        Ok(result)
    }
}

impl Component for SlabSurface {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        Self::generated_definitions()
    }
}

#[typetag::serde]
impl ImplicitComponent for SlabSurface {
    fn compute(&mut self, input_state: &InputState, time_step: Time) -> RGCMResult<ImplicitOutput> {
        let constants = input_state.constants();
        let sigma = constants.get("stefan_boltzmann_constant", "W m^-2 K^-4")?;
        let density = constants.get("density_of_liquid_water", "kg m^-3")?;
        let specific_heat = constants.get("heat_capacity_of_liquid_water", "J kg^-1 K^-1")?;

        let inputs = SlabSurfaceInputs::from_input_state(input_state)?;
        let temperature = surface("surface_temperature", inputs.temperature)?;
        let shortwave = surface("surface_downwelling_shortwave_flux_in_air", inputs.shortwave)?;
        let longwave = surface("surface_downwelling_longwave_flux_in_air", inputs.longwave)?;
        let sensible = surface("surface_upward_sensible_heat_flux", inputs.sensible)?;
        let latent = surface("surface_upward_latent_heat_flux", inputs.latent)?;
        let depth = surface("ocean_mixed_layer_thickness", inputs.depth)?;
        for (name, values) in [
            ("surface_downwelling_shortwave_flux_in_air", &shortwave),
            ("surface_downwelling_longwave_flux_in_air", &longwave),
            ("surface_upward_sensible_heat_flux", &sensible),
            ("surface_upward_latent_heat_flux", &latent),
            ("ocean_mixed_layer_thickness", &depth),
        ] {
            check_shape(name, temperature.shape(), values.shape())?;
        }
        if let Some(d) = depth.iter().find(|d| **d <= 0.0) {
            return Err(RGCMError::Error(format!(
                "ocean mixed layer thickness must be positive, got {} m",
                d
            )));
        }

        let mut absorbed = Array2::zeros(temperature.raw_dim());
        Zip::from(&mut absorbed)
            .and(&shortwave)
            .and(&longwave)
            .and(&sensible)
            .and(&latent)
            .for_each(|a, &sw, &lw, &sh, &lh| {
                *a = (1.0 - self.parameters.albedo) * sw + lw - sh - lh;
            });

        let mut new_temperature = Array2::zeros(temperature.raw_dim());
        for ((index, t), a) in temperature.indexed_iter().zip(absorbed.iter()) {
            let budget = SurfaceBudget {
                absorbed: *a,
                heat_capacity: density * specific_heat * depth[index],
                sigma,
            };
            new_temperature[index] = self.integrate(budget, *t, time_step)?;
        }
        let upward_longwave = new_temperature.mapv(|t: FloatValue| sigma * t.powi(4));

        Ok(ImplicitOutput {
            outputs: SlabSurfaceOutputs {
                temperature: new_temperature.into_dyn(),
            }
            .into(),
            diagnostics: SlabSurfaceDiagnostics {
                upward_longwave: upward_longwave.into_dyn(),
            }
            .into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;
    use ndarray::{ArrayD, IxDyn};

    const SIGMA: f64 = 5.670367e-8;

    fn input_state(temperature: f64, shortwave: f64, longwave: f64) -> InputState<'static> {
        let field = |value: f64| ArrayD::from_elem(IxDyn(&[2, 3]), value);
        InputState::empty()
            .with_values("surface_temperature", field(temperature))
            .with_values("surface_downwelling_shortwave_flux_in_air", field(shortwave))
            .with_values("surface_downwelling_longwave_flux_in_air", field(longwave))
            .with_values("surface_upward_sensible_heat_flux", field(0.0))
            .with_values("surface_upward_latent_heat_flux", field(0.0))
            .with_values("ocean_mixed_layer_thickness", field(50.0))
    }

    #[test]
    fn test_equilibrium_is_steady() {
        let mut component = SlabSurface::from_parameters(SlabSurfaceParameters {
            albedo: 0.0,
            ..Default::default()
        });
        let temperature: f64 = 290.0;
        let emission = SIGMA * temperature.powi(4);
        let output = component
            .compute(&input_state(temperature, emission - 300.0, 300.0), 86400.0)
            .unwrap();

        let new = &output.outputs["surface_temperature"];
        assert_eq!(new.shape(), &[2, 3]);
        assert!(new.iter().all(|t| (t - temperature).abs() < 1e-6));
        assert!(is_close!(
            output.diagnostics["surface_upward_longwave_flux_in_air"][[1, 2]],
            SIGMA * new[[1, 2]].powi(4)
        ));
    }

    #[test]
    fn test_warming_matches_energy_budget() {
        let mut component = SlabSurface::default();
        let temperature: f64 = 280.0;
        let time_step = 3600.0;
        let output = component
            .compute(&input_state(temperature, 400.0, 350.0), time_step)
            .unwrap();

        let net = 0.94 * 400.0 + 350.0 - SIGMA * temperature.powi(4);
        let heat_capacity = 1000.0 * 4185.5 * 50.0;
        let expected = net * time_step / heat_capacity;
        let change = output.outputs["surface_temperature"][[0, 0]] - temperature;
        assert!(change > 0.0);
        assert!((change / expected - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_relaxes_towards_radiative_equilibrium_over_long_steps() {
        let mut component = SlabSurface::default();
        // A shallow slab integrated for a year ends near equilibrium
        let input = input_state(250.0, 0.0, 400.0)
            .with_values("ocean_mixed_layer_thickness", ArrayD::from_elem(IxDyn(&[2, 3]), 1.0));
        let output = component.compute(&input, 365.0 * 86400.0).unwrap();

        let equilibrium = (400.0 / SIGMA).powf(0.25);
        let result = output.outputs["surface_temperature"][[1, 1]];
        assert!((result - equilibrium).abs() < 1e-3);
    }

    #[test]
    fn test_rejects_non_positive_depth() {
        let mut component = SlabSurface::default();
        let input = input_state(290.0, 200.0, 300.0)
            .with_values("ocean_mixed_layer_thickness", ArrayD::zeros(IxDyn(&[2, 3])));
        assert!(component.compute(&input, 600.0).is_err());
    }

    #[test]
    fn test_flux_shape_must_match_surface() {
        let mut component = SlabSurface::default();
        let input = input_state(290.0, 200.0, 300.0).with_values(
            "surface_upward_latent_heat_flux",
            ArrayD::zeros(IxDyn(&[3, 2])),
        );
        assert!(matches!(
            component.compute(&input, 600.0),
            Err(RGCMError::DimensionMismatch { .. })
        ));
    }
}
