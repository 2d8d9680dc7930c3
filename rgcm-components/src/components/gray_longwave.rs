//! Gray longwave radiation
//!
//! A two-stream, single band scheme in the style of idealised moist GCMs. The
//! optical depth grows with pressure as a blend of a linear term and a quartic
//! term, the surface emits as a black body and no radiation enters from the
//! top of the atmosphere.

use crate::columns::{check_shape, columns, surface};
use ndarray::{s, Array1, Array3, ArrayView1, Axis};
use rgcm_core::component::{
    Component, PrognosticComponent, PrognosticOutput, RequirementDefinition,
};
use rgcm_core::errors::{RGCMError, RGCMResult};
use rgcm_core::state::InputState;
use rgcm_core::units::registry::SECONDS_PER_DAY;
use rgcm_core::{ComponentIO, FloatValue, Time};
use serde::{Deserialize, Serialize};

/// Parameters for [`GrayLongwaveRadiation`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrayLongwaveParameters {
    /// Longwave optical depth of the whole column
    pub tau_surface: FloatValue,
    /// Weight of the linear term in the optical depth profile
    pub linear_fraction: FloatValue,
}

impl Default for GrayLongwaveParameters {
    fn default() -> Self {
        Self {
            tau_surface: 6.0,
            linear_fraction: 0.1,
        }
    }
}

/// Gray two-stream longwave radiative transfer
///
/// Optical depth at an interface with pressure $p$ is
///
/// $$ \tau(p) = \tau_s \left( f \frac{p}{p_s} + (1 - f) \left(\frac{p}{p_s}\right)^4 \right) $$
///
/// where $p_s$ is the pressure of the lowest interface. Each layer emits
/// $\sigma T^4$ weighted by its emissivity $1 - e^{-\Delta\tau}$.
///
/// Interface levels are ordered from the surface (index 0) upwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ComponentIO)]
#[inputs(
    temperature { name = "air_temperature", unit = "K" },
    interface_pressure { name = "air_pressure_on_interface_levels", unit = "Pa" },
    surface_temperature { name = "surface_temperature", unit = "K" },
)]
#[tendencies(
    temperature { name = "air_temperature", unit = "K s^-1" },
)]
#[diagnostics(
    upwelling { name = "upwelling_longwave_flux_in_air", unit = "W m^-2" },
    downwelling { name = "downwelling_longwave_flux_in_air", unit = "W m^-2" },
    heating_rate { name = "longwave_heating_rate", unit = "K day^-1" },
    surface_downwelling { name = "surface_downwelling_longwave_flux_in_air", unit = "W m^-2" },
)]
pub struct GrayLongwaveRadiation {
    parameters: GrayLongwaveParameters,
}

/// Fluxes and heating of one column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFluxes {
    /// Upward flux at each interface, W m^-2
    pub upwelling: Array1<FloatValue>,
    /// Downward flux at each interface, W m^-2
    pub downwelling: Array1<FloatValue>,
    /// Heating of each layer, K s^-1
    pub heating: Array1<FloatValue>,
}

impl GrayLongwaveRadiation {
    pub fn from_parameters(parameters: GrayLongwaveParameters) -> Self {
        Self { parameters }
    }

    /// Optical depth at `pressure` in a column with lowest interface at `surface_pressure`
    pub fn optical_depth(&self, pressure: FloatValue, surface_pressure: FloatValue) -> FloatValue {
        let x = pressure / surface_pressure;
        let f = self.parameters.linear_fraction;
        self.parameters.tau_surface * (f * x + (1.0 - f) * x.powi(4))
    }

    /// Solves the two-stream equations for one column.
    ///
    /// `temperature` holds the layer temperatures and `interface_pressure`
    /// the bounding interfaces, both ordered from the surface upwards.
    pub fn column_fluxes(
        &self,
        temperature: ArrayView1<FloatValue>,
        interface_pressure: ArrayView1<FloatValue>,
        surface_temperature: FloatValue,
        sigma: FloatValue,
        gravity: FloatValue,
        heat_capacity: FloatValue,
    ) -> RGCMResult<ColumnFluxes> {
        let n_layers = temperature.len();
        check_shape(
            "air_pressure_on_interface_levels",
            &[n_layers + 1],
            interface_pressure.shape(),
        )?;

        let surface_pressure = interface_pressure[0];
        if surface_pressure <= 0.0 {
            return Err(RGCMError::Error(format!(
                "lowest interface pressure must be positive, got {}",
                surface_pressure
            )));
        }

        let mut transmissivity = Array1::zeros(n_layers);
        let mut thickness = Array1::zeros(n_layers);
        for k in 0..n_layers {
            let dp = interface_pressure[k] - interface_pressure[k + 1];
            if dp <= 0.0 {
                return Err(RGCMError::Error(format!(
                    "interface pressure must decrease upwards, layer {} has thickness {} Pa",
                    k, dp
                )));
            }
            let d_tau = self.optical_depth(interface_pressure[k], surface_pressure)
                - self.optical_depth(interface_pressure[k + 1], surface_pressure);
            transmissivity[k] = (-d_tau).exp();
            thickness[k] = dp;
        }
        let emission = temperature.mapv(|t| sigma * t.powi(4));

        let mut upwelling = Array1::zeros(n_layers + 1);
        upwelling[0] = sigma * surface_temperature.powi(4);
        for k in 0..n_layers {
            upwelling[k + 1] =
                upwelling[k] * transmissivity[k] + emission[k] * (1.0 - transmissivity[k]);
        }

        let mut downwelling = Array1::zeros(n_layers + 1);
        for k in (0..n_layers).rev() {
            downwelling[k] =
                downwelling[k + 1] * transmissivity[k] + emission[k] * (1.0 - transmissivity[k]);
        }

        let net_upward = &upwelling - &downwelling;
        let heating = Array1::from_shape_fn(n_layers, |k| {
            gravity / heat_capacity * (net_upward[k] - net_upward[k + 1]) / thickness[k]
        });

        Ok(ColumnFluxes {
            upwelling,
            downwelling,
            heating,
        })
    }
}

impl Component for GrayLongwaveRadiation {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        Self::generated_definitions()
    }
}

#[typetag::serde]
impl PrognosticComponent for GrayLongwaveRadiation {
    fn compute(&mut self, input_state: &InputState, _time_step: Time) -> RGCMResult<PrognosticOutput> {
        let constants = input_state.constants();
        let sigma = constants.get("stefan_boltzmann_constant", "W m^-2 K^-4")?;
        let gravity = constants.get("gravitational_acceleration", "m s^-2")?;
        let heat_capacity =
            constants.get("heat_capacity_of_dry_air_at_constant_pressure", "J kg^-1 K^-1")?;

        let inputs = GrayLongwaveRadiationInputs::from_input_state(input_state)?;
        let temperature = columns("air_temperature", inputs.temperature)?;
        let interface_pressure =
            columns("air_pressure_on_interface_levels", inputs.interface_pressure)?;
        let surface_temperature = surface("surface_temperature", inputs.surface_temperature)?;

        let (nlon, nlat, n_layers) = temperature.dim();
        check_shape(
            "air_pressure_on_interface_levels",
            &[nlon, nlat, n_layers + 1],
            interface_pressure.shape(),
        )?;
        check_shape(
            "surface_temperature",
            &[nlon, nlat],
            surface_temperature.shape(),
        )?;

        let mut heating = Array3::zeros((nlon, nlat, n_layers));
        let mut upwelling = Array3::zeros((nlon, nlat, n_layers + 1));
        let mut downwelling = Array3::zeros((nlon, nlat, n_layers + 1));

        for i in 0..nlon {
            for j in 0..nlat {
                let fluxes = self.column_fluxes(
                    temperature.slice(s![i, j, ..]),
                    interface_pressure.slice(s![i, j, ..]),
                    surface_temperature[[i, j]],
                    sigma,
                    gravity,
                    heat_capacity,
                )?;
                heating.slice_mut(s![i, j, ..]).assign(&fluxes.heating);
                upwelling.slice_mut(s![i, j, ..]).assign(&fluxes.upwelling);
                downwelling.slice_mut(s![i, j, ..]).assign(&fluxes.downwelling);
            }
        }

        let surface_downwelling = downwelling.index_axis(Axis(2), 0).to_owned();
        let heating_rate = heating.mapv(|h| h * SECONDS_PER_DAY);

        Ok(PrognosticOutput {
            tendencies: GrayLongwaveRadiationTendencies {
                temperature: heating.into_dyn(),
            }
            .into(),
            diagnostics: GrayLongwaveRadiationDiagnostics {
                upwelling: upwelling.into_dyn(),
                downwelling: downwelling.into_dyn(),
                heating_rate: heating_rate.into_dyn(),
                surface_downwelling: surface_downwelling.into_dyn(),
            }
            .into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;
    use ndarray::{array, ArrayD, IxDyn};

    const SIGMA: f64 = 5.670367e-8;
    const GRAVITY: f64 = 9.80665;
    const CP: f64 = 1004.64;

    fn interface_pressure(n_layers: usize) -> Array1<f64> {
        Array1::from_shape_fn(n_layers + 1, |k| 1e5 * (1.0 - k as f64 / n_layers as f64))
    }

    #[test]
    fn test_optical_depth_profile() {
        let component = GrayLongwaveRadiation::default();
        assert!(is_close!(component.optical_depth(1e5, 1e5), 6.0));
        assert_eq!(component.optical_depth(0.0, 1e5), 0.0);
        assert!(is_close!(
            component.optical_depth(5e4, 1e5),
            6.0 * (0.1 * 0.5 + 0.9 * 0.0625)
        ));
    }

    #[test]
    fn test_transparent_atmosphere() {
        let component = GrayLongwaveRadiation::from_parameters(GrayLongwaveParameters {
            tau_surface: 0.0,
            ..Default::default()
        });
        let temperature = Array1::from_elem(4, 250.0);
        let fluxes = component
            .column_fluxes(
                temperature.view(),
                interface_pressure(4).view(),
                300.0,
                SIGMA,
                GRAVITY,
                CP,
            )
            .unwrap();

        let surface_emission = SIGMA * 300.0_f64.powi(4);
        for k in 0..5 {
            assert!(is_close!(fluxes.upwelling[k], surface_emission));
            assert_eq!(fluxes.downwelling[k], 0.0);
        }
        assert!(fluxes.heating.iter().all(|h| *h == 0.0));
    }

    #[test]
    fn test_column_energy_budget() {
        let component = GrayLongwaveRadiation::default();
        let temperature = array![288.0, 270.0, 250.0, 230.0, 215.0];
        let pressure = interface_pressure(5);
        let fluxes = component
            .column_fluxes(temperature.view(), pressure.view(), 295.0, SIGMA, GRAVITY, CP)
            .unwrap();

        // Column heating balances the net flux through the bottom and top
        let column_heating: f64 = (0..5)
            .map(|k| fluxes.heating[k] * (pressure[k] - pressure[k + 1]) * CP / GRAVITY)
            .sum();
        let net_bottom = fluxes.upwelling[0] - fluxes.downwelling[0];
        let net_top = fluxes.upwelling[5] - fluxes.downwelling[5];
        assert!(is_close!(column_heating, net_bottom - net_top));

        assert_eq!(fluxes.downwelling[5], 0.0);
        assert!(fluxes.upwelling[5] < fluxes.upwelling[0]);
    }

    #[test]
    fn test_isothermal_column_cools() {
        let component = GrayLongwaveRadiation::default();
        let temperature = Array1::from_elem(6, 260.0);
        let fluxes = component
            .column_fluxes(
                temperature.view(),
                interface_pressure(6).view(),
                260.0,
                SIGMA,
                GRAVITY,
                CP,
            )
            .unwrap();

        let emission = SIGMA * 260.0_f64.powi(4);
        assert!(fluxes.upwelling.iter().all(|u| is_close!(*u, emission)));
        assert!(fluxes.downwelling[0] < emission);
        assert!(fluxes.heating.iter().all(|h| *h < 0.0));
    }

    #[test]
    fn test_rejects_inverted_pressure() {
        let component = GrayLongwaveRadiation::default();
        let temperature = Array1::from_elem(2, 250.0);
        let pressure = array![1e5, 6e4, 7e4];
        assert!(component
            .column_fluxes(temperature.view(), pressure.view(), 300.0, SIGMA, GRAVITY, CP)
            .is_err());
    }

    #[test]
    fn test_compute_on_grid() {
        let (nlon, nlat, nz) = (2, 3, 4);
        let pressure = interface_pressure(nz);
        let interface = ArrayD::from_shape_fn(IxDyn(&[nlon, nlat, nz + 1]), |idx| pressure[idx[2]]);
        let input = InputState::empty()
            .with_values(
                "air_temperature",
                ArrayD::from_elem(IxDyn(&[nlon, nlat, nz]), 260.0),
            )
            .with_values("air_pressure_on_interface_levels", interface)
            .with_values(
                "surface_temperature",
                ArrayD::from_elem(IxDyn(&[nlon, nlat]), 290.0),
            );

        let mut component = GrayLongwaveRadiation::default();
        let output = component.compute(&input, 900.0).unwrap();

        assert_eq!(output.tendencies["air_temperature"].shape(), &[2, 3, 4]);
        assert_eq!(
            output.diagnostics["upwelling_longwave_flux_in_air"].shape(),
            &[2, 3, 5]
        );
        assert_eq!(
            output.diagnostics["surface_downwelling_longwave_flux_in_air"].shape(),
            &[2, 3]
        );
        assert!(is_close!(
            output.diagnostics["longwave_heating_rate"][[1, 2, 3]],
            output.tendencies["air_temperature"][[1, 2, 3]] * 86400.0
        ));
        assert!(is_close!(
            output.diagnostics["surface_downwelling_longwave_flux_in_air"][[0, 1]],
            output.diagnostics["downwelling_longwave_flux_in_air"][[0, 1, 0]]
        ));
    }

    #[test]
    fn test_compute_checks_interface_shape() {
        let input = InputState::empty()
            .with_values("air_temperature", ArrayD::from_elem(IxDyn(&[1, 1, 3]), 260.0))
            .with_values(
                "air_pressure_on_interface_levels",
                ArrayD::from_elem(IxDyn(&[1, 1, 3]), 1e5),
            )
            .with_values("surface_temperature", ArrayD::from_elem(IxDyn(&[1, 1]), 290.0));
        let mut component = GrayLongwaveRadiation::default();
        assert!(matches!(
            component.compute(&input, 900.0),
            Err(RGCMError::DimensionMismatch { .. })
        ));
    }
}
