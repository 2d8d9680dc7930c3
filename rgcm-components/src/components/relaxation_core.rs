//! A minimal dynamical core
//!
//! There is no advection. Temperature relaxes towards a reference value,
//! winds are damped and every field is diffused around each latitude circle.
//! Together with the forcing from the physics this gives a rate of change
//! that is stepped with second-order Adams-Bashforth.

use crate::columns::{check_shape, columns};
use ndarray::{Array3, ArrayD, ArrayView3};
use rgcm_core::component::{
    Component, CoreOutput, DynamicalCore, RequirementDefinition,
};
use rgcm_core::errors::{RGCMError, RGCMResult};
use rgcm_core::state::{InputState, OutputState};
use rgcm_core::units::registry::SECONDS_PER_DAY;
use rgcm_core::{ComponentIO, FloatValue, Time};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

/// Parameters for [`RelaxationCore`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaxationCoreParameters {
    /// Temperature the air relaxes towards
    /// unit: K
    pub reference_temperature: FloatValue,
    /// Temperature relaxation timescale, `None` disables relaxation
    /// unit: day
    pub relaxation_days: Option<FloatValue>,
    /// Wind damping timescale, `None` disables damping
    /// unit: day
    pub rayleigh_damping_days: Option<FloatValue>,
    /// Strength of the zonal diffusion between neighbouring columns
    /// unit: s^-1
    pub zonal_diffusion_rate: FloatValue,
}

impl Default for RelaxationCoreParameters {
    fn default() -> Self {
        Self {
            reference_temperature: 270.0,
            relaxation_days: Some(40.0),
            rayleigh_damping_days: Some(1.0),
            zonal_diffusion_rate: 0.0,
        }
    }
}

/// Rates from the last completed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct History {
    time_step: Time,
    rates: BTreeMap<String, ArrayD<FloatValue>>,
}

/// Dynamical core owning air temperature and the horizontal wind
///
/// The first step, and any step after the time step or grid changed, is a
/// forward step. Later steps use
///
/// $$ x_{n+1} = x_n + \Delta t \left( \tfrac{3}{2} r_n - \tfrac{1}{2} r_{n-1} \right) $$
///
/// The rates of the previous step are only replaced once a step has
/// succeeded, and a model step that fails later on puts them back.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ComponentIO)]
#[inputs(
    temperature { name = "air_temperature", unit = "K" },
    eastward_wind { name = "eastward_wind", unit = "m s^-1" },
    northward_wind { name = "northward_wind", unit = "m s^-1" },
)]
#[outputs(
    temperature { name = "air_temperature", unit = "K" },
    eastward_wind { name = "eastward_wind", unit = "m s^-1" },
    northward_wind { name = "northward_wind", unit = "m s^-1" },
)]
#[diagnostics(
    kinetic_energy { name = "specific_kinetic_energy", unit = "J kg^-1" },
)]
pub struct RelaxationCore {
    parameters: RelaxationCoreParameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    history: Option<History>,
    /// History as of the last committed step, once it has been replaced
    #[serde(skip)]
    committed: Option<Option<History>>,
}

fn timescale_seconds(name: &str, days: Option<FloatValue>) -> RGCMResult<Option<FloatValue>> {
    match days {
        Some(d) if d <= 0.0 => Err(RGCMError::InvalidConfiguration(format!(
            "{} must be positive, got {} days",
            name, d
        ))),
        Some(d) => Ok(Some(d * SECONDS_PER_DAY)),
        None => Ok(None),
    }
}

impl RelaxationCore {
    pub fn from_parameters(parameters: RelaxationCoreParameters) -> Self {
        Self {
            parameters,
            history: None,
            committed: None,
        }
    }

    /// Whether the next step can use the rates of a previous one.
    pub fn has_history(&self) -> bool {
        self.history.is_some()
    }

    /// Forgets the previous rates so that the next step is a forward step.
    pub fn reset(&mut self) {
        self.history = None;
        self.committed = None;
    }

    /// Rate of change produced by the core itself, per second.
    fn internal_rate(&self, name: &str, values: ArrayView3<FloatValue>) -> RGCMResult<Array3<FloatValue>> {
        let nlon = values.dim().0;
        let kappa = self.parameters.zonal_diffusion_rate;
        let mut rate = Array3::from_shape_fn(values.raw_dim(), |(i, j, k)| {
            let east = values[[(i + 1) % nlon, j, k]];
            let west = values[[(i + nlon - 1) % nlon, j, k]];
            kappa * (east + west - 2.0 * values[[i, j, k]])
        });

        let damping = if name == "air_temperature" {
            let reference = self.parameters.reference_temperature;
            timescale_seconds("relaxation_days", self.parameters.relaxation_days)?
                .map(|tau| (tau, reference))
        } else {
            timescale_seconds("rayleigh_damping_days", self.parameters.rayleigh_damping_days)?
                .map(|tau| (tau, 0.0))
        };
        if let Some((tau, target)) = damping {
            rate.zip_mut_with(&values, |r, &x| *r -= (x - target) / tau);
        }
        Ok(rate)
    }
}

impl Component for RelaxationCore {
    fn definitions(&self) -> Vec<RequirementDefinition> {
        Self::generated_definitions()
    }

    fn commit_step(&mut self) {
        self.committed = None;
    }

    fn rollback_step(&mut self) {
        if let Some(history) = self.committed.take() {
            self.history = history;
        }
    }
}

#[typetag::serde]
impl DynamicalCore for RelaxationCore {
    fn advance(
        &mut self,
        input_state: &InputState,
        tendencies: &OutputState,
        time_step: Time,
    ) -> RGCMResult<CoreOutput> {
        let inputs = RelaxationCoreInputs::from_input_state(input_state)?;
        let fields = [
            ("air_temperature", inputs.temperature),
            ("eastward_wind", inputs.eastward_wind),
            ("northward_wind", inputs.northward_wind),
        ];

        let history = self.history.as_ref().filter(|h| {
            h.time_step == time_step
                && fields.iter().all(|(name, values)| {
                    h.rates
                        .get(*name)
                        .is_some_and(|r| r.shape() == values.shape())
                })
        });

        let mut rates = BTreeMap::new();
        let mut advanced = BTreeMap::new();
        for (name, values) in fields {
            let view = columns(name, values)?;
            let mut rate = self.internal_rate(name, view)?;
            if let Some(forcing) = tendencies.get(name) {
                check_shape(name, rate.shape(), forcing.shape())?;
                rate += &columns(name, forcing)?;
            }
            let rate = rate.into_dyn();

            let increment = match history.and_then(|h| h.rates.get(name)) {
                Some(previous) => (&rate * 1.5 - previous * 0.5) * time_step,
                None => &rate * time_step,
            };
            let new_values = values + &increment;
            if new_values.iter().any(|v| !v.is_finite()) {
                return Err(RGCMError::Error(format!(
                    "'{}' became non-finite in {}",
                    name,
                    self.name()
                )));
            }
            rates.insert(name.to_string(), rate);
            advanced.insert(name, new_values);
        }

        let mut take = |name: &str| advanced.remove(name).unwrap_or_default();
        let outputs = RelaxationCoreOutputs {
            temperature: take("air_temperature"),
            eastward_wind: take("eastward_wind"),
            northward_wind: take("northward_wind"),
        };
        let kinetic_energy = (&outputs.eastward_wind * &outputs.eastward_wind
            + &outputs.northward_wind * &outputs.northward_wind)
            * 0.5;

        trace!(
            adams_bashforth = history.is_some(),
            time_step,
            "relaxation core advanced"
        );
        let previous = self.history.replace(History { time_step, rates });
        self.committed.get_or_insert(previous);

        Ok(CoreOutput {
            state: outputs.into(),
            diagnostics: RelaxationCoreDiagnostics { kinetic_energy }.into(),
        })
    }
}
