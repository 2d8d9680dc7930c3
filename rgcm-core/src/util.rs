//! Numerical helpers shared by components.

use crate::errors::{RGCMError, RGCMResult};
use crate::FloatValue;
use ndarray::{ArrayD, Axis, Slice};

/// Celsius offset used by the Bolton formula.
const BOLTON_T0: FloatValue = 273.15;

/// Converts a mass mixing ratio to a volume mixing ratio.
///
/// `molecular_weight` and `molecular_weight_air` must share units.
pub fn mass_to_volume_mixing_ratio(
    mass_mixing_ratio: &ArrayD<FloatValue>,
    molecular_weight: FloatValue,
    molecular_weight_air: FloatValue,
) -> ArrayD<FloatValue> {
    mass_mixing_ratio * (molecular_weight_air / molecular_weight)
}

/// Interpolates mid-level values onto interface levels.
///
/// The last axis of `values` is the mid-level axis and the last axis of
/// `interface_pressure` the interface axis, one longer. Interior interfaces
/// are weighted by pressure distance to the two neighbouring mid levels; the
/// outermost interfaces take the value of the nearest mid level.
pub fn interface_values(
    values: &ArrayD<FloatValue>,
    mid_pressure: &ArrayD<FloatValue>,
    interface_pressure: &ArrayD<FloatValue>,
) -> RGCMResult<ArrayD<FloatValue>> {
    let level_axis = values.ndim().checked_sub(1).map(Axis).ok_or_else(|| {
        RGCMError::Error("cannot interpolate a zero-dimensional array".to_string())
    })?;
    let n_mid = values.len_of(level_axis);
    let mut expected = values.shape().to_vec();
    expected[level_axis.index()] = n_mid + 1;

    if mid_pressure.shape() != values.shape() || interface_pressure.shape() != expected.as_slice()
    {
        return Err(RGCMError::Error(format!(
            "interface interpolation needs pressures of shape {:?} and {:?}, got {:?} and {:?}",
            values.shape(),
            expected,
            mid_pressure.shape(),
            interface_pressure.shape()
        )));
    }
    if n_mid == 0 {
        return Ok(ArrayD::zeros(expected));
    }

    let mut result = ArrayD::zeros(expected);
    result
        .slice_axis_mut(level_axis, Slice::from(0..1))
        .assign(&values.slice_axis(level_axis, Slice::from(0..1)));
    result
        .slice_axis_mut(level_axis, Slice::from(n_mid..n_mid + 1))
        .assign(&values.slice_axis(level_axis, Slice::from(n_mid - 1..n_mid)));

    for k in 1..n_mid {
        let below = values.index_axis(level_axis, k - 1);
        let above = values.index_axis(level_axis, k);
        let p_below = mid_pressure.index_axis(level_axis, k - 1);
        let p_above = mid_pressure.index_axis(level_axis, k);
        let p_int = interface_pressure.index_axis(level_axis, k);

        let mut target = result.index_axis_mut(level_axis, k);
        ndarray::Zip::from(&mut target)
            .and(&below)
            .and(&above)
            .and(&p_below)
            .and(&p_above)
            .and(&p_int)
            .for_each(|t, &vb, &va, &pb, &pa, &pi| {
                let span = pb - pa;
                *t = if span == 0.0 {
                    0.5 * (vb + va)
                } else {
                    vb + (va - vb) * (pb - pi) / span
                };
            });
    }
    Ok(result)
}

/// Saturation vapour pressure over liquid water in Pa (Bolton, 1980).
///
/// `temperature` is in kelvin.
pub fn bolton_saturation_vapour_pressure(temperature: FloatValue) -> FloatValue {
    611.2 * (17.67 * (temperature - BOLTON_T0) / (temperature - 29.65)).exp()
}

/// Derivative of [`bolton_saturation_vapour_pressure`] with respect to temperature, in Pa K^-1.
pub fn bolton_saturation_vapour_pressure_dt(temperature: FloatValue) -> FloatValue {
    let es = bolton_saturation_vapour_pressure(temperature);
    es * 17.67 * (BOLTON_T0 - 29.65) / (temperature - 29.65).powi(2)
}

/// Saturation specific humidity.
///
/// `epsilon` is the ratio of the gas constants of dry air and water vapour.
pub fn bolton_q_sat(temperature: FloatValue, pressure: FloatValue, epsilon: FloatValue) -> FloatValue {
    let es = bolton_saturation_vapour_pressure(temperature);
    epsilon * es / (pressure - (1.0 - epsilon) * es)
}

/// Derivative of [`bolton_q_sat`] with respect to temperature.
pub fn bolton_dqsat_dt(
    temperature: FloatValue,
    pressure: FloatValue,
    epsilon: FloatValue,
) -> FloatValue {
    let es = bolton_saturation_vapour_pressure(temperature);
    let des_dt = bolton_saturation_vapour_pressure_dt(temperature);
    let denominator = pressure - (1.0 - epsilon) * es;
    epsilon * pressure * des_dt / denominator.powi(2)
}
