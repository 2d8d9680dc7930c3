//! Default state construction.
//!
//! Every quantity is created at its registry default, in canonical units, on
//! the requested grid. A few quantities get a profile instead of a constant
//! fill:
//!
//! - `latitude` and `longitude` hold the grid coordinates
//! - `air_pressure_on_interface_levels` and `air_pressure` follow equally
//!   spaced sigma levels from the surface (level 0) to zero pressure at the
//!   top, scaled by the default surface pressure

use crate::component::{Component, RequirementDefinition};
use crate::errors::RGCMResult;
use crate::grid::Grid;
use crate::registry::{QuantityDescriptor, QuantityRegistry};
use crate::standard_quantities::{
    AIR_PRESSURE, AIR_PRESSURE_ON_INTERFACE_LEVELS, LATITUDE, LONGITUDE, SURFACE_AIR_PRESSURE,
};
use crate::state::{Quantity, State};
use crate::FloatValue;
use ndarray::{ArrayD, Axis, IxDyn};
use std::collections::BTreeSet;

/// Builds the initial state for `components` on `grid`.
///
/// The state holds every quantity any component reads or produces, plus the
/// grid coordinates.
///
/// # Errors
///
/// [`RGCMError::UnknownQuantity`](crate::errors::RGCMError::UnknownQuantity)
/// if a component declares a name the registry does not know.
pub fn get_default_state(
    components: &[&dyn Component],
    grid: &Grid,
    registry: &QuantityRegistry,
) -> RGCMResult<State> {
    let definitions: Vec<RequirementDefinition> =
        components.iter().flat_map(|c| c.definitions()).collect();
    default_state_for(definitions.iter().map(|d| d.name.as_str()), grid, registry)
}

/// Builds a state holding the named quantities plus the grid coordinates.
pub fn default_state_for<'a>(
    names: impl IntoIterator<Item = &'a str>,
    grid: &Grid,
    registry: &QuantityRegistry,
) -> RGCMResult<State> {
    let mut names: BTreeSet<&str> = names.into_iter().collect();
    names.insert(LATITUDE.name);
    names.insert(LONGITUDE.name);

    let mut state = State::new(0.0);
    for name in names {
        let descriptor = registry.describe(name)?;
        state.insert(name, default_quantity(&descriptor, grid, registry));
    }
    Ok(state)
}

/// The default value of one quantity on `grid`.
pub fn default_quantity(
    descriptor: &QuantityDescriptor,
    grid: &Grid,
    registry: &QuantityRegistry,
) -> Quantity {
    let shape = grid.shape_for(&descriptor.dims);
    let values = match descriptor.name.as_str() {
        n if n == LATITUDE.name && shape == [grid.nlat] => grid.latitudes().into_dyn(),
        n if n == LONGITUDE.name && shape == [grid.nlon] => grid.longitudes().into_dyn(),
        n if n == AIR_PRESSURE_ON_INTERFACE_LEVELS.name => {
            sigma_pressure(&shape, grid.n_interface_levels, false, surface_pressure(registry))
        }
        n if n == AIR_PRESSURE.name => {
            sigma_pressure(&shape, grid.n_interface_levels, true, surface_pressure(registry))
        }
        _ => ArrayD::from_elem(IxDyn(&shape), descriptor.default_value),
    };
    Quantity {
        values,
        units: descriptor.units.clone(),
        dims: descriptor.dims.clone(),
    }
}

fn surface_pressure(registry: &QuantityRegistry) -> FloatValue {
    registry
        .get(SURFACE_AIR_PRESSURE.name)
        .map(|d| d.default_value)
        .unwrap_or(SURFACE_AIR_PRESSURE.default_value)
}

/// Pressure on sigma levels along the last axis of `shape`.
///
/// Interface `k` sits at `sigma = 1 - k / (n_interface - 1)`. Mid levels are
/// halfway between their bounding interfaces.
fn sigma_pressure(
    shape: &[usize],
    n_interface: usize,
    mid_levels: bool,
    p_surface: FloatValue,
) -> ArrayD<FloatValue> {
    let sigma_interface = |k: usize| {
        if n_interface > 1 {
            1.0 - k as FloatValue / (n_interface - 1) as FloatValue
        } else {
            1.0
        }
    };
    let mut values = ArrayD::zeros(IxDyn(shape));
    let Some(level_axis) = shape.len().checked_sub(1).map(Axis) else {
        return values;
    };
    for (k, mut level) in values.axis_iter_mut(level_axis).enumerate() {
        let sigma = if mid_levels {
            0.5 * (sigma_interface(k) + sigma_interface(k + 1))
        } else {
            sigma_interface(k)
        };
        level.fill(p_surface * sigma);
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RGCMError;
    use is_close::is_close;

    #[derive(Debug)]
    struct Radiation;

    impl Component for Radiation {
        fn definitions(&self) -> Vec<RequirementDefinition> {
            vec![
                RequirementDefinition::input("air_temperature", "K"),
                RequirementDefinition::input("air_pressure", "Pa"),
                RequirementDefinition::input("surface_temperature", "K"),
                RequirementDefinition::tendency("air_temperature", "K s^-1"),
                RequirementDefinition::diagnostic("upwelling_longwave_flux_in_air", "W m^-2"),
            ]
        }
    }

    #[derive(Debug)]
    struct Unknown;

    impl Component for Unknown {
        fn definitions(&self) -> Vec<RequirementDefinition> {
            vec![RequirementDefinition::input("not_a_quantity", "1")]
        }
    }

    #[test]
    fn test_default_state_shapes_and_units() {
        let grid = Grid::from_levels(4, 3, 2).unwrap();
        let registry = QuantityRegistry::new();
        let state = get_default_state(&[&Radiation], &grid, &registry).unwrap();

        let t = state.get("air_temperature").unwrap();
        assert_eq!(t.values.shape(), &[4, 3, 2]);
        assert_eq!(t.units, "K");
        assert!(t.values.iter().all(|v| *v == 290.0));

        let ts = state.get("surface_temperature").unwrap();
        assert_eq!(ts.values.shape(), &[4, 3]);

        let flux = state.get("upwelling_longwave_flux_in_air").unwrap();
        assert_eq!(flux.values.shape(), &[4, 3, 3]);

        assert_eq!(state.get("latitude").unwrap().values.shape(), &[3]);
        assert_eq!(state.get("longitude").unwrap().values.shape(), &[4]);
        assert_eq!(state.time, 0.0);
        for (name, q) in state.iter() {
            q.check_grid(name, &grid).unwrap();
        }
    }

    #[test]
    fn test_coordinates() {
        let grid = Grid::from_levels(4, 2, 1).unwrap();
        let state = default_state_for(std::iter::empty(), &grid, &QuantityRegistry::new()).unwrap();
        let lat = state.values("latitude").unwrap();
        assert!(is_close!(lat[0], -45.0));
        assert!(is_close!(lat[1], 45.0));
        let lon = state.values("longitude").unwrap();
        assert!(is_close!(lon[3], 270.0));
    }

    #[test]
    fn test_pressure_profile() {
        let grid = Grid::from_levels(1, 1, 2).unwrap();
        let state = default_state_for(
            ["air_pressure", "air_pressure_on_interface_levels"],
            &grid,
            &QuantityRegistry::new(),
        )
        .unwrap();

        let p_int = state.values("air_pressure_on_interface_levels").unwrap();
        assert!(is_close!(p_int[[0, 0, 0]], 1e5));
        assert!(is_close!(p_int[[0, 0, 1]], 5e4));
        assert_eq!(p_int[[0, 0, 2]], 0.0);

        let p = state.values("air_pressure").unwrap();
        assert!(is_close!(p[[0, 0, 0]], 7.5e4));
        assert!(is_close!(p[[0, 0, 1]], 2.5e4));
    }

    #[test]
    fn test_unknown_quantity() {
        let grid = Grid::default();
        let err = get_default_state(&[&Unknown], &grid, &QuantityRegistry::new()).unwrap_err();
        assert_eq!(
            err,
            RGCMError::UnknownQuantity {
                name: "not_a_quantity".to_string()
            }
        );
    }
}
