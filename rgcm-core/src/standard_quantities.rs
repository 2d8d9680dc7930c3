//! Standard quantity catalogue.
//!
//! Names follow the CF standard-name style used across atmospheric models
//! (`air_temperature`, `eastward_wind`, ...). Every descriptor here is always
//! available from any [`QuantityRegistry`](crate::registry::QuantityRegistry).
//!
//! ```rust
//! use rgcm_core::standard_quantities::AIR_TEMPERATURE;
//! use rgcm_core::registry::QUANTITY_REGISTRY;
//!
//! assert_eq!(AIR_TEMPERATURE.name, "air_temperature");
//! let d = QUANTITY_REGISTRY.describe("air_temperature").unwrap();
//! assert_eq!(d.units, AIR_TEMPERATURE.units);
//! ```

use crate::define_quantity;
use crate::registry::StaticQuantityDescriptor;

// ============================================================================
// Coordinates
// ============================================================================

define_quantity!(
    LATITUDE,
    name = "latitude",
    units = "degrees_north",
    dims = [Latitude],
    default = 0.0,
    description = "Latitude of each grid row",
);

define_quantity!(
    LONGITUDE,
    name = "longitude",
    units = "degrees_east",
    dims = [Longitude],
    default = 0.0,
    description = "Longitude of each grid column",
);

define_quantity!(
    AIR_PRESSURE,
    name = "air_pressure",
    units = "Pa",
    dims = [Longitude, Latitude, MidLevels],
    default = 1e5,
    description = "Pressure at mid levels",
);

define_quantity!(
    AIR_PRESSURE_ON_INTERFACE_LEVELS,
    name = "air_pressure_on_interface_levels",
    units = "Pa",
    dims = [Longitude, Latitude, InterfaceLevels],
    default = 1e5,
    description = "Pressure at the interfaces bounding each mid level",
);

define_quantity!(
    SURFACE_AIR_PRESSURE,
    name = "surface_air_pressure",
    units = "Pa",
    dims = [Longitude, Latitude],
    default = 1e5,
    description = "Pressure at the lower boundary",
);

// ============================================================================
// Prognostic atmosphere
// ============================================================================

define_quantity!(
    AIR_TEMPERATURE,
    name = "air_temperature",
    units = "K",
    dims = [Longitude, Latitude, MidLevels],
    default = 290.0,
    description = "Temperature of the air at mid levels",
);

define_quantity!(
    EASTWARD_WIND,
    name = "eastward_wind",
    units = "m s^-1",
    dims = [Longitude, Latitude, MidLevels],
    default = 0.0,
    description = "Zonal wind component",
);

define_quantity!(
    NORTHWARD_WIND,
    name = "northward_wind",
    units = "m s^-1",
    dims = [Longitude, Latitude, MidLevels],
    default = 0.0,
    description = "Meridional wind component",
);

define_quantity!(
    SPECIFIC_HUMIDITY,
    name = "specific_humidity",
    units = "kg/kg",
    dims = [Longitude, Latitude, MidLevels],
    default = 0.0,
    description = "Mass of water vapour per unit mass of moist air",
);

// ============================================================================
// Surface
// ============================================================================

define_quantity!(
    SURFACE_TEMPERATURE,
    name = "surface_temperature",
    units = "K",
    dims = [Longitude, Latitude],
    default = 300.0,
    description = "Temperature of the lower boundary",
);

define_quantity!(
    OCEAN_MIXED_LAYER_THICKNESS,
    name = "ocean_mixed_layer_thickness",
    units = "m",
    dims = [Longitude, Latitude],
    default = 50.0,
    description = "Depth of the slab ocean",
);

define_quantity!(
    ZENITH_ANGLE,
    name = "zenith_angle",
    units = "radians",
    dims = [Longitude, Latitude],
    default = 0.0,
    description = "Solar zenith angle",
);

define_quantity!(
    SURFACE_UPWARD_SENSIBLE_HEAT_FLUX,
    name = "surface_upward_sensible_heat_flux",
    units = "W m^-2",
    dims = [Longitude, Latitude],
    default = 0.0,
    description = "Sensible heat flux from the surface into the atmosphere",
);

define_quantity!(
    SURFACE_UPWARD_LATENT_HEAT_FLUX,
    name = "surface_upward_latent_heat_flux",
    units = "W m^-2",
    dims = [Longitude, Latitude],
    default = 0.0,
    description = "Latent heat flux from the surface into the atmosphere",
);

define_quantity!(
    SURFACE_DOWNWELLING_SHORTWAVE_FLUX,
    name = "surface_downwelling_shortwave_flux_in_air",
    units = "W m^-2",
    dims = [Longitude, Latitude],
    default = 0.0,
    description = "Net solar flux absorbed at the surface",
);

define_quantity!(
    SURFACE_DOWNWELLING_LONGWAVE_FLUX,
    name = "surface_downwelling_longwave_flux_in_air",
    units = "W m^-2",
    dims = [Longitude, Latitude],
    default = 0.0,
    description = "Thermal radiation reaching the surface from the atmosphere",
);

define_quantity!(
    SURFACE_UPWARD_LONGWAVE_FLUX,
    name = "surface_upward_longwave_flux_in_air",
    units = "W m^-2",
    dims = [Longitude, Latitude],
    default = 0.0,
    description = "Thermal radiation emitted by the surface",
);

define_quantity!(
    STRATIFORM_PRECIPITATION_AMOUNT,
    name = "stratiform_precipitation_amount",
    units = "kg m^-2",
    dims = [Longitude, Latitude],
    default = 0.0,
    description = "Water removed from the column by large-scale condensation in one step",
);

// ============================================================================
// Radiation
// ============================================================================

define_quantity!(
    LONGWAVE_HEATING_RATE,
    name = "longwave_heating_rate",
    units = "K day^-1",
    dims = [Longitude, Latitude, MidLevels],
    default = 0.0,
    description = "Heating of each layer by thermal radiation",
);

define_quantity!(
    SHORTWAVE_HEATING_RATE,
    name = "shortwave_heating_rate",
    units = "K day^-1",
    dims = [Longitude, Latitude, MidLevels],
    default = 0.0,
    description = "Heating of each layer by solar radiation",
);

define_quantity!(
    UPWELLING_LONGWAVE_FLUX,
    name = "upwelling_longwave_flux_in_air",
    units = "W m^-2",
    dims = [Longitude, Latitude, InterfaceLevels],
    default = 0.0,
    description = "Upward thermal flux at each interface",
);

define_quantity!(
    DOWNWELLING_LONGWAVE_FLUX,
    name = "downwelling_longwave_flux_in_air",
    units = "W m^-2",
    dims = [Longitude, Latitude, InterfaceLevels],
    default = 0.0,
    description = "Downward thermal flux at each interface",
);

// ============================================================================
// Derived diagnostics
// ============================================================================

define_quantity!(
    AIR_POTENTIAL_TEMPERATURE,
    name = "air_potential_temperature",
    units = "K",
    dims = [Longitude, Latitude, MidLevels],
    default = 290.0,
    description = "Temperature of air brought adiabatically to the reference pressure",
);

define_quantity!(
    RELATIVE_HUMIDITY,
    name = "relative_humidity",
    units = "1",
    dims = [Longitude, Latitude, MidLevels],
    default = 0.0,
    description = "Ratio of specific humidity to its saturation value",
);

define_quantity!(
    SPECIFIC_KINETIC_ENERGY,
    name = "specific_kinetic_energy",
    units = "J kg^-1",
    dims = [Longitude, Latitude, MidLevels],
    default = 0.0,
    description = "Kinetic energy of the horizontal wind per unit mass",
);

/// Every descriptor in this module.
pub static STANDARD_QUANTITIES: &[&StaticQuantityDescriptor] = &[
    &LATITUDE,
    &LONGITUDE,
    &AIR_PRESSURE,
    &AIR_PRESSURE_ON_INTERFACE_LEVELS,
    &SURFACE_AIR_PRESSURE,
    &AIR_TEMPERATURE,
    &EASTWARD_WIND,
    &NORTHWARD_WIND,
    &SPECIFIC_HUMIDITY,
    &SURFACE_TEMPERATURE,
    &OCEAN_MIXED_LAYER_THICKNESS,
    &ZENITH_ANGLE,
    &SURFACE_UPWARD_SENSIBLE_HEAT_FLUX,
    &SURFACE_UPWARD_LATENT_HEAT_FLUX,
    &SURFACE_DOWNWELLING_SHORTWAVE_FLUX,
    &SURFACE_DOWNWELLING_LONGWAVE_FLUX,
    &SURFACE_UPWARD_LONGWAVE_FLUX,
    &STRATIFORM_PRECIPITATION_AMOUNT,
    &LONGWAVE_HEATING_RATE,
    &SHORTWAVE_HEATING_RATE,
    &UPWELLING_LONGWAVE_FLUX,
    &DOWNWELLING_LONGWAVE_FLUX,
    &AIR_POTENTIAL_TEMPERATURE,
    &RELATIVE_HUMIDITY,
    &SPECIFIC_KINETIC_ENERGY,
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Unit;
    use std::collections::HashSet;

    #[test]
    fn test_all_units_parse() {
        for d in STANDARD_QUANTITIES {
            let unit = Unit::parse(d.units);
            assert!(unit.is_ok(), "{} has unparseable units {}", d.name, d.units);
            assert!(unit.unwrap().dimension().is_ok(), "{} has unknown units", d.name);
        }
    }

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<&str> = STANDARD_QUANTITIES.iter().map(|d| d.name).collect();
        assert_eq!(names.len(), STANDARD_QUANTITIES.len());
    }
}
