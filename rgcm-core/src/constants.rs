//! Physical constants used by components.
//!
//! A [`ConstantsTable`] is an ordinary value owned by a model. Components read
//! it through their [`InputState`](crate::state::InputState) and cannot
//! modify it. Changing a constant for a run means changing the table before
//! the model is built, or through [`Model::constants_mut`](crate::model::Model::constants_mut)
//! between steps; [`ConstantsTable::reset`] restores the defaults.
//!
//! ```rust
//! use rgcm_core::constants::ConstantsTable;
//!
//! let mut constants = ConstantsTable::default();
//! assert_eq!(constants.get("stellar_irradiance", "W m^-2").unwrap(), 1367.0);
//!
//! constants.set("stellar_irradiance", 200.0, "W/m^2").unwrap();
//! assert_eq!(constants.value("stellar_irradiance").unwrap(), 200.0);
//!
//! constants.reset();
//! assert_eq!(constants.value("stellar_irradiance").unwrap(), 1367.0);
//! ```

use crate::errors::{RGCMError, RGCMResult};
use crate::state::unit_conversion;
use crate::units::Unit;
use crate::FloatValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single named constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    pub value: FloatValue,
    pub units: String,
    #[serde(default)]
    pub description: String,
}

impl Constant {
    pub fn new(value: FloatValue, units: impl Into<String>) -> Self {
        Self {
            value,
            units: units.into(),
            description: String::new(),
        }
    }

    fn described(value: FloatValue, units: &str, description: &str) -> Self {
        Self {
            value,
            units: units.to_string(),
            description: description.to_string(),
        }
    }
}

/// Table of physical constants keyed by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstantsTable {
    constants: BTreeMap<String, Constant>,
}

fn default_constants() -> BTreeMap<String, Constant> {
    [
        (
            "gravitational_acceleration",
            Constant::described(9.80665, "m s^-2", "Acceleration due to gravity at the surface"),
        ),
        (
            "heat_capacity_of_dry_air_at_constant_pressure",
            Constant::described(1004.64, "J kg^-1 K^-1", "Specific heat of dry air"),
        ),
        (
            "gas_constant_of_dry_air",
            Constant::described(287.04, "J kg^-1 K^-1", "Specific gas constant of dry air"),
        ),
        (
            "gas_constant_of_vapor_phase",
            Constant::described(461.5, "J kg^-1 K^-1", "Specific gas constant of water vapour"),
        ),
        (
            "heat_capacity_of_vapor_phase",
            Constant::described(1846.0, "J kg^-1 K^-1", "Specific heat of water vapour"),
        ),
        (
            "stefan_boltzmann_constant",
            Constant::described(5.670367e-8, "W m^-2 K^-4", "Stefan-Boltzmann constant"),
        ),
        (
            "stellar_irradiance",
            Constant::described(1367.0, "W m^-2", "Solar flux at the top of the atmosphere"),
        ),
        (
            "reference_air_pressure",
            Constant::described(1e5, "Pa", "Reference pressure for potential temperature"),
        ),
        (
            "latent_heat_of_condensation_of_water",
            Constant::described(2.5e6, "J kg^-1", "Latent heat released by condensation"),
        ),
        (
            "density_of_liquid_water",
            Constant::described(1000.0, "kg m^-3", "Density of liquid water"),
        ),
        (
            "heat_capacity_of_liquid_water",
            Constant::described(4185.5, "J kg^-1 K^-1", "Specific heat of liquid water"),
        ),
        (
            "freezing_temperature_of_liquid_water",
            Constant::described(273.15, "K", "Freezing point of water"),
        ),
        (
            "planetary_radius",
            Constant::described(6.371e6, "m", "Mean radius of the planet"),
        ),
        (
            "planetary_rotation_rate",
            Constant::described(7.292e-5, "s^-1", "Angular velocity of the planet"),
        ),
    ]
    .into_iter()
    .map(|(name, c)| (name.to_string(), c))
    .collect()
}

impl Default for ConstantsTable {
    fn default() -> Self {
        Self {
            constants: default_constants(),
        }
    }
}

impl ConstantsTable {
    /// A table with no constants at all.
    pub fn empty() -> Self {
        Self {
            constants: BTreeMap::new(),
        }
    }

    pub fn constant(&self, name: &str) -> RGCMResult<&Constant> {
        self.constants
            .get(name)
            .ok_or_else(|| RGCMError::UnknownConstant {
                name: name.to_string(),
            })
    }

    /// The value of a constant in the units it is stored in.
    pub fn value(&self, name: &str) -> RGCMResult<FloatValue> {
        Ok(self.constant(name)?.value)
    }

    /// The value of a constant converted to `units`.
    pub fn get(&self, name: &str, units: &str) -> RGCMResult<FloatValue> {
        let constant = self.constant(name)?;
        Ok(unit_conversion(name, &constant.units, units)?.apply(constant.value))
    }

    /// Sets a constant.
    ///
    /// An existing constant keeps its units: the new value is converted into
    /// them, so `units` must be compatible. A new name is added as given.
    pub fn set(&mut self, name: &str, value: FloatValue, units: &str) -> RGCMResult<()> {
        match self.constants.get_mut(name) {
            Some(existing) => {
                existing.value = unit_conversion(name, units, &existing.units)?.apply(value);
            }
            None => {
                Unit::parse(units)
                    .and_then(|u| u.dimension())
                    .map_err(|e| RGCMError::UnitParseError {
                        name: name.to_string(),
                        unit_string: units.to_string(),
                        details: e.to_string(),
                    })?;
                self.constants
                    .insert(name.to_string(), Constant::new(value, units));
            }
        }
        Ok(())
    }

    /// Restores the default constants, discarding any additions.
    pub fn reset(&mut self) {
        self.constants = default_constants();
    }

    /// Names of every constant in the table.
    pub fn list_available(&self) -> Vec<&str> {
        self.constants.keys().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Constant)> {
        self.constants.iter()
    }

    /// Applies every entry of `overrides` with [`ConstantsTable::set`].
    ///
    /// Nothing is changed if any entry fails.
    pub fn update_from_map(&mut self, overrides: &BTreeMap<String, Constant>) -> RGCMResult<()> {
        let mut updated = self.clone();
        for (name, c) in overrides {
            updated.set(name, c.value, &c.units)?;
            if !c.description.is_empty() {
                if let Some(entry) = updated.constants.get_mut(name) {
                    entry.description = c.description.clone();
                }
            }
        }
        *self = updated;
        Ok(())
    }

    /// The default table overridden by a TOML document of the form
    ///
    /// ```toml
    /// [stellar_irradiance]
    /// value = 200.0
    /// units = "W m^-2"
    /// ```
    pub fn from_toml_str(toml_str: &str) -> RGCMResult<Self> {
        let overrides: BTreeMap<String, Constant> = toml::from_str(toml_str)
            .map_err(|e| RGCMError::InvalidConfiguration(format!("invalid constants: {}", e)))?;
        let mut table = Self::default();
        table.update_from_map(&overrides)?;
        Ok(table)
    }
}

impl fmt::Display for ConstantsTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, c) in &self.constants {
            writeln!(f, "{}: {} {}", name, c.value, c.units)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use is_close::is_close;

    #[test]
    fn test_defaults() {
        let constants = ConstantsTable::default();
        assert_eq!(constants.value("gravitational_acceleration").unwrap(), 9.80665);
        assert!(constants
            .list_available()
            .contains(&"heat_capacity_of_dry_air_at_constant_pressure"));
    }

    #[test]
    fn test_get_converts_units() {
        let constants = ConstantsTable::default();
        let p = constants.get("reference_air_pressure", "hPa").unwrap();
        assert!(is_close!(p, 1000.0));
    }

    #[test]
    fn test_set_existing_converts_into_stored_units() {
        let mut constants = ConstantsTable::default();
        constants.set("reference_air_pressure", 1013.25, "hPa").unwrap();
        assert!(is_close!(constants.value("reference_air_pressure").unwrap(), 101_325.0));
        assert_eq!(constants.constant("reference_air_pressure").unwrap().units, "Pa");
    }

    #[test]
    fn test_set_incompatible_units() {
        let mut constants = ConstantsTable::default();
        let err = constants.set("reference_air_pressure", 1.0, "K").unwrap_err();
        assert!(matches!(err, RGCMError::UnitMismatch { .. }));
        assert_eq!(constants.value("reference_air_pressure").unwrap(), 1e5);
    }

    #[test]
    fn test_new_constant_and_reset() {
        let mut constants = ConstantsTable::default();
        constants.set("seawater_salinity", 35.0, "g/kg").unwrap();
        assert_eq!(constants.value("seawater_salinity").unwrap(), 35.0);
        constants.reset();
        assert!(matches!(
            constants.value("seawater_salinity"),
            Err(RGCMError::UnknownConstant { .. })
        ));
    }

    #[test]
    fn test_update_from_map_is_all_or_nothing() {
        let mut constants = ConstantsTable::default();
        let mut overrides = BTreeMap::new();
        overrides.insert("stellar_irradiance".to_string(), Constant::new(200.0, "W m^-2"));
        overrides.insert("planetary_radius".to_string(), Constant::new(1.0, "K"));

        assert!(constants.update_from_map(&overrides).is_err());
        assert_eq!(constants.value("stellar_irradiance").unwrap(), 1367.0);

        overrides.remove("planetary_radius");
        constants.update_from_map(&overrides).unwrap();
        assert_eq!(constants.value("stellar_irradiance").unwrap(), 200.0);
    }

    #[test]
    fn test_from_toml_str() {
        let constants = ConstantsTable::from_toml_str(
            r#"
            [stellar_irradiance]
            value = 200.0
            units = "W m^-2"

            [planetary_radius]
            value = 3390.0
            units = "km"
            "#,
        )
        .unwrap();
        assert_eq!(constants.value("stellar_irradiance").unwrap(), 200.0);
        assert!(is_close!(constants.value("planetary_radius").unwrap(), 3.39e6));
    }

    #[test]
    fn test_new_constant_with_unknown_units() {
        let mut constants = ConstantsTable::default();
        let err = constants.set("mystery", 1.0, "furlongs").unwrap_err();
        assert!(matches!(err, RGCMError::UnitParseError { .. }));
    }

    #[test]
    fn test_from_toml_str_invalid() {
        let err = ConstantsTable::from_toml_str("stellar_irradiance = 3").unwrap_err();
        assert!(matches!(err, RGCMError::InvalidConfiguration(_)));
    }
}
