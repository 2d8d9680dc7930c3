//! Unit parsing, normalization and conversion for model quantities.
//!
//! Quantities carry their unit as a free-form string. Before a component sees
//! an input, the value is converted from the unit it is stored in to the unit
//! the component declared. This module turns those strings into something that
//! can be compared and converted.
//!
//! # Quick Start
//!
//! ```
//! use rgcm_core::units::Unit;
//!
//! // Different spellings of the same unit compare equal
//! let u1 = Unit::parse("W/m^2").unwrap();
//! let u2 = Unit::parse("W m^-2").unwrap();
//! assert_eq!(u1, u2);
//!
//! // Compatible units convert
//! let hpa = Unit::parse("hPa").unwrap();
//! let pa = Unit::parse("Pa").unwrap();
//! assert_eq!(hpa.conversion_factor(&pa).unwrap(), 100.0);
//!
//! // Incompatible units do not
//! let kelvin = Unit::parse("K").unwrap();
//! assert!(!kelvin.is_compatible(&pa));
//! assert!(kelvin.conversion_factor(&pa).is_err());
//! ```
//!
//! # Supported Syntax
//!
//! | Notation | Meaning |
//! |----------|---------|
//! | `m^2`, `m**2`, `m2` | Square metres |
//! | `W/m^2`, `W m^-2`, `W per m^2` | Watts per square metre |
//! | `kg m`, `kg*m`, `kg·m` | Kilogram-metres |
//! | `(K) / s` | A tendency of a quantity stored in kelvin |
//!
//! # Units known to the registry
//!
//! - **Pressure**: `Pa` with SI prefixes (`hPa`, `kPa`), `bar`, `mbar`, `atm`
//! - **Temperature**: `K`, `degK`, and the absolute scales `degC` and `degF`
//! - **Time**: `s`, `min`, `h`, `day`
//! - **Angles**: `radians`, `degrees`, `degrees_north`, `degrees_east`
//! - **Ratios**: `kg/kg`, `g/kg`, `percent`, `%`, `ppm`
//! - **Energy/Power**: `J`, `W`
//!
//! # Module Structure
//!
//! - [`dimension`]: Physical dimension exponents (M, L, T, Θ, N)
//! - [`registry`]: Known units with conversion factors and offsets
//! - [`parser`]: Unit string parsing with normalization
//! - [`conversion`]: High-level [`Unit`] type and conversion API

pub mod conversion;
pub mod dimension;
pub mod parser;
pub mod registry;

pub use conversion::{convert_array, conversion_factor, units_equal, Conversion, ConversionError, Unit};
pub use dimension::Dimension;
pub use parser::{ParseError, ParsedUnit};
pub use registry::{UnitInfo, UnitRegistry, UNIT_REGISTRY};

/// The unit of the time derivative of a quantity stored in `units`.
///
/// ```
/// use rgcm_core::units::tendency_units;
///
/// assert_eq!(tendency_units("K"), "(K) / s");
/// ```
#[must_use]
pub fn tendency_units(units: &str) -> String {
    format!("({units}) / s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tendency_units_round_trip_through_parser() {
        let tendency = Unit::parse(&tendency_units("m s^-1")).unwrap();
        assert_eq!(tendency, Unit::parse("m/s^2").unwrap());
        assert_eq!(tendency.dimension().unwrap(), Dimension::VELOCITY - Dimension::TIME);
    }

    #[test]
    fn test_declared_tendency_in_kelvin_per_day() {
        let stored = tendency_units("K");
        let factor = conversion_factor("K/day", &stored).unwrap();
        assert!((factor * 86400.0 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_dimensionless_variants() {
        for unit in ["1", "dimensionless", "kg/kg", "%", "ppm", "degrees"] {
            let parsed = Unit::parse(unit).unwrap();
            assert!(parsed.is_dimensionless(), "{unit} should be dimensionless");
        }
    }
}
