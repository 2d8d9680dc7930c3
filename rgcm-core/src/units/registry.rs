//! Registry of units that occur in atmospheric model quantities.
//!
//! Every registered unit carries its physical dimension and the factor that
//! converts it to SI base units. Absolute temperature scales additionally carry
//! an offset so that `degC` and `K` can be converted as values, not only as
//! differences.
//!
//! # Conversion Convention
//!
//! `si_value = value * to_si_factor + offset`
//!
//! - hPa has factor 100 (1 hPa = 100 Pa)
//! - day has factor 86400
//! - degC has factor 1 and offset 273.15

use super::dimension::Dimension;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Information about a known unit.
#[derive(Debug, Clone)]
pub struct UnitInfo {
    /// The canonical name of this unit.
    pub name: String,
    /// The physical dimension of this unit.
    pub dimension: Dimension,
    /// Conversion factor to SI base units.
    pub to_si_factor: f64,
    /// Offset added after scaling. Only non-zero for absolute temperature scales.
    pub offset: f64,
}

impl UnitInfo {
    fn new(name: &str, dimension: Dimension, to_si_factor: f64) -> Self {
        Self {
            name: name.to_string(),
            dimension,
            to_si_factor,
            offset: 0.0,
        }
    }

    fn affine(name: &str, dimension: Dimension, to_si_factor: f64, offset: f64) -> Self {
        Self {
            offset,
            ..Self::new(name, dimension, to_si_factor)
        }
    }

    /// Whether converting this unit requires more than a multiplication.
    #[must_use]
    pub fn is_affine(&self) -> bool {
        self.offset != 0.0
    }
}

/// SI prefix multipliers.
#[derive(Debug, Clone, Copy)]
pub struct SiPrefix {
    pub symbol: &'static str,
    pub factor: f64,
}

/// Prefixes ordered longest symbol first so `da` wins over `d`.
pub static SI_PREFIXES: &[SiPrefix] = &[
    SiPrefix {
        symbol: "da",
        factor: 1e1,
    },
    SiPrefix {
        symbol: "G",
        factor: 1e9,
    },
    SiPrefix {
        symbol: "M",
        factor: 1e6,
    },
    SiPrefix {
        symbol: "k",
        factor: 1e3,
    },
    SiPrefix {
        symbol: "h",
        factor: 1e2,
    },
    SiPrefix {
        symbol: "d",
        factor: 1e-1,
    },
    SiPrefix {
        symbol: "c",
        factor: 1e-2,
    },
    SiPrefix {
        symbol: "m",
        factor: 1e-3,
    },
    SiPrefix {
        symbol: "u",
        factor: 1e-6,
    },
    SiPrefix {
        symbol: "μ",
        factor: 1e-6,
    },
    SiPrefix {
        symbol: "n",
        factor: 1e-9,
    },
];

pub const SECONDS_PER_YEAR: f64 = 365.25 * SECONDS_PER_DAY;
pub const SECONDS_PER_DAY: f64 = 24.0 * 3600.0;
pub const SECONDS_PER_HOUR: f64 = 3600.0;
pub const SECONDS_PER_MINUTE: f64 = 60.0;
/// Offset between the Celsius and Kelvin scales.
pub const CELSIUS_OFFSET: f64 = 273.15;

/// Process-wide registry of known units. Read-only after construction.
pub static UNIT_REGISTRY: LazyLock<UnitRegistry> = LazyLock::new(UnitRegistry::new);

#[derive(Debug)]
pub struct UnitRegistry {
    units: HashMap<&'static str, UnitInfo>,
    aliases: HashMap<&'static str, &'static str>,
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            units: HashMap::new(),
            aliases: HashMap::new(),
        };
        registry.register_base_units();
        registry.register_time_units();
        registry.register_mechanical_units();
        registry.register_temperature_units();
        registry.register_angle_units();
        registry.register_ratio_units();
        registry
    }

    /// Looks up a unit by symbol, handling aliases and SI prefixes.
    pub fn lookup(&self, symbol: &str) -> Option<UnitInfo> {
        self.lookup_exact(symbol)
            .or_else(|| self.lookup_prefixed(symbol))
    }

    fn lookup_exact(&self, symbol: &str) -> Option<UnitInfo> {
        self.units
            .get(symbol)
            .or_else(|| {
                self.aliases
                    .get(symbol)
                    .and_then(|canonical| self.units.get(canonical))
            })
            .cloned()
    }

    fn lookup_prefixed(&self, symbol: &str) -> Option<UnitInfo> {
        SI_PREFIXES.iter().find_map(|prefix| {
            let base_symbol = symbol.strip_prefix(prefix.symbol)?;
            let base = self.lookup_exact(base_symbol)?;
            // Prefixed absolute temperatures are meaningless
            if base.is_affine() {
                return None;
            }
            Some(UnitInfo::new(
                symbol,
                base.dimension,
                base.to_si_factor * prefix.factor,
            ))
        })
    }

    fn insert(&mut self, info: UnitInfo, name: &'static str) {
        self.units.insert(name, info);
    }

    fn alias(&mut self, alias: &'static str, canonical: &'static str) {
        self.aliases.insert(alias, canonical);
    }

    fn register_base_units(&mut self) {
        self.insert(UnitInfo::new("kg", Dimension::MASS, 1.0), "kg");
        self.insert(UnitInfo::new("g", Dimension::MASS, 1e-3), "g");
        self.insert(UnitInfo::new("m", Dimension::LENGTH, 1.0), "m");
        self.insert(UnitInfo::new("s", Dimension::TIME, 1.0), "s");
        self.insert(UnitInfo::new("K", Dimension::TEMPERATURE, 1.0), "K");
        self.insert(UnitInfo::new("mol", Dimension::AMOUNT, 1.0), "mol");
        self.insert(UnitInfo::new("1", Dimension::dimensionless(), 1.0), "1");

        self.alias("degK", "K");
        self.alias("kelvin", "K");
        self.alias("meter", "m");
        self.alias("metre", "m");
        self.alias("sec", "s");
        self.alias("second", "s");
        self.alias("seconds", "s");
        self.alias("dimensionless", "1");
    }

    fn register_time_units(&mut self) {
        self.insert(UnitInfo::new("yr", Dimension::TIME, SECONDS_PER_YEAR), "yr");
        self.insert(UnitInfo::new("day", Dimension::TIME, SECONDS_PER_DAY), "day");
        self.insert(UnitInfo::new("h", Dimension::TIME, SECONDS_PER_HOUR), "h");
        self.insert(
            UnitInfo::new("min", Dimension::TIME, SECONDS_PER_MINUTE),
            "min",
        );

        self.alias("year", "yr");
        self.alias("years", "yr");
        self.alias("days", "day");
        self.alias("d", "day");
        self.alias("hr", "h");
        self.alias("hour", "h");
        self.alias("hours", "h");
        self.alias("minute", "min");
        self.alias("minutes", "min");
    }

    fn register_mechanical_units(&mut self) {
        self.insert(UnitInfo::new("Pa", Dimension::PRESSURE, 1.0), "Pa");
        self.insert(UnitInfo::new("bar", Dimension::PRESSURE, 1e5), "bar");
        self.insert(UnitInfo::new("atm", Dimension::PRESSURE, 101_325.0), "atm");
        self.insert(UnitInfo::new("J", Dimension::ENERGY, 1.0), "J");
        self.insert(UnitInfo::new("W", Dimension::POWER, 1.0), "W");
        self.insert(
            UnitInfo::new("N", Dimension::PRESSURE * Dimension::AREA, 1.0),
            "N",
        );

        self.alias("pascal", "Pa");
        self.alias("joule", "J");
        self.alias("watt", "W");
    }

    fn register_temperature_units(&mut self) {
        self.insert(
            UnitInfo::affine("degC", Dimension::TEMPERATURE, 1.0, CELSIUS_OFFSET),
            "degC",
        );
        self.insert(
            UnitInfo::affine(
                "degF",
                Dimension::TEMPERATURE,
                5.0 / 9.0,
                CELSIUS_OFFSET - 32.0 * 5.0 / 9.0,
            ),
            "degF",
        );
        // Temperature differences in Celsius have no offset
        self.insert(
            UnitInfo::new("delta_degC", Dimension::TEMPERATURE, 1.0),
            "delta_degC",
        );

        self.alias("degree_Celsius", "degC");
        self.alias("celsius", "degC");
        self.alias("degree_Fahrenheit", "degF");
    }

    fn register_angle_units(&mut self) {
        self.insert(
            UnitInfo::new("radians", Dimension::dimensionless(), 1.0),
            "radians",
        );
        self.insert(
            UnitInfo::new(
                "degrees",
                Dimension::dimensionless(),
                std::f64::consts::PI / 180.0,
            ),
            "degrees",
        );

        self.alias("rad", "radians");
        self.alias("radian", "radians");
        self.alias("degree", "degrees");
        self.alias("degrees_north", "degrees");
        self.alias("degrees_east", "degrees");
        self.alias("degrees_N", "degrees");
        self.alias("degrees_E", "degrees");
    }

    fn register_ratio_units(&mut self) {
        self.insert(
            UnitInfo::new("percent", Dimension::dimensionless(), 1e-2),
            "percent",
        );
        self.insert(
            UnitInfo::new("ppm", Dimension::dimensionless(), 1e-6),
            "ppm",
        );
        self.insert(
            UnitInfo::new("ppb", Dimension::dimensionless(), 1e-9),
            "ppb",
        );

        self.alias("%", "percent");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_unit_lookup() {
        let kg = UNIT_REGISTRY.lookup("kg").unwrap();
        assert_eq!(kg.dimension, Dimension::MASS);
        assert_eq!(kg.to_si_factor, 1.0);
    }

    #[test]
    fn test_prefixed_pressure() {
        let hpa = UNIT_REGISTRY.lookup("hPa").unwrap();
        assert_eq!(hpa.dimension, Dimension::PRESSURE);
        assert_eq!(hpa.to_si_factor, 100.0);

        let mbar = UNIT_REGISTRY.lookup("mbar").unwrap();
        assert!((mbar.to_si_factor - 100.0).abs() < 1e-9);

        let kpa = UNIT_REGISTRY.lookup("kPa").unwrap();
        assert_eq!(kpa.to_si_factor, 1000.0);
    }

    #[test]
    fn test_exact_match_beats_prefix() {
        // "min" must not be read as milli-"in"; "day" must not be deci-"ay"
        let min = UNIT_REGISTRY.lookup("min").unwrap();
        assert_eq!(min.to_si_factor, 60.0);
        let day = UNIT_REGISTRY.lookup("day").unwrap();
        assert_eq!(day.to_si_factor, SECONDS_PER_DAY);
    }

    #[test]
    fn test_celsius_is_affine() {
        let deg_c = UNIT_REGISTRY.lookup("degC").unwrap();
        assert!(deg_c.is_affine());
        assert_eq!(deg_c.offset, CELSIUS_OFFSET);
        assert!(!UNIT_REGISTRY.lookup("delta_degC").unwrap().is_affine());
    }

    #[test]
    fn test_no_prefixed_celsius() {
        assert!(UNIT_REGISTRY.lookup("kdegC").is_none());
    }

    #[test]
    fn test_aliases() {
        assert_eq!(UNIT_REGISTRY.lookup("degK").unwrap().name, "K");
        assert_eq!(UNIT_REGISTRY.lookup("degrees_north").unwrap().name, "degrees");
        assert_eq!(UNIT_REGISTRY.lookup("%").unwrap().name, "percent");
    }

    #[test]
    fn test_unknown_unit() {
        assert!(UNIT_REGISTRY.lookup("furlong").is_none());
    }
}
