//! Unit conversion.
//!
//! [`Unit`] combines a parsed unit with its dimension and its SI scaling. A
//! conversion between two compatible units is the affine map
//! `to = from * factor + offset`, where the offset is non-zero only when one
//! side is an absolute temperature scale such as `degC`.
//!
//! # Example
//!
//! ```
//! use rgcm_core::units::Unit;
//!
//! let hpa = Unit::parse("hPa").unwrap();
//! let pa = Unit::parse("Pa").unwrap();
//! assert_eq!(hpa.convert_to(1013.25, &pa).unwrap(), 101_325.0);
//!
//! let deg_c = Unit::parse("degC").unwrap();
//! let kelvin = Unit::parse("K").unwrap();
//! assert!((deg_c.convert_to(0.0, &kelvin).unwrap() - 273.15).abs() < 1e-12);
//! ```

use super::dimension::Dimension;
use super::parser::{ParseError, ParsedUnit};
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error type for unit conversion failures.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionError {
    IncompatibleDimensions {
        from: Dimension,
        to: Dimension,
        from_unit: String,
        to_unit: String,
    },
    ParseError(ParseError),
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IncompatibleDimensions {
                from,
                to,
                from_unit,
                to_unit,
            } => write!(
                f,
                "cannot convert from '{from_unit}' to '{to_unit}': \
                 incompatible dimensions ({from} vs {to})"
            ),
            Self::ParseError(e) => write!(f, "unit parse error: {e}"),
        }
    }
}

impl std::error::Error for ConversionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ParseError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for ConversionError {
    fn from(e: ParseError) -> Self {
        Self::ParseError(e)
    }
}

/// The affine map between two units: `to = from * factor + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conversion {
    pub factor: f64,
    pub offset: f64,
}

impl Conversion {
    pub const IDENTITY: Self = Self {
        factor: 1.0,
        offset: 0.0,
    };

    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.factor == 1.0 && self.offset == 0.0
    }

    #[must_use]
    pub fn apply(&self, value: f64) -> f64 {
        value * self.factor + self.offset
    }

    /// Converts every element of an array, skipping the copy for identity maps.
    #[must_use]
    pub fn apply_array(&self, values: &ArrayD<f64>) -> ArrayD<f64> {
        if self.is_identity() {
            values.clone()
        } else {
            values.mapv(|v| self.apply(v))
        }
    }
}

/// A parsed and validated unit.
///
/// Equality compares the normalized form, so `Unit::parse("W/m^2")` equals
/// `Unit::parse("W m^-2")`. Units that are merely convertible (`hPa` and `Pa`)
/// are not equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    original: String,
    parsed: ParsedUnit,
}

impl Unit {
    /// Parses a unit string.
    ///
    /// ```
    /// use rgcm_core::units::Unit;
    ///
    /// let u1 = Unit::parse("W/m^2").unwrap();
    /// let u2 = Unit::parse("W m^-2").unwrap();
    /// assert_eq!(u1, u2);
    /// ```
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        Ok(Self {
            original: input.to_string(),
            parsed: ParsedUnit::parse(input)?,
        })
    }

    #[must_use]
    pub fn original(&self) -> &str {
        &self.original
    }

    #[must_use]
    pub fn normalized(&self) -> String {
        self.parsed.normalized()
    }

    #[must_use]
    pub fn parsed(&self) -> &ParsedUnit {
        &self.parsed
    }

    /// False when the dimension cannot be computed.
    #[must_use]
    pub fn is_dimensionless(&self) -> bool {
        self.parsed.is_dimensionless().unwrap_or(false)
    }

    pub fn dimension(&self) -> Result<Dimension, ParseError> {
        self.parsed.dimension()
    }

    pub fn to_si_factor(&self) -> Result<f64, ParseError> {
        self.parsed.to_si_factor()
    }

    /// Units are compatible if they have the same physical dimension.
    pub fn is_compatible(&self, other: &Self) -> bool {
        match (self.dimension(), other.dimension()) {
            (Ok(d1), Ok(d2)) => d1.is_compatible(&d2),
            _ => false,
        }
    }

    /// The affine map from values in `self` to values in `other`.
    ///
    /// # Errors
    ///
    /// Fails if either unit contains an unknown symbol or if the dimensions differ.
    pub fn conversion(&self, other: &Self) -> Result<Conversion, ConversionError> {
        let dim_self = self.dimension()?;
        let dim_other = other.dimension()?;
        if !dim_self.is_compatible(&dim_other) {
            return Err(ConversionError::IncompatibleDimensions {
                from: dim_self,
                to: dim_other,
                from_unit: self.original.clone(),
                to_unit: other.original.clone(),
            });
        }

        // si = v * f_from + o_from; to = (si - o_to) / f_to
        let f_from = self.to_si_factor()?;
        let f_to = other.to_si_factor()?;
        let o_from = self.parsed.to_si_offset()?;
        let o_to = other.parsed.to_si_offset()?;
        Ok(Conversion {
            factor: f_from / f_to,
            offset: (o_from - o_to) / f_to,
        })
    }

    /// The multiplicative part of [`Unit::conversion`].
    ///
    /// For units with an offset this is the factor that applies to differences.
    pub fn conversion_factor(&self, other: &Self) -> Result<f64, ConversionError> {
        Ok(self.conversion(other)?.factor)
    }

    pub fn convert_to(&self, value: f64, other: &Self) -> Result<f64, ConversionError> {
        Ok(self.conversion(other)?.apply(value))
    }
}

impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.parsed == other.parsed
    }
}

impl Eq for Unit {}

impl std::hash::Hash for Unit {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.normalized())
    }
}

/// Checks if two unit strings are equivalent after normalization.
///
/// ```
/// use rgcm_core::units::units_equal;
///
/// assert!(units_equal("K/s", "K s^-1").unwrap());
/// assert!(!units_equal("K/s", "K/day").unwrap());
/// ```
pub fn units_equal(a: &str, b: &str) -> Result<bool, ParseError> {
    Ok(Unit::parse(a)? == Unit::parse(b)?)
}

/// Multiplicative conversion factor between two unit strings.
///
/// ```
/// use rgcm_core::units::conversion_factor;
///
/// let factor = conversion_factor("K/day", "K/s").unwrap();
/// assert!((factor - 1.0 / 86400.0).abs() < 1e-18);
/// ```
pub fn conversion_factor(from: &str, to: &str) -> Result<f64, ConversionError> {
    Unit::parse(from)?.conversion_factor(&Unit::parse(to)?)
}

/// Converts a whole array between two unit strings, honouring offsets.
pub fn convert_array(
    values: &ArrayD<f64>,
    from: &str,
    to: &str,
) -> Result<ArrayD<f64>, ConversionError> {
    let conversion = Unit::parse(from)?.conversion(&Unit::parse(to)?)?;
    Ok(conversion.apply_array(values))
}
