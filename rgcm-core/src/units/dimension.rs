//! Physical dimensions for unit validation.
//!
//! Dimensions are integer exponents of the SI base quantities that occur in
//! atmospheric modelling: mass (M), length (L), time (T), temperature (Θ) and
//! amount of substance (N). Electric current and luminous intensity never appear
//! in the quantities exchanged between components and are not tracked.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// The physical dimension of a quantity.
///
/// For example:
/// - Wind speed has dimensions L·T⁻¹
/// - Pressure has dimensions M·L⁻¹·T⁻²
/// - A heating rate has dimensions Θ·T⁻¹
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Dimension {
    pub mass: i8,
    pub length: i8,
    pub time: i8,
    pub temperature: i8,
    pub amount: i8,
}

impl Dimension {
    /// Creates a new dimension with all exponents set to zero.
    #[must_use]
    pub const fn dimensionless() -> Self {
        Self::new(0, 0, 0, 0, 0)
    }

    /// Creates a dimension with the specified exponents.
    #[must_use]
    pub const fn new(mass: i8, length: i8, time: i8, temperature: i8, amount: i8) -> Self {
        Self {
            mass,
            length,
            time,
            temperature,
            amount,
        }
    }

    pub const MASS: Self = Self::new(1, 0, 0, 0, 0);
    pub const LENGTH: Self = Self::new(0, 1, 0, 0, 0);
    pub const TIME: Self = Self::new(0, 0, 1, 0, 0);
    pub const TEMPERATURE: Self = Self::new(0, 0, 0, 1, 0);
    pub const AMOUNT: Self = Self::new(0, 0, 0, 0, 1);

    /// Area (L²).
    pub const AREA: Self = Self::new(0, 2, 0, 0, 0);

    /// Velocity (L·T⁻¹).
    pub const VELOCITY: Self = Self::new(0, 1, -1, 0, 0);

    /// Pressure (M·L⁻¹·T⁻²).
    pub const PRESSURE: Self = Self::new(1, -1, -2, 0, 0);

    /// Energy (M·L²·T⁻²).
    pub const ENERGY: Self = Self::new(1, 2, -2, 0, 0);

    /// Power (M·L²·T⁻³).
    pub const POWER: Self = Self::new(1, 2, -3, 0, 0);

    /// Radiative flux (M·T⁻³), equivalent to W/m².
    pub const RADIATIVE_FLUX: Self = Self::new(1, 0, -3, 0, 0);

    /// Heating rate (Θ·T⁻¹).
    pub const HEATING_RATE: Self = Self::new(0, 0, -1, 1, 0);

    #[must_use]
    pub const fn is_dimensionless(&self) -> bool {
        self.mass == 0
            && self.length == 0
            && self.time == 0
            && self.temperature == 0
            && self.amount == 0
    }

    /// Two dimensions are compatible for conversion if they are identical.
    #[must_use]
    pub const fn is_compatible(&self, other: &Self) -> bool {
        self.mass == other.mass
            && self.length == other.length
            && self.time == other.time
            && self.temperature == other.temperature
            && self.amount == other.amount
    }

    /// Raises this dimension to an integer power.
    #[must_use]
    pub const fn pow(&self, exp: i8) -> Self {
        Self::new(
            self.mass * exp,
            self.length * exp,
            self.time * exp,
            self.temperature * exp,
            self.amount * exp,
        )
    }
}

impl Mul for Dimension {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self::new(
            self.mass + rhs.mass,
            self.length + rhs.length,
            self.time + rhs.time,
            self.temperature + rhs.temperature,
            self.amount + rhs.amount,
        )
    }
}

impl Add for Dimension {
    type Output = Self;

    /// Combining quantities multiplies their dimensions, which adds exponents.
    #[allow(clippy::suspicious_arithmetic_impl)]
    fn add(self, rhs: Self) -> Self::Output {
        self * rhs
    }
}

impl Sub for Dimension {
    type Output = Self;

    /// Division of quantities subtracts exponents.
    fn sub(self, rhs: Self) -> Self::Output {
        self + (-rhs)
    }
}

impl Neg for Dimension {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.pow(-1)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "dimensionless");
        }

        let symbols = [
            (self.mass, "M"),
            (self.length, "L"),
            (self.time, "T"),
            (self.temperature, "Θ"),
            (self.amount, "N"),
        ];

        let parts: Vec<String> = symbols
            .iter()
            .filter(|(exp, _)| *exp != 0)
            .map(|(exp, sym)| match exp {
                1 => sym.to_string(),
                _ => format!("{sym}^{exp}"),
            })
            .collect();

        write!(f, "{}", parts.join(" "))
    }
}
