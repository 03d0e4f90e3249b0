//! Explicit angle values.
//!
//! Configuration never takes bare floats for angles; [`Angle`] forces the
//! caller to say whether a value is degrees or radians.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An angle, stored internally in radians.
///
/// # Example
///
/// ```
/// use kin_types::Angle;
///
/// let quarter = Angle::degrees(90.0);
/// assert!((quarter.to_radians() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Angle(f64);

impl Angle {
    /// The zero angle.
    pub const ZERO: Self = Self(0.0);

    /// Create an angle from radians.
    #[must_use]
    pub const fn radians(radians: f64) -> Self {
        Self(radians)
    }

    /// Create an angle from degrees.
    #[must_use]
    pub fn degrees(degrees: f64) -> Self {
        Self(degrees.to_radians())
    }

    /// The value in radians.
    #[must_use]
    pub const fn to_radians(self) -> f64 {
        self.0
    }

    /// The value in degrees.
    #[must_use]
    pub fn to_degrees(self) -> f64 {
        self.0.to_degrees()
    }
}

impl std::ops::Add for Angle {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Angle {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl std::ops::Neg for Angle {
    type Output = Self;
    fn neg(self) -> Self {
        Self(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_degree_radian_conversion() {
        let a = Angle::degrees(180.0);
        assert_relative_eq!(a.to_radians(), std::f64::consts::PI, epsilon = 1e-12);
        assert_relative_eq!(a.to_degrees(), 180.0, epsilon = 1e-12);
    }

    #[test]
    fn test_arithmetic() {
        let sum = Angle::degrees(30.0) + Angle::degrees(60.0);
        assert_relative_eq!(sum.to_degrees(), 90.0, epsilon = 1e-12);
        assert!(Angle::degrees(10.0) < Angle::degrees(20.0));
        assert_relative_eq!((-Angle::degrees(45.0)).to_degrees(), -45.0, epsilon = 1e-12);
    }
}
